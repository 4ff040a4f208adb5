//! ElevenLabs synthesis variant
//!
//! Higher-quality multilingual voices than the OpenAI endpoint; requested
//! with `output_format=pcm_24000` so the downstream normalization is the
//! same for both vendors.

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use serde_json::json;
use tracing::debug;

use crate::client::ensure_success;
use crate::error::{ProviderError, ProviderResult};
use crate::tts::{PcmStream, TtsProvider};

const API_BASE: &str = "https://api.elevenlabs.io";
const DEFAULT_MODEL: &str = "eleven_multilingual_v2";
/// "Daniel", a multilingual voice
const DEFAULT_VOICE: &str = "onwK4e9ZLuTAKqWW03F9";

const NATIVE_SAMPLE_RATE: u32 = 24_000;

pub struct ElevenLabsTtsProvider {
    http: reqwest::Client,
    api_key: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsTtsProvider {
    pub fn new(api_key: String, voice: Option<String>, model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            voice_id: voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            model_id: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    async fn request(&self, text: &str, streaming: bool) -> ProviderResult<reqwest::Response> {
        let endpoint = if streaming { "/stream" } else { "" };
        let url = format!(
            "{API_BASE}/v1/text-to-speech/{}{endpoint}?output_format=pcm_24000",
            self.voice_id
        );
        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&json!({
                "text": text,
                "model_id": self.model_id,
                "voice_settings": {
                    "stability": 0.5,
                    "similarity_boost": 0.75,
                },
            }))
            .send()
            .await?;
        ensure_success(response).await
    }
}

#[async_trait]
impl TtsProvider for ElevenLabsTtsProvider {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    fn sample_rate(&self) -> u32 {
        NATIVE_SAMPLE_RATE
    }

    async fn synthesize(&self, text: &str) -> ProviderResult<Bytes> {
        debug!(chars = text.len(), model = %self.model_id, "ElevenLabs batch synthesis");
        Ok(self.request(text, false).await?.bytes().await?)
    }

    async fn synthesize_stream(&self, text: &str) -> ProviderResult<PcmStream> {
        debug!(chars = text.len(), model = %self.model_id, "ElevenLabs streaming synthesis");
        let response = self.request(text, true).await?;
        Ok(Box::pin(response.bytes_stream().map_err(ProviderError::Transport)))
    }
}
