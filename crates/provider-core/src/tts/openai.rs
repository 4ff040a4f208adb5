//! OpenAI synthesis variant

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use serde_json::json;
use tracing::debug;

use crate::client::ensure_success;
use crate::error::{ProviderError, ProviderResult};
use crate::tts::{PcmStream, TtsProvider};

const API_URL: &str = "https://api.openai.com/v1/audio/speech";
const DEFAULT_MODEL: &str = "tts-1";
const DEFAULT_VOICE: &str = "onyx";

/// Raw PCM output from the speech endpoint is 24 kHz mono 16-bit.
const NATIVE_SAMPLE_RATE: u32 = 24_000;

pub struct OpenAiTtsProvider {
    http: reqwest::Client,
    api_key: String,
    voice: String,
    model: String,
}

impl OpenAiTtsProvider {
    pub fn new(api_key: String, voice: Option<String>, model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            voice: voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    async fn request(&self, text: &str) -> ProviderResult<reqwest::Response> {
        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "voice": self.voice,
                "input": text,
                "response_format": "pcm",
                "speed": 1.0,
            }))
            .send()
            .await?;
        ensure_success(response).await
    }
}

#[async_trait]
impl TtsProvider for OpenAiTtsProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn sample_rate(&self) -> u32 {
        NATIVE_SAMPLE_RATE
    }

    async fn synthesize(&self, text: &str) -> ProviderResult<Bytes> {
        debug!(chars = text.len(), model = %self.model, "OpenAI TTS batch synthesis");
        Ok(self.request(text).await?.bytes().await?)
    }

    async fn synthesize_stream(&self, text: &str) -> ProviderResult<PcmStream> {
        debug!(chars = text.len(), model = %self.model, "OpenAI TTS streaming synthesis");
        let response = self.request(text).await?;
        Ok(Box::pin(response.bytes_stream().map_err(ProviderError::Transport)))
    }
}
