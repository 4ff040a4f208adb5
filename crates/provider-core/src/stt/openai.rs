//! OpenAI recognition variant

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::ensure_success;
use crate::error::ProviderResult;
use crate::stt::{SttProvider, TRANSCRIPTION_FAILED};

const API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "gpt-4o-transcribe";

/// A WAV container of this size or less carries no samples.
const WAV_HEADER_LEN: usize = 44;

pub struct OpenAiSttProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct Transcription {
    text: String,
}

impl OpenAiSttProvider {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    async fn transcribe(&self, wav: Vec<u8>) -> ProviderResult<String> {
        let file = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone());

        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let transcription: Transcription = ensure_success(response).await?.json().await?;
        Ok(transcription.text)
    }
}

#[async_trait]
impl SttProvider for OpenAiSttProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn recognize(&self, wav: Vec<u8>) -> String {
        if wav.len() <= WAV_HEADER_LEN {
            return String::new();
        }

        match self.transcribe(wav).await {
            Ok(text) => {
                debug!(chars = text.len(), "transcription complete");
                text
            }
            Err(error) => {
                warn!(%error, "transcription failed, degrading turn");
                TRANSCRIPTION_FAILED.to_string()
            }
        }
    }
}
