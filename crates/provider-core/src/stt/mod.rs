//! Speech-recognition abstraction
//!
//! Recognition failures degrade rather than abort: a vendor error returns
//! the [`TRANSCRIPTION_FAILED`] placeholder so a garbled reply spoils one
//! turn instead of the whole call.

mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::SttConfig;

pub use openai::OpenAiSttProvider;

/// Placeholder returned when the recognition vendor fails
pub const TRANSCRIPTION_FAILED: &str = "[transcription failed]";

/// Speech-to-text operations.
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Vendor name for log lines
    fn name(&self) -> &'static str;

    /// Transcribe a WAV container of caller audio.
    ///
    /// Never fails: vendor errors yield [`TRANSCRIPTION_FAILED`], and a
    /// container with no payload yields an empty string without a vendor
    /// round trip.
    async fn recognize(&self, wav: Vec<u8>) -> String;
}

/// Construct the recognition provider.
pub fn build_stt_provider(config: &SttConfig) -> Arc<dyn SttProvider> {
    Arc::new(OpenAiSttProvider::new(
        config.api_key.clone(),
        config.model.clone(),
    ))
}
