//! Speech-synthesis abstraction
//!
//! Both vendors produce 16-bit little-endian mono PCM at their native
//! 24 kHz rate; [`TtsProvider::sample_rate`] lets the codec layer normalize
//! it down to the wire rate. Streaming synthesis yields a lazy, finite,
//! non-restartable sequence of byte chunks with no alignment guarantees.

mod elevenlabs;
mod openai;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::ProviderResult;
use crate::types::{TtsConfig, TtsProviderKind};

pub use elevenlabs::ElevenLabsTtsProvider;
pub use openai::OpenAiTtsProvider;

/// A lazy stream of synthesized PCM chunks
pub type PcmStream = Pin<Box<dyn Stream<Item = ProviderResult<Bytes>> + Send>>;

/// Text-to-speech operations.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Vendor name for log lines
    fn name(&self) -> &'static str;

    /// Native PCM sample rate of this vendor's output, in Hz
    fn sample_rate(&self) -> u32;

    /// Synthesize the whole utterance in one response
    async fn synthesize(&self, text: &str) -> ProviderResult<Bytes>;

    /// Synthesize as a chunked stream, preferred for long utterances
    async fn synthesize_stream(&self, text: &str) -> ProviderResult<PcmStream>;
}

/// Construct the configured synthesis variant.
pub fn build_tts_provider(config: &TtsConfig) -> Arc<dyn TtsProvider> {
    match config.kind {
        TtsProviderKind::OpenAi => Arc::new(OpenAiTtsProvider::new(
            config.api_key.clone(),
            config.voice.clone(),
            config.model.clone(),
        )),
        TtsProviderKind::ElevenLabs => Arc::new(ElevenLabsTtsProvider::new(
            config.api_key.clone(),
            config.voice.clone(),
            config.model.clone(),
        )),
    }
}
