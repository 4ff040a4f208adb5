//! Carrier and speech-vendor integrations for the switchboard telephony
//! bridge.
//!
//! Three capability traits, each with a closed set of variants selected once
//! at startup and injected into the call engine:
//!
//! - [`phone::PhoneProvider`] — dial, hang up, attach the media stream, and
//!   authenticate webhooks (Twilio or Telnyx)
//! - [`tts::TtsProvider`] — text to PCM synthesis (OpenAI or ElevenLabs)
//! - [`stt::SttProvider`] — WAV container to text (OpenAI)
//!
//! Provider instances are stateless per call and shared across the registry.

pub mod error;
pub mod phone;
pub mod stt;
pub mod tts;
pub mod types;

mod client;

pub use error::{ProviderError, ProviderResult};
pub use phone::{build_phone_provider, PhoneProvider};
pub use stt::{build_stt_provider, SttProvider, TRANSCRIPTION_FAILED};
pub use tts::{build_tts_provider, PcmStream, TtsProvider};
pub use types::{
    AnswerResponse, CarrierCallStatus, PhoneConfig, PhoneProviderKind, SttConfig, StatusUpdate,
    TtsConfig, TtsProviderKind,
};
