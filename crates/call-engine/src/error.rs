//! Error types for the call engine

use switchboard_audio_core::AudioError;
use switchboard_provider_core::ProviderError;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to control-API callers and internal turn logic.
///
/// All of these are structured and returned to the caller; none of them
/// crash the registry or affect other calls.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No session exists for the given call id
    #[error("unknown call: {call_id}")]
    UnknownCall { call_id: String },

    /// The session exists but is not in the connected state
    #[error("call {call_id} is not live")]
    CallNotLive { call_id: String },

    /// Another turn is already running for this call
    #[error("a turn is already in progress for call {call_id}")]
    TurnInProgress { call_id: String },

    /// A listen hit its absolute ceiling with no end-of-utterance
    #[error("no reply from the callee within {seconds} seconds")]
    ResponseTimeout { seconds: u64 },

    /// Control-API surface of [`EngineError::ResponseTimeout`]
    #[error("turn timed out after {seconds} seconds")]
    TurnTimeout { seconds: u64 },

    /// The call never connected within the connect deadline
    #[error("call not connected within {seconds} seconds")]
    DialTimeout { seconds: u64 },

    /// The media connection dropped mid-turn
    #[error("media connection closed")]
    MediaClosed,

    /// Carrier or speech vendor failure
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Audio pipeline failure
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),

    /// Startup configuration problem; fatal
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Create an unknown-call error
    pub fn unknown_call(call_id: impl Into<String>) -> Self {
        Self::UnknownCall {
            call_id: call_id.into(),
        }
    }

    /// Create a not-live error
    pub fn not_live(call_id: impl Into<String>) -> Self {
        Self::CallNotLive {
            call_id: call_id.into(),
        }
    }

    /// Create a turn-in-progress error
    pub fn turn_in_progress(call_id: impl Into<String>) -> Self {
        Self::TurnInProgress {
            call_id: call_id.into(),
        }
    }
}
