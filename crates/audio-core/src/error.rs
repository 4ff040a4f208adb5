//! Error types for audio processing

use thiserror::Error;

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors that can occur while converting or framing audio
#[derive(Debug, Error)]
pub enum AudioError {
    /// Rate conversion was configured with an unsupported rate pair
    #[error("unsupported rate conversion: {input_rate} Hz -> {output_rate} Hz ({reason})")]
    UnsupportedRateConversion {
        input_rate: u32,
        output_rate: u32,
        reason: String,
    },

    /// Invalid configuration
    #[error("invalid audio configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl AudioError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}
