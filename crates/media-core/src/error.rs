//! Error types for media stream handling

use thiserror::Error;

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur on the media stream
#[derive(Debug, Error)]
pub enum MediaError {
    /// An envelope could not be parsed as a known carrier event
    #[error("malformed media envelope: {0}")]
    MalformedEnvelope(#[from] serde_json::Error),

    /// A media payload was not valid base64
    #[error("invalid media payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
}
