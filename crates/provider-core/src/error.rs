//! Error types for provider operations

use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while talking to a carrier or speech vendor
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure reaching the vendor
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success response from the vendor API
    #[error("provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A webhook arrived without the expected signature material
    #[error("missing webhook signature header: {header}")]
    MissingSignature { header: &'static str },

    /// A webhook signature did not verify
    #[error("webhook signature verification failed: {reason}")]
    SignatureInvalid { reason: String },

    /// Provider credentials were missing or unusable
    #[error("provider credential error: {message}")]
    Credentials { message: String },

    /// The vendor response could not be interpreted
    #[error("unexpected provider response: {message}")]
    UnexpectedResponse { message: String },
}

impl ProviderError {
    /// Create a signature verification error
    pub fn signature_invalid(reason: impl Into<String>) -> Self {
        Self::SignatureInvalid {
            reason: reason.into(),
        }
    }

    /// Create a credentials error
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    /// Create an unexpected response error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }
}
