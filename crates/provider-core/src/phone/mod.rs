//! Carrier abstraction
//!
//! One trait over the closed set of supported carriers. The engine holds a
//! single shared instance chosen at startup; per-call state lives entirely
//! in the call session, never here.

mod telnyx;
mod twilio;

use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;

use crate::error::ProviderResult;
use crate::types::{AnswerResponse, PhoneConfig, PhoneProviderKind, StatusUpdate};

pub use telnyx::TelnyxPhoneProvider;
pub use twilio::TwilioPhoneProvider;

/// Telephony carrier operations.
#[async_trait]
pub trait PhoneProvider: Send + Sync {
    /// Carrier name for log lines
    fn name(&self) -> &'static str;

    /// Place an outbound call and register lifecycle callbacks plus
    /// answering-machine detection. Returns the carrier-assigned call id.
    async fn initiate_call(
        &self,
        to: &str,
        from: &str,
        answer_url: &str,
        status_url: &str,
    ) -> ProviderResult<String>;

    /// Issue an explicit media-stream attach for carriers that need one.
    ///
    /// A no-op for carriers that declare streaming inline in the answer
    /// response.
    async fn start_streaming(&self, carrier_call_id: &str, stream_url: &str) -> ProviderResult<()>;

    /// Request call termination. The call may already be over, so failures
    /// are reported for logging but are not fatal to the caller.
    async fn hangup(&self, carrier_call_id: &str) -> ProviderResult<()>;

    /// Produce the carrier-specific answer-webhook response instructing it
    /// to open the bidirectional media connection.
    fn answer_response(&self, stream_url: &str, status_callback_url: &str) -> AnswerResponse;

    /// Verify an inbound webhook against the carrier's signing mechanism.
    fn verify_webhook(&self, headers: &HeaderMap, url: &str, body: &str) -> ProviderResult<()>;

    /// Map a carrier status callback body to unified status updates.
    fn parse_status(&self, content_type: &str, body: &str) -> Vec<StatusUpdate>;
}

/// Construct the configured carrier variant.
pub fn build_phone_provider(config: &PhoneConfig) -> ProviderResult<Arc<dyn PhoneProvider>> {
    let provider: Arc<dyn PhoneProvider> = match config.kind {
        PhoneProviderKind::Twilio => Arc::new(TwilioPhoneProvider::new(
            config.account_sid.clone(),
            config.auth_token.clone(),
        )),
        PhoneProviderKind::Telnyx => Arc::new(TelnyxPhoneProvider::new(
            config.auth_token.clone(),
            config.account_sid.clone(),
            config.telnyx_public_key.clone(),
        )?),
    };
    Ok(provider)
}
