//! Telnyx carrier variant
//!
//! Call Control v2 over the REST API. Unlike Twilio, the media stream is not
//! declared in the answer document: after the call is answered the engine
//! issues an explicit `streaming_start` action, so the answer webhook returns
//! an empty TeXML document. Webhooks are authenticated with an Ed25519
//! signature over `"{timestamp}|{raw body}"` against the account public key.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use http::HeaderMap;
use ring::signature::{UnparsedPublicKey, ED25519};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::ensure_success;
use crate::error::{ProviderError, ProviderResult};
use crate::phone::PhoneProvider;
use crate::types::{AnswerResponse, CarrierCallStatus, StatusUpdate};

const API_BASE: &str = "https://api.telnyx.com";
const SIGNATURE_HEADER: &str = "telnyx-signature-ed25519";
const TIMESTAMP_HEADER: &str = "telnyx-timestamp";

pub struct TelnyxPhoneProvider {
    http: reqwest::Client,
    api_key: String,
    connection_id: String,
    public_key: Option<Vec<u8>>,
}

impl TelnyxPhoneProvider {
    pub fn new(
        api_key: String,
        connection_id: String,
        public_key_base64: Option<String>,
    ) -> ProviderResult<Self> {
        let public_key = public_key_base64
            .map(|key| {
                BASE64
                    .decode(key.trim())
                    .map_err(|_| ProviderError::credentials("Telnyx public key is not valid base64"))
            })
            .transpose()?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            connection_id,
            public_key,
        })
    }

    fn action_url(&self, carrier_call_id: &str, action: &str) -> String {
        format!("{API_BASE}/v2/calls/{carrier_call_id}/actions/{action}")
    }
}

#[derive(Debug, Deserialize)]
struct CallData {
    call_control_id: String,
}

#[derive(Debug, Deserialize)]
struct CallEnvelope {
    data: CallData,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    call_control_id: Option<String>,
    #[serde(default)]
    hangup_cause: Option<String>,
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventData {
    event_type: String,
    payload: EventPayload,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    data: EventData,
}

#[async_trait]
impl PhoneProvider for TelnyxPhoneProvider {
    fn name(&self) -> &'static str {
        "telnyx"
    }

    async fn initiate_call(
        &self,
        to: &str,
        from: &str,
        _answer_url: &str,
        status_url: &str,
    ) -> ProviderResult<String> {
        let response = self
            .http
            .post(format!("{API_BASE}/v2/calls"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "connection_id": self.connection_id,
                "to": to,
                "from": from,
                "webhook_url": status_url,
                "answering_machine_detection": "detect",
                "timeout_secs": 60,
            }))
            .send()
            .await?;
        let call: CallEnvelope = ensure_success(response).await?.json().await?;

        debug!(call_control_id = %call.data.call_control_id, %to, "Telnyx call created");
        Ok(call.data.call_control_id)
    }

    async fn start_streaming(&self, carrier_call_id: &str, stream_url: &str) -> ProviderResult<()> {
        let response = self
            .http
            .post(self.action_url(carrier_call_id, "streaming_start"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "stream_url": stream_url,
                "stream_track": "inbound_track",
                "stream_bidirectional_mode": "rtp",
            }))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn hangup(&self, carrier_call_id: &str) -> ProviderResult<()> {
        let response = self
            .http
            .post(self.action_url(carrier_call_id, "hangup"))
            .bearer_auth(&self.api_key)
            .json(&json!({}))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    fn answer_response(&self, _stream_url: &str, _status_callback_url: &str) -> AnswerResponse {
        // The stream is attached via the streaming_start action instead.
        AnswerResponse {
            content_type: "application/xml",
            body: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response/>".to_string(),
        }
    }

    fn verify_webhook(&self, headers: &HeaderMap, _url: &str, body: &str) -> ProviderResult<()> {
        let public_key = self
            .public_key
            .as_deref()
            .ok_or_else(|| ProviderError::credentials("Telnyx public key not configured"))?;

        let signature = headers
            .get(SIGNATURE_HEADER)
            .ok_or(ProviderError::MissingSignature {
                header: "telnyx-signature-ed25519",
            })?
            .to_str()
            .map_err(|_| ProviderError::signature_invalid("signature header is not ASCII"))?;
        let timestamp = headers
            .get(TIMESTAMP_HEADER)
            .ok_or(ProviderError::MissingSignature {
                header: "telnyx-timestamp",
            })?
            .to_str()
            .map_err(|_| ProviderError::signature_invalid("timestamp header is not ASCII"))?;

        let signature = BASE64
            .decode(signature)
            .map_err(|_| ProviderError::signature_invalid("signature is not valid base64"))?;

        let message = format!("{timestamp}|{body}");
        UnparsedPublicKey::new(&ED25519, public_key)
            .verify(message.as_bytes(), &signature)
            .map_err(|_| ProviderError::signature_invalid("Ed25519 mismatch"))
    }

    fn parse_status(&self, _content_type: &str, body: &str) -> Vec<StatusUpdate> {
        let Ok(event) = serde_json::from_str::<EventEnvelope>(body) else {
            return Vec::new();
        };
        let data = event.data;
        let Some(carrier_call_id) = data.payload.call_control_id else {
            return Vec::new();
        };

        let status = match data.event_type.as_str() {
            "call.initiated" => CarrierCallStatus::Initiated,
            "call.ringing" => CarrierCallStatus::Ringing,
            "call.answered" => CarrierCallStatus::Answered,
            "call.hangup" => match data.payload.hangup_cause.as_deref() {
                Some(cause) if cause.contains("busy") => CarrierCallStatus::Busy,
                Some("no_answer") | Some("noanswer") | Some("timeout") => {
                    CarrierCallStatus::NoAnswer
                }
                _ => CarrierCallStatus::Completed,
            },
            "call.machine.detection.ended" => match data.payload.result.as_deref() {
                Some(result) if result.starts_with("machine") => {
                    CarrierCallStatus::MachineDetected
                }
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };

        vec![StatusUpdate {
            carrier_call_id,
            status,
        }]
    }
}
