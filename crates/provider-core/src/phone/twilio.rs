//! Twilio carrier variant
//!
//! Programmable Voice over the REST API, with bidirectional Media Streams
//! declared inline in the answer TwiML (`<Connect><Stream>`). Status
//! callbacks arrive form-encoded and are authenticated with the
//! `X-Twilio-Signature` HMAC-SHA1 scheme: the signature covers the full
//! webhook URL followed by the form parameters sorted by key with values
//! appended.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use http::HeaderMap;
use serde::Deserialize;
use sha1::Sha1;
use std::collections::HashMap;
use tracing::debug;

use crate::client::ensure_success;
use crate::error::{ProviderError, ProviderResult};
use crate::phone::PhoneProvider;
use crate::types::{AnswerResponse, CarrierCallStatus, StatusUpdate};

const API_BASE: &str = "https://api.twilio.com";
const SIGNATURE_HEADER: &str = "x-twilio-signature";

type HmacSha1 = Hmac<Sha1>;

pub struct TwilioPhoneProvider {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
}

impl TwilioPhoneProvider {
    pub fn new(account_sid: String, auth_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid,
            auth_token,
        }
    }

    /// The string Twilio signs: URL, then form params sorted by key with
    /// each value appended directly after its key.
    fn signed_payload(&self, url: &str, body: &str) -> String {
        let mut params: Vec<(String, String)> =
            url::form_urlencoded::parse(body.as_bytes()).into_owned().collect();
        params.sort();

        let mut signed = String::from(url);
        for (key, value) in &params {
            signed.push_str(key);
            signed.push_str(value);
        }
        signed
    }
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

#[async_trait]
impl PhoneProvider for TwilioPhoneProvider {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn initiate_call(
        &self,
        to: &str,
        from: &str,
        answer_url: &str,
        status_url: &str,
    ) -> ProviderResult<String> {
        let url = format!(
            "{API_BASE}/2010-04-01/Accounts/{}/Calls.json",
            self.account_sid
        );
        let params: &[(&str, &str)] = &[
            ("To", to),
            ("From", from),
            ("Url", answer_url),
            ("StatusCallback", status_url),
            ("StatusCallbackEvent", "initiated"),
            ("StatusCallbackEvent", "ringing"),
            ("StatusCallbackEvent", "answered"),
            ("StatusCallbackEvent", "completed"),
            ("MachineDetection", "Enable"),
            ("MachineDetectionTimeout", "5"),
            ("Timeout", "60"),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(params)
            .send()
            .await?;
        let call: CallResource = ensure_success(response).await?.json().await?;

        debug!(sid = %call.sid, %to, "Twilio call created");
        Ok(call.sid)
    }

    async fn start_streaming(&self, _carrier_call_id: &str, _stream_url: &str) -> ProviderResult<()> {
        // Streaming is declared by the answer TwiML; no attach call exists.
        Ok(())
    }

    async fn hangup(&self, carrier_call_id: &str) -> ProviderResult<()> {
        let url = format!(
            "{API_BASE}/2010-04-01/Accounts/{}/Calls/{carrier_call_id}.json",
            self.account_sid
        );
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    fn answer_response(&self, stream_url: &str, status_callback_url: &str) -> AnswerResponse {
        // <Connect><Stream> is the bidirectional form; <Start><Stream> is
        // receive-only and cannot play audio back.
        let body = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Response>\n\
               <Connect>\n\
                 <Stream url=\"{stream_url}\" statusCallback=\"{status_callback_url}\" statusCallbackMethod=\"POST\" />\n\
               </Connect>\n\
             </Response>"
        );
        AnswerResponse {
            content_type: "application/xml",
            body,
        }
    }

    fn verify_webhook(&self, headers: &HeaderMap, url: &str, body: &str) -> ProviderResult<()> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .ok_or(ProviderError::MissingSignature {
                header: "X-Twilio-Signature",
            })?
            .to_str()
            .map_err(|_| ProviderError::signature_invalid("signature header is not ASCII"))?;

        let provided = BASE64
            .decode(signature)
            .map_err(|_| ProviderError::signature_invalid("signature is not valid base64"))?;

        let mut mac = HmacSha1::new_from_slice(self.auth_token.as_bytes())
            .map_err(|_| ProviderError::credentials("auth token unusable as HMAC key"))?;
        mac.update(self.signed_payload(url, body).as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| ProviderError::signature_invalid("HMAC mismatch"))
    }

    fn parse_status(&self, _content_type: &str, body: &str) -> Vec<StatusUpdate> {
        let fields: HashMap<String, String> =
            url::form_urlencoded::parse(body.as_bytes()).into_owned().collect();

        let Some(call_sid) = fields.get("CallSid") else {
            return Vec::new();
        };

        // Machine detection arrives on the answered callback as AnsweredBy.
        if let Some(answered_by) = fields.get("AnsweredBy") {
            if answered_by.starts_with("machine") {
                return vec![StatusUpdate {
                    carrier_call_id: call_sid.clone(),
                    status: CarrierCallStatus::MachineDetected,
                }];
            }
        }

        let status = match fields.get("CallStatus").map(String::as_str) {
            Some("queued") | Some("initiated") => CarrierCallStatus::Initiated,
            Some("ringing") => CarrierCallStatus::Ringing,
            Some("in-progress") | Some("answered") => CarrierCallStatus::Answered,
            Some("completed") => CarrierCallStatus::Completed,
            Some("busy") => CarrierCallStatus::Busy,
            Some("no-answer") => CarrierCallStatus::NoAnswer,
            Some("failed") | Some("canceled") => CarrierCallStatus::Failed,
            _ => return Vec::new(),
        };

        vec![StatusUpdate {
            carrier_call_id: call_sid.clone(),
            status,
        }]
    }
}
