//! Carrier media-stream envelope codec
//!
//! Both supported carriers speak JSON text messages over the media socket,
//! discriminated by an `event` field: `connected`, `start` (stream metadata),
//! `media` (base64 audio payload), `stop`, and `mark`. Field naming differs
//! per carrier — Twilio nests `callSid`/`streamSid` under `start`, Telnyx
//! uses `call_control_id` and a top-level `stream_id` — so the start
//! extractor accepts either shape.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::json;

use crate::error::MediaResult;

/// One inbound event on the media socket.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Socket-level handshake acknowledgement
    Connected,
    /// Stream opened; carries the carrier call and stream identifiers
    Start(StreamStart),
    /// One chunk of caller audio, already base64-decoded
    Media(Vec<u8>),
    /// Stream closing from the carrier side
    Stop,
    /// Playback checkpoint echo; unused
    Mark,
    /// Any event this bridge does not act on
    Other(String),
}

/// Metadata from a stream `start` event, normalized across carriers.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStart {
    /// Carrier-assigned call identifier (Twilio CallSid, Telnyx call control id)
    pub carrier_call_id: Option<String>,
    /// Stream identifier to echo on outbound media, when the carrier uses one
    pub stream_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    event: String,
    #[serde(default)]
    start: Option<RawStart>,
    #[serde(default)]
    media: Option<RawMedia>,
    #[serde(default, rename = "streamSid")]
    stream_sid: Option<String>,
    #[serde(default)]
    stream_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStart {
    #[serde(default, rename = "callSid")]
    call_sid: Option<String>,
    #[serde(default, rename = "streamSid")]
    stream_sid: Option<String>,
    #[serde(default)]
    call_control_id: Option<String>,
    #[serde(default)]
    stream_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    payload: String,
}

/// Parse one text message from the media socket.
pub fn parse_event(text: &str) -> MediaResult<MediaEvent> {
    let raw: RawEnvelope = serde_json::from_str(text)?;

    let event = match raw.event.as_str() {
        "connected" => MediaEvent::Connected,
        "start" => {
            let start = raw.start.unwrap_or(RawStart {
                call_sid: None,
                stream_sid: None,
                call_control_id: None,
                stream_id: None,
            });
            MediaEvent::Start(StreamStart {
                carrier_call_id: start.call_sid.or(start.call_control_id),
                stream_id: start
                    .stream_sid
                    .or(start.stream_id)
                    .or(raw.stream_sid)
                    .or(raw.stream_id),
            })
        }
        "media" => match raw.media {
            Some(media) => MediaEvent::Media(BASE64.decode(media.payload.as_bytes())?),
            None => MediaEvent::Other(raw.event),
        },
        "stop" => MediaEvent::Stop,
        "mark" => MediaEvent::Mark,
        _ => MediaEvent::Other(raw.event),
    };
    Ok(event)
}

/// Build an outbound `media` message around one encoded wire frame.
///
/// Twilio requires the stream id on bidirectional streams; Telnyx accepts
/// payload-only messages, so the id is included only when known.
pub fn media_message(stream_id: Option<&str>, frame: &[u8]) -> String {
    let payload = BASE64.encode(frame);
    let value = match stream_id {
        Some(sid) => json!({
            "event": "media",
            "streamSid": sid,
            "media": { "payload": payload },
        }),
        None => json!({
            "event": "media",
            "media": { "payload": payload },
        }),
    };
    value.to_string()
}
