//! Shared test doubles for the engine integration tests
//!
//! The mocks stand in for the carrier and the speech vendors so the full
//! registry/turn path runs without network access. Audio is shaped to the
//! real pipeline: TTS yields 16-bit PCM at 24 kHz, inbound frames are
//! 160-byte wire frames.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use parking_lot::Mutex;
use switchboard_call_engine::{CallRegistry, EngineConfig};
use switchboard_media_core::{MediaStreamBridge, StreamStart};
use switchboard_provider_core::{
    AnswerResponse, PcmStream, PhoneProvider, ProviderError, ProviderResult, StatusUpdate,
    SttProvider, TtsProvider, TRANSCRIPTION_FAILED,
};

pub const CARRIER_PREFIX: &str = "carrier-";

/// Carrier double. Dials always succeed (unless `fail_dial`), hangups are
/// recorded, webhook verification accepts or rejects wholesale.
pub struct MockPhone {
    pub fail_dial: bool,
    pub verify_ok: bool,
    dials: AtomicUsize,
    hangups: Mutex<Vec<String>>,
}

impl MockPhone {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_dial: false,
            verify_ok: true,
            dials: AtomicUsize::new(0),
            hangups: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_dial() -> Arc<Self> {
        Arc::new(Self {
            fail_dial: true,
            verify_ok: true,
            dials: AtomicUsize::new(0),
            hangups: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting_webhooks() -> Arc<Self> {
        Arc::new(Self {
            fail_dial: false,
            verify_ok: false,
            dials: AtomicUsize::new(0),
            hangups: Mutex::new(Vec::new()),
        })
    }

    pub fn hangups(&self) -> Vec<String> {
        self.hangups.lock().clone()
    }
}

#[async_trait]
impl PhoneProvider for MockPhone {
    fn name(&self) -> &'static str {
        "mock-phone"
    }

    async fn initiate_call(
        &self,
        _to: &str,
        _from: &str,
        _answer_url: &str,
        _status_url: &str,
    ) -> ProviderResult<String> {
        if self.fail_dial {
            return Err(ProviderError::Api {
                status: 503,
                body: "dial rejected".to_string(),
            });
        }
        let n = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{CARRIER_PREFIX}{n}"))
    }

    async fn start_streaming(&self, _carrier_call_id: &str, _stream_url: &str) -> ProviderResult<()> {
        Ok(())
    }

    async fn hangup(&self, carrier_call_id: &str) -> ProviderResult<()> {
        self.hangups.lock().push(carrier_call_id.to_string());
        Ok(())
    }

    fn answer_response(&self, _stream_url: &str, _status_callback_url: &str) -> AnswerResponse {
        AnswerResponse {
            content_type: "text/xml",
            body: "<Response/>".to_string(),
        }
    }

    fn verify_webhook(&self, _headers: &HeaderMap, _url: &str, _body: &str) -> ProviderResult<()> {
        if self.verify_ok {
            Ok(())
        } else {
            Err(ProviderError::signature_invalid("mock rejection"))
        }
    }

    fn parse_status(&self, _content_type: &str, _body: &str) -> Vec<StatusUpdate> {
        Vec::new()
    }
}

/// Synthesis double producing a short burst of silence-valued 24 kHz PCM.
pub struct MockTts;

impl MockTts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl TtsProvider for MockTts {
    fn name(&self) -> &'static str {
        "mock-tts"
    }

    fn sample_rate(&self) -> u32 {
        24_000
    }

    async fn synthesize(&self, _text: &str) -> ProviderResult<Bytes> {
        // 480 samples = 20 ms at 24 kHz = one wire frame after resampling.
        Ok(Bytes::from(vec![0u8; 960]))
    }

    async fn synthesize_stream(&self, text: &str) -> ProviderResult<PcmStream> {
        let bytes = self.synthesize(text).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(bytes) })))
    }
}

/// Recognition double replaying a scripted sequence of transcripts.
pub struct MockStt {
    replies: Mutex<VecDeque<String>>,
}

impl MockStt {
    pub fn scripted<const N: usize>(replies: [&str; N]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait]
impl SttProvider for MockStt {
    fn name(&self) -> &'static str {
        "mock-stt"
    }

    async fn recognize(&self, _wav: Vec<u8>) -> String {
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| TRANSCRIPTION_FAILED.to_string())
    }
}

/// A config suitable for tests: fast enough to run under paused time, with
/// every knob explicit.
pub fn test_config() -> EngineConfig {
    let vars = [
        ("PHONE_PROVIDER", "twilio"),
        ("PHONE_ACCOUNT_SID", "AC-test"),
        ("PHONE_AUTH_TOKEN", "token"),
        ("PHONE_NUMBER", "+15550001111"),
        ("USER_PHONE_NUMBER", "+15550002222"),
        ("OPENAI_API_KEY", "sk-test"),
        ("PUBLIC_URL", "https://switchboard.test"),
    ];
    let config = EngineConfig::from_lookup(|name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    });
    match config {
        Ok(config) => config,
        Err(error) => panic!("test config failed to load: {error}"),
    }
}

pub fn registry_with(
    config: EngineConfig,
    phone: Arc<MockPhone>,
    stt: Arc<MockStt>,
) -> Arc<CallRegistry> {
    CallRegistry::new(config, phone, MockTts::new(), stt)
}

/// Attach a media stream for `carrier_call_id`, polling until the registry
/// has registered the dial.
pub async fn attach_when_dialed(
    registry: &Arc<CallRegistry>,
    carrier_call_id: &str,
) -> Arc<MediaStreamBridge> {
    let start = StreamStart {
        carrier_call_id: Some(carrier_call_id.to_string()),
        stream_id: Some("stream-1".to_string()),
    };
    loop {
        if let Some((_session, bridge, mut outbound)) = registry.attach_media(&start) {
            // Keep the writer side drained for the life of the test.
            tokio::spawn(async move { while outbound.recv().await.is_some() {} });
            return bridge;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Feed caller audio in bursts separated by silence long enough to end an
/// utterance, forever. Whenever a listen subscribes it will catch a burst
/// and then observe the gap.
pub fn spawn_talker(bridge: Arc<MediaStreamBridge>) {
    tokio::spawn(async move {
        loop {
            for _ in 0..5 {
                if !bridge.is_open() {
                    return;
                }
                bridge.handle_inbound(vec![0xFF; 160]);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    });
}
