//! Per-call session state machine
//!
//! One [`CallSession`] owns everything about a single call: its lifecycle
//! state, timestamps, transcript, media bridge handle, and the single-turn
//! guard. It is mutated only through its own methods, driven by carrier
//! status events, media attach, and the registry's turn logic; the media
//! read loop never touches it directly.
//!
//! Lifecycle: `Initiating → Ringing → Connected → Ended`, with `Failed`
//! reachable from any non-terminal state (busy, no answer, answering
//! machine, carrier failure). The media connection must attach before any
//! turn runs; [`CallSession::wait_until_live`] enforces the connect
//! deadline.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use switchboard_media_core::MediaStreamBridge;
use switchboard_provider_core::CarrierCallStatus;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

/// Opaque call identifier handed to the orchestrator
pub type CallId = String;

/// Lifecycle state of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Initiating,
    Ringing,
    Connected,
    Ended,
    Failed,
}

impl CallState {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended | CallState::Failed)
    }
}

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Agent,
    Caller,
}

/// One appended line of the call transcript
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// What kind of turn currently holds the session's turn slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Speak,
    SpeakAndListen,
    Hangup,
}

/// State of one live call, owned by the registry.
pub struct CallSession {
    id: CallId,
    to: String,
    from: String,
    created_at: DateTime<Utc>,
    connected_at: Mutex<Option<DateTime<Utc>>>,
    ended_at: Mutex<Option<DateTime<Utc>>>,
    carrier_call_id: Mutex<Option<String>>,
    state_tx: watch::Sender<CallState>,
    media: Mutex<Option<Arc<MediaStreamBridge>>>,
    transcript: Mutex<Vec<TranscriptEntry>>,
    turn: Mutex<Option<TurnKind>>,
}

impl CallSession {
    pub fn new(id: CallId, to: String, from: String) -> Arc<Self> {
        let (state_tx, _) = watch::channel(CallState::Initiating);
        Arc::new(Self {
            id,
            to,
            from,
            created_at: Utc::now(),
            connected_at: Mutex::new(None),
            ended_at: Mutex::new(None),
            carrier_call_id: Mutex::new(None),
            state_tx,
            media: Mutex::new(None),
            transcript: Mutex::new(Vec::new()),
            turn: Mutex::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> CallState {
        *self.state_tx.borrow()
    }

    pub fn set_carrier_call_id(&self, carrier_call_id: String) {
        *self.carrier_call_id.lock() = Some(carrier_call_id);
    }

    pub fn carrier_call_id(&self) -> Option<String> {
        self.carrier_call_id.lock().clone()
    }

    /// Apply one normalized carrier status event.
    pub fn apply_status(&self, status: CarrierCallStatus) {
        match status {
            CarrierCallStatus::Initiated => {}
            CarrierCallStatus::Ringing => {
                self.state_tx.send_modify(|state| {
                    if *state == CallState::Initiating {
                        *state = CallState::Ringing;
                    }
                });
            }
            // Connected is driven by media attach, not the answer event;
            // the stream is what turns actually need.
            CarrierCallStatus::Answered => {
                debug!(call_id = %self.id, "carrier reports answered, awaiting media attach");
            }
            CarrierCallStatus::Completed => self.mark_ended(),
            CarrierCallStatus::Busy
            | CarrierCallStatus::NoAnswer
            | CarrierCallStatus::Failed
            | CarrierCallStatus::MachineDetected => self.fail(),
        }
    }

    /// Hand the freshly opened media bridge to this session and go live.
    pub fn attach_media(&self, bridge: Arc<MediaStreamBridge>) {
        if self.state().is_terminal() {
            // Late attach on a dead call: refuse, and close the stream.
            bridge.close();
            return;
        }
        *self.media.lock() = Some(bridge);
        let mut connected_at = self.connected_at.lock();
        if connected_at.is_none() {
            *connected_at = Some(Utc::now());
        }
        drop(connected_at);
        self.state_tx.send_modify(|state| {
            if !state.is_terminal() {
                *state = CallState::Connected;
            }
        });
        info!(call_id = %self.id, "call connected");
    }

    /// The live media bridge, or `CallNotLive` when none is attached.
    pub fn media(&self) -> EngineResult<Arc<MediaStreamBridge>> {
        self.media
            .lock()
            .clone()
            .ok_or_else(|| EngineError::not_live(self.id.clone()))
    }

    /// Fail unless the session is currently connected.
    pub fn ensure_live(&self) -> EngineResult<()> {
        if self.state() == CallState::Connected {
            Ok(())
        } else {
            Err(EngineError::not_live(self.id.clone()))
        }
    }

    /// Wait for the media stream to attach, within the connect deadline.
    pub async fn wait_until_live(&self, deadline: Duration) -> EngineResult<()> {
        let mut rx = self.state_tx.subscribe();
        let wait = async {
            loop {
                let state = *rx.borrow_and_update();
                if state == CallState::Connected {
                    return Ok(());
                }
                if state.is_terminal() {
                    return Err(EngineError::not_live(self.id.clone()));
                }
                if rx.changed().await.is_err() {
                    return Err(EngineError::not_live(self.id.clone()));
                }
            }
        };
        match tokio::time::timeout(deadline, wait).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::DialTimeout {
                seconds: deadline.as_secs(),
            }),
        }
    }

    /// Claim the session's single turn slot.
    ///
    /// A concurrent turn request fails immediately with `TurnInProgress`
    /// instead of queueing, so misuse surfaces rather than serializing
    /// silently. The slot is released when the returned guard drops.
    pub fn begin_turn(&self, kind: TurnKind) -> EngineResult<TurnGuard<'_>> {
        let mut turn = self.turn.lock();
        if turn.is_some() {
            return Err(EngineError::turn_in_progress(self.id.clone()));
        }
        *turn = Some(kind);
        Ok(TurnGuard { session: self })
    }

    pub fn push_transcript(&self, speaker: Speaker, text: &str) {
        self.transcript.lock().push(TranscriptEntry {
            speaker,
            text: text.to_string(),
            at: Utc::now(),
        });
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().clone()
    }

    /// Normal termination: close media, stamp the end time.
    pub fn mark_ended(&self) {
        self.finish(CallState::Ended);
    }

    /// Abnormal termination (busy, no answer, machine, carrier fault).
    pub fn fail(&self) {
        self.finish(CallState::Failed);
    }

    fn finish(&self, terminal: CallState) {
        if let Some(bridge) = self.media.lock().take() {
            bridge.close();
        }
        let mut ended_at = self.ended_at.lock();
        if ended_at.is_none() {
            *ended_at = Some(Utc::now());
        }
        drop(ended_at);
        self.state_tx.send_modify(|state| {
            if !state.is_terminal() {
                *state = terminal;
            }
        });
        debug!(call_id = %self.id, state = ?self.state(), "call finished");
    }

    /// Connected→ended elapsed time, rounded to whole seconds.
    ///
    /// Zero when the call never connected.
    pub fn duration_seconds(&self) -> u64 {
        let Some(connected) = *self.connected_at.lock() else {
            return 0;
        };
        let ended = self.ended_at.lock().unwrap_or_else(Utc::now);
        let millis = (ended - connected).num_milliseconds().max(0);
        ((millis as f64) / 1000.0).round() as u64
    }
}

/// RAII guard for the session's turn slot.
pub struct TurnGuard<'a> {
    session: &'a CallSession,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        *self.session.turn.lock() = None;
    }
}
