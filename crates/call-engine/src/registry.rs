//! Call registry — the control surface over all live calls
//!
//! The registry owns the only cross-call shared state: the id→session map
//! (plus a carrier-id index for webhook routing) and the default user
//! number. Everything else belongs to individual sessions. Each dial
//! spawns an absolute per-call watchdog that force-ends the session after
//! the configured lifetime regardless of turn state; one call's media
//! fault never affects another.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use switchboard_media_core::{MediaStreamBridge, StreamStart};
use switchboard_provider_core::{
    AnswerResponse, CarrierCallStatus, PhoneProvider, ProviderResult, StatusUpdate, SttProvider,
    TtsProvider,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::session::{CallId, CallSession, CallState, TurnKind};
use crate::turn::TurnController;

/// Result of a successful `initiate_call`
#[derive(Debug, Clone)]
pub struct InitiatedCall {
    pub call_id: CallId,
    pub response: String,
}

/// The id→session map and the control API behind it.
pub struct CallRegistry {
    config: EngineConfig,
    phone: Arc<dyn PhoneProvider>,
    tts: Arc<dyn TtsProvider>,
    stt: Arc<dyn SttProvider>,
    calls: DashMap<CallId, Arc<CallSession>>,
    carrier_index: DashMap<String, CallId>,
    user_number: RwLock<String>,
    watchdogs: DashMap<CallId, JoinHandle<()>>,
}

impl CallRegistry {
    pub fn new(
        config: EngineConfig,
        phone: Arc<dyn PhoneProvider>,
        tts: Arc<dyn TtsProvider>,
        stt: Arc<dyn SttProvider>,
    ) -> Arc<Self> {
        let user_number = RwLock::new(config.user_phone_number.clone());
        Arc::new(Self {
            config,
            phone,
            tts,
            stt,
            calls: DashMap::new(),
            carrier_index: DashMap::new(),
            user_number,
            watchdogs: DashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of calls currently tracked
    pub fn live_calls(&self) -> usize {
        self.calls.len()
    }

    /// Dial the user, wait for the media stream, and run the greeting turn.
    pub async fn initiate_call(self: &Arc<Self>, message: &str) -> EngineResult<InitiatedCall> {
        let to = self.user_number.read().clone();
        let from = self.config.phone_number.clone();
        let call_id = Uuid::new_v4().to_string();

        let session = CallSession::new(call_id.clone(), to.clone(), from);
        self.calls.insert(call_id.clone(), session.clone());
        info!(%call_id, %to, "initiating call");

        let carrier_call_id = match self
            .phone
            .initiate_call(&to, &self.config.phone_number, &self.config.answer_url(), &self.config.status_url())
            .await
        {
            Ok(id) => id,
            Err(error) => {
                self.calls.remove(&call_id);
                return Err(error.into());
            }
        };
        session.set_carrier_call_id(carrier_call_id.clone());
        self.carrier_index.insert(carrier_call_id, call_id.clone());
        self.spawn_watchdog(&session);

        if let Err(error) = session.wait_until_live(self.config.connect_deadline).await {
            warn!(%call_id, %error, "call never went live");
            self.hangup_best_effort(&session).await;
            session.fail();
            self.cleanup(&session);
            return Err(error);
        }

        let guard = session.begin_turn(TurnKind::SpeakAndListen)?;
        let response = self
            .turn_controller(&session)
            .speak_and_listen(message)
            .await
            .map_err(surface_turn_error)?;
        drop(guard);

        Ok(InitiatedCall { call_id, response })
    }

    /// Run one speak-and-listen turn on an already live call.
    pub async fn continue_call(&self, call_id: &str, message: &str) -> EngineResult<String> {
        let session = self.get(call_id)?;
        session.ensure_live()?;

        let guard = session.begin_turn(TurnKind::SpeakAndListen)?;
        let response = self
            .turn_controller(&session)
            .speak_and_listen(message)
            .await
            .map_err(surface_turn_error)?;
        drop(guard);
        Ok(response)
    }

    /// Speak without waiting for a reply.
    pub async fn speak_only(&self, call_id: &str, message: &str) -> EngineResult<()> {
        let session = self.get(call_id)?;
        session.ensure_live()?;

        let guard = session.begin_turn(TurnKind::Speak)?;
        self.turn_controller(&session).speak(message).await?;
        drop(guard);
        Ok(())
    }

    /// Best-effort farewell, hang up, tear down. Returns the call duration
    /// in whole seconds.
    pub async fn end_call(&self, call_id: &str, message: &str) -> EngineResult<u64> {
        let session = self.get(call_id)?;

        if session.state() == CallState::Connected {
            // The farewell never blocks hangup: a held turn slot or a
            // speak failure just skips it.
            match session.begin_turn(TurnKind::Hangup) {
                Ok(_guard) => {
                    if let Err(error) = self.turn_controller(&session).speak(message).await {
                        warn!(%call_id, %error, "farewell failed, hanging up anyway");
                    }
                }
                Err(error) => debug!(%call_id, %error, "skipping farewell"),
            }
        }

        self.hangup_best_effort(&session).await;
        session.mark_ended();
        self.cleanup(&session);
        Ok(session.duration_seconds())
    }

    /// Registry-level default destination number.
    pub fn set_user_phone_number(&self, number: String) {
        info!(%number, "user phone number updated");
        *self.user_number.write() = number;
    }

    pub fn get_user_phone_number(&self) -> String {
        self.user_number.read().clone()
    }

    /// Force-end every live call and drop all watchdogs.
    pub async fn shutdown(&self) {
        info!(calls = self.calls.len(), "registry shutting down");
        let sessions: Vec<Arc<CallSession>> = self.calls.iter().map(|e| e.value().clone()).collect();
        for session in sessions {
            self.force_end(&session).await;
        }
    }

    /// Route normalized carrier status updates to their sessions.
    pub async fn handle_status(&self, updates: Vec<StatusUpdate>) {
        for update in updates {
            let Some(call_id) = self
                .carrier_index
                .get(&update.carrier_call_id)
                .map(|entry| entry.value().clone())
            else {
                debug!(carrier_call_id = %update.carrier_call_id, "status for unknown call, ignored");
                continue;
            };
            let Some(session) = self.calls.get(&call_id).map(|entry| entry.value().clone()) else {
                continue;
            };
            info!(%call_id, status = ?update.status, "carrier status");

            match update.status {
                CarrierCallStatus::Answered => {
                    session.apply_status(update.status);
                    // Carriers with an explicit attach step get it now;
                    // inline-streaming carriers no-op.
                    let phone = self.phone.clone();
                    let carrier_call_id = update.carrier_call_id.clone();
                    let stream_url = self.config.stream_url();
                    tokio::spawn(async move {
                        if let Err(error) = phone.start_streaming(&carrier_call_id, &stream_url).await {
                            warn!(%error, "media stream attach request failed");
                        }
                    });
                }
                // Unlike the hangup-derived statuses below, machine
                // detection reports on a call the carrier still has up;
                // it has to be hung up here or it keeps running.
                CarrierCallStatus::MachineDetected => {
                    self.hangup_best_effort(&session).await;
                    session.apply_status(update.status);
                    self.cleanup(&session);
                }
                CarrierCallStatus::Completed
                | CarrierCallStatus::Busy
                | CarrierCallStatus::NoAnswer
                | CarrierCallStatus::Failed => {
                    session.apply_status(update.status);
                    self.cleanup(&session);
                }
                _ => session.apply_status(update.status),
            }
        }
    }

    /// Bind a freshly opened media stream to its session.
    ///
    /// Returns the session, the bridge for the socket's read side, and the
    /// outbound message stream its writer must drain; `None` when the
    /// stream does not belong to any tracked call.
    pub fn attach_media(
        &self,
        start: &StreamStart,
    ) -> Option<(Arc<CallSession>, Arc<MediaStreamBridge>, mpsc::UnboundedReceiver<String>)> {
        let carrier_call_id = start.carrier_call_id.as_deref()?;
        let call_id = self.carrier_index.get(carrier_call_id)?.value().clone();
        let session = self.calls.get(&call_id)?.value().clone();

        let (bridge, outbound) = MediaStreamBridge::new(start.stream_id.clone());
        session.attach_media(bridge.clone());
        Some((session, bridge, outbound))
    }

    /// The carrier-specific answer-webhook response.
    pub fn answer_response(&self) -> AnswerResponse {
        self.phone
            .answer_response(&self.config.stream_url(), &self.config.status_url())
    }

    /// Verify a carrier webhook against the full public URL of `path`.
    pub fn verify_webhook(
        &self,
        headers: &http::HeaderMap,
        path: &str,
        body: &str,
    ) -> ProviderResult<()> {
        let url = format!("{}{path}", self.config.public_url);
        self.phone.verify_webhook(headers, &url, body)
    }

    /// Map a carrier status callback body to unified updates.
    pub fn parse_status(&self, content_type: &str, body: &str) -> Vec<StatusUpdate> {
        self.phone.parse_status(content_type, body)
    }

    fn get(&self, call_id: &str) -> EngineResult<Arc<CallSession>> {
        self.calls
            .get(call_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::unknown_call(call_id))
    }

    fn turn_controller(&self, session: &Arc<CallSession>) -> TurnController {
        TurnController::new(session.clone(), self.tts.clone(), self.stt.clone(), &self.config)
    }

    fn spawn_watchdog(self: &Arc<Self>, session: &Arc<CallSession>) {
        let registry = Arc::downgrade(self);
        let session = session.clone();
        let lifetime = self.config.call_watchdog;
        let call_id = session.id().to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            let Some(registry) = registry.upgrade() else {
                return;
            };
            warn!(call_id = %session.id(), "watchdog expired, force-ending call");
            registry.force_end(&session).await;
        });
        self.watchdogs.insert(call_id, handle);
    }

    /// The carrier closed a call's media connection; the call cannot
    /// continue, so tear it down if it is still tracked.
    pub async fn media_disconnected(&self, session: &Arc<CallSession>) {
        if self.calls.get(session.id()).is_none() {
            return;
        }
        info!(call_id = %session.id(), "media stream dropped, ending call");
        self.force_end(session).await;
    }

    /// Unconditional teardown used by the watchdog and shutdown. Closing
    /// the media bridge fails any in-flight listen with `MediaClosed`, so
    /// a blocked control-API caller gets an error instead of a hang.
    async fn force_end(&self, session: &Arc<CallSession>) {
        self.hangup_best_effort(session).await;
        session.mark_ended();
        self.cleanup(session);
    }

    async fn hangup_best_effort(&self, session: &Arc<CallSession>) {
        if let Some(carrier_call_id) = session.carrier_call_id() {
            if let Err(error) = self.phone.hangup(&carrier_call_id).await {
                // The call may simply be over already.
                warn!(call_id = %session.id(), %error, "hangup request failed");
            }
        }
    }

    fn cleanup(&self, session: &Arc<CallSession>) {
        self.calls.remove(session.id());
        if let Some(carrier_call_id) = session.carrier_call_id() {
            self.carrier_index.remove(&carrier_call_id);
        }
        if let Some((_, watchdog)) = self.watchdogs.remove(session.id()) {
            watchdog.abort();
        }
    }
}

/// A listen-layer timeout surfaces to control-API callers as a turn
/// timeout; everything else passes through unchanged.
fn surface_turn_error(error: EngineError) -> EngineError {
    match error {
        EngineError::ResponseTimeout { seconds } => EngineError::TurnTimeout { seconds },
        other => other,
    }
}
