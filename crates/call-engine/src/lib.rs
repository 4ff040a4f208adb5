//! Call lifecycle engine for the switchboard telephony bridge.
//!
//! An orchestrating agent supplies conversational text through a small
//! synchronous control API; this crate turns each request into a speak or
//! speak-and-listen turn on a live phone call. It owns:
//!
//! - [`registry::CallRegistry`] — the id→session map and the control
//!   operations (initiate, continue, speak-only, end, shutdown)
//! - [`session::CallSession`] — the per-call state machine and transcript
//! - [`turn::TurnController`] — one speak/listen exchange, with real-time
//!   frame pacing out and silence-debounced end-of-utterance detection in
//! - [`http`] — the local control API router and the carrier webhook router
//!   (answer, status callbacks, media-stream WebSocket)
//!
//! The registry is constructed explicitly at startup and passed into every
//! entry point; there is no ambient global.

pub mod config;
pub mod error;
pub mod http;
pub mod registry;
pub mod session;
pub mod turn;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use registry::{CallRegistry, InitiatedCall};
pub use session::{CallSession, CallState, Speaker, TranscriptEntry, TurnKind};
pub use turn::TurnController;
