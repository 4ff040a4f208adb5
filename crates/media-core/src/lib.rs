//! Media stream plumbing for the switchboard telephony bridge.
//!
//! One live call owns one bidirectional media connection to the carrier. The
//! [`envelope`] module speaks the carrier's JSON event protocol; the
//! [`bridge`] module demuxes inbound caller audio to whichever listen
//! operation currently owns the subscription and muxes outbound synthesized
//! frames toward the socket writer.
//!
//! The bridge is transport-agnostic: the WebSocket loop that pumps it lives
//! in the call engine's webhook layer.

pub mod bridge;
pub mod envelope;
pub mod error;

pub use bridge::MediaStreamBridge;
pub use envelope::{media_message, parse_event, MediaEvent, StreamStart};
pub use error::{MediaError, MediaResult};
