//! HTTP surfaces
//!
//! Two separate routers on two separate ports: the carrier-facing webhook
//! server (answer, status, media stream — exposed publicly through a
//! tunnel) and the loopback control API the orchestrator drives turns
//! through. Keeping them apart means the public surface never carries a
//! control endpoint.

mod control;
mod webhook;

pub use control::control_router;
pub use webhook::webhook_router;
