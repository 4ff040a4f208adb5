//! switchboard-server — phone-call bridge for a conversational agent
//!
//! Boots the engine from environment configuration and serves two HTTP
//! surfaces: the carrier webhook server on all interfaces (reached through
//! the configured public URL) and the control API on loopback only.

use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::Context;
use switchboard_call_engine::http::{control_router, webhook_router};
use switchboard_call_engine::{CallRegistry, EngineConfig};
use switchboard_provider_core::{build_phone_provider, build_stt_provider, build_tts_provider};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_env().context("loading configuration")?;
    info!(
        phone_provider = %config.phone_provider,
        tts_provider = %config.tts_provider,
        public_url = %config.public_url,
        "starting switchboard"
    );

    let phone = build_phone_provider(&config.phone_config()).context("building phone provider")?;
    let tts = build_tts_provider(&config.tts_config());
    let stt = build_stt_provider(&config.stt_config());

    let registry = CallRegistry::new(config.clone(), phone, tts, stt);

    let webhook_listener = tokio::net::TcpListener::bind(("0.0.0.0", config.webhook_port))
        .await
        .with_context(|| format!("binding webhook port {}", config.webhook_port))?;
    let control_listener = tokio::net::TcpListener::bind(("127.0.0.1", config.api_port))
        .await
        .with_context(|| format!("binding control port {}", config.api_port))?;
    info!(
        webhook_port = config.webhook_port,
        api_port = config.api_port,
        "listening"
    );

    let webhook = axum::serve(webhook_listener, webhook_router(registry.clone())).into_future();
    let control = axum::serve(control_listener, control_router(registry.clone())).into_future();

    tokio::select! {
        result = webhook => result.context("webhook server")?,
        result = control => result.context("control server")?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    registry.shutdown().await;
    Ok(())
}
