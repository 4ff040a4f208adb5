//! Carrier-facing webhook server
//!
//! Three endpoints the carrier calls back on: `/voice` (answered — returns
//! the carrier-specific instruction document that opens the media stream),
//! `/status` (lifecycle events), and `/media-stream` (the bidirectional
//! audio WebSocket). `/voice` and `/status` authenticate every request
//! with the carrier's signature scheme; a failed check is a 401 and the
//! body is never acted on.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use switchboard_media_core::{parse_event, MediaEvent, MediaStreamBridge};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::registry::CallRegistry;
use crate::session::CallSession;

pub fn webhook_router(registry: Arc<CallRegistry>) -> Router {
    Router::new()
        .route("/voice", post(voice))
        .route("/status", post(status))
        .route("/media-stream", get(media_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

fn unauthorized(reason: &str) -> Response {
    warn!(%reason, "webhook signature rejected");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "invalid webhook signature" })),
    )
        .into_response()
}

async fn voice(
    State(registry): State<Arc<CallRegistry>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(error) = registry.verify_webhook(&headers, "/voice", &body) {
        return unauthorized(&error.to_string());
    }
    info!("answer webhook received");
    let answer = registry.answer_response();
    ([(header::CONTENT_TYPE, answer.content_type)], answer.body).into_response()
}

async fn status(
    State(registry): State<Arc<CallRegistry>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(error) = registry.verify_webhook(&headers, "/status", &body) {
        return unauthorized(&error.to_string());
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();
    let updates = registry.parse_status(&content_type, &body);
    registry.handle_status(updates).await;
    StatusCode::OK.into_response()
}

async fn media_stream(
    State(registry): State<Arc<CallRegistry>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| media_socket(socket, registry))
}

/// Drive one carrier media connection to completion.
///
/// The socket stays unattached until the carrier's `start` event names the
/// call it belongs to; from then on inbound audio flows into the bridge and
/// outbound envelope messages drain back onto the socket. Whatever ends the
/// loop, the bridge closes so in-flight turns observe the drop.
async fn media_socket(mut socket: WebSocket, registry: Arc<CallRegistry>) {
    let mut attached: Option<(Arc<CallSession>, Arc<MediaStreamBridge>)> = None;
    let mut outbound: Option<mpsc::UnboundedReceiver<String>> = None;

    loop {
        tokio::select! {
            message = socket.recv() => {
                let Some(Ok(message)) = message else {
                    break;
                };
                match message {
                    Message::Text(text) => {
                        let event = match parse_event(&text) {
                            Ok(event) => event,
                            Err(error) => {
                                warn!(%error, "unparseable media envelope, ignored");
                                continue;
                            }
                        };
                        match event {
                            MediaEvent::Start(start) => {
                                match registry.attach_media(&start) {
                                    Some((session, bridge, rx)) => {
                                        info!(call_id = %session.id(), "media stream attached");
                                        attached = Some((session, bridge));
                                        outbound = Some(rx);
                                    }
                                    None => {
                                        warn!("media stream for unknown call, closing");
                                        break;
                                    }
                                }
                            }
                            MediaEvent::Media(audio) => {
                                if let Some((_, bridge)) = &attached {
                                    bridge.handle_inbound(audio);
                                }
                            }
                            MediaEvent::Stop => {
                                debug!("carrier stopped the media stream");
                                break;
                            }
                            MediaEvent::Connected | MediaEvent::Mark => {}
                            MediaEvent::Other(event) => {
                                debug!(%event, "unhandled media event");
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            queued = next_outbound(&mut outbound) => {
                match queued {
                    Some(text) => {
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Bridge closed locally; stop draining, keep reading
                    // until the carrier closes its side.
                    None => outbound = None,
                }
            }
        }
    }

    if let Some((session, bridge)) = attached {
        debug!(call_id = %session.id(), "media socket finished");
        bridge.close();
        registry.media_disconnected(&session).await;
    }
}

/// Next outbound message, or pend forever while no stream is attached.
async fn next_outbound(rx: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
