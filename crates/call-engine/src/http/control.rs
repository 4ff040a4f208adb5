//! Loopback control API
//!
//! The orchestrator drives calls through this JSON API. Every error comes
//! back as `{"error": "..."}` with a status that distinguishes caller
//! mistakes (404/409) from timeouts (504) and vendor faults (502), so the
//! orchestrator can react without parsing message text.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::EngineError;
use crate::registry::CallRegistry;

pub fn control_router(registry: Arc<CallRegistry>) -> Router {
    Router::new()
        .route("/initiate_call", post(initiate_call))
        .route("/continue_call", post(continue_call))
        .route("/speak_to_user", post(speak_to_user))
        .route("/end_call", post(end_call))
        .route("/set_user_number", post(set_user_number))
        .route("/get_user_number", post(get_user_number))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// [`EngineError`] carried out of a handler as a JSON error response.
struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::UnknownCall { .. } => StatusCode::NOT_FOUND,
            EngineError::CallNotLive { .. }
            | EngineError::TurnInProgress { .. }
            | EngineError::MediaClosed => StatusCode::CONFLICT,
            EngineError::ResponseTimeout { .. }
            | EngineError::TurnTimeout { .. }
            | EngineError::DialTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EngineError::Provider(_) => StatusCode::BAD_GATEWAY,
            EngineError::Audio(_) | EngineError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            warn!(error = %self.0, "control request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
struct InitiateRequest {
    message: String,
}

#[derive(Deserialize)]
struct TurnRequest {
    call_id: String,
    message: String,
}

#[derive(Deserialize)]
struct SetNumberRequest {
    phone_number: String,
}

async fn initiate_call(
    State(registry): State<Arc<CallRegistry>>,
    Json(request): Json<InitiateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let call = registry.initiate_call(&request.message).await?;
    Ok(Json(json!({
        "callId": call.call_id,
        "response": call.response,
    })))
}

async fn continue_call(
    State(registry): State<Arc<CallRegistry>>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let response = registry.continue_call(&request.call_id, &request.message).await?;
    Ok(Json(json!({ "response": response })))
}

async fn speak_to_user(
    State(registry): State<Arc<CallRegistry>>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    registry.speak_only(&request.call_id, &request.message).await?;
    Ok(Json(json!({ "success": true })))
}

async fn end_call(
    State(registry): State<Arc<CallRegistry>>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let duration = registry.end_call(&request.call_id, &request.message).await?;
    Ok(Json(json!({ "durationSeconds": duration })))
}

async fn set_user_number(
    State(registry): State<Arc<CallRegistry>>,
    Json(request): Json<SetNumberRequest>,
) -> Json<serde_json::Value> {
    registry.set_user_phone_number(request.phone_number.clone());
    Json(json!({
        "success": true,
        "phone_number": request.phone_number,
    }))
}

async fn get_user_number(State(registry): State<Arc<CallRegistry>>) -> Json<serde_json::Value> {
    Json(json!({ "phone_number": registry.get_user_phone_number() }))
}

async fn health(State(registry): State<Arc<CallRegistry>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "publicUrl": registry.config().public_url,
    }))
}
