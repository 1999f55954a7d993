//! Webhook HTTP surface.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook/call-started", post(call_started))
        .route("/webhook/call-ended", post(call_ended))
        .route("/status", get(status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CallStarted {
    call_id: Option<String>,
    /// Caller phone number, as the telephony system reports it.
    from: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallEnded {
    call_id: Option<String>,
}

/// Webhook fired when a call starts: create and launch a session.
async fn call_started(
    State(state): State<AppState>,
    Json(body): Json<CallStarted>,
) -> impl IntoResponse {
    let Some(call_id) = body.call_id.filter(|id| !id.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "call_id required"})),
        );
    };
    let caller_phone = body.from.unwrap_or_default();

    match state.sessions.start(&call_id, &caller_phone) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "call_id": call_id,
                "caller_phone": caller_phone,
            })),
        ),
        Err(ServerError::AlreadyExists(_)) => (
            StatusCode::CONFLICT,
            Json(json!({"error": "session already running"})),
        ),
        Err(e) => {
            tracing::error!(%call_id, "failed to start session: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}

/// Webhook fired when a call ends: signal the session to stop.
async fn call_ended(
    State(state): State<AppState>,
    Json(body): Json<CallEnded>,
) -> impl IntoResponse {
    let Some(call_id) = body.call_id.filter(|id| !id.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "call_id required"})),
        );
    };

    match state.sessions.stop(&call_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "success"}))),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "no active session found"})),
        ),
    }
}

/// Snapshot of the live sessions.
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sessions.status())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}
