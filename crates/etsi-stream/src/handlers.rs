//! ETSI Stream Handlers
//!
//! HTTP handlers: the WebSocket upgrade on `/ws`, the health check and the
//! JSON 404 fallback.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::connection;
use crate::state::AppState;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

// =============================================================================
// WebSocket
// =============================================================================

/// Upgrade to a stream connection, or refuse with 503 when the server is
/// full or shutting down.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(guard) = state.admit() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(
                "Not accepting connections",
                "UNAVAILABLE",
            )),
        )
            .into_response();
    };
    ws.on_upgrade(move |socket| connection::serve(socket, state, guard))
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub connections: usize,
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.connections.is_shutting_down() {
        "shutting_down"
    } else {
        "healthy"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.connections.active(),
    })
}

// =============================================================================
// Errors
// =============================================================================

/// Error body shared by the JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString, code: impl ToString) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Not found", "NOT_FOUND")),
    )
}
