//! REST API handlers.
//!
//! Each handler reads via `StatusReader` and returns JSON responses.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use tracing::warn;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn store_error(e: pulsewatch_store::StoreError) -> axum::response::Response {
    warn!(error = %e, "status store read failed");
    error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Status ─────────────────────────────────────────────────────

/// GET /api/v1/status
pub async fn list_statuses(State(state): State<ApiState>) -> impl IntoResponse {
    match state.reader.list() {
        Ok(records) => ApiResponse::ok(records).into_response(),
        Err(e) => store_error(e),
    }
}

/// GET /api/v1/status/:id
pub async fn get_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.reader.get(&id) {
        Ok(Some(record)) => ApiResponse::ok(record).into_response(),
        Ok(None) => error_response("target not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => store_error(e),
    }
}

// ── Liveness ───────────────────────────────────────────────────

/// GET /health
pub async fn liveness(State(state): State<ApiState>) -> impl IntoResponse {
    let uptime = (Utc::now() - state.reader.started_at()).num_seconds().max(0);
    Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": uptime,
        "targets": state.reader.len(),
    }))
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = pulsewatch_metrics::render_prometheus(&state.metrics.snapshot());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
