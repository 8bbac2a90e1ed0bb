//! pulsewatch-api — read-only REST API for PulseWatch.
//!
//! Every handler reads a [`StatusReader`] snapshot; nothing here writes.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/status` | List all target statuses |
//! | GET | `/api/v1/status/{id}` | Get one target's status |
//! | GET | `/health` | Liveness probe |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use pulsewatch_metrics::MetricsCollector;
use pulsewatch_store::StatusReader;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub reader: StatusReader,
    pub metrics: Arc<MetricsCollector>,
}

/// Build the complete API router (REST + liveness + metrics).
pub fn build_router(reader: StatusReader, metrics: Arc<MetricsCollector>) -> Router {
    let state = ApiState { reader, metrics };

    let api_routes = Router::new()
        .route("/status", get(handlers::list_statuses))
        .route("/status/{id}", get(handlers::get_status));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::liveness))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
