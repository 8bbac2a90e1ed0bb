//! pulsewatch-metrics — observability for PulseWatch targets.
//!
//! Counts polls, errors, transitions, and incidents per target and keeps
//! the latest verdict and latency, fed by the engine's telemetry seam.
//!
//! # Architecture
//!
//! ```text
//! MetricsCollector (implements Telemetry)
//!   ├── poll_completed() / verdict_changed() / incident() ← Poller
//!   └── snapshot() → Vec<TargetMetrics>
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod collector;
pub mod prometheus;

pub use collector::{MetricsCollector, TargetMetrics};
pub use prometheus::render_prometheus;
