//! Telemetry seam — where poll results leave the engine.
//!
//! The poller reports every poll, every verdict transition, and every
//! transition into `down`. Sinks decide what to do with them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use pulsewatch_core::{HealthVerdict, TargetId};

/// Log severity of a verdict transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn for_verdict(verdict: HealthVerdict) -> Self {
        match verdict {
            HealthVerdict::Down => Severity::Error,
            HealthVerdict::Degraded => Severity::Warn,
            HealthVerdict::Healthy | HealthVerdict::Unknown => Severity::Info,
        }
    }
}

/// Emitted once per target per sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollEvent {
    pub target_id: TargetId,
    pub name: String,
    pub verdict: HealthVerdict,
    pub latency_ms: Option<u64>,
    pub has_error: bool,
    pub attempts: u32,
}

/// Emitted when a target's verdict differs from its previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target_id: TargetId,
    pub name: String,
    pub previous: HealthVerdict,
    pub current: HealthVerdict,
    pub severity: Severity,
    pub error: Option<String>,
}

/// Emitted when a target transitions into `down`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub target_id: TargetId,
    pub name: String,
    pub previous: HealthVerdict,
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

/// Receives engine telemetry. Calls are made from the poller task and must not block.
pub trait Telemetry: Send + Sync {
    fn poll_completed(&self, event: &PollEvent);
    fn verdict_changed(&self, transition: &Transition);
    fn incident(&self, incident: &Incident);
}

/// Writes telemetry as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn poll_completed(&self, event: &PollEvent) {
        info!(
            target_id = %event.target_id,
            name = %event.name,
            verdict = %event.verdict,
            latency_ms = event.latency_ms,
            has_error = event.has_error,
            attempts = event.attempts,
            "status check completed"
        );
    }

    fn verdict_changed(&self, t: &Transition) {
        match t.severity {
            Severity::Error => error!(
                target_id = %t.target_id,
                name = %t.name,
                previous = %t.previous,
                current = %t.current,
                error = t.error.as_deref(),
                "status transition"
            ),
            Severity::Warn => warn!(
                target_id = %t.target_id,
                name = %t.name,
                previous = %t.previous,
                current = %t.current,
                error = t.error.as_deref(),
                "status transition"
            ),
            Severity::Info => info!(
                target_id = %t.target_id,
                name = %t.name,
                previous = %t.previous,
                current = %t.current,
                "status transition"
            ),
        }
    }

    fn incident(&self, incident: &Incident) {
        error!(
            target_id = %incident.target_id,
            name = %incident.name,
            previous = %incident.previous,
            error = incident.error.as_deref(),
            at = %incident.at.to_rfc3339(),
            "service down"
        );
    }
}

/// Forwards every call to each sink in order.
#[derive(Clone, Default)]
pub struct TelemetryFanout {
    sinks: Vec<Arc<dyn Telemetry>>,
}

impl TelemetryFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Telemetry>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Telemetry for TelemetryFanout {
    fn poll_completed(&self, event: &PollEvent) {
        for sink in &self.sinks {
            sink.poll_completed(event);
        }
    }

    fn verdict_changed(&self, transition: &Transition) {
        for sink in &self.sinks {
            sink.verdict_changed(transition);
        }
    }

    fn incident(&self, incident: &Incident) {
        for sink in &self.sinks {
            sink.incident(incident);
        }
    }
}
