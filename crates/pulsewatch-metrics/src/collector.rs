//! Metrics collector — per-target counters fed by poller telemetry.
//!
//! Targets are registered up front from the registry; counters are atomics
//! behind a map that is only read after construction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering};

use tracing::debug;

use pulsewatch_core::{HealthVerdict, TargetRegistry};
use pulsewatch_engine::{Incident, PollEvent, Telemetry, Transition};

const NO_LATENCY: i64 = -1;

/// Per-target counters.
struct Counters {
    name: String,
    polls: AtomicU64,
    errors: AtomicU64,
    transitions: AtomicU64,
    incidents: AtomicU64,
    /// Milliseconds, or `NO_LATENCY`.
    last_latency_ms: AtomicI64,
    /// Index into `HealthVerdict::ALL`.
    verdict: AtomicU8,
}

impl Counters {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            polls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            transitions: AtomicU64::new(0),
            incidents: AtomicU64::new(0),
            last_latency_ms: AtomicI64::new(NO_LATENCY),
            verdict: AtomicU8::new(verdict_index(HealthVerdict::Unknown)),
        }
    }
}

/// Point-in-time view of one target's metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMetrics {
    pub target_id: String,
    pub name: String,
    pub verdict: HealthVerdict,
    pub latency_ms: Option<u64>,
    pub polls_total: u64,
    pub errors_total: u64,
    pub transitions_total: u64,
    pub incidents_total: u64,
}

/// Collects metrics across all targets.
pub struct MetricsCollector {
    /// target_id → counters. Fixed after construction.
    targets: HashMap<String, Counters>,
    /// Registry order, for stable exposition.
    order: Vec<String>,
}

impl MetricsCollector {
    pub fn new(registry: &TargetRegistry) -> Self {
        let mut targets = HashMap::with_capacity(registry.len());
        let mut order = Vec::with_capacity(registry.len());
        for target in registry {
            targets.insert(target.id.clone(), Counters::new(&target.name));
            order.push(target.id.clone());
        }
        debug!(targets = order.len(), "metrics collector initialized");
        Self { targets, order }
    }

    /// Snapshot every target, in registry order.
    pub fn snapshot(&self) -> Vec<TargetMetrics> {
        self.order
            .iter()
            .filter_map(|id| self.targets.get(id).map(|c| (id, c)))
            .map(|(id, c)| {
                let latency = c.last_latency_ms.load(Ordering::Relaxed);
                TargetMetrics {
                    target_id: id.clone(),
                    name: c.name.clone(),
                    verdict: verdict_from_index(c.verdict.load(Ordering::Relaxed)),
                    latency_ms: u64::try_from(latency).ok(),
                    polls_total: c.polls.load(Ordering::Relaxed),
                    errors_total: c.errors.load(Ordering::Relaxed),
                    transitions_total: c.transitions.load(Ordering::Relaxed),
                    incidents_total: c.incidents.load(Ordering::Relaxed),
                }
            })
            .collect()
    }

    /// Total polls recorded for a target (0 for unknown ids).
    pub fn poll_count(&self, target_id: &str) -> u64 {
        self.targets
            .get(target_id)
            .map(|c| c.polls.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl Telemetry for MetricsCollector {
    fn poll_completed(&self, event: &PollEvent) {
        let Some(c) = self.targets.get(&event.target_id) else {
            return;
        };
        c.polls.fetch_add(1, Ordering::Relaxed);
        if event.has_error {
            c.errors.fetch_add(1, Ordering::Relaxed);
        }
        let latency = event
            .latency_ms
            .and_then(|ms| i64::try_from(ms).ok())
            .unwrap_or(NO_LATENCY);
        c.last_latency_ms.store(latency, Ordering::Relaxed);
        c.verdict.store(verdict_index(event.verdict), Ordering::Relaxed);
    }

    fn verdict_changed(&self, transition: &Transition) {
        if let Some(c) = self.targets.get(&transition.target_id) {
            c.transitions.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn incident(&self, incident: &Incident) {
        if let Some(c) = self.targets.get(&incident.target_id) {
            c.incidents.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn verdict_index(verdict: HealthVerdict) -> u8 {
    match verdict {
        HealthVerdict::Healthy => 0,
        HealthVerdict::Degraded => 1,
        HealthVerdict::Down => 2,
        HealthVerdict::Unknown => 3,
    }
}

fn verdict_from_index(i: u8) -> HealthVerdict {
    HealthVerdict::ALL
        .get(usize::from(i))
        .copied()
        .unwrap_or(HealthVerdict::Unknown)
}
