//! Test doubles shared by the engine's unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::prober::{ProbeResponse, Prober, TransportFailure};
use crate::telemetry::{Incident, PollEvent, Telemetry, Transition};

type Script = dyn Fn(&str) -> Result<ProbeResponse, TransportFailure> + Send + Sync;

struct Call {
    url: String,
    at: Instant,
    timeout: Duration,
}

/// A [`Prober`] that answers from a closure and records every call.
pub(crate) struct ScriptedProber {
    script: Box<Script>,
    /// Simulated time each probe spends in flight.
    delay: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProber {
    pub(crate) fn new<F>(script: F) -> Self
    where
        F: Fn(&str) -> Result<ProbeResponse, TransportFailure> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.url.clone()).collect()
    }

    pub(crate) fn timeouts(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().iter().map(|c| c.timeout).collect()
    }

    /// Start time of every call, relative to `origin`.
    pub(crate) fn call_offsets(&self, origin: Instant) -> Vec<Duration> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.at.duration_since(origin))
            .collect()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, TransportFailure> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            at: Instant::now(),
            timeout,
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.script)(url)
    }
}

/// A 200 response reporting no incident.
pub(crate) fn healthy_page(elapsed_ms: u64) -> ProbeResponse {
    status_page("none", "All Systems Operational", elapsed_ms)
}

pub(crate) fn status_page(indicator: &str, description: &str, elapsed_ms: u64) -> ProbeResponse {
    ProbeResponse {
        status: 200,
        body: format!(
            r#"{{"status":{{"indicator":"{indicator}","description":"{description}"}}}}"#
        ),
        elapsed: Duration::from_millis(elapsed_ms),
    }
}

/// Telemetry sink that keeps everything it receives.
#[derive(Default)]
pub(crate) struct RecordingTelemetry {
    polls: Mutex<Vec<PollEvent>>,
    transitions: Mutex<Vec<Transition>>,
    incidents: Mutex<Vec<Incident>>,
}

impl RecordingTelemetry {
    pub(crate) fn polls(&self) -> Vec<PollEvent> {
        self.polls.lock().unwrap().clone()
    }

    pub(crate) fn transitions(&self) -> Vec<Transition> {
        self.transitions.lock().unwrap().clone()
    }

    pub(crate) fn incidents(&self) -> Vec<Incident> {
        self.incidents.lock().unwrap().clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn poll_completed(&self, event: &PollEvent) {
        self.polls.lock().unwrap().push(event.clone());
    }

    fn verdict_changed(&self, transition: &Transition) {
        self.transitions.lock().unwrap().push(transition.clone());
    }

    fn incident(&self, incident: &Incident) {
        self.incidents.lock().unwrap().push(incident.clone());
    }
}
