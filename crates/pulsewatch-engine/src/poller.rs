//! Poller — drives paced sweeps over the target registry.
//!
//! One sweep visits every target in registry order, waits the pacing delay
//! between consecutive targets, and replaces each target's record in the
//! status store as soon as its poll resolves. Sweeps never overlap: the
//! timer loop runs them inline and `run_sweep` holds a sweep lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use pulsewatch_core::{HealthVerdict, PollerSettings, Target, TargetRegistry};
use pulsewatch_store::{StatusReader, StatusRecord, StatusStore};

use crate::classifier::PollOutcome;
use crate::prober::Prober;
use crate::retry::{PollReport, RetryController};
use crate::telemetry::{Incident, PollEvent, Severity, Telemetry, TracingTelemetry, Transition};

/// What one sweep did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    pub targets: usize,
    pub transitions: usize,
    pub elapsed: Duration,
}

/// Owns the status store and is its only writer.
pub struct Poller {
    registry: TargetRegistry,
    store: StatusStore,
    prober: Arc<dyn Prober>,
    telemetry: Arc<dyn Telemetry>,
    controller: RetryController,
    pacing: Duration,
    sweep_interval: Duration,
    sweep_lock: Mutex<()>,
}

impl Poller {
    /// Builds the status store from `registry`, so every target has a record.
    pub fn new(registry: TargetRegistry, prober: Arc<dyn Prober>, settings: &PollerSettings) -> Self {
        let store = StatusStore::new(&registry, Utc::now());
        Self {
            registry,
            store,
            prober,
            telemetry: Arc::new(TracingTelemetry),
            controller: RetryController::from_settings(settings),
            pacing: settings.pacing(),
            sweep_interval: settings.sweep_interval(),
            sweep_lock: Mutex::new(()),
        }
    }

    /// Replace the default tracing sink.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Read-only handle for the query surface.
    pub fn reader(&self) -> StatusReader {
        self.store.reader()
    }

    /// Sweep once immediately, then every `sweep_interval`, until `shutdown` flips.
    ///
    /// A sweep in flight when shutdown arrives is abandoned.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            targets = self.registry.len(),
            interval_secs = self.sweep_interval.as_secs(),
            pacing_ms = self.pacing.as_millis() as u64,
            "poller started"
        );

        let mut ticker = tokio::time::interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = async {
                    ticker.tick().await;
                    self.run_sweep().await
                } => {}
                _ = shutdown.changed() => {
                    info!("poller shutting down");
                    break;
                }
            }
        }
    }

    /// Poll every target once, in order. Waits for any sweep already running.
    pub async fn run_sweep(&self) -> SweepSummary {
        let _guard = self.sweep_lock.lock().await;
        let start = Instant::now();
        let mut transitions = 0;

        debug!(targets = self.registry.len(), "sweep starting");

        for (i, target) in self.registry.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let report = self.poll_target(target).await;
            if self.publish(target, report) {
                transitions += 1;
            }
        }

        let summary = SweepSummary {
            targets: self.registry.len(),
            transitions,
            elapsed: start.elapsed(),
        };
        info!(
            targets = summary.targets,
            transitions = summary.transitions,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "sweep completed"
        );
        summary
    }

    /// Run one target's poll in its own task so a panic cannot take down the sweep.
    async fn poll_target(&self, target: &Target) -> PollReport {
        let prober = Arc::clone(&self.prober);
        let controller = self.controller;
        let owned = target.clone();

        let task = tokio::spawn(async move { controller.poll(prober.as_ref(), &owned).await });

        match task.await {
            Ok(report) => report,
            Err(e) => {
                let message = join_error_message(e);
                error!(target_id = %target.id, error = %message, "status check failed unexpectedly");
                PollReport {
                    outcome: PollOutcome::unknown(message),
                    attempts: 0,
                }
            }
        }
    }

    /// Store the outcome and emit telemetry. Returns whether the verdict changed.
    fn publish(&self, target: &Target, report: PollReport) -> bool {
        let PollReport { outcome, attempts } = report;
        let record = StatusRecord {
            target_id: target.id.clone(),
            name: target.name.clone(),
            verdict: outcome.verdict,
            latency_ms: outcome.latency_ms,
            error: outcome.error,
            last_checked: Utc::now(),
        };

        self.telemetry.poll_completed(&PollEvent {
            target_id: record.target_id.clone(),
            name: record.name.clone(),
            verdict: record.verdict,
            latency_ms: record.latency_ms,
            has_error: record.error.is_some(),
            attempts,
        });

        let current = record.verdict;
        let error = record.error.clone();
        let at = record.last_checked;

        let previous = match self.store.replace(record) {
            Ok(previous) => previous.verdict,
            Err(e) => {
                error!(target_id = %target.id, error = %e, "failed to update status store");
                return false;
            }
        };

        if previous == current {
            return false;
        }

        let transition = Transition {
            target_id: target.id.clone(),
            name: target.name.clone(),
            previous,
            current,
            severity: Severity::for_verdict(current),
            error: error.clone(),
        };
        self.telemetry.verdict_changed(&transition);

        if current == HealthVerdict::Down {
            self.telemetry.incident(&Incident {
                target_id: target.id.clone(),
                name: target.name.clone(),
                previous,
                error,
                at,
            });
        }

        true
    }
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "status check cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("status check panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("status check panicked: {s}")
    } else {
        "status check panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::prober::{ProbeResponse, TransportFailure};
    use crate::telemetry::TelemetryFanout;
    use crate::testing::{RecordingTelemetry, ScriptedProber, healthy_page, status_page};

    fn three_targets() -> TargetRegistry {
        TargetRegistry::new(vec![
            Target::new("one", "One", "https://one.example.com/api/v2/status.json"),
            Target::new("two", "Two", "https://two.example.com/api/v2/status.json"),
            Target::new("three", "Three", "https://three.example.com/api/v2/status.json"),
        ])
    }

    fn poller(
        registry: TargetRegistry,
        prober: Arc<ScriptedProber>,
        telemetry: Arc<RecordingTelemetry>,
    ) -> Poller {
        Poller::new(registry, prober, &PollerSettings::default()).with_telemetry(telemetry)
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_visits_targets_in_order_with_pacing() {
        let prober = Arc::new(ScriptedProber::new(|_| Ok(healthy_page(300))));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = poller(three_targets(), prober.clone(), telemetry);
        let start = Instant::now();

        let summary = poller.run_sweep().await;

        assert_eq!(summary.targets, 3);
        assert_eq!(
            prober.urls(),
            [
                "https://one.example.com/api/v2/status.json",
                "https://two.example.com/api/v2/status.json",
                "https://three.example.com/api/v2/status.json",
            ]
        );
        // 2s between targets, nothing after the last.
        assert_eq!(
            prober.call_offsets(start),
            [Duration::ZERO, Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(summary.elapsed, Duration::from_secs(4));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn new_poller_has_a_record_per_registered_target() {
        let prober = Arc::new(ScriptedProber::new(|_| Ok(healthy_page(100))));
        let poller = Poller::new(three_targets(), prober, &PollerSettings::default());

        let records = poller.reader().list().unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.target_id.as_str()).collect();
        assert_eq!(ids, ["one", "two", "three"]);
        assert!(records.iter().all(|r| r.verdict == HealthVerdict::Unknown));
    }

    #[tokio::test(start_paused = true)]
    async fn transition_is_logged_once_through_tracing_fanout() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let registry = TargetRegistry::new(vec![Target::new("svc", "Service", "https://svc.example.com")]);
        let prober = Arc::new(ScriptedProber::new(|_| {
            Ok(status_page("critical", "Partial outage", 300))
        }));
        let recording = Arc::new(RecordingTelemetry::default());
        let fanout = TelemetryFanout::new()
            .with(Arc::new(TracingTelemetry))
            .with(recording.clone());
        let poller = Poller::new(registry, prober, &PollerSettings::default())
            .with_telemetry(Arc::new(fanout));

        poller.run_sweep().await;

        assert_eq!(recording.transitions().len(), 1);
        let output = logs.contents();
        assert_eq!(output.matches("status transition").count(), 1, "{output}");
        assert_eq!(output.matches("service down").count(), 1, "{output}");
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_target_does_not_abort_sweep() {
        let prober = Arc::new(ScriptedProber::new(|url| {
            if url.contains("two.") {
                panic!("probe exploded");
            }
            Ok(healthy_page(250))
        }));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = poller(three_targets(), prober.clone(), telemetry.clone());

        let summary = poller.run_sweep().await;
        assert_eq!(summary.targets, 3);

        let reader = poller.reader();
        let one = reader.get("one").unwrap().unwrap();
        let two = reader.get("two").unwrap().unwrap();
        let three = reader.get("three").unwrap().unwrap();

        assert_eq!(one.verdict, HealthVerdict::Healthy);
        assert_eq!(one.latency_ms, Some(250));
        assert_eq!(three.verdict, HealthVerdict::Healthy);

        assert_eq!(two.verdict, HealthVerdict::Unknown);
        assert_eq!(two.latency_ms, None);
        assert_eq!(two.error.as_deref(), Some("status check panicked: probe exploded"));

        // Every target produced a poll event, even the failed one.
        assert_eq!(telemetry.polls().len(), 3);
        assert_eq!(prober.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn steady_healthy_target_only_transitions_once() {
        let registry = TargetRegistry::new(vec![Target::new(
            "svc",
            "Service",
            "https://svc.example.com/api/v2/status.json",
        )]);
        let prober = Arc::new(ScriptedProber::new(|_| Ok(healthy_page(500))));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = poller(registry, prober, telemetry.clone());

        for _ in 0..5 {
            poller.run_sweep().await;
            let record = poller.reader().get("svc").unwrap().unwrap();
            assert_eq!(record.verdict, HealthVerdict::Healthy);
        }

        let transitions = telemetry.transitions();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].previous, HealthVerdict::Unknown);
        assert_eq!(transitions[0].current, HealthVerdict::Healthy);
        assert_eq!(transitions[0].severity, Severity::Info);
        assert_eq!(telemetry.polls().len(), 5);
        assert!(telemetry.incidents().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_verdict_with_new_details_is_not_a_transition() {
        let registry = TargetRegistry::new(vec![Target::new("svc", "Service", "https://svc.example.com")]);
        let flip = Arc::new(AtomicBool::new(false));
        let f = flip.clone();
        let prober = Arc::new(ScriptedProber::new(move |_| {
            if f.load(Ordering::SeqCst) {
                Ok(status_page("minor", "Elevated latency", 900))
            } else {
                Ok(status_page("partial", "Partial degradation", 100))
            }
        }));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = poller(registry, prober, telemetry.clone());

        poller.run_sweep().await;
        flip.store(true, Ordering::SeqCst);
        let summary = poller.run_sweep().await;

        assert_eq!(summary.transitions, 0);
        assert_eq!(telemetry.transitions().len(), 1);
        let record = poller.reader().get("svc").unwrap().unwrap();
        assert_eq!(record.error.as_deref(), Some("Elevated latency"));
        assert_eq!(record.latency_ms, Some(900));
    }

    #[tokio::test(start_paused = true)]
    async fn critical_indicator_reports_incident() {
        let registry = TargetRegistry::new(vec![Target::new("svc", "Service", "https://svc.example.com")]);
        let prober = Arc::new(ScriptedProber::new(|_| {
            Ok(ProbeResponse {
                status: 200,
                body: r#"{"status":{"indicator":"critical","description":"Partial outage"}}"#
                    .to_string(),
                elapsed: Duration::from_millis(300),
            })
        }));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = poller(registry, prober, telemetry.clone());

        let summary = poller.run_sweep().await;
        assert_eq!(summary.transitions, 1);

        let record = poller.reader().get("svc").unwrap().unwrap();
        assert_eq!(record.verdict, HealthVerdict::Down);
        assert_eq!(record.latency_ms, Some(300));
        assert_eq!(record.error.as_deref(), Some("Partial outage"));

        let transitions = telemetry.transitions();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].previous, HealthVerdict::Unknown);
        assert_eq!(transitions[0].severity, Severity::Error);

        let incidents = telemetry.incidents();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].previous, HealthVerdict::Unknown);
        assert_eq!(incidents[0].error.as_deref(), Some("Partial outage"));

        let polls = telemetry.polls();
        assert!(polls[0].has_error);
        assert_eq!(polls[0].latency_ms, Some(300));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_target_goes_down_after_backoff() {
        let registry = TargetRegistry::new(vec![Target::new("svc", "Service", "https://svc.example.com")]);
        let prober = Arc::new(ScriptedProber::new(|_| Err(TransportFailure::ConnectionFailed)));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = poller(registry, prober.clone(), telemetry.clone());
        let start = Instant::now();

        poller.run_sweep().await;

        let record = poller.reader().get("svc").unwrap().unwrap();
        assert_eq!(record.verdict, HealthVerdict::Down);
        assert_eq!(record.latency_ms, None);
        assert_eq!(record.error.as_deref(), Some("Connection failed"));
        assert_eq!(
            prober.call_offsets(start),
            [Duration::ZERO, Duration::from_secs(1), Duration::from_secs(3)]
        );
        assert_eq!(telemetry.polls()[0].attempts, 3);
        assert_eq!(telemetry.incidents().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_transition_is_warn_without_incident() {
        let registry = TargetRegistry::new(vec![Target::new("svc", "Service", "https://svc.example.com")]);
        let prober = Arc::new(ScriptedProber::new(|_| {
            Ok(ProbeResponse {
                status: 429,
                body: String::new(),
                elapsed: Duration::from_millis(40),
            })
        }));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = poller(registry, prober, telemetry.clone());

        poller.run_sweep().await;

        let transitions = telemetry.transitions();
        assert_eq!(transitions[0].current, HealthVerdict::Degraded);
        assert_eq!(transitions[0].severity, Severity::Warn);
        assert!(telemetry.incidents().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sweep_requests_are_serialized() {
        let prober = Arc::new(
            ScriptedProber::new(|_| Ok(healthy_page(100))).with_delay(Duration::from_millis(700)),
        );
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = poller(three_targets(), prober.clone(), telemetry);

        let (a, b) = tokio::join!(poller.run_sweep(), poller.run_sweep());

        assert_eq!(prober.calls(), 6);
        assert_eq!(prober.max_in_flight(), 1);
        // Each sweep: 3 x 700ms probes + 2 x 2s pacing.
        let one_sweep = Duration::from_millis(3 * 700 + 2 * 2000);
        assert_eq!(a.elapsed.min(b.elapsed), one_sweep);
    }

    #[test]
    fn worst_case_sweep_fits_default_interval() {
        let settings = PollerSettings::default();
        let registry = pulsewatch_core::MonitorConfig::default().targets;
        assert!(settings.worst_case_sweep(registry.len()) < settings.sweep_interval());
    }

    #[tokio::test(start_paused = true)]
    async fn run_sweeps_at_startup_then_on_interval() {
        let prober = Arc::new(ScriptedProber::new(|_| Ok(healthy_page(100))));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = Arc::new(poller(three_targets(), prober.clone(), telemetry));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.run(shutdown_rx).await })
        };

        // First sweep runs immediately and takes 4s of pacing.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(prober.calls(), 3);

        // Second sweep fires at the 300s mark.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(prober.calls(), 6);

        shutdown_tx.send(true).unwrap();
        runner.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_in_flight_sweep() {
        let prober = Arc::new(ScriptedProber::new(|_| Ok(healthy_page(100))));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let poller = Arc::new(poller(three_targets(), prober.clone(), telemetry));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.run(shutdown_rx).await })
        };

        // Mid-way through the pacing delay after the first target.
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(true).unwrap();
        runner.await.unwrap();

        assert_eq!(prober.calls(), 1);
        let reader = poller.reader();
        assert_eq!(reader.get("one").unwrap().unwrap().verdict, HealthVerdict::Healthy);
        assert_eq!(reader.get("two").unwrap().unwrap().verdict, HealthVerdict::Unknown);
    }
}
