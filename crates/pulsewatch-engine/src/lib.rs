//! pulsewatch-engine — the status-polling engine.
//!
//! Polls every registered target once per sweep, strictly one at a time,
//! and publishes the latest verdict into the status store.
//!
//! # Architecture
//!
//! ```text
//! Poller (one sweep at a time, paced between targets)
//!   └── per target, in registry order
//!       ├── RetryController (bounded attempts, linear backoff)
//!       │   ├── Prober::probe() → ProbeResponse | TransportFailure
//!       │   └── Classifier → PollOutcome
//!       ├── StatusStore::replace()
//!       └── Telemetry (poll event, transition, incident)
//! ```
//!
//! Only transport failures are retried. A completed HTTP response, however
//! unfavorable, is classified once and never retried. Rate limiting and slow
//! responses are reported as `degraded`, never as `down`.

pub mod classifier;
pub mod poller;
pub mod prober;
pub mod retry;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{Classifier, Indicator, PollOutcome};
pub use poller::{Poller, SweepSummary};
pub use prober::{HttpProber, ProbeResponse, Prober, TransportFailure};
pub use retry::{PollReport, RetryController, RetryPolicy};
pub use telemetry::{
    Incident, PollEvent, Severity, Telemetry, TelemetryFanout, TracingTelemetry, Transition,
};
