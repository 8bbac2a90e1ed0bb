//! Retry controller — bounded attempts with linear backoff.
//!
//! Only transport failures are retried. Retry `n` (1-indexed) waits
//! `n * backoff_base` before it starts; nothing waits after the last attempt.

use std::time::Duration;

use tracing::{debug, warn};

use pulsewatch_core::{PollerSettings, Target};

use crate::classifier::{Classifier, PollOutcome};
use crate::prober::{Prober, TransportFailure};

/// Attempt budget and pacing for one target poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            attempt_timeout: Duration::from_secs(10),
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &PollerSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            attempt_timeout: settings.timeout(),
            backoff_base: settings.backoff_base(),
        }
    }

    /// Delay before retry `retry` (1-indexed).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(retry)
    }

    /// All backoff delays a fully failing poll goes through, in order.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_retries).map(|n| self.backoff(n))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// The terminal outcome of one target poll and how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    pub attempts: u32,
}

/// Wraps a [`Prober`] and a [`Classifier`] with the retry policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryController {
    policy: RetryPolicy,
    classifier: Classifier,
}

impl RetryController {
    pub fn new(policy: RetryPolicy, classifier: Classifier) -> Self {
        Self { policy, classifier }
    }

    pub fn from_settings(settings: &PollerSettings) -> Self {
        Self::new(
            RetryPolicy::from_settings(settings),
            Classifier::new(settings.latency_threshold()),
        )
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll `target` until a response arrives or the attempt budget is spent.
    pub async fn poll(&self, prober: &dyn Prober, target: &Target) -> PollReport {
        let mut attempt = 0;
        let mut last_failure = TransportFailure::Other("no attempt made".to_string());

        while attempt < self.policy.max_attempts() {
            if attempt > 0 {
                let delay = self.policy.backoff(attempt);
                debug!(
                    target_id = %target.id,
                    retry = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
            attempt += 1;

            match prober.probe(&target.url, self.policy.attempt_timeout).await {
                Ok(resp) => {
                    return PollReport {
                        outcome: self.classifier.classify_response(&resp),
                        attempts: attempt,
                    };
                }
                Err(failure) => {
                    warn!(
                        target_id = %target.id,
                        attempt,
                        max_attempts = self.policy.max_attempts(),
                        %failure,
                        "probe attempt failed"
                    );
                    last_failure = failure;
                }
            }
        }

        PollReport {
            outcome: self.classifier.classify_failure(&last_failure),
            attempts: attempt,
        }
    }
}
