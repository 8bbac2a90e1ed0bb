//! Result classification — maps a probe outcome onto a health verdict.
//!
//! Pure and total: every [`ProbeResponse`] and every [`TransportFailure`]
//! maps to exactly one [`PollOutcome`].

use std::time::Duration;

use pulsewatch_core::HealthVerdict;

use crate::prober::{ProbeResponse, TransportFailure};

pub const PARSE_FAILURE: &str = "Failed to parse status API response";
pub const RATE_LIMITED: &str = "Rate limited - too many requests";
const DEGRADED_FALLBACK: &str = "Service degraded";

/// Terminal result of polling one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub verdict: HealthVerdict,
    /// `None` when no response was obtained.
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl PollOutcome {
    fn new(verdict: HealthVerdict, latency_ms: Option<u64>, error: Option<String>) -> Self {
        Self {
            verdict,
            latency_ms,
            error,
        }
    }

    /// An outcome for a poll that failed outside the normal classification path.
    pub fn unknown(error: impl Into<String>) -> Self {
        Self::new(HealthVerdict::Unknown, None, Some(error.into()))
    }
}

/// `status.indicator` as published by status-page style endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indicator {
    None,
    Minor,
    Partial,
    Major,
    Critical,
    Unrecognized(String),
    Missing,
}

impl Indicator {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("none") => Indicator::None,
            Some("minor") => Indicator::Minor,
            Some("partial") => Indicator::Partial,
            Some("major") => Indicator::Major,
            Some("critical") => Indicator::Critical,
            Some(other) => Indicator::Unrecognized(other.to_string()),
            None => Indicator::Missing,
        }
    }
}

/// The fields of a status-page payload the classifier looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusPayload {
    indicator: Indicator,
    description: Option<String>,
}

impl StatusPayload {
    /// Fails only when the body is not JSON; absent fields are tolerated.
    fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        let status = value.get("status");
        let field = |name: &str| {
            status
                .and_then(|s| s.get(name))
                .and_then(serde_json::Value::as_str)
        };
        Ok(Self {
            indicator: Indicator::parse(field("indicator")),
            description: field("description")
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        })
    }
}

/// Maps probe results onto verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    /// Responses slower than this are degraded even when upstream reports no incident.
    latency_threshold: Duration,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(2_000))
    }
}

impl Classifier {
    pub fn new(latency_threshold: Duration) -> Self {
        Self { latency_threshold }
    }

    /// Classify a completed HTTP exchange.
    pub fn classify_response(&self, resp: &ProbeResponse) -> PollOutcome {
        let latency = Some(millis(resp.elapsed));

        match resp.status {
            200..=299 => match StatusPayload::parse(&resp.body) {
                Ok(payload) => self.classify_payload(payload, resp.elapsed),
                Err(_) => PollOutcome::new(
                    HealthVerdict::Unknown,
                    latency,
                    Some(PARSE_FAILURE.to_string()),
                ),
            },
            429 => PollOutcome::new(HealthVerdict::Degraded, latency, Some(RATE_LIMITED.to_string())),
            status @ 500.. => PollOutcome::new(
                HealthVerdict::Down,
                latency,
                Some(format!("Server error: {status}")),
            ),
            status => PollOutcome::new(HealthVerdict::Down, latency, Some(format!("HTTP {status}"))),
        }
    }

    /// Classify the final transport failure once retries are exhausted.
    pub fn classify_failure(&self, failure: &TransportFailure) -> PollOutcome {
        match failure {
            TransportFailure::RateLimited => {
                PollOutcome::new(HealthVerdict::Degraded, None, Some(RATE_LIMITED.to_string()))
            }
            TransportFailure::Timeout
            | TransportFailure::ConnectionFailed
            | TransportFailure::Other(_) => {
                PollOutcome::new(HealthVerdict::Down, None, Some(failure.to_string()))
            }
        }
    }

    fn classify_payload(&self, payload: StatusPayload, elapsed: Duration) -> PollOutcome {
        let latency = Some(millis(elapsed));
        let StatusPayload {
            indicator,
            description,
        } = payload;

        match indicator {
            Indicator::Minor | Indicator::Partial => PollOutcome::new(
                HealthVerdict::Degraded,
                latency,
                Some(description.unwrap_or_else(|| DEGRADED_FALLBACK.to_string())),
            ),
            Indicator::Major => PollOutcome::new(
                HealthVerdict::Down,
                latency,
                Some(description.unwrap_or_else(|| "Service status: major".to_string())),
            ),
            Indicator::Critical => PollOutcome::new(
                HealthVerdict::Down,
                latency,
                Some(description.unwrap_or_else(|| "Service status: critical".to_string())),
            ),
            Indicator::None | Indicator::Unrecognized(_) | Indicator::Missing => {
                self.by_latency(elapsed)
            }
        }
    }

    /// Healthy unless the response was slower than the threshold.
    fn by_latency(&self, elapsed: Duration) -> PollOutcome {
        // Compare at the precision that gets reported.
        let ms = millis(elapsed);
        if ms <= millis(self.latency_threshold) {
            PollOutcome::new(HealthVerdict::Healthy, Some(ms), None)
        } else {
            PollOutcome::new(
                HealthVerdict::Degraded,
                Some(ms),
                Some(format!("High latency: {ms}ms")),
            )
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
