//! Shared types used across PulseWatch crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a monitored target.
pub type TargetId = String;

/// One externally monitored service and its public status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    /// Human-readable service name.
    pub name: String,
    /// Status endpoint polled on every sweep.
    pub url: String,
}

impl Target {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Health classification assigned to one poll.
///
/// The variants carry no severity order; each is a distinct terminal verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthVerdict {
    Healthy,
    Degraded,
    Down,
    Unknown,
}

impl HealthVerdict {
    pub const ALL: [HealthVerdict; 4] = [
        HealthVerdict::Healthy,
        HealthVerdict::Degraded,
        HealthVerdict::Down,
        HealthVerdict::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthVerdict::Healthy => "healthy",
            HealthVerdict::Degraded => "degraded",
            HealthVerdict::Down => "down",
            HealthVerdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_display_matches_wire_name() {
        for verdict in HealthVerdict::ALL {
            assert_eq!(verdict.to_string(), verdict.as_str());
        }
    }

    #[test]
    fn target_new_takes_owned_or_borrowed() {
        let t = Target::new("github", "GitHub", String::from("https://example.com"));
        assert_eq!(t.id, "github");
        assert_eq!(t.url, "https://example.com");
    }
}
