//! Persisted per-target status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulsewatch_core::{HealthVerdict, Target, TargetId};

/// Latest known state of one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub target_id: TargetId,
    pub name: String,
    pub verdict: HealthVerdict,
    /// Response time of the last poll; `None` when no response was obtained.
    pub latency_ms: Option<u64>,
    /// Diagnostic message from the last poll.
    pub error: Option<String>,
    pub last_checked: DateTime<Utc>,
}

impl StatusRecord {
    /// The placeholder record a target holds before its first poll.
    pub fn pending(target: &Target, started_at: DateTime<Utc>) -> Self {
        Self {
            target_id: target.id.clone(),
            name: target.name.clone(),
            verdict: HealthVerdict::Unknown,
            latency_ms: None,
            error: None,
            last_checked: started_at,
        }
    }
}
