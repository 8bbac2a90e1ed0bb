//! pulsewatch.toml configuration parser.
//!
//! Every field is optional in the file; missing values fall back to the
//! production defaults below, and a file without `[[targets]]` monitors the
//! built-in registry.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::types::Target;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no targets configured")]
    NoTargets,

    #[error("duplicate target id: {0}")]
    DuplicateTarget(String),

    #[error("target #{index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("target {id} has a non-http(s) url: {url}")]
    InvalidUrl { id: String, url: String },

    #[error("poller.{0} must be greater than zero")]
    ZeroSetting(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub poller: PollerSettings,
    #[serde(default = "default_targets")]
    pub targets: Vec<Target>,
}

/// Listen address for the query surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Poller tunables. All durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Per-attempt request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after the first attempt on transport failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Retry `n` waits `n * backoff_base_ms` before it starts.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Wait between consecutive targets within a sweep.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Period between sweep starts.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// A healthy response slower than this is reported as degraded.
    #[serde(default = "default_latency_threshold_ms")]
    pub latency_threshold_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_base_ms() -> u64 {
    1_000
}
fn default_pacing_ms() -> u64 {
    2_000
}
fn default_sweep_interval_ms() -> u64 {
    300_000
}
fn default_latency_threshold_ms() -> u64 {
    2_000
}
fn default_user_agent() -> String {
    concat!("pulsewatch/", env!("CARGO_PKG_VERSION")).to_string()
}

/// The public status pages monitored when the config names no targets.
pub fn default_targets() -> Vec<Target> {
    vec![
        Target::new("github", "GitHub", "https://www.githubstatus.com/api/v2/status.json"),
        Target::new(
            "cloudflare",
            "Cloudflare",
            "https://www.cloudflarestatus.com/api/v2/status.json",
        ),
        Target::new("discord", "Discord", "https://discordstatus.com/api/v2/status.json"),
        Target::new("openai", "OpenAI", "https://status.openai.com/api/v2/status.json"),
        Target::new(
            "bitbucket",
            "Bitbucket",
            "https://bitbucket.status.atlassian.com/api/v2/status.json",
        ),
    ]
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            pacing_ms: default_pacing_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            latency_threshold_ms: default_latency_threshold_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            poller: PollerSettings::default(),
            targets: default_targets(),
        }
    }
}

impl PollerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn latency_threshold(&self) -> Duration {
        Duration::from_millis(self.latency_threshold_ms)
    }

    /// Upper bound on one sweep over `targets` targets when every attempt
    /// times out and every retry backs off in full.
    pub fn worst_case_sweep(&self, targets: usize) -> Duration {
        let retries = u64::from(self.max_retries);
        let attempts = retries + 1;
        // Saturating: tunables are unbounded u64s straight from TOML.
        let backoff_total = self
            .backoff_base_ms
            .saturating_mul(retries.saturating_mul(attempts) / 2);
        let per_target = self
            .timeout_ms
            .saturating_mul(attempts)
            .saturating_add(backoff_total)
            .saturating_add(self.pacing_ms);
        Duration::from_millis(per_target.saturating_mul(targets as u64))
    }
}

impl MonitorConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reject configurations the poller cannot run with.
    ///
    /// A sweep interval shorter than the worst-case sweep is only warned
    /// about: sweeps are serialized, so the next one simply starts late.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let mut seen = HashSet::new();
        for (index, target) in self.targets.iter().enumerate() {
            if target.id.trim().is_empty() {
                return Err(ConfigError::EmptyField { index, field: "id" });
            }
            if target.name.trim().is_empty() {
                return Err(ConfigError::EmptyField { index, field: "name" });
            }
            if !(target.url.starts_with("http://") || target.url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    id: target.id.clone(),
                    url: target.url.clone(),
                });
            }
            if !seen.insert(target.id.as_str()) {
                return Err(ConfigError::DuplicateTarget(target.id.clone()));
            }
        }

        if self.poller.timeout_ms == 0 {
            return Err(ConfigError::ZeroSetting("timeout_ms"));
        }
        if self.poller.sweep_interval_ms == 0 {
            return Err(ConfigError::ZeroSetting("sweep_interval_ms"));
        }

        let worst = self.poller.worst_case_sweep(self.targets.len());
        if worst >= self.poller.sweep_interval() {
            warn!(
                worst_case_ms = worst.as_millis() as u64,
                interval_ms = self.poller.sweep_interval_ms,
                "worst-case sweep exceeds the sweep interval; sweeps will start late"
            );
        }

        Ok(())
    }
}
