//! pulsewatch-core — shared types for the PulseWatch status poller.
//!
//! Holds the monitored [`Target`] definition, the [`HealthVerdict`]
//! taxonomy, the ordered [`TargetRegistry`], and the `pulsewatch.toml`
//! configuration parser with its tunables.

pub mod config;
pub mod registry;
pub mod types;

pub use config::{ConfigError, MonitorConfig, PollerSettings, ServerSettings};
pub use registry::TargetRegistry;
pub use types::*;
