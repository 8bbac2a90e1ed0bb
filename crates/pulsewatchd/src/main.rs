//! pulsewatchd — the PulseWatch daemon.
//!
//! Single binary that assembles all PulseWatch subsystems:
//! - Target registry (from config)
//! - Status store
//! - Poller (immediate sweep, then one every sweep interval)
//! - Metrics collector
//! - REST API
//!
//! # Usage
//!
//! ```text
//! pulsewatchd run --config /etc/pulsewatch/pulsewatch.toml --port 3000
//! pulsewatchd check --config /etc/pulsewatch/pulsewatch.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pulsewatch_core::{MonitorConfig, TargetRegistry};
use pulsewatch_engine::{HttpProber, Poller, TelemetryFanout, TracingTelemetry};
use pulsewatch_metrics::MetricsCollector;

#[derive(Parser)]
#[command(name = "pulsewatchd", about = "PulseWatch status poller daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the poller and the API server.
    Run {
        /// Path to pulsewatch.toml. Built-in defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides `server.port`).
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (overrides `server.bind`).
        #[arg(long)]
        bind: Option<String>,
    },
    /// Validate the config and print the target registry.
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run { config, port, bind } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            run(config).await
        }
        Command::Check { config } => check(config.as_deref()),
    }
}

/// `pulsewatch` is a prefix of every library crate's target.
const DEFAULT_LOG_FILTER: &str = "info,pulsewatchd=debug,pulsewatch=debug";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            info!("no config file given, using built-in defaults");
            Ok(MonitorConfig::default())
        }
    }
}

fn check(path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let registry = TargetRegistry::from_config(&config).context("invalid configuration")?;

    println!("{} target(s), polled in this order:", registry.len());
    for target in &registry {
        println!("  {:<16} {:<20} {}", target.id, target.name, target.url);
    }
    println!(
        "worst-case sweep {}s, sweep interval {}s",
        config.poller.worst_case_sweep(registry.len()).as_secs(),
        config.poller.sweep_interval().as_secs()
    );
    Ok(())
}

async fn run(config: MonitorConfig) -> anyhow::Result<()> {
    info!("PulseWatch daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    // A bad registry is the one unrecoverable startup condition.
    let registry = TargetRegistry::from_config(&config).context("invalid target registry")?;
    info!(targets = registry.len(), "target registry loaded");

    let prober = HttpProber::new(&config.poller.user_agent).context("failed to build HTTP client")?;

    let metrics = Arc::new(MetricsCollector::new(&registry));
    let telemetry = TelemetryFanout::new()
        .with(Arc::new(TracingTelemetry))
        .with(metrics.clone());

    let poller = Poller::new(registry, Arc::new(prober), &config.poller)
        .with_telemetry(Arc::new(telemetry));
    let reader = poller.reader();
    info!(
        timeout_ms = config.poller.timeout_ms,
        max_retries = config.poller.max_retries,
        pacing_ms = config.poller.pacing_ms,
        interval_ms = config.poller.sweep_interval_ms,
        "poller initialized"
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let poller_handle = tokio::spawn(async move {
        poller.run(shutdown_rx).await;
    });

    // ── Start API server ───────────────────────────────────────

    let router = pulsewatch_api::build_router(reader, metrics);
    let bind = (config.server.bind.as_str(), config.server.port);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}:{}", bind.0, bind.1))?;
    info!(addr = %listener.local_addr()?, "API server starting");

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = poller_handle.await;

    info!("PulseWatch daemon stopped");
    Ok(())
}
