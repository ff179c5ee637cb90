//! Logging and metrics setup.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// One-time metrics registration (so series show up on the exporter).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("hunter_cycles_total", "Completed ingestion cycles.");
        describe_counter!(
            "hunter_units_failed_total",
            "Per-source fetch units that failed or aborted."
        );
        describe_counter!("hunter_signals_stored_total", "Signals persisted.");
        describe_counter!(
            "hunter_signals_duplicate_total",
            "Signals rejected by the dedup window (or not stored)."
        );
        describe_counter!("hunter_alerts_sent_total", "Alerts delivered, by kind.");
        describe_counter!(
            "hunter_alerts_failed_total",
            "Alerts the notifier could not deliver."
        );
        describe_gauge!(
            "hunter_cycle_last_run_ts",
            "Unix ts when the last cycle finished."
        );
    });
}

/// Install the tracing subscriber. `RUST_LOG` wins over the default filter;
/// `HUNTER_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("signal_hunter=info,warn"));
    let json = std::env::var("HUNTER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}

/// Start the Prometheus exporter on `listen` (e.g. "0.0.0.0:9000").
/// Must be called from within a Tokio runtime.
pub fn install_prometheus(listen: &str) -> Result<()> {
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid metrics listen address `{listen}`"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_metrics_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
