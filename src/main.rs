//! Signal Hunter binary entrypoint.
//!
//! `signal-hunter`       run the scheduler until Ctrl-C
//! `signal-hunter once`  run a single cycle and exit

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use signal_hunter::bootstrap::build_engine;
use signal_hunter::scheduler::{spawn_scheduler, SchedulerCfg};
use signal_hunter::telemetry::{init_tracing, install_prometheus};
use signal_hunter::HunterConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = HunterConfig::load_default()?;
    if let Some(listen) = cfg.metrics.listen.as_deref() {
        if let Err(e) = install_prometheus(listen) {
            warn!(error = ?e, "metrics exporter not started");
        }
    }

    let engine = Arc::new(build_engine(&cfg)?);

    if std::env::args().nth(1).as_deref() == Some("once") {
        let report = engine.run_cycle().await;
        info!(?report, "single cycle finished");
        return Ok(());
    }

    let sched = SchedulerCfg::from(&cfg.scheduler);
    info!(
        interval_secs = sched.interval.as_secs(),
        delay_secs = sched.first_run_delay.as_secs(),
        "scheduler started"
    );
    let handle = spawn_scheduler(engine, sched);

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    handle.abort();
    Ok(())
}
