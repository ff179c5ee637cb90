// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::hunter::SchedulerSection;
use crate::engine::Engine;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval: Duration,
    pub first_run_delay: Duration,
}

impl From<&SchedulerSection> for SchedulerCfg {
    fn from(s: &SchedulerSection) -> Self {
        Self {
            interval: Duration::from_secs(s.interval_minutes.max(1) * 60),
            first_run_delay: Duration::from_secs(s.first_run_delay_seconds),
        }
    }
}

/// Run `engine.run_cycle()` after the initial delay, then on every interval tick.
/// A slow cycle delays the next tick rather than overlapping it.
pub fn spawn_scheduler(engine: Arc<Engine>, cfg: SchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(cfg.first_run_delay).await;
        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = engine.run_cycle().await;
            tracing::info!(
                target: "scheduler",
                stored = report.signals_stored,
                alerts = report.alerts_sent.len(),
                failed_units = report.units_failed,
                "scheduled cycle tick"
            );
        }
    })
}
