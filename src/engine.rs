//! # Engine
//! One ingestion-and-alerting cycle.
//!
//! 1. Ask the source supplier for the current list (failure → empty cycle).
//! 2. Fan out one task per source: fetch, extract, persist. A failing or
//!    panicking unit contributes nothing and never affects the others.
//! 3. Load the trailing window from the store and group it by ticker.
//! 4. For every ticker not alerted inside the suppression window, compute its
//!    diversity profile and route at most one alert by priority.
//! 5. Record the alert only after the notifier reports delivery.
//!
//! `run_cycle` never fails; the returned `CycleReport` is accounting only.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::HunterConfig;
use crate::diversity::{DiversityAnalyzer, Thresholds};
use crate::error::HunterError;
use crate::ingest::{FetchAdapter, SourceSupplier};
use crate::model::{AlertKind, DiversityMetrics, Signal, Source};
use crate::notify::{AlertMessage, Notifier};
use crate::processor::SignalProcessor;
use crate::store::SignalStore;
use crate::telemetry::ensure_metrics_described;

/// Characters of each signal's snippet quoted in an alert.
const QUOTE_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Trailing window (hours) analyzed for alerts.
    pub window_hours: i64,
    /// A ticker alerted within this many hours is skipped.
    pub suppression_hours: i64,
    /// Representative signals quoted per alert.
    pub max_signals_in_alert: usize,
    pub thresholds: Thresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            suppression_hours: 24,
            max_signals_in_alert: 5,
            thresholds: Thresholds::default(),
        }
    }
}

impl From<&HunterConfig> for EngineConfig {
    fn from(cfg: &HunterConfig) -> Self {
        Self {
            window_hours: cfg.engine.window_hours,
            suppression_hours: cfg.engine.suppression_hours,
            max_signals_in_alert: cfg.engine.max_signals_in_alert,
            thresholds: cfg.thresholds,
        }
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub sources: usize,
    pub units_failed: usize,
    pub signals_extracted: usize,
    pub signals_stored: usize,
    pub duplicates: usize,
    pub tickers_evaluated: usize,
    pub suppressed: usize,
    pub alerts_sent: Vec<(String, AlertKind)>,
    pub alerts_failed: usize,
}

#[derive(Debug)]
struct UnitOutcome {
    extracted: usize,
    stored: usize,
}

pub struct Engine {
    supplier: Arc<dyn SourceSupplier>,
    adapter: Arc<dyn FetchAdapter>,
    notifier: Arc<dyn Notifier>,
    processor: Arc<SignalProcessor>,
    store: SignalStore,
    cfg: EngineConfig,
}

impl Engine {
    pub fn new(
        supplier: Arc<dyn SourceSupplier>,
        adapter: Arc<dyn FetchAdapter>,
        notifier: Arc<dyn Notifier>,
        store: SignalStore,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            supplier,
            adapter,
            notifier,
            processor: Arc::new(SignalProcessor::default()),
            store,
            cfg,
        }
    }

    pub fn with_processor(mut self, processor: SignalProcessor) -> Self {
        self.processor = Arc::new(processor);
        self
    }

    pub fn store(&self) -> &SignalStore {
        &self.store
    }

    pub async fn run_cycle(&self) -> CycleReport {
        ensure_metrics_described();
        info!(target: "engine", "cycle started");
        let mut report = CycleReport::default();

        let sources = match self.supplier.sources().await {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "engine", error = ?e, "source list unavailable; running empty cycle");
                Vec::new()
            }
        };
        report.sources = sources.len();

        self.fan_out(&sources, &mut report).await;
        self.route_alerts(&sources, &mut report).await;

        if let Some(Err(e)) = self.with_store(|store| store.prune(Utc::now())).await {
            warn!(target: "engine", error = %e, "prune failed");
        }

        let now = Utc::now().timestamp().max(0);
        counter!("hunter_cycles_total").increment(1);
        gauge!("hunter_cycle_last_run_ts").set(now as f64);
        info!(
            target: "engine",
            sources = report.sources,
            failed_units = report.units_failed,
            extracted = report.signals_extracted,
            stored = report.signals_stored,
            duplicates = report.duplicates,
            alerts = report.alerts_sent.len(),
            "cycle complete"
        );
        report
    }

    /// One task per source; all joined before alert routing begins.
    async fn fan_out(&self, sources: &[Source], report: &mut CycleReport) {
        let mut units = JoinSet::new();
        for source in sources.iter().cloned() {
            let adapter = Arc::clone(&self.adapter);
            let processor = Arc::clone(&self.processor);
            let store = self.store.clone();
            units.spawn(async move { run_unit(source, adapter, processor, store).await });
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(Ok(outcome)) => {
                    report.signals_extracted += outcome.extracted;
                    report.signals_stored += outcome.stored;
                    report.duplicates += outcome.extracted - outcome.stored;
                }
                Ok(Err(e)) => {
                    warn!(target: "engine", error = %e, "source unit failed");
                    report.units_failed += 1;
                }
                Err(e) => {
                    warn!(target: "engine", error = %e, "source unit aborted");
                    report.units_failed += 1;
                }
            }
        }

        counter!("hunter_units_failed_total").increment(report.units_failed as u64);
        counter!("hunter_signals_stored_total").increment(report.signals_stored as u64);
        counter!("hunter_signals_duplicate_total").increment(report.duplicates as u64);
    }

    /// Run a store call on the blocking pool. `None` if the task died.
    pub(crate) async fn with_store<T, F>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&SignalStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || f(&store)).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(target: "engine", error = %e, "store task failed");
                None
            }
        }
    }

    async fn route_alerts(&self, sources: &[Source], report: &mut CycleReport) {
        let window_hours = self.cfg.window_hours;
        let window = self
            .with_store(move |store| store.get_recent(window_hours))
            .await
            .unwrap_or_default();
        let by_ticker = group_by_ticker(window);
        let analyzer = DiversityAnalyzer::new(sources, self.cfg.thresholds);

        for (ticker, signals) in by_ticker {
            report.tickers_evaluated += 1;
            let suppression_hours = self.cfg.suppression_hours;
            let key = ticker.clone();
            let alerted = self
                .with_store(move |store| store.is_alerted_recently(&key, suppression_hours))
                .await
                .unwrap_or(false);
            if alerted {
                debug!(target: "engine", %ticker, "suppressed: alerted within window");
                report.suppressed += 1;
                continue;
            }

            let metrics = analyzer.analyze(&ticker, &signals);
            let distinct = distinct_sources(&signals);
            let Some(kind) = select_alert(&metrics, distinct, &self.cfg.thresholds) else {
                debug!(target: "engine", %ticker, sources = distinct, "no alert condition");
                continue;
            };

            let ranked = analyzer.rank_signals(&signals, &metrics);
            let msg = AlertMessage {
                ticker: ticker.clone(),
                kind,
                text: format_alert(
                    kind,
                    &metrics,
                    distinct,
                    &ranked,
                    self.cfg.max_signals_in_alert,
                    Utc::now(),
                ),
            };

            match self.notifier.send(&msg).await {
                Ok(()) => {
                    let key = ticker.clone();
                    self.with_store(move |store| store.record_alert(&key)).await;
                    counter!("hunter_alerts_sent_total", "kind" => kind.as_str()).increment(1);
                    info!(target: "engine", %ticker, %kind, "alert dispatched");
                    report.alerts_sent.push((ticker, kind));
                }
                Err(e) => {
                    let err = HunterError::notify(&ticker, &e);
                    counter!("hunter_alerts_failed_total").increment(1);
                    warn!(target: "engine", %ticker, %kind, error = %err, "alert not delivered; will retry next cycle");
                    report.alerts_failed += 1;
                }
            }
        }
    }
}

/// Fetch, extract and persist for one source.
async fn run_unit(
    source: Source,
    adapter: Arc<dyn FetchAdapter>,
    processor: Arc<SignalProcessor>,
    store: SignalStore,
) -> Result<UnitOutcome, HunterError> {
    let items = adapter
        .fetch(&source)
        .await
        .map_err(|e| HunterError::fetch(&source.name, &e))?;

    let signals = processor.process(&source, &items);
    let extracted = signals.len();
    debug!(target: "engine", source = %source.name, items = items.len(), signals = extracted, "source processed");

    // SQLite calls block; keep them off the async workers.
    let stored = tokio::task::spawn_blocking(move || signals.iter().filter(|s| store.save(s)).count())
        .await
        .map_err(|e| HunterError::PersistTask {
            source_name: source.name.clone(),
            message: e.to_string(),
        })?;

    Ok(UnitOutcome { extracted, stored })
}

fn group_by_ticker(signals: Vec<Signal>) -> BTreeMap<String, Vec<Signal>> {
    let mut out: BTreeMap<String, Vec<Signal>> = BTreeMap::new();
    for s in signals {
        out.entry(s.ticker.clone()).or_default().push(s);
    }
    out
}

fn distinct_sources(signals: &[Signal]) -> usize {
    signals
        .iter()
        .map(|s| s.source_name.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// First matching condition in priority order wins; lower ones are ignored.
pub fn select_alert(
    m: &DiversityMetrics,
    distinct_sources: usize,
    t: &Thresholds,
) -> Option<AlertKind> {
    AlertKind::PRIORITY.into_iter().find(|kind| match kind {
        AlertKind::ExtremeConsensus => m.is_extreme_consensus,
        AlertKind::EchoChamber => m.is_echo_chamber,
        AlertKind::ContrarianOpportunity => m.contrarian_opportunity,
        AlertKind::CrossPlatformDivergence => m.cross_platform_divergence,
        AlertKind::HealthyResonance => {
            m.diversity_score >= t.echo_chamber && distinct_sources >= t.healthy_min_sources
        }
    })
}

/// Telegram-Markdown alert body.
pub fn format_alert(
    kind: AlertKind,
    m: &DiversityMetrics,
    distinct_sources: usize,
    ranked: &[&Signal],
    max_signals: usize,
    now: DateTime<Utc>,
) -> String {
    let mut msg = format!("🚨 *{}: {}*\n", kind.headline(), m.ticker);
    msg.push_str("-------------------\n");
    msg.push_str(&format!(
        "Signals: {} (🟢 {} / 🔴 {} / ⚪️ {}) from {} source(s)\n",
        m.total_signals, m.bullish_count, m.bearish_count, m.neutral_count, distinct_sources
    ));
    msg.push_str(&format!(
        "Diversity: {:.2} | Consensus: {:.0}% | Contrarian: {:+.2}\n",
        m.diversity_score,
        m.consensus_ratio * 100.0,
        m.contrarian_index
    ));
    if m.mainstream_sentiment.is_some() || m.contrarian_sentiment.is_some() {
        let label = |s: Option<crate::model::SignalType>| s.map(|t| t.as_str()).unwrap_or("-");
        msg.push_str(&format!(
            "Mainstream: {} | Contrarian: {}\n",
            label(m.mainstream_sentiment),
            label(m.contrarian_sentiment)
        ));
    }
    msg.push_str("-------------------\n");
    // Source names and snippets are user text: plain and escaped, never inside an entity.
    for s in ranked.iter().take(max_signals) {
        msg.push_str(&format!(
            "{} {} ({}): {}\n",
            s.signal_type.icon(),
            escape_markdown(&s.source_name),
            s.timestamp.format("%H:%M"),
            s.signal_type.as_str()
        ));
        let quote: String = s.raw_text.chars().take(QUOTE_CHARS).collect();
        msg.push_str(&format!("   \"{}...\"\n", escape_markdown(&quote)));
    }
    msg.push_str("-------------------\n");
    msg.push_str(&format!("⏰ {} UTC", now.format("%Y-%m-%d %H:%M")));
    msg
}

/// Backslash-escape the legacy Telegram Markdown metacharacters.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
