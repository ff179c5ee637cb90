// src/bootstrap.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::HunterConfig;
use crate::engine::{Engine, EngineConfig};
use crate::fetch::{AdapterRouter, BirdCliAdapter, WebAdapter};
use crate::ingest::{FileSourceSupplier, SourceSupplier, StaticSources};
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::processor::SignalProcessor;
use crate::store::SignalStore;

/// Wire store, collaborators and engine from a loaded config.
pub fn build_engine(cfg: &HunterConfig) -> Result<Engine> {
    let store = SignalStore::open(&cfg.store.path, cfg.store.store_config())
        .with_context(|| format!("opening store at {}", cfg.store.path.display()))?;

    let supplier: Arc<dyn SourceSupplier> = match &cfg.sources_path {
        Some(p) => {
            info!(path = %p.display(), "sources: file supplier");
            Arc::new(FileSourceSupplier::new(p.clone()))
        }
        None => {
            info!(count = cfg.sources.len(), "sources: inline list");
            Arc::new(StaticSources(cfg.sources.clone()))
        }
    };

    let adapter = AdapterRouter::new(
        Arc::new(
            BirdCliAdapter::new(cfg.fetch.bird_path.clone())
                .with_count(cfg.fetch.bird_count)
                .with_timeout(cfg.fetch.http_timeout_secs.max(1) * 3),
        ),
        Arc::new(WebAdapter::new().with_timeout(cfg.fetch.http_timeout_secs.max(1))),
    );

    let notifier: Arc<dyn Notifier> = match cfg.telegram.credentials() {
        Some((token, chat)) => Arc::new(
            TelegramNotifier::new(token, chat)
                .with_timeout(cfg.telegram.timeout_secs.max(1))
                .with_retries(cfg.telegram.retries),
        ),
        None => {
            warn!("telegram credentials missing; alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    Ok(Engine::new(
        supplier,
        Arc::new(adapter),
        notifier,
        store,
        EngineConfig::from(cfg),
    )
    .with_processor(SignalProcessor::new(cfg.processor.lexicon())))
}
