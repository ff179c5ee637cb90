// src/lib.rs
// Public library surface for integration tests and the binary.

pub mod bootstrap;
pub mod config;
pub mod diversity;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod model;
pub mod notify;
pub mod processor;
pub mod scheduler;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::HunterConfig;
pub use crate::diversity::{DiversityAnalyzer, Thresholds};
pub use crate::engine::{CycleReport, Engine, EngineConfig};
pub use crate::error::HunterError;
pub use crate::model::{AlertKind, DiversityMetrics, RawItem, Signal, SignalType, Source};
pub use crate::notify::{AlertMessage, Notifier};
pub use crate::processor::SignalProcessor;
pub use crate::store::{SignalStore, StoreConfig};
