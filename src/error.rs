//! Error taxonomy for the ingestion/alerting core.
//!
//! None of these are fatal to a cycle: each is handled where it happens and
//! surfaces only as a log line, a metric and a `CycleReport` counter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HunterError {
    /// A source could not be fetched; that unit contributes no signals.
    #[error("fetch failed for source `{source_name}`: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// A raw item could not be turned into signals; the item is skipped.
    #[error("malformed item: {0}")]
    Extraction(String),

    /// Store read/write failure; treated as "not stored" / "empty result".
    #[error("persistence: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// The blocking task persisting a source's signals died before reporting.
    #[error("persisting signals for source `{source_name}` failed: {message}")]
    PersistTask {
        source_name: String,
        message: String,
    },

    /// Stored row could not be decoded back into a signal.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// Alert delivery failed; the ticker stays eligible next cycle.
    #[error("notify failed for `{ticker}`: {message}")]
    Notify { ticker: String, message: String },

    #[error("config: {0}")]
    Config(String),
}

impl HunterError {
    pub fn fetch(source_name: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: format!("{err:#}"),
        }
    }

    pub fn notify(ticker: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Notify {
            ticker: ticker.into(),
            message: format!("{err:#}"),
        }
    }
}

pub type HunterResult<T> = std::result::Result<T, HunterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_task_failure_reads_as_persistence() {
        let e = HunterError::PersistTask {
            source_name: "Vista".into(),
            message: "task panicked".into(),
        };
        let text = e.to_string();
        assert!(text.starts_with("persisting signals for source `Vista`"));
        assert!(!text.contains("fetch"));
    }
}
