//! SQLite-backed signal store with dedup and alert suppression.
//!
//! One connection behind a mutex: every write takes the lock, and the dedup
//! check plus insert run inside a single transaction, so concurrent fetch units
//! cannot both pass the duplicate check for the same (ticker, source) pair.
//!
//! The contract methods (`save`, `get_recent`, `is_alerted_recently`,
//! `record_alert`) never fail; they log and degrade. The `try_*` variants
//! return the underlying error for callers that want it.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::{HunterError, HunterResult};
use crate::model::{AlertRecord, Signal, SignalType};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Two signals with the same ticker and source closer than this are duplicates.
    pub dedup_window: Duration,
    /// Rows older than this are dropped by [`SignalStore::prune`].
    pub retention: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dedup_window: Duration::hours(1),
            retention: Duration::hours(72),
        }
    }
}

/// Persistent rolling window of signals and alert-suppression rows.
#[derive(Clone)]
pub struct SignalStore {
    conn: Arc<Mutex<Connection>>,
    cfg: StoreConfig,
}

impl std::fmt::Debug for SignalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalStore").field("cfg", &self.cfg).finish()
    }
}

impl SignalStore {
    /// Open or create a store at `path` (parent directories are created).
    pub fn open<P: AsRef<Path>>(path: P, cfg: StoreConfig) -> HunterResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| HunterError::Config(format!("create {}: {e}", dir.display())))?;
        }
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn, cfg)?;
        info!(target: "store", path = %path.display(), "signal store opened");
        Ok(store)
    }

    /// In-memory store (tests, dry runs).
    pub fn open_in_memory(cfg: StoreConfig) -> HunterResult<Self> {
        let store = Self::from_connection(Connection::open_in_memory()?, cfg)?;
        debug!(target: "store", "in-memory signal store created");
        Ok(store)
    }

    fn from_connection(conn: Connection, cfg: StoreConfig) -> HunterResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL,
                signal_type TEXT NOT NULL,
                source_name TEXT NOT NULL,
                raw_text TEXT,
                url TEXT,
                timestamp TEXT NOT NULL,
                confidence REAL
            );

            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_signals_dedup ON signals(ticker, source_name, timestamp);
            CREATE INDEX IF NOT EXISTS idx_signals_ts ON signals(timestamp);
            CREATE INDEX IF NOT EXISTS idx_alerts_ticker ON alerts(ticker, timestamp);
            "#,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            cfg,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied transaction
        // (it rolls back on drop), so a poisoned guard is still usable.
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Insert unless a signal with the same ticker and source lies within the
    /// dedup window of this one. `Ok(false)` means duplicate.
    pub fn try_save(&self, signal: &Signal) -> HunterResult<bool> {
        let lo = ts_key(signal.timestamp - self.cfg.dedup_window);
        let hi = ts_key(signal.timestamp + self.cfg.dedup_window);

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM signals
                 WHERE ticker = ?1 AND source_name = ?2
                   AND timestamp > ?3 AND timestamp < ?4
                 LIMIT 1",
                params![signal.ticker, signal.source_name, lo, hi],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO signals (ticker, signal_type, source_name, raw_text, url, timestamp, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                signal.ticker,
                signal.signal_type.as_str(),
                signal.source_name,
                signal.raw_text,
                signal.url,
                ts_key(signal.timestamp),
                signal.confidence,
            ],
        )?;
        tx.commit()?;
        debug!(target: "store", ticker = %signal.ticker, source = %signal.source_name, "signal saved");
        Ok(true)
    }

    /// `true` if stored, `false` if duplicate or on storage failure (logged).
    pub fn save(&self, signal: &Signal) -> bool {
        match self.try_save(signal) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(target: "store", ticker = %signal.ticker, source = %signal.source_name, error = %e, "save failed");
                false
            }
        }
    }

    /// Signals newer than `since`, newest first.
    pub fn try_recent_since(&self, since: DateTime<Utc>) -> HunterResult<Vec<Signal>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT ticker, signal_type, source_name, raw_text, url, timestamp, confidence
             FROM signals WHERE timestamp > ?1
             ORDER BY timestamp DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![ts_key(since)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<f64>>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (ticker, kind, source_name, raw_text, url, ts, confidence) = row?;
            let Some(signal_type) = SignalType::parse(&kind) else {
                warn!(target: "store", %ticker, kind = %kind, "skipping row with unknown signal type");
                continue;
            };
            let timestamp = match parse_ts(&ts) {
                Ok(t) => t,
                Err(e) => {
                    warn!(target: "store", %ticker, error = %e, "skipping row with corrupt timestamp");
                    continue;
                }
            };
            out.push(Signal {
                ticker,
                signal_type,
                source_name,
                raw_text: raw_text.unwrap_or_default(),
                url: url.unwrap_or_default(),
                timestamp,
                confidence: confidence.unwrap_or(0.5),
                sentiment_score: None,
            });
        }
        Ok(out)
    }

    /// Signals from the last `hours`, newest first. Empty on storage failure.
    pub fn get_recent(&self, hours: i64) -> Vec<Signal> {
        match self.try_recent_since(Utc::now() - Duration::hours(hours)) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "store", error = %e, "recent-signal query failed");
                Vec::new()
            }
        }
    }

    pub fn try_alerted_since(&self, ticker: &str, since: DateTime<Utc>) -> HunterResult<bool> {
        let conn = self.lock();
        let hit: Option<i64> = conn
            .query_row(
                "SELECT id FROM alerts WHERE ticker = ?1 AND timestamp > ?2 LIMIT 1",
                params![ticker, ts_key(since)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    /// Whether `ticker` was alerted in the last `hours`. `false` on storage failure.
    pub fn is_alerted_recently(&self, ticker: &str, hours: i64) -> bool {
        match self.try_alerted_since(ticker, Utc::now() - Duration::hours(hours)) {
            Ok(b) => b,
            Err(e) => {
                warn!(target: "store", %ticker, error = %e, "alert lookup failed");
                false
            }
        }
    }

    pub fn try_record_alert_at(&self, ticker: &str, at: DateTime<Utc>) -> HunterResult<AlertRecord> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO alerts (ticker, timestamp) VALUES (?1, ?2)",
            params![ticker, ts_key(at)],
        )?;
        Ok(AlertRecord {
            ticker: ticker.to_string(),
            timestamp: at,
        })
    }

    /// Append a suppression row for `ticker` at the current time.
    pub fn record_alert(&self, ticker: &str) {
        if let Err(e) = self.try_record_alert_at(ticker, Utc::now()) {
            warn!(target: "store", %ticker, error = %e, "recording alert failed");
        }
    }

    /// Drop signal and alert rows older than the retention window.
    /// Returns the number of rows removed.
    pub fn prune(&self, now: DateTime<Utc>) -> HunterResult<usize> {
        let cutoff = ts_key(now - self.cfg.retention);
        let conn = self.lock();
        let s = conn.execute("DELETE FROM signals WHERE timestamp < ?1", params![cutoff])?;
        let a = conn.execute("DELETE FROM alerts WHERE timestamp < ?1", params![cutoff])?;
        if s + a > 0 {
            debug!(target: "store", signals = s, alerts = a, "pruned old rows");
        }
        Ok(s + a)
    }
}

/// Fixed-width RFC 3339 UTC key; lexical order equals time order.
fn ts_key(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> HunterResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| HunterError::CorruptRow(format!("timestamp `{s}`: {e}")))
}
