// src/config/hunter.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::diversity::Thresholds;
use crate::model::Source;
use crate::processor::Lexicon;
use crate::store::StoreConfig;

pub const ENV_CONFIG_PATH: &str = "HUNTER_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/hunter.toml";
pub const DEFAULT_JSON_PATH: &str = "config/hunter.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HunterConfig {
    pub engine: EngineSection,
    pub store: StoreSection,
    pub thresholds: Thresholds,
    pub processor: ProcessorSection,
    pub scheduler: SchedulerSection,
    pub fetch: FetchSection,
    pub telegram: TelegramSection,
    pub metrics: MetricsSection,
    /// Inline source list; ignored when `sources_path` is set.
    pub sources: Vec<Source>,
    /// Separate TOML/JSON source list, re-read every cycle.
    pub sources_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub window_hours: i64,
    pub suppression_hours: i64,
    pub max_signals_in_alert: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            window_hours: 24,
            suppression_hours: 24,
            max_signals_in_alert: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: PathBuf,
    pub dedup_minutes: i64,
    pub retention_hours: i64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("memory/signals.db"),
            dedup_minutes: 60,
            retention_hours: 72,
        }
    }
}

impl StoreSection {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            dedup_window: chrono::Duration::minutes(self.dedup_minutes.max(1)),
            retention: chrono::Duration::hours(self.retention_hours.max(1)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcessorSection {
    pub bullish: Vec<String>,
    pub bearish: Vec<String>,
    pub blacklist: Vec<String>,
}

impl ProcessorSection {
    pub fn lexicon(&self) -> Lexicon {
        Lexicon::extended(&self.bullish, &self.bearish, &self.blacklist)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub interval_minutes: u64,
    pub first_run_delay_seconds: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
            first_run_delay_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub http_timeout_secs: u64,
    pub bird_path: String,
    pub bird_count: u32,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            http_timeout_secs: 10,
            bird_path: "bird".to_string(),
            bird_count: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub retries: u8,
    pub timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            retries: 3,
            timeout_secs: 10,
        }
    }
}

impl TelegramSection {
    /// Token and chat id, if both are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().filter(|s| !s.trim().is_empty())?;
        let chat = self.chat_id.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((token, chat))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    /// e.g. "0.0.0.0:9000"; exporter disabled when unset.
    pub listen: Option<String>,
}

impl HunterConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = if ext == "json" {
            serde_json::from_str::<HunterConfig>(&content).context("parsing json config")?
        } else {
            toml::from_str::<HunterConfig>(&content).context("parsing toml config")?
        };
        Ok(cfg.sanitized())
    }

    /// Resolve config using env var + fallbacks, then apply env overrides:
    /// 1) $HUNTER_CONFIG_PATH
    /// 2) config/hunter.toml
    /// 3) config/hunter.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_TOML_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_TOML_PATH))?
        } else if Path::new(DEFAULT_JSON_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_JSON_PATH))?
        } else {
            Self::default()
        };
        cfg.apply_env();
        Ok(cfg)
    }

    /// Environment wins over file values for secrets and the DB path.
    pub fn apply_env(&mut self) {
        if let Ok(v) = env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(v);
        }
        if let Ok(v) = env::var("TELEGRAM_CHANNEL_ID").or_else(|_| env::var("TELEGRAM_CHAT_ID")) {
            self.telegram.chat_id = Some(v);
        }
        if let Ok(v) = env::var("HUNTER_DB_PATH") {
            self.store.path = PathBuf::from(v);
        }
    }

    fn sanitized(mut self) -> Self {
        let d = Thresholds::default();
        let t = &mut self.thresholds;
        if !(0.0..=1.0).contains(&t.echo_chamber) {
            t.echo_chamber = d.echo_chamber;
        }
        if !(0.0..=1.0).contains(&t.extreme_consensus) {
            t.extreme_consensus = d.extreme_consensus;
        }
        if !(-1.0..=1.0).contains(&t.contrarian_opportunity) {
            t.contrarian_opportunity = d.contrarian_opportunity;
        }
        if self.engine.window_hours <= 0 {
            self.engine.window_hours = EngineSection::default().window_hours;
        }
        if self.engine.suppression_hours <= 0 {
            self.engine.suppression_hours = EngineSection::default().suppression_hours;
        }
        if self.scheduler.interval_minutes == 0 {
            self.scheduler.interval_minutes = SchedulerSection::default().interval_minutes;
        }
        self
    }
}
