//! Twitter/X timeline through the `bird` CLI.
//!
//! Runs `bird user-tweets @<user> -n <count> --json --plain` and accepts a JSON
//! array, a single object, or JSON lines. Items without text are dropped here;
//! the processor never sees them.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tokio::process::Command;

use crate::ingest::FetchAdapter;
use crate::model::{RawItem, Source};

#[derive(Debug, Clone)]
pub struct BirdCliAdapter {
    binary: String,
    count: u32,
    timeout: Duration,
}

impl BirdCliAdapter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            count: 5,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

/// `https://x.com/vista8/` → `vista8`.
pub fn username_from_url(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|u| u.trim_start_matches('@'))
        .filter(|u| !u.is_empty() && !u.contains(':'))
}

#[async_trait]
impl FetchAdapter for BirdCliAdapter {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawItem>> {
        let Some(user) = username_from_url(&source.url) else {
            bail!("cannot derive username from {}", source.url);
        };
        tracing::info!(target: "fetch", source = %source.name, user, "fetching tweets");

        let mut cmd = Command::new(&self.binary);
        cmd.arg("user-tweets")
            .arg(format!("@{user}"))
            .arg("-n")
            .arg(self.count.to_string())
            .arg("--json")
            .arg("--plain")
            .kill_on_drop(true);
        if let Ok(token) = std::env::var("BIRD_AUTH_TOKEN") {
            cmd.env("AUTH_TOKEN", token);
        }
        if let Ok(ct0) = std::env::var("BIRD_CT0") {
            cmd.env("CT0", ct0);
        }

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .context("bird timed out")?
            .with_context(|| format!("spawn {}", self.binary))?;
        if !output.status.success() {
            bail!(
                "bird exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_bird_output(&stdout, &source.url))
    }

    fn name(&self) -> &'static str {
        "bird"
    }
}

/// Parse bird output into raw items; unparseable lines are skipped.
pub fn parse_bird_output(out: &str, fallback_url: &str) -> Vec<RawItem> {
    let trimmed = out.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let values: Vec<Value> = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items,
        Ok(v @ Value::Object(_)) => vec![v],
        Ok(_) => Vec::new(),
        Err(_) => trimmed
            .lines()
            .filter_map(|l| serde_json::from_str::<Value>(l.trim()).ok())
            .collect(),
    };
    values
        .iter()
        .filter_map(|v| item_from_value(v, fallback_url))
        .collect()
}

fn item_from_value(v: &Value, fallback_url: &str) -> Option<RawItem> {
    let text = v
        .get("full_text")
        .or_else(|| v.get("text"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())?;
    let url = v
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            v.get("id")
                .and_then(|id| id.as_str().map(str::to_string).or_else(|| id.as_u64().map(|n| n.to_string())))
                .map(|id| format!("{}/status/{id}", fallback_url.trim_end_matches('/')))
        });
    let created_at = v
        .get("created_at")
        .or_else(|| v.get("createdAt"))
        .and_then(Value::as_str)
        .and_then(parse_created_at);
    Some(RawItem {
        text: text.to_string(),
        url,
        created_at,
    })
}

/// RFC 3339 or the classic Twitter format (`Wed Oct 10 20:19:24 +0000 2018`).
fn parse_created_at(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%a %b %d %H:%M:%S %z %Y"))
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn username_parsing() {
        assert_eq!(username_from_url("https://x.com/vista8"), Some("vista8"));
        assert_eq!(username_from_url("https://twitter.com/@QingQ77/"), Some("QingQ77"));
        assert_eq!(username_from_url("https://"), None);
    }

    #[test]
    fn parses_array_object_and_lines() {
        let arr = r#"[{"full_text":"long $TSLA","id":"42","created_at":"Wed Oct 10 20:19:24 +0000 2018"},{"text":""}]"#;
        let items = parse_bird_output(arr, "https://x.com/a");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url.as_deref(), Some("https://x.com/a/status/42"));
        assert_eq!(
            items[0].created_at,
            Some(Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap())
        );

        let obj = r#"{"text":"sell $AMD","url":"https://x.com/a/status/1"}"#;
        assert_eq!(parse_bird_output(obj, "https://x.com/a").len(), 1);

        let lines = "{\"text\":\"buy $NVDA\"}\nnot json\n{\"text\":\"dump $META\"}\n";
        assert_eq!(parse_bird_output(lines, "https://x.com/a").len(), 2);

        assert!(parse_bird_output("   ", "https://x.com/a").is_empty());
    }
}
