// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::SourceSupplier;
use crate::model::Source;

/// Load a source list from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<Source>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    let v: Vec<Source> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim names/URLs, drop blank entries and keep the first entry per name.
fn clean_list(items: Vec<Source>) -> Vec<Source> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(items.len());
    for mut it in items {
        it.name = it.name.trim().to_string();
        it.url = it.url.trim().to_string();
        if it.name.is_empty() || it.url.is_empty() {
            continue;
        }
        if !seen.insert(it.name.clone()) {
            continue;
        }
        it.weight = it.weight.clamp(0.0, 10.0);
        out.push(it);
    }
    out
}

/// Fixed list, e.g. the inline `[[sources]]` of the main config.
#[derive(Debug, Clone, Default)]
pub struct StaticSources(pub Vec<Source>);

#[async_trait::async_trait]
impl SourceSupplier for StaticSources {
    async fn sources(&self) -> Result<Vec<Source>> {
        Ok(self.0.clone())
    }
}

/// Re-reads a sources file every cycle, so edits apply without a restart.
#[derive(Debug, Clone)]
pub struct FileSourceSupplier {
    path: PathBuf,
}

impl FileSourceSupplier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl SourceSupplier for FileSourceSupplier {
    async fn sources(&self) -> Result<Vec<Source>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || load_sources_from(&path))
            .await
            .context("sources loader task")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Platform, SourceCategory};

    #[test]
    fn toml_and_json_formats_are_cleaned() {
        let toml = r#"
[[sources]]
name = " Vista "
url = "https://x.com/vista8"
platform = "twitter"
category = "contrarian"
weight = 12.0

[[sources]]
name = "Vista"
url = "https://x.com/dup"

[[sources]]
name = ""
url = "https://nowhere"
"#;
        let out = parse_toml(toml).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Vista");
        assert_eq!(out[0].platform, Platform::Twitter);
        assert_eq!(out[0].category, SourceCategory::Contrarian);
        assert!((out[0].weight - 10.0).abs() < 1e-12);

        let json = r#"[{"name":"Blog","url":"https://blog.example"}]"#;
        let out = parse_json(json).unwrap();
        assert_eq!(out[0].platform, Platform::Generic);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_sources("not a list", "").is_err());
    }
}
