// tests/sources_file.rs
use anyhow::Result;
use async_trait::async_trait;
use signal_hunter::ingest::{FetchAdapter, FileSourceSupplier, SourceSupplier};
use signal_hunter::model::{Platform, SourceCategory};
use signal_hunter::notify::LogNotifier;
use signal_hunter::{Engine, EngineConfig, RawItem, SignalStore, Source, StoreConfig};
use std::fs;
use std::sync::Arc;

struct EchoAdapter;

#[async_trait]
impl FetchAdapter for EchoAdapter {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawItem>> {
        Ok(vec![RawItem::new(format!("{} says buy $AAPL", source.name))])
    }
    fn name(&self) -> &'static str {
        "echo"
    }
}

#[tokio::test]
async fn toml_sources_file_is_read_and_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sources.toml");
    fs::write(
        &path,
        r#"
[[sources]]
name = "Vista"
url = "https://x.com/vista8"
platform = "twitter"
category = "contrarian"

[[sources]]
name = "Vista"
url = "https://x.com/dupe"

[[sources]]
name = "  "
url = "https://blank.example"

[[sources]]
name = "Notes"
url = "https://notes.substack.com"
platform = "substack"
weight = 42.0
"#,
    )
    .unwrap();

    let sources = FileSourceSupplier::new(&path).sources().await.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].platform, Platform::Twitter);
    assert_eq!(sources[0].category, SourceCategory::Contrarian);
    assert_eq!(sources[1].category, SourceCategory::Mainstream);
    assert!((sources[1].weight - 10.0).abs() < 1e-12);
}

#[tokio::test]
async fn edits_apply_on_next_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sources.json");
    fs::write(&path, r#"[{"name":"a","url":"https://a.example"}]"#).unwrap();
    let supplier = FileSourceSupplier::new(&path);
    assert_eq!(supplier.sources().await.unwrap().len(), 1);

    fs::write(
        &path,
        r#"[{"name":"a","url":"https://a.example"},{"name":"b","url":"https://b.example","platform":"mastodon"}]"#,
    )
    .unwrap();
    let sources = supplier.sources().await.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[1].platform, Platform::Generic);
}

#[tokio::test]
async fn unreadable_sources_file_degrades_to_empty_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sources.toml");
    fs::write(&path, "this is [not valid").unwrap();

    let store = SignalStore::open_in_memory(StoreConfig::default()).unwrap();
    let engine = Engine::new(
        Arc::new(FileSourceSupplier::new(&path)),
        Arc::new(EchoAdapter),
        Arc::new(LogNotifier),
        store,
        EngineConfig::default(),
    );
    let report = engine.run_cycle().await;
    assert_eq!(report.sources, 0);
    assert_eq!(report.signals_stored, 0);

    // Fix the file; the next cycle picks it up without a rebuild.
    fs::write(
        &path,
        "[[sources]]\nname = \"a\"\nurl = \"https://a.example\"\n\n[[sources]]\nname = \"b\"\nurl = \"https://b.example\"\n",
    )
    .unwrap();
    let report = engine.run_cycle().await;
    assert_eq!(report.sources, 2);
    assert_eq!(report.signals_stored, 2);
    assert_eq!(report.alerts_sent.len(), 1);
}
