// tests/store_dedup.rs
use chrono::{Duration, Utc};
use signal_hunter::{Signal, SignalStore, SignalType, StoreConfig};

fn signal(ticker: &str, source: &str, offset_minutes: i64) -> Signal {
    Signal {
        ticker: ticker.into(),
        signal_type: SignalType::Bullish,
        source_name: source.into(),
        raw_text: format!("buy {ticker}"),
        url: "https://example.com/post".into(),
        timestamp: Utc::now() - Duration::minutes(offset_minutes),
        confidence: 0.7,
        sentiment_score: Some(1.0),
    }
}

#[test]
fn signals_and_alerts_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/signals.db");

    {
        let store = SignalStore::open(&path, StoreConfig::default()).unwrap();
        assert!(store.save(&signal("NVDA", "alpha", 5)));
        store.record_alert("NVDA");
    }

    let store = SignalStore::open(&path, StoreConfig::default()).unwrap();
    let recent = store.get_recent(24);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].ticker, "NVDA");
    assert_eq!(recent[0].signal_type, SignalType::Bullish);
    assert!((recent[0].confidence - 0.7).abs() < 1e-9);
    assert!(store.is_alerted_recently("NVDA", 24));

    // Still within the dedup window after reopen.
    assert!(!store.save(&signal("NVDA", "alpha", 0)));
}

#[test]
fn dedup_is_per_ticker_and_source() {
    let store = SignalStore::open_in_memory(StoreConfig::default()).unwrap();
    assert!(store.save(&signal("AAPL", "alpha", 30)));
    assert!(!store.save(&signal("AAPL", "alpha", 0)));
    assert!(store.save(&signal("AAPL", "beta", 0)));
    assert!(store.save(&signal("MSFT", "alpha", 0)));
    assert!(store.save(&signal("AAPL", "alpha", 120)));
    assert_eq!(store.get_recent(24).len(), 4);
}

#[test]
fn recent_window_excludes_older_signals() {
    let store = SignalStore::open_in_memory(StoreConfig::default()).unwrap();
    assert!(store.save(&signal("AAPL", "alpha", 60 * 30)));
    assert!(store.save(&signal("AAPL", "beta", 10)));
    let recent = store.get_recent(24);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].source_name, "beta");
}

#[test]
fn suppression_respects_hours() {
    let store = SignalStore::open_in_memory(StoreConfig::default()).unwrap();
    assert!(!store.is_alerted_recently("TSLA", 24));
    store
        .try_record_alert_at("TSLA", Utc::now() - Duration::hours(30))
        .unwrap();
    assert!(!store.is_alerted_recently("TSLA", 24));
    assert!(store.is_alerted_recently("TSLA", 48));
}

#[test]
fn narrower_dedup_window_is_honored() {
    let cfg = StoreConfig {
        dedup_window: Duration::minutes(10),
        ..StoreConfig::default()
    };
    let store = SignalStore::open_in_memory(cfg).unwrap();
    assert!(store.save(&signal("AMD", "alpha", 30)));
    assert!(store.save(&signal("AMD", "alpha", 0)));
}
