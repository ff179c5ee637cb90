//! # Signal Processor
//! Pure extraction: raw items from one source → zero or more `Signal`s.
//!
//! Tickers come from three lexical forms (`$NVDA`, bare `AAPL`, 6-digit `600519`),
//! minus a blacklist of acronyms that look like tickers. Sentiment is keyword
//! counting over a bilingual lexicon: +1 per bullish keyword present, -1 per
//! bearish keyword present. No I/O, nothing escapes: a bad item is skipped.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::error::HunterError;
use crate::model::{RawItem, Signal, SignalType, Source};

static RE_TICKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\$[A-Z]{2,5})|(\b[A-Z]{2,5}\b)|(\b\d{6}\b)").expect("valid ticker regex")
});

const DEFAULT_BULLISH: &[&str] = &[
    "buy", "long", "call", "breakout", "moon", "bull", "买入", "看多", "看好", "加仓", "突破",
    "目标价", "起飞",
];

const DEFAULT_BEARISH: &[&str] = &[
    "sell", "short", "put", "breakdown", "dump", "bear", "卖出", "看空", "减仓", "跌破", "止损",
    "崩盘",
];

const DEFAULT_BLACKLIST: &[&str] = &[
    "THE", "AND", "FOR", "AI", "CPU", "GPU", "API", "APP", "GUI", "CLI", "GPT", "LLM", "GLM",
    "UNIX", "PDF", "SDK", "URL", "HTTP", "WWW", "COM",
];

/// Stored snippet length (chars) before `...` is appended.
pub const SNIPPET_CHARS: usize = 200;

/// Keyword sets and ticker blacklist used by the processor.
#[derive(Debug, Clone)]
pub struct Lexicon {
    bullish: Vec<String>,
    bearish: Vec<String>,
    blacklist: BTreeSet<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            bullish: DEFAULT_BULLISH.iter().map(|s| s.to_string()).collect(),
            bearish: DEFAULT_BEARISH.iter().map(|s| s.to_string()).collect(),
            blacklist: DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Lexicon {
    /// Built-in lexicon extended with extra keywords / blacklist entries.
    pub fn extended(bullish: &[String], bearish: &[String], blacklist: &[String]) -> Self {
        let mut lx = Self::default();
        merge_keywords(&mut lx.bullish, bullish);
        merge_keywords(&mut lx.bearish, bearish);
        for b in blacklist {
            let t = b.trim();
            if !t.is_empty() {
                lx.blacklist.insert(t.to_uppercase());
            }
        }
        lx
    }

    pub fn is_blacklisted(&self, ticker: &str) -> bool {
        self.blacklist.contains(ticker)
    }
}

fn merge_keywords(into: &mut Vec<String>, extra: &[String]) {
    for kw in extra {
        let k = kw.trim().to_lowercase();
        if !k.is_empty() && !into.contains(&k) {
            into.push(k);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalProcessor {
    lexicon: Lexicon,
}

impl SignalProcessor {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Candidate tickers in `text`, `$` stripped, uppercased, blacklist removed.
    pub fn extract_tickers(&self, text: &str) -> BTreeSet<String> {
        RE_TICKER
            .find_iter(text)
            .map(|m| m.as_str().trim_start_matches('$').to_uppercase())
            .filter(|t| !self.lexicon.is_blacklisted(t))
            .collect()
    }

    /// Net keyword score: bullish keywords present minus bearish keywords present.
    pub fn sentiment_score(&self, text: &str) -> i32 {
        let lower = text.to_lowercase();
        let bull = self
            .lexicon
            .bullish
            .iter()
            .filter(|kw| lower.contains(kw.as_str()))
            .count() as i32;
        let bear = self
            .lexicon
            .bearish
            .iter()
            .filter(|kw| lower.contains(kw.as_str()))
            .count() as i32;
        bull - bear
    }

    /// Process a batch of raw items for one source at the current time.
    pub fn process(&self, source: &Source, items: &[RawItem]) -> Vec<Signal> {
        self.process_at(source, items, Utc::now())
    }

    /// Same as [`process`](Self::process) with an explicit clock.
    pub fn process_at(&self, source: &Source, items: &[RawItem], now: DateTime<Utc>) -> Vec<Signal> {
        let mut out = Vec::new();
        for item in items {
            match self.process_item(source, item, now) {
                Ok(mut signals) => out.append(&mut signals),
                Err(e) => {
                    tracing::debug!(target: "processor", source = %source.name, error = %e, "item skipped");
                }
            }
        }
        out
    }

    fn process_item(
        &self,
        source: &Source,
        item: &RawItem,
        now: DateTime<Utc>,
    ) -> Result<Vec<Signal>, HunterError> {
        let text = item.text.trim();
        if text.is_empty() {
            return Err(HunterError::Extraction("empty text".into()));
        }

        let tickers = self.extract_tickers(text);
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let score = self.sentiment_score(text);
        let signal_type = SignalType::from_score(score);
        let confidence = confidence_for(score);

        // Future-dated posts are pinned to "now" so they cannot dodge the window.
        let timestamp = item.created_at.map(|t| t.min(now)).unwrap_or(now);
        let url = item
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| source.url.clone());
        let snippet = snippet(text);

        let signals = tickers
            .into_iter()
            .map(|ticker| {
                tracing::debug!(target: "processor", %ticker, kind = signal_type.as_str(), source = %source.name, "signal detected");
                Signal {
                    ticker,
                    signal_type,
                    source_name: source.name.clone(),
                    raw_text: snippet.clone(),
                    url: url.clone(),
                    timestamp,
                    confidence,
                    sentiment_score: Some(sentiment_unit(score)),
                }
            })
            .collect();
        Ok(signals)
    }
}

/// `0.6 + 0.1·|score|`, clamped to 1.0.
pub fn confidence_for(score: i32) -> f64 {
    (0.6 + 0.1 * f64::from(score.unsigned_abs().min(100))).min(1.0)
}

/// Net score squashed into `[-1, 1]`.
fn sentiment_unit(score: i32) -> f64 {
    (f64::from(score) / 4.0).clamp(-1.0, 1.0)
}

fn snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_CHARS {
        let mut s: String = text.chars().take(SNIPPET_CHARS).collect();
        s.push_str("...");
        s
    } else {
        text.to_string()
    }
}
