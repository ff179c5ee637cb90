//! Shared value types for sources, signals, diversity metrics and alerts.
//!
//! Everything here is plain data: a `Signal` is created once by the processor and
//! never mutated, `DiversityMetrics` are recomputed every cycle and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform a source publishes on. Unknown tags fall back to `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Substack,
    Wechat,
    #[default]
    #[serde(other)]
    Generic,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Substack => "substack",
            Self::Wechat => "wechat",
            Self::Generic => "generic",
        }
    }
}

/// Viewpoint category of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    #[default]
    Mainstream,
    Contrarian,
    Institutional,
    Retail,
    Technical,
    Fundamental,
}

/// Category → weight multiplier applied to minority signals in the contrarian index.
const CATEGORY_WEIGHTS: [(SourceCategory, f64); 6] = [
    (SourceCategory::Mainstream, 1.0),
    (SourceCategory::Contrarian, 1.5),
    (SourceCategory::Institutional, 1.0),
    (SourceCategory::Retail, 1.0),
    (SourceCategory::Technical, 1.0),
    (SourceCategory::Fundamental, 1.0),
];

impl SourceCategory {
    pub fn contrarian_weight(&self) -> f64 {
        CATEGORY_WEIGHTS
            .iter()
            .find(|(c, _)| c == self)
            .map(|(_, w)| *w)
            .unwrap_or(1.0)
    }
}

/// A configured source. Immutable for the duration of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub category: SourceCategory,
    /// Trust weight in `[0, 10]`.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            platform: Platform::Generic,
            category: SourceCategory::Mainstream,
            weight: 1.0,
        }
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn category(mut self, category: SourceCategory) -> Self {
        self.category = category;
        self
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight.clamp(0.0, 10.0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Bullish,
    Bearish,
    Neutral,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Neutral => "NEUTRAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BULLISH" => Some(Self::Bullish),
            "BEARISH" => Some(Self::Bearish),
            "NEUTRAL" => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Net keyword score → signal type.
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s > 0 => Self::Bullish,
            s if s < 0 => Self::Bearish,
            _ => Self::Neutral,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Bullish => "🟢",
            Self::Bearish => "🔴",
            Self::Neutral => "⚪️",
        }
    }
}

/// Bullish / bearish / neutral tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentCounts {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl SentimentCounts {
    pub fn tally<'a, I>(types: I) -> Self
    where
        I: IntoIterator<Item = &'a SignalType>,
    {
        let mut c = Self::default();
        for t in types {
            match t {
                SignalType::Bullish => c.bullish += 1,
                SignalType::Bearish => c.bearish += 1,
                SignalType::Neutral => c.neutral += 1,
            }
        }
        c
    }

    pub fn total(&self) -> usize {
        self.bullish + self.bearish + self.neutral
    }

    /// Majority label; ties go bullish, then bearish, then neutral.
    /// `None` for an empty tally.
    pub fn dominant(&self) -> Option<SignalType> {
        if self.total() == 0 {
            return None;
        }
        let max = self.bullish.max(self.bearish).max(self.neutral);
        if self.bullish == max {
            Some(SignalType::Bullish)
        } else if self.bearish == max {
            Some(SignalType::Bearish)
        } else {
            Some(SignalType::Neutral)
        }
    }
}

/// One raw post/article as returned by a fetch adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default, alias = "full_text")]
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RawItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            created_at: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.created_at = Some(ts);
        self
    }
}

/// One extracted (ticker, sentiment, source, time) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ticker: String,
    pub signal_type: SignalType,
    pub source_name: String,
    pub raw_text: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    /// In `[0, 1]`.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
}

/// Per-ticker diversity / consensus / contrarian profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiversityMetrics {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub total_signals: usize,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
    pub diversity_score: f64,
    pub consensus_ratio: f64,
    pub contrarian_index: f64,
    pub is_echo_chamber: bool,
    pub is_extreme_consensus: bool,
    pub contrarian_opportunity: bool,
    pub cross_platform_divergence: bool,
    pub mainstream_sentiment: Option<SignalType>,
    pub contrarian_sentiment: Option<SignalType>,
}

impl DiversityMetrics {
    /// Zero-value record for a ticker without signals.
    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            timestamp: Utc::now(),
            total_signals: 0,
            bullish_count: 0,
            bearish_count: 0,
            neutral_count: 0,
            diversity_score: 0.0,
            consensus_ratio: 0.0,
            contrarian_index: 0.0,
            is_echo_chamber: false,
            is_extreme_consensus: false,
            contrarian_opportunity: false,
            cross_platform_divergence: false,
            mainstream_sentiment: None,
            contrarian_sentiment: None,
        }
    }

    pub fn counts(&self) -> SentimentCounts {
        SentimentCounts {
            bullish: self.bullish_count,
            bearish: self.bearish_count,
            neutral: self.neutral_count,
        }
    }
}

/// Suppression row: a ticker was alerted at `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
}

/// Alert types, declared in routing priority order (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    ExtremeConsensus,
    EchoChamber,
    ContrarianOpportunity,
    CrossPlatformDivergence,
    HealthyResonance,
}

impl AlertKind {
    pub const PRIORITY: [AlertKind; 5] = [
        AlertKind::ExtremeConsensus,
        AlertKind::EchoChamber,
        AlertKind::ContrarianOpportunity,
        AlertKind::CrossPlatformDivergence,
        AlertKind::HealthyResonance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtremeConsensus => "EXTREME_CONSENSUS",
            Self::EchoChamber => "ECHO_CHAMBER",
            Self::ContrarianOpportunity => "CONTRARIAN_OPPORTUNITY",
            Self::CrossPlatformDivergence => "CROSS_PLATFORM_DIVERGENCE",
            Self::HealthyResonance => "HEALTHY_RESONANCE",
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Self::ExtremeConsensus => "⚠️ Extreme consensus",
            Self::EchoChamber => "🔁 Echo chamber",
            Self::ContrarianOpportunity => "🔄 Contrarian opportunity",
            Self::CrossPlatformDivergence => "🔀 Cross-platform divergence",
            Self::HealthyResonance => "🚨 Signal resonance",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_tie_break_prefers_bullish_then_bearish() {
        let tie_all = SentimentCounts {
            bullish: 2,
            bearish: 2,
            neutral: 2,
        };
        assert_eq!(tie_all.dominant(), Some(SignalType::Bullish));

        let bear_neutral = SentimentCounts {
            bullish: 0,
            bearish: 3,
            neutral: 3,
        };
        assert_eq!(bear_neutral.dominant(), Some(SignalType::Bearish));

        assert_eq!(SentimentCounts::default().dominant(), None);
    }

    #[test]
    fn category_weight_table() {
        assert!((SourceCategory::Contrarian.contrarian_weight() - 1.5).abs() < 1e-12);
        assert!((SourceCategory::Retail.contrarian_weight() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn source_deserializes_with_defaults_and_unknown_platform() {
        let s: Source =
            serde_json::from_str(r#"{"name":"Vista","url":"https://x.com/vista8","platform":"mastodon"}"#)
                .unwrap();
        assert_eq!(s.platform, Platform::Generic);
        assert_eq!(s.category, SourceCategory::Mainstream);
        assert!((s.weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn raw_item_accepts_full_text_alias() {
        let it: RawItem = serde_json::from_str(r#"{"full_text":"buy $NVDA"}"#).unwrap();
        assert_eq!(it.text, "buy $NVDA");
        assert!(it.url.is_none());
    }

    #[test]
    fn alert_kind_serializes_screaming() {
        let v = serde_json::to_value(AlertKind::CrossPlatformDivergence).unwrap();
        assert_eq!(v, serde_json::json!("CROSS_PLATFORM_DIVERGENCE"));
    }
}
