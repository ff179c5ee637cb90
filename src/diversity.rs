//! # Diversity Analyzer
//! Per-ticker sentiment diversity, consensus and contrarian profile.
//!
//! - `diversity_score`: Shannon entropy of the bullish/bearish/neutral split,
//!   normalized by `log2(3)`, so one-sided = 0 and an even split = 1.
//! - `consensus_ratio`: share of the majority label.
//! - `contrarian_index`: confidence-weighted strength of the bullish/bearish
//!   minority, signed by direction (bearish minority → negative).
//! - flags: echo chamber, extreme consensus, contrarian opportunity and
//!   cross-platform divergence.
//!
//! Deterministic: the same signals (and source table) give the same metrics,
//! apart from the `timestamp` stamped on the result.

use chrono::Utc;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{
    DiversityMetrics, Platform, SentimentCounts, Signal, SignalType, Source, SourceCategory,
};

/// Flag thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Diversity strictly below this is an echo chamber.
    pub echo_chamber: f64,
    /// Consensus strictly above this is extreme.
    pub extreme_consensus: f64,
    /// Contrarian index strictly below this is an opportunity.
    pub contrarian_opportunity: f64,
    /// Distinct sources needed for a healthy-resonance alert.
    pub healthy_min_sources: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            echo_chamber: 0.3,
            extreme_consensus: 0.8,
            contrarian_opportunity: -0.5,
            healthy_min_sources: 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SourceProfile {
    platform: Platform,
    category: SourceCategory,
}

#[derive(Debug, Clone)]
pub struct DiversityAnalyzer {
    sources: HashMap<String, SourceProfile>,
    thresholds: Thresholds,
}

impl DiversityAnalyzer {
    pub fn new(sources: &[Source], thresholds: Thresholds) -> Self {
        let sources = sources
            .iter()
            .map(|s| {
                (
                    s.name.clone(),
                    SourceProfile {
                        platform: s.platform,
                        category: s.category,
                    },
                )
            })
            .collect();
        Self {
            sources,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn category_of(&self, signal: &Signal) -> Option<SourceCategory> {
        self.sources.get(&signal.source_name).map(|p| p.category)
    }

    pub fn analyze(&self, ticker: &str, signals: &[Signal]) -> DiversityMetrics {
        if signals.is_empty() {
            return DiversityMetrics::empty(ticker);
        }

        let counts = SentimentCounts::tally(signals.iter().map(|s| &s.signal_type));
        let total = counts.total();

        let diversity_score = diversity_score(&counts);
        let max = counts.bullish.max(counts.bearish).max(counts.neutral);
        let consensus_ratio = max as f64 / total as f64;
        let contrarian_index = self.contrarian_index(signals, &counts);

        let t = &self.thresholds;
        let contrarian_opportunity = contrarian_index < t.contrarian_opportunity
            && counts.bullish > 0
            && counts.bearish > 0;

        DiversityMetrics {
            ticker: ticker.to_string(),
            timestamp: Utc::now(),
            total_signals: total,
            bullish_count: counts.bullish,
            bearish_count: counts.bearish,
            neutral_count: counts.neutral,
            diversity_score,
            consensus_ratio,
            contrarian_index,
            is_echo_chamber: diversity_score < t.echo_chamber,
            is_extreme_consensus: consensus_ratio > t.extreme_consensus,
            contrarian_opportunity,
            cross_platform_divergence: self.platform_divergence(signals),
            mainstream_sentiment: self.category_sentiment(signals, SourceCategory::Mainstream),
            contrarian_sentiment: self.category_sentiment(signals, SourceCategory::Contrarian),
        }
    }

    /// `direction × Σ(wᵢ·cᵢ) / Σwᵢ` over the bullish/bearish minority, where
    /// `wᵢ = cᵢ × category multiplier`. Neutral is never the minority.
    fn contrarian_index(&self, signals: &[Signal], counts: &SentimentCounts) -> f64 {
        if counts.bullish == counts.bearish {
            return 0.0;
        }
        let (minority, direction) = if counts.bullish > counts.bearish {
            (SignalType::Bearish, -1.0)
        } else {
            (SignalType::Bullish, 1.0)
        };

        let mut weighted = 0.0;
        let mut weight_total = 0.0;
        for s in signals.iter().filter(|s| s.signal_type == minority) {
            let mult = self
                .category_of(s)
                .map(|c| c.contrarian_weight())
                .unwrap_or(1.0);
            let w = s.confidence * mult;
            weighted += w * s.confidence;
            weight_total += w;
        }

        if weight_total > 0.0 {
            direction * weighted / weight_total
        } else {
            0.0
        }
    }

    /// Dominant label among signals whose source is in `category`.
    fn category_sentiment(&self, signals: &[Signal], category: SourceCategory) -> Option<SignalType> {
        let counts = SentimentCounts::tally(
            signals
                .iter()
                .filter(|s| self.category_of(s) == Some(category))
                .map(|s| &s.signal_type),
        );
        counts.dominant()
    }

    /// True when two or more platforms have different dominant labels.
    /// Signals from unknown sources carry no platform and are ignored.
    fn platform_divergence(&self, signals: &[Signal]) -> bool {
        let mut per_platform: HashMap<Platform, SentimentCounts> = HashMap::new();
        for s in signals {
            let Some(profile) = self.sources.get(&s.source_name) else {
                continue;
            };
            let c = per_platform.entry(profile.platform).or_default();
            match s.signal_type {
                SignalType::Bullish => c.bullish += 1,
                SignalType::Bearish => c.bearish += 1,
                SignalType::Neutral => c.neutral += 1,
            }
        }
        if per_platform.len() < 2 {
            return false;
        }
        let mut dominants = per_platform.values().filter_map(|c| c.dominant());
        let Some(first) = dominants.next() else {
            return false;
        };
        dominants.any(|d| d != first)
    }

    /// Order signals for presentation given the ticker's profile:
    /// echo chamber → minority first, then confidence; contrarian opportunity →
    /// minority side first, then confidence; otherwise confidence only.
    /// Bullish is the majority only when strictly ahead; a tie counts bearish.
    pub fn rank_signals<'a>(&self, signals: &'a [Signal], metrics: &DiversityMetrics) -> Vec<&'a Signal> {
        let majority = if metrics.bullish_count > metrics.bearish_count {
            SignalType::Bullish
        } else {
            SignalType::Bearish
        };
        let by_conf = |a: &&Signal, b: &&Signal| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        };

        let mut ranked: Vec<&Signal> = signals.iter().collect();
        if metrics.is_echo_chamber || metrics.contrarian_opportunity {
            ranked.sort_by(|a, b| {
                let ka = a.signal_type == majority;
                let kb = b.signal_type == majority;
                ka.cmp(&kb).then_with(|| by_conf(a, b))
            });
        } else {
            ranked.sort_by(by_conf);
        }
        ranked
    }
}

/// Normalized Shannon entropy over three categories; zero shares contribute 0.
pub fn diversity_score(counts: &SentimentCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 0.0;
    }
    let entropy: f64 = [counts.bullish, counts.bearish, counts.neutral]
        .iter()
        .filter(|&&n| n > 0)
        .map(|&n| {
            let p = n as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    entropy / 3f64.log2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sig(ticker: &str, kind: SignalType, source: &str, conf: f64) -> Signal {
        Signal {
            ticker: ticker.into(),
            signal_type: kind,
            source_name: source.into(),
            raw_text: String::new(),
            url: String::new(),
            timestamp: Utc::now(),
            confidence: conf,
            sentiment_score: None,
        }
    }

    fn analyzer(sources: &[Source]) -> DiversityAnalyzer {
        DiversityAnalyzer::new(sources, Thresholds::default())
    }

    fn repeat(kind: SignalType, n: usize) -> Vec<Signal> {
        (0..n).map(|i| sig("X", kind, &format!("s{i}"), 0.7)).collect()
    }

    #[test]
    fn empty_input_is_zero_value() {
        let m = analyzer(&[]).analyze("X", &[]);
        assert_eq!(m.total_signals, 0);
        assert_eq!(m.diversity_score, 0.0);
        assert!(!m.is_echo_chamber && !m.is_extreme_consensus);
        assert!(!m.contrarian_opportunity && !m.cross_platform_divergence);
        assert!(m.mainstream_sentiment.is_none() && m.contrarian_sentiment.is_none());
    }

    #[test]
    fn entropy_bounds() {
        let a = analyzer(&[]);
        let one_sided = a.analyze("X", &repeat(SignalType::Bullish, 4));
        assert!(one_sided.diversity_score.abs() < 1e-12);

        let mut even = repeat(SignalType::Bullish, 1);
        even.extend(repeat(SignalType::Bearish, 1));
        even.extend(repeat(SignalType::Neutral, 1));
        let m = a.analyze("X", &even);
        assert!((m.diversity_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn consensus_threshold_is_strict() {
        let a = analyzer(&[]);
        let mut s = repeat(SignalType::Bullish, 8);
        s.extend(repeat(SignalType::Bearish, 2));
        let m = a.analyze("X", &s);
        assert!((m.consensus_ratio - 0.8).abs() < 1e-12);
        assert!(!m.is_extreme_consensus);

        let mut s = repeat(SignalType::Bullish, 9);
        s.extend(repeat(SignalType::Bearish, 1));
        assert!(a.analyze("X", &s).is_extreme_consensus);
    }

    #[test]
    fn contrarian_index_sign_and_weighting() {
        let sources = vec![
            Source::new("main", "https://a").category(SourceCategory::Mainstream),
            Source::new("contra", "https://b").category(SourceCategory::Contrarian),
        ];
        let a = analyzer(&sources);

        // Bearish minority → negative index.
        let signals = vec![
            sig("X", SignalType::Bullish, "main", 0.6),
            sig("X", SignalType::Bullish, "main", 0.6),
            sig("X", SignalType::Bullish, "main", 0.6),
            sig("X", SignalType::Bearish, "contra", 0.9),
            sig("X", SignalType::Bearish, "main", 0.6),
        ];
        let m = a.analyze("X", &signals);
        // weights: 0.9*1.5 = 1.35, 0.6*1.0 = 0.6
        let expected = -(1.35 * 0.9 + 0.6 * 0.6) / (1.35 + 0.6);
        assert!((m.contrarian_index - expected).abs() < 1e-9);
        assert!(m.contrarian_opportunity);

        // Bullish minority → positive index.
        let signals = vec![
            sig("X", SignalType::Bearish, "main", 0.7),
            sig("X", SignalType::Bearish, "main", 0.7),
            sig("X", SignalType::Bullish, "main", 0.8),
        ];
        let m = a.analyze("X", &signals);
        assert!((m.contrarian_index - 0.8).abs() < 1e-9);
        assert!(!m.contrarian_opportunity);
    }

    #[test]
    fn balanced_or_neutral_only_has_zero_index() {
        let a = analyzer(&[]);
        let mut s = repeat(SignalType::Bullish, 2);
        s.extend(repeat(SignalType::Bearish, 2));
        assert_eq!(a.analyze("X", &s).contrarian_index, 0.0);

        // Neutral is never the minority: bullish majority, no bearish at all.
        let mut s = repeat(SignalType::Bullish, 3);
        s.extend(repeat(SignalType::Neutral, 1));
        let m = a.analyze("X", &s);
        assert_eq!(m.contrarian_index, 0.0);
        assert!(!m.contrarian_opportunity);
    }

    #[test]
    fn category_sentiment_tie_breaks_bullish_first() {
        let sources = vec![
            Source::new("m1", "https://a").category(SourceCategory::Mainstream),
            Source::new("m2", "https://b").category(SourceCategory::Mainstream),
            Source::new("c1", "https://c").category(SourceCategory::Contrarian),
            Source::new("c2", "https://d").category(SourceCategory::Contrarian),
        ];
        let a = analyzer(&sources);
        let signals = vec![
            sig("X", SignalType::Bullish, "m1", 0.7),
            sig("X", SignalType::Bearish, "m2", 0.7),
            sig("X", SignalType::Bearish, "c1", 0.7),
            sig("X", SignalType::Neutral, "c2", 0.7),
        ];
        let m = a.analyze("X", &signals);
        assert_eq!(m.mainstream_sentiment, Some(SignalType::Bullish));
        assert_eq!(m.contrarian_sentiment, Some(SignalType::Bearish));
    }

    #[test]
    fn category_sentiment_absent_without_members() {
        let sources = vec![Source::new("m1", "https://a").category(SourceCategory::Mainstream)];
        let m = analyzer(&sources).analyze("X", &[sig("X", SignalType::Bearish, "m1", 0.7)]);
        assert_eq!(m.mainstream_sentiment, Some(SignalType::Bearish));
        assert_eq!(m.contrarian_sentiment, None);
    }

    #[test]
    fn platform_divergence_requires_two_platforms_disagreeing() {
        let sources = vec![
            Source::new("tw", "https://x.com/a").platform(Platform::Twitter),
            Source::new("tw2", "https://x.com/b").platform(Platform::Twitter),
            Source::new("web", "https://blog").platform(Platform::Generic),
        ];
        let a = analyzer(&sources);

        let agree = vec![
            sig("X", SignalType::Bullish, "tw", 0.7),
            sig("X", SignalType::Bullish, "web", 0.7),
        ];
        assert!(!a.analyze("X", &agree).cross_platform_divergence);

        let differ = vec![
            sig("X", SignalType::Bullish, "tw", 0.7),
            sig("X", SignalType::Bearish, "web", 0.7),
        ];
        assert!(a.analyze("X", &differ).cross_platform_divergence);

        // Single platform never diverges, even with mixed views.
        let one = vec![
            sig("X", SignalType::Bullish, "tw", 0.7),
            sig("X", SignalType::Bearish, "tw2", 0.7),
        ];
        assert!(!a.analyze("X", &one).cross_platform_divergence);

        // Platform tie (1 bullish, 1 neutral) resolves bullish: agrees with a bullish platform.
        let tie = vec![
            sig("X", SignalType::Bullish, "tw", 0.7),
            sig("X", SignalType::Neutral, "tw2", 0.7),
            sig("X", SignalType::Bullish, "web", 0.7),
        ];
        assert!(!a.analyze("X", &tie).cross_platform_divergence);
    }

    #[test]
    fn rank_puts_minority_first_in_echo_chamber() {
        let a = analyzer(&[]);
        let mut s = repeat(SignalType::Bullish, 9);
        s.push(sig("X", SignalType::Bearish, "lonely", 0.6));
        let m = a.analyze("X", &s);
        assert!(m.is_echo_chamber);
        let ranked = a.rank_signals(&s, &m);
        assert_eq!(ranked[0].source_name, "lonely");
    }

    #[test]
    fn rank_tie_treats_bearish_as_majority() {
        let a = analyzer(&[]);
        let s = vec![
            sig("X", SignalType::Bearish, "bear", 0.9),
            sig("X", SignalType::Bullish, "bull", 0.6),
        ];
        let mut m = a.analyze("X", &s);
        assert_eq!(m.bullish_count, m.bearish_count);
        m.is_echo_chamber = true;
        let ranked = a.rank_signals(&s, &m);
        assert_eq!(ranked[0].source_name, "bull");
    }
}
