//! Headline sentiment.
//!
//! Scoring is delegated to the VADER lexicon and rules; this module adapts
//! its polarity map into [`SentimentScore`] and aggregates scores per ticker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vader_sentiment::SentimentIntensityAnalyzer;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub compound: f64,
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl Default for SentimentScore {
    fn default() -> Self {
        Self {
            compound: 0.0,
            positive: 0.0,
            neutral: 1.0,
            negative: 0.0,
        }
    }
}

impl SentimentScore {
    pub fn label(&self) -> &'static str {
        if self.compound >= 0.05 {
            "positive"
        } else if self.compound <= -0.05 {
            "negative"
        } else {
            "neutral"
        }
    }
}

pub struct SentimentAnalyzer {
    inner: SentimentIntensityAnalyzer<'static>,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            inner: SentimentIntensityAnalyzer::new(),
        }
    }

    pub fn analyze(&self, text: &str) -> SentimentScore {
        // text without a single word scores as fully neutral
        if !text.chars().any(char::is_alphanumeric) {
            return SentimentScore::default();
        }

        let scores = self.inner.polarity_scores(text);
        let get = |key: &str| scores.get(key).copied().unwrap_or(0.0);
        SentimentScore {
            compound: get("compound").clamp(-1.0, 1.0),
            positive: get("pos"),
            neutral: get("neu"),
            negative: get("neg"),
        }
    }
}

/// Mean compound score per ticker.
pub fn average_by_ticker<'a, I>(scores: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (ticker, compound) in scores {
        let entry = sums.entry(ticker.to_string()).or_insert((0.0, 0));
        entry.0 += compound;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(ticker, (sum, count))| (ticker, sum / count as f64))
        .collect()
}

/// The `n` highest and `n` lowest averages, each ordered from the extreme inward.
pub fn rank_extremes(averages: &BTreeMap<String, f64>, n: usize) -> (Vec<(String, f64)>, Vec<(String, f64)>) {
    let mut sorted: Vec<(String, f64)> = averages.iter().map(|(t, v)| (t.clone(), *v)).collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let bottom: Vec<_> = sorted.iter().take(n).cloned().collect();
    let top: Vec<_> = sorted.iter().rev().take(n).cloned().collect();
    (top, bottom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_headline() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.analyze("Apple reports great quarter on strong iPhone sales");
        assert!(score.compound > 0.5);
        assert_eq!(score.label(), "positive");
    }

    #[test]
    fn test_negative_headline() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.analyze("Bank hit by fraud crisis and weak outlook");
        assert!(score.compound < -0.5);
        assert_eq!(score.label(), "negative");
    }

    #[test]
    fn test_ordinary_finance_headlines() {
        let analyzer = SentimentAnalyzer::new();
        let positive = [
            "Apple posts best quarter ever",
            "Nvidia delivers excellent results",
            "Microsoft wins major cloud contract",
        ];
        let negative = [
            "Lender faces liquidity crisis",
            "Retailer reports terrible quarter",
            "Regulators flag bad accounting at carmaker",
        ];
        for text in positive {
            assert_eq!(analyzer.analyze(text).label(), "positive", "{text}");
        }
        for text in negative {
            assert_eq!(analyzer.analyze(text).label(), "negative", "{text}");
        }
    }

    #[test]
    fn test_neutral_and_empty() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.analyze("Company to hold annual meeting on Tuesday");
        assert_eq!(score.compound, 0.0);
        assert_eq!(score.label(), "neutral");
        assert_eq!(analyzer.analyze("  ...  "), SentimentScore::default());
    }

    #[test]
    fn test_negation_flips() {
        let analyzer = SentimentAnalyzer::new();
        let plain = analyzer.analyze("results are strong");
        let negated = analyzer.analyze("results are not strong");
        assert!(plain.compound > 0.0);
        assert!(negated.compound < 0.0);
    }

    #[test]
    fn test_booster_increases_magnitude() {
        let analyzer = SentimentAnalyzer::new();
        let plain = analyzer.analyze("good results");
        let boosted = analyzer.analyze("very good results");
        assert!(boosted.compound > plain.compound);
    }

    #[test]
    fn test_scores_bounded_and_proportions_sum_to_one() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.analyze("great great great win win success best excellent");
        assert!(score.compound <= 1.0 && score.compound > 0.9);
        let sum = score.positive + score.neutral + score.negative;
        assert!((sum - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_ranking_with_nan_does_not_panic() {
        let mut averages = BTreeMap::new();
        averages.insert("AAA".to_string(), 0.2);
        averages.insert("BBB".to_string(), f64::NAN);
        averages.insert("CCC".to_string(), -0.3);

        let (top, bottom) = rank_extremes(&averages, 1);
        assert_eq!(bottom[0].0, "CCC");
        // NaN sorts above every number under total ordering
        assert_eq!(top[0].0, "BBB");
    }

    #[test]
    fn test_average_and_ranking() {
        let rows = vec![("AAA", 0.5), ("AAA", 0.1), ("BBB", -0.4), ("CCC", 0.9)];
        let averages = average_by_ticker(rows);
        assert!((averages["AAA"] - 0.3).abs() < 1e-12);

        let (top, bottom) = rank_extremes(&averages, 2);
        assert_eq!(top[0].0, "CCC");
        assert_eq!(top[1].0, "AAA");
        assert_eq!(bottom[0].0, "BBB");
        assert_eq!(bottom[1].0, "AAA");
    }
}
