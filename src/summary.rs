use crate::prices::PriceSeries;
use serde::Serialize;

/// Box-and-whisker statistics of the closing prices of one ticker.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CloseSummary {
    pub ticker: String,
    pub observations: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub last_close: f64,
    pub change_pct: Option<f64>,
}

/// Quantile with linear interpolation between closest ranks. `sorted` must be
/// ascending and non-empty.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Percent change between the last two closes.
pub fn last_change_pct(closes: &[f64]) -> Option<f64> {
    let [.., previous, last] = closes else {
        return None;
    };
    if *previous == 0.0 {
        return None;
    }
    Some((last - previous) / previous * 100.0)
}

pub fn summarize(series: &PriceSeries) -> Option<CloseSummary> {
    let closes: Vec<f64> = series.closes().into_iter().filter(|c| c.is_finite()).collect();
    let last_close = *closes.last()?;

    let mut sorted = closes.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Some(CloseSummary {
        ticker: series.ticker.clone(),
        observations: sorted.len(),
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
        last_close,
        change_pct: last_change_pct(&closes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::PriceBar;
    use chrono::{DateTime, Utc};

    fn series(closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: DateTime::<Utc>::from_timestamp(86_400 * i as i64, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0,
            })
            .collect();
        PriceSeries::new("TEST", bars)
    }

    #[test]
    fn test_five_number_summary() {
        let summary = summarize(&series(&[7.0, 1.0, 3.0, 5.0, 9.0])).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.q1, 3.0);
        assert_eq!(summary.median, 5.0);
        assert_eq!(summary.q3, 7.0);
        assert_eq!(summary.max, 9.0);
        assert_eq!(summary.last_close, 9.0);
        assert_eq!(summary.observations, 5);
    }

    #[test]
    fn test_interpolated_quartiles() {
        let summary = summarize(&series(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert!((summary.q1 - 1.75).abs() < 1e-12);
        assert!((summary.median - 2.5).abs() < 1e-12);
        assert!((summary.q3 - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_change_pct() {
        let change = last_change_pct(&[100.0, 110.0]).unwrap();
        assert!((change - 10.0).abs() < 1e-9);
        assert_eq!(last_change_pct(&[0.0, 5.0]), None);
        assert_eq!(last_change_pct(&[5.0]), None);
    }

    #[test]
    fn test_empty_series() {
        assert!(summarize(&series(&[])).is_none());
        let single = summarize(&series(&[4.0])).unwrap();
        assert_eq!(single.median, 4.0);
        assert_eq!(single.change_pct, None);
    }
}
