//! Indicator formulas used by the screener.
//!
//! Every series returned here has the same length as its input, so index `i`
//! of an indicator always lines up with bar `i` of the price series.

use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::ExponentialMovingAverage;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct IndicatorParams {
    pub fast_span: usize,
    pub slow_span: usize,
    pub signal_span: usize,
    pub rsi_period: usize,
    pub lookback: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            fast_span: 12,
            slow_span: 26,
            signal_span: 9,
            rsi_period: 14,
            lookback: 3,
        }
    }
}

/// Exponential moving average with `k = 2 / (span + 1)`, seeded with the
/// first value. A span of 0 behaves like a span of 1.
pub fn compute_ema(series: &[f64], span: usize) -> Vec<f64> {
    let mut ema = match ExponentialMovingAverage::new(span.max(1)) {
        Ok(ema) => ema,
        Err(_) => return Vec::new(),
    };

    series.iter().map(|&price| ema.next(price)).collect()
}

/// Fast EMA minus slow EMA, point by point.
pub fn compute_macd_with(series: &[f64], fast_span: usize, slow_span: usize) -> Vec<f64> {
    let fast = compute_ema(series, fast_span);
    let slow = compute_ema(series, slow_span);

    fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect()
}

pub fn compute_macd(series: &[f64]) -> Vec<f64> {
    compute_macd_with(series, 12, 26)
}

pub fn compute_signal(macd: &[f64]) -> Vec<f64> {
    compute_ema(macd, 9)
}

/// Relative Strength Index from simple trailing means of gains and losses.
///
/// The window holds up to `period` deltas and shrinks at the start of the
/// series (minimum one observation). The first delta is taken as 0.
/// When the average loss is zero the value is 100, or 50 if there were no
/// gains either.
pub fn compute_rsi(series: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);

    let mut gains = Vec::with_capacity(series.len());
    let mut losses = Vec::with_capacity(series.len());
    for (i, &price) in series.iter().enumerate() {
        let delta = if i == 0 { 0.0 } else { price - series[i - 1] };
        gains.push(if delta > 0.0 { delta } else { 0.0 });
        losses.push(if delta < 0.0 { -delta } else { 0.0 });
    }

    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            let window = (i + 1 - start) as f64;
            let avg_gain = gains[start..=i].iter().sum::<f64>() / window;
            let avg_loss = losses[start..=i].iter().sum::<f64>() / window;
            rsi_from_averages(avg_gain, avg_loss)
        })
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { 50.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// True when MACD sits strictly above its signal line on each of the last
/// `lookback` aligned points. Too little history (or a zero lookback) is
/// simply `false`.
pub fn is_bullish_crossover(macd: &[f64], signal: &[f64], lookback: usize) -> bool {
    if lookback == 0 || macd.len() < lookback || signal.len() < lookback {
        return false;
    }

    macd[macd.len() - lookback..]
        .iter()
        .zip(&signal[signal.len() - lookback..])
        .all(|(m, s)| m > s)
}

/// All indicator series for one price series, index-aligned with it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub ema_fast: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub rsi: Vec<f64>,
}

impl IndicatorSet {
    pub fn compute(closes: &[f64], params: &IndicatorParams) -> Self {
        let ema_fast = compute_ema(closes, params.fast_span);
        let ema_slow = compute_ema(closes, params.slow_span);
        let macd: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
        let signal = compute_ema(&macd, params.signal_span);
        let rsi = compute_rsi(closes, params.rsi_period);

        Self {
            ema_fast,
            ema_slow,
            macd,
            signal,
            rsi,
        }
    }

    pub fn len(&self) -> usize {
        self.macd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }

    pub fn is_bullish(&self, lookback: usize) -> bool {
        is_bullish_crossover(&self.macd, &self.signal, lookback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| 10.0 + i as f64).collect()
    }

    #[test]
    fn test_ema_empty_series() {
        assert!(compute_ema(&[], 12).is_empty());
    }

    #[test]
    fn test_ema_seeded_with_first_price() {
        let ema = compute_ema(&[4.0, 8.0], 3);
        assert_eq!(ema[0], 4.0);
        // k = 0.5
        assert!((ema[1] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_ema_constant_series() {
        let series = vec![42.5; 60];
        for span in [1, 9, 12, 26, 50] {
            for value in compute_ema(&series, span) {
                assert!((value - 42.5).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_macd_matches_ema_difference() {
        let series: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let macd = compute_macd(&series);
        let fast = compute_ema(&series, 12);
        let slow = compute_ema(&series, 26);

        assert_eq!(macd.len(), series.len());
        for i in 0..series.len() {
            let diff = fast[i] - slow[i];
            assert_eq!(macd[i].signum(), diff.signum());
            assert!((macd[i] - diff).abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_on_rising_series() {
        let macd = compute_macd(&ramp(60));
        assert_eq!(macd[0], 0.0);
        for i in 1..macd.len() {
            assert!(macd[i] > 0.0, "macd[{}] = {}", i, macd[i]);
        }
        for i in 26..macd.len() {
            assert!(macd[i] + 1e-12 >= macd[i - 1]);
        }
    }

    #[test]
    fn test_signal_is_ema9_of_macd() {
        let macd = compute_macd(&ramp(30));
        assert_eq!(compute_signal(&macd), compute_ema(&macd, 9));
    }

    #[test]
    fn test_rsi_bounds() {
        let series: Vec<f64> = (0..120)
            .map(|i| 50.0 + (i as f64 * 1.3).sin() * 10.0 + (i % 7) as f64)
            .collect();
        let rsi = compute_rsi(&series, 14);
        assert_eq!(rsi.len(), series.len());
        assert!(rsi.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_rsi_single_observation() {
        assert_eq!(compute_rsi(&[10.0], 14), vec![50.0]);
    }

    #[test]
    fn test_rsi_zero_loss_cases() {
        let rising = compute_rsi(&ramp(20), 14);
        assert!(rising[1..].iter().all(|&v| v == 100.0));

        let flat = compute_rsi(&[5.0; 10], 14);
        assert!(flat.iter().all(|&v| v == 50.0));

        let falling: Vec<f64> = ramp(20).into_iter().rev().collect();
        let rsi = compute_rsi(&falling, 14);
        assert!(rsi[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rsi_shrinking_window() {
        // gains [0, 2, 0], losses [0, 0, 1] with a window of 3 -> rs = 2
        let rsi = compute_rsi(&[10.0, 12.0, 11.0], 14);
        assert!((rsi[2] - (100.0 - 100.0 / 3.0)).abs() < 1e-9);

        // window of 2 drops the first delta
        let rsi = compute_rsi(&[10.0, 12.0, 11.0, 13.0], 2);
        // gains [0, 2], losses [1, 0] over the last two deltas
        assert!((rsi[3] - (100.0 - 100.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_crossover_needs_history() {
        assert!(!is_bullish_crossover(&[2.0, 3.0], &[1.0, 1.0], 3));
        assert!(!is_bullish_crossover(&[], &[], 3));
        assert!(!is_bullish_crossover(&[2.0], &[1.0], 0));
    }

    #[test]
    fn test_crossover_strict_trailing_comparison() {
        let signal = [1.0, 1.0, 1.0, 1.0];
        assert!(is_bullish_crossover(&[0.0, 2.0, 2.0, 2.0], &signal, 3));
        assert!(!is_bullish_crossover(&[2.0, 2.0, 1.0, 2.0], &signal, 3));
        assert!(!is_bullish_crossover(&[2.0, 2.0, 2.0, 1.0], &signal, 3));
        assert!(!is_bullish_crossover(&[2.0, f64::NAN, 2.0, 2.0], &signal, 3));
    }

    #[test]
    fn test_indicator_set_is_aligned_and_deterministic() {
        let closes: Vec<f64> = (0..90).map(|i| 20.0 + (i as f64 / 5.0).cos() * 3.0).collect();
        let params = IndicatorParams::default();
        let first = IndicatorSet::compute(&closes, &params);
        let second = IndicatorSet::compute(&closes, &params);

        assert_eq!(first.len(), closes.len());
        assert_eq!(first.rsi.len(), closes.len());
        assert_eq!(first.signal, compute_signal(&first.macd));
        for (a, b) in first.macd.iter().zip(&second.macd) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_eq!(first.is_bullish(3), second.is_bullish(3));
    }
}
