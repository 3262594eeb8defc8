use crate::indicators::{IndicatorParams, IndicatorSet};
use crate::prices::PriceSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest indicator values of one ticker and whether it passed the screen.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScreeningResult {
    pub ticker: String,
    pub last_date: DateTime<Utc>,
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub macd: f64,
    pub signal: f64,
    pub rsi: f64,
    pub flagged: bool,
    #[serde(default)]
    pub sentiment: Option<f64>,
}

impl ScreeningResult {
    pub fn histogram(&self) -> f64 {
        self.macd - self.signal
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScreeningReport {
    pub last_updated: DateTime<Utc>,
    pub results: Vec<ScreeningResult>,
}

/// Screens one series. Series with less history than the crossover lookback
/// are skipped.
pub fn screen_series(series: &PriceSeries, params: &IndicatorParams) -> Option<ScreeningResult> {
    if series.is_empty() || series.len() < params.lookback {
        return None;
    }

    let closes = series.closes();
    let indicators = IndicatorSet::compute(&closes, params);
    let last_bar = series.last()?;

    Some(ScreeningResult {
        ticker: series.ticker.clone(),
        last_date: last_bar.timestamp,
        close: last_bar.close,
        ema_fast: *indicators.ema_fast.last()?,
        ema_slow: *indicators.ema_slow.last()?,
        macd: *indicators.macd.last()?,
        signal: *indicators.signal.last()?,
        rsi: *indicators.rsi.last()?,
        flagged: indicators.is_bullish(params.lookback),
        sentiment: None,
    })
}

/// Screens every series and orders the results by MACD histogram, strongest first.
pub fn screen_all<'a, I>(series: I, params: &IndicatorParams) -> Vec<ScreeningResult>
where
    I: IntoIterator<Item = &'a PriceSeries>,
{
    let mut results: Vec<ScreeningResult> = series
        .into_iter()
        .filter_map(|s| screen_series(s, params))
        .collect();

    results.sort_unstable_by(|a, b| {
        b.histogram()
            .total_cmp(&a.histogram())
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    results
}
