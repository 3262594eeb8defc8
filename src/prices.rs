use crate::error::{FetchError, FetchResult};
use crate::find_tickers::to_yahoo_symbol;
use anyhow::bail;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

pub const PERIODS: &[&str] = &["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"];
pub const INTERVALS: &[&str] = &["1m", "5m", "15m", "30m", "1h", "1d", "1wk", "1mo"];

pub fn validate_period(period: &str) -> anyhow::Result<()> {
    if !PERIODS.contains(&period) {
        bail!("unsupported period '{}' (expected one of {})", period, PERIODS.join(", "));
    }
    Ok(())
}

pub fn validate_interval(interval: &str) -> anyhow::Result<()> {
    if !INTERVALS.contains(&interval) {
        bail!("unsupported interval '{}' (expected one of {})", interval, INTERVALS.join(", "));
    }
    Ok(())
}

// --- Price Data ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Bars of one ticker, ascending by timestamp with no duplicate timestamps.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Sorts the bars and drops duplicate timestamps, keeping the last one seen.
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);

        let mut unique: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match unique.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => unique.push(bar),
            }
        }

        Self {
            ticker: ticker.into(),
            bars: unique,
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

// --- Chart API payload ---

/// A number that may arrive as a float, an integer, a numeric string or null.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct LenientF64(Option<f64>);

struct LenientF64Visitor;

impl<'de> Visitor<'de> for LenientF64Visitor {
    type Value = LenientF64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a float, an integer, a numeric string or null")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(LenientF64(Some(v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(LenientF64(Some(v as f64)))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(LenientF64(Some(v as f64)))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if v.trim().is_empty() {
            Ok(LenientF64(None))
        } else {
            v.trim().parse::<f64>().map(|f| LenientF64(Some(f))).map_err(E::custom)
        }
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(LenientF64(None))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(LenientF64(None))
    }
}

impl<'de> Deserialize<'de> for LenientF64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LenientF64Visitor)
    }
}

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Deserialize, Debug)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize, Debug)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize, Debug, Default)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<LenientF64>,
    #[serde(default)]
    high: Vec<LenientF64>,
    #[serde(default)]
    low: Vec<LenientF64>,
    #[serde(default)]
    close: Vec<LenientF64>,
    #[serde(default)]
    volume: Vec<LenientF64>,
}

fn value_at(values: &[LenientF64], i: usize) -> Option<f64> {
    values.get(i).and_then(|v| v.0).filter(|v| v.is_finite())
}

/// Turns a chart response body into a series. Bars without a close are
/// skipped; a series with no usable bar is `EmptyData`.
pub fn parse_chart(ticker: &str, body: &[u8]) -> FetchResult<PriceSeries> {
    let envelope: ChartEnvelope = serde_json::from_slice(body)?;

    if let Some(err) = envelope.chart.error {
        let code = err.code.unwrap_or_default();
        if code == "Not Found" {
            return Err(FetchError::EmptyData);
        }
        return Err(FetchError::Parse(format!(
            "{}: {}",
            code,
            err.description.unwrap_or_default()
        )));
    }

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or(FetchError::EmptyData)?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(close) = value_at(&quote.close, i) else {
            continue;
        };
        let Some(timestamp) = DateTime::from_timestamp(ts, 0) else {
            continue;
        };
        bars.push(PriceBar {
            timestamp,
            open: value_at(&quote.open, i).unwrap_or(close),
            high: value_at(&quote.high, i).unwrap_or(close),
            low: value_at(&quote.low, i).unwrap_or(close),
            close,
            volume: value_at(&quote.volume, i).map(|v| v.max(0.0) as u64).unwrap_or(0),
        });
    }

    if bars.is_empty() {
        return Err(FetchError::EmptyData);
    }
    Ok(PriceSeries::new(ticker, bars))
}

// --- Client ---

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    user_agents: Vec<String>,
}

impl YahooClient {
    pub fn new(client: Client, user_agents: Vec<String>) -> Self {
        Self {
            client,
            base_url: CHART_URL.to_string(),
            user_agents,
        }
    }

    fn user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or("Mozilla/5.0")
    }

    pub async fn fetch_series(&self, ticker: &str, period: &str, interval: &str) -> FetchResult<PriceSeries> {
        let url = format!("{}/{}", self.base_url, to_yahoo_symbol(ticker));
        let query = [("range", period), ("interval", interval), ("includePrePost", "false")];

        debug!(ticker, url = %url, "Requesting chart");
        let response = self
            .client
            .get(&url)
            .query(&query)
            .header(reqwest::header::USER_AGENT, self.user_agent())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let body = response.bytes().await?;
        parse_chart(ticker, &body)
    }
}
