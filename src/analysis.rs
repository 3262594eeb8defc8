//! The end-to-end pipelines behind each command.

use crate::comfy_table;
use crate::error::FetchResult;
use crate::find_tickers;
use crate::news::{self, FinvizClient, Headline, PriceTarget};
use crate::pool::{self, Jitter};
use crate::prices::{self, PriceSeries, YahooClient};
use crate::screener::{self, ScreeningReport, ScreeningResult};
use crate::sentiment::{self, SentimentAnalyzer, SentimentScore};
use crate::spreadsheet;
use crate::storage_utils::{AppConfig, AsyncStorageManager};
use crate::summary::{self, CloseSummary};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use reqwest::Client;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const EXTREMES: usize = 10;

/// Where tickers come from for a run.
#[derive(Debug, Clone, Default)]
pub struct TickerSource {
    pub typed: Option<String>,
    pub sp500: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScreenOptions {
    pub tickers: TickerSource,
    pub include_all: bool,
    pub with_sentiment: bool,
    pub cached: bool,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct NewsOptions {
    pub tickers: TickerSource,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SummaryOptions {
    pub tickers: TickerSource,
    pub output: Option<PathBuf>,
}

/// Headline with the snapshot RSI of its ticker and its sentiment score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHeadline {
    pub headline: Headline,
    pub rsi: Option<f64>,
    pub score: SentimentScore,
}

/// What one quote page yields.
#[derive(Debug, Clone, Default)]
pub struct QuoteSnapshot {
    pub headlines: Vec<Headline>,
    pub rsi: Option<f64>,
    pub targets: Vec<PriceTarget>,
}

pub fn http_client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(find_tickers::APP_USER_AGENT)
        .pool_max_idle_per_host(16)
        .timeout(Duration::from_secs(20))
        .build()?;
    Ok(client)
}

fn output_path(storage: &AsyncStorageManager, requested: Option<PathBuf>, default_name: &str) -> PathBuf {
    requested.unwrap_or_else(|| storage.artifact_path(default_name))
}

async fn resolve(client: &Client, source: &TickerSource) -> Result<Vec<String>> {
    let tickers = find_tickers::resolve_tickers(client, source.typed.as_deref(), source.sp500).await?;
    info!(count = tickers.len(), "Tickers resolved");
    Ok(tickers)
}

async fn fetch_prices(client: &Client, config: &AppConfig, tickers: &[String]) -> BTreeMap<String, PriceSeries> {
    let yahoo = YahooClient::new(client.clone(), config.fetch.user_agents.clone());
    let yahoo = &yahoo;
    let period = config.prices.period.as_str();
    let interval = config.prices.interval.as_str();
    let jitter = Jitter::new(config.fetch.min_delay_ms, config.fetch.max_delay_ms);

    pool::fetch_all(tickers, config.fetch.workers, jitter, move |ticker| async move {
        yahoo.fetch_series(&ticker, period, interval).await
    })
    .await
}

async fn fetch_snapshot(
    finviz: &FinvizClient,
    ticker: &str,
    headlines_per_ticker: usize,
    today: NaiveDate,
) -> FetchResult<QuoteSnapshot> {
    let page = finviz.fetch_quote_page(ticker).await?;
    Ok(QuoteSnapshot {
        headlines: news::parse_news_table(ticker, &page, headlines_per_ticker, today),
        rsi: news::parse_snapshot_rsi(&page),
        targets: news::parse_price_targets(ticker, &page),
    })
}

async fn fetch_snapshots(client: &Client, config: &AppConfig, tickers: &[String]) -> BTreeMap<String, QuoteSnapshot> {
    let finviz = FinvizClient::new(client.clone(), config.fetch.user_agents.clone());
    let finviz = &finviz;
    let limit = config.news.headlines_per_ticker;
    let today = Local::now().date_naive();
    let jitter = Jitter::new(config.news.min_delay_ms, config.news.max_delay_ms);

    pool::fetch_all(tickers, config.news.workers, jitter, move |ticker| async move {
        fetch_snapshot(finviz, &ticker, limit, today).await
    })
    .await
}

/// Scores every headline of every snapshot.
pub fn score_snapshots(analyzer: &SentimentAnalyzer, snapshots: &BTreeMap<String, QuoteSnapshot>) -> Vec<ScoredHeadline> {
    snapshots
        .values()
        .flat_map(|snapshot| {
            snapshot.headlines.iter().map(|headline| ScoredHeadline {
                headline: headline.clone(),
                rsi: snapshot.rsi,
                score: analyzer.analyze(&headline.title),
            })
        })
        .collect()
}

pub fn average_sentiment(rows: &[ScoredHeadline]) -> BTreeMap<String, f64> {
    sentiment::average_by_ticker(rows.iter().map(|r| (r.headline.ticker.as_str(), r.score.compound)))
}

/// Copies the average headline sentiment onto the matching results.
pub fn join_sentiment(results: &mut [ScreeningResult], averages: &BTreeMap<String, f64>) {
    for result in results.iter_mut() {
        result.sentiment = averages.get(&result.ticker).copied();
    }
}

/// Loads the last fetched price snapshot, restricted to `wanted` when given.
/// Nothing cached yet yields an empty map.
async fn load_cached_prices(storage: &AsyncStorageManager, wanted: Option<&str>) -> Result<BTreeMap<String, PriceSeries>> {
    if !storage.exists("prices").await {
        warn!("No cached prices yet; run `screen` without --cached first");
        return Ok(BTreeMap::new());
    }
    let cached: Vec<PriceSeries> = storage
        .load("prices")
        .await
        .context("reading cached prices")?;
    let wanted: Option<HashSet<String>> = wanted.map(|w| find_tickers::parse_symbols(w).into_iter().collect());
    Ok(cached
        .into_iter()
        .filter(|s| wanted.as_ref().is_none_or(|w| w.contains(&s.ticker)))
        .map(|s| (s.ticker.clone(), s))
        .collect())
}

pub async fn run_screen(config: &AppConfig, storage: &AsyncStorageManager, opts: ScreenOptions) -> Result<()> {
    let client = http_client()?;

    let series = if opts.cached {
        println!("\n--- Step 1: Loading Cached Prices ---");
        load_cached_prices(storage, opts.tickers.typed.as_deref()).await?
    } else {
        println!("\n--- Step 1: Resolving Tickers ---");
        let tickers = resolve(&client, &opts.tickers).await?;

        println!("\n--- Step 2: Fetching Prices ---");
        let series = fetch_prices(&client, config, &tickers).await;
        let snapshot: Vec<&PriceSeries> = series.values().collect();
        storage.save("prices", &snapshot).await?;
        series
    };

    if series.is_empty() {
        println!("No data found for the given tickers and period.");
        return Ok(());
    }

    println!("\n--- Step 3: Computing Indicators ---");
    let mut results = screener::screen_all(series.values(), &config.indicators);
    let flagged: Vec<String> = results.iter().filter(|r| r.flagged).map(|r| r.ticker.clone()).collect();
    info!(screened = results.len(), flagged = flagged.len(), "Screening finished");

    if opts.with_sentiment && !flagged.is_empty() {
        println!("\n--- Step 4: Scoring Headlines ---");
        let snapshots = fetch_snapshots(&client, config, &flagged).await;
        let scored = score_snapshots(&SentimentAnalyzer::new(), &snapshots);
        join_sentiment(&mut results, &average_sentiment(&scored));
    }

    let last_updated = results.iter().map(|r| r.last_date).max().unwrap_or_else(Utc::now);
    let report = ScreeningReport {
        last_updated,
        results,
    };
    storage.save("results", &report).await?;

    let rows: Vec<&ScreeningResult> = report
        .results
        .iter()
        .filter(|r| opts.include_all || r.flagged)
        .collect();

    let path = output_path(storage, opts.output, "cross_above_signals.csv");
    spreadsheet::save_to(&path, rows.len(), |w| spreadsheet::write_screening(w, &rows))?;

    if rows.is_empty() {
        println!("No ticker has MACD above its signal line for the last {} sessions.", config.indicators.lookback);
    } else {
        println!("\n{}", comfy_table::screening_table(&rows, report.last_updated));
    }
    println!("Results saved to {}", path.display());
    Ok(())
}

pub async fn run_sentiment(config: &AppConfig, storage: &AsyncStorageManager, opts: NewsOptions) -> Result<()> {
    let client = http_client()?;

    println!("\n--- Step 1: Resolving Tickers ---");
    let tickers = resolve(&client, &opts.tickers).await?;

    println!("\n--- Step 2: Fetching Headlines ---");
    let snapshots = fetch_snapshots(&client, config, &tickers).await;

    println!("\n--- Step 3: Scoring Headlines ---");
    let scored = score_snapshots(&SentimentAnalyzer::new(), &snapshots);
    if scored.is_empty() {
        println!("No headlines found for the given tickers.");
        return Ok(());
    }

    let path = output_path(storage, opts.output, "sentiment_scores.csv");
    spreadsheet::save_to(&path, scored.len(), |w| spreadsheet::write_headlines(w, &scored))?;

    let averages = average_sentiment(&scored);
    let (top, bottom) = sentiment::rank_extremes(&averages, EXTREMES);
    let rsi: BTreeMap<String, f64> = snapshots
        .iter()
        .filter_map(|(ticker, snapshot)| snapshot.rsi.map(|v| (ticker.clone(), v)))
        .collect();

    println!("\n{}", comfy_table::sentiment_table(&top, &bottom, &rsi));
    println!("Results saved to {}", path.display());
    Ok(())
}

pub async fn run_targets(config: &AppConfig, storage: &AsyncStorageManager, opts: NewsOptions) -> Result<()> {
    let client = http_client()?;

    println!("\n--- Step 1: Resolving Tickers ---");
    let tickers = resolve(&client, &opts.tickers).await?;

    println!("\n--- Step 2: Fetching Price Targets ---");
    let snapshots = fetch_snapshots(&client, config, &tickers).await;

    let today = Local::now().date_naive();
    let days = config.news.target_window_days;
    let mut targets: Vec<PriceTarget> = snapshots
        .into_values()
        .flat_map(|s| news::recent_targets(s.targets, today, days))
        .collect();
    targets.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.ticker.cmp(&b.ticker)));

    if targets.is_empty() {
        println!("No data found within the last {} days.", days);
        return Ok(());
    }

    let path = output_path(storage, opts.output, "price_target_changes.csv");
    spreadsheet::save_to(&path, targets.len(), |w| spreadsheet::write_targets(w, &targets))?;

    println!("\n{}", comfy_table::targets_table(&targets));
    println!("Data saved to {}", path.display());
    Ok(())
}

pub async fn run_summary(config: &AppConfig, storage: &AsyncStorageManager, opts: SummaryOptions) -> Result<()> {
    let client = http_client()?;

    println!("\n--- Step 1: Resolving Tickers ---");
    let tickers = resolve(&client, &opts.tickers).await?;

    println!("\n--- Step 2: Fetching Prices ---");
    let series = fetch_prices(&client, config, &tickers).await;

    // keep the requested order
    let summaries: Vec<CloseSummary> = tickers
        .iter()
        .filter_map(|t| series.get(t))
        .filter_map(summary::summarize)
        .collect();

    if summaries.is_empty() {
        println!("No data found for the given tickers and period.");
        return Ok(());
    }

    let path = output_path(storage, opts.output, "close_summary.csv");
    spreadsheet::save_to(&path, summaries.len(), |w| spreadsheet::write_summaries(w, &summaries))?;

    println!(
        "\nClosing prices ({}, {})\n{}",
        config.prices.period,
        config.prices.interval,
        comfy_table::summary_table(&summaries)
    );
    println!("Data saved to {}", path.display());
    Ok(())
}

/// Checks the configured period and interval before any request is made.
pub fn validate_price_config(config: &AppConfig) -> Result<()> {
    prices::validate_period(&config.prices.period)?;
    prices::validate_interval(&config.prices.interval)?;
    Ok(())
}
