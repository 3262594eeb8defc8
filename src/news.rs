//! Scraping of the stock-analysis quote page: headlines, the snapshot RSI
//! and analyst price-target changes.

use crate::error::{FetchError, FetchResult};
use crate::html;
use chrono::{NaiveDate, TimeDelta};
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

const QUOTE_URL: &str = "https://finviz.com/quote.ashx";
const DATE_FORMAT: &str = "%b-%d-%y";
const RATINGS_CLASS: &str = "js-table-ratings";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Headline {
    pub ticker: String,
    pub date: Option<NaiveDate>,
    pub time: String,
    pub title: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PriceTarget {
    pub ticker: String,
    pub date: NaiveDate,
    pub action: String,
    pub analyst: String,
    pub rating: String,
    pub price_target: String,
}

/// `Today`, `Yesterday` or a short date such as `Jan-02-24`.
pub fn parse_quote_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    match raw.trim() {
        "Today" => Some(today),
        "Yesterday" => today.pred_opt(),
        other => NaiveDate::parse_from_str(other, DATE_FORMAT).ok(),
    }
}

/// First `limit` rows of the `news-table`.
///
/// The stamp cell is either `date time` or a bare `time`; a bare time belongs
/// to the last date seen above it, or to `today` when none was seen.
pub fn parse_news_table(ticker: &str, page: &str, limit: usize, today: NaiveDate) -> Vec<Headline> {
    let Some(table) = html::table_by_id(page, "news-table") else {
        return Vec::new();
    };

    let mut current_date = None;
    let mut headlines = Vec::new();

    for row in html::rows(table) {
        if headlines.len() >= limit {
            break;
        }
        let raw = html::raw_cells(row);
        let Some(stamp_cell) = raw.first() else {
            continue;
        };
        let Some(title) = html::first_anchor_text(row) else {
            continue;
        };

        let stamp = html::text(stamp_cell);
        let parts: Vec<&str> = stamp.split_whitespace().collect();
        let time = match parts.as_slice() {
            [time] => {
                if current_date.is_none() {
                    current_date = Some(today);
                }
                time.to_string()
            }
            [date, time, ..] => {
                if let Some(date) = parse_quote_date(date, today) {
                    current_date = Some(date);
                }
                time.to_string()
            }
            [] => continue,
        };

        headlines.push(Headline {
            ticker: ticker.to_string(),
            date: current_date,
            time,
            title,
        });
    }

    headlines
}

/// Value of the `RSI (14)` snapshot field.
pub fn parse_snapshot_rsi(page: &str) -> Option<f64> {
    let start = page.find("RSI (14)")? + "RSI (14)".len();
    let rest = &page[start..];
    // skip the remainder of the label cell
    let rest = &rest[rest.find("</td>")? + "</td>".len()..];
    let value_cell = html::raw_cells(rest).into_iter().next()?;
    html::text(value_cell).parse::<f64>().ok()
}

/// Analyst rating rows: date, action, analyst, rating change, price target.
pub fn parse_price_targets(ticker: &str, page: &str) -> Vec<PriceTarget> {
    let Some(table) = html::table_by_class(page, RATINGS_CLASS) else {
        return Vec::new();
    };

    html::rows(table)
        .into_iter()
        .filter_map(|row| {
            let cells = html::cells(row);
            if cells.len() < 5 {
                return None;
            }
            let date = NaiveDate::parse_from_str(cells[0].trim(), DATE_FORMAT).ok()?;
            Some(PriceTarget {
                ticker: ticker.to_string(),
                date,
                action: cells[1].clone(),
                analyst: cells[2].clone(),
                rating: cells[3].clone(),
                price_target: cells[4].clone(),
            })
        })
        .collect()
}

/// Targets dated within `days` of `today` (inclusive). A window reaching
/// past the earliest representable date keeps every target.
pub fn recent_targets(targets: Vec<PriceTarget>, today: NaiveDate, days: i64) -> Vec<PriceTarget> {
    let cutoff = TimeDelta::try_days(days.max(0))
        .and_then(|window| today.checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN);
    targets.into_iter().filter(|t| t.date >= cutoff).collect()
}

#[derive(Clone)]
pub struct FinvizClient {
    client: Client,
    base_url: String,
    user_agents: Vec<String>,
}

impl FinvizClient {
    pub fn new(client: Client, user_agents: Vec<String>) -> Self {
        Self {
            client,
            base_url: QUOTE_URL.to_string(),
            user_agents,
        }
    }

    fn user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or("Mozilla/5.0")
    }

    pub async fn fetch_quote_page(&self, ticker: &str) -> FetchResult<String> {
        debug!(ticker, "Requesting quote page");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("t", ticker), ("p", "d")])
            .header(reqwest::header::USER_AGENT, self.user_agent())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let page = response.text().await?;
        if page.trim().is_empty() {
            return Err(FetchError::EmptyData);
        }
        Ok(page)
    }
}
