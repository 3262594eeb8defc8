use crate::html;
use anyhow::{Context, Result, bail};
use reqwest::{Client, Request, header};
use std::collections::HashSet;
use tracing::info;

pub const SP500_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

/// Sent on every request that does not rotate a browser agent.
pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Splits user input such as `"aapl, msft tsla"` into unique upper-case symbols.
pub fn parse_symbols(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Share-class dots become dashes on the quote API (`BRK.B` -> `BRK-B`).
pub fn to_yahoo_symbol(symbol: &str) -> String {
    symbol.replace('.', "-")
}

/// First cell of each data row in the `constituents` table.
pub fn parse_constituents_table(page: &str) -> Result<Vec<String>> {
    let table = html::table_by_id(page, "constituents")
        .context("constituents table not found on page")?;

    let mut seen = HashSet::new();
    let tickers: Vec<String> = html::rows(table)
        .into_iter()
        .filter_map(|row| html::cells(row).into_iter().next())
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect();

    if tickers.is_empty() {
        bail!("constituents table has no rows");
    }
    Ok(tickers)
}

fn sp500_request(client: &Client) -> reqwest::Result<Request> {
    client
        .get(SP500_URL)
        .header(header::USER_AGENT, APP_USER_AGENT)
        .build()
}

pub async fn fetch_sp500_tickers(client: &Client) -> Result<Vec<String>> {
    let page = client
        .execute(sp500_request(client)?)
        .await?
        .error_for_status()?
        .text()
        .await?;

    let tickers = parse_constituents_table(&page)?;
    info!(count = tickers.len(), "Loaded S&P 500 constituents");
    Ok(tickers)
}

/// Resolves the ticker list for a run: explicit symbols win, otherwise the
/// S&P 500 list is scraped.
pub async fn resolve_tickers(client: &Client, typed: Option<&str>, sp500: bool) -> Result<Vec<String>> {
    let mut tickers = typed.map(parse_symbols).unwrap_or_default();
    if sp500 || tickers.is_empty() {
        let scraped = fetch_sp500_tickers(client).await?;
        let known: HashSet<String> = tickers.iter().cloned().collect();
        tickers.extend(scraped.into_iter().filter(|t| !known.contains(t)));
    }
    Ok(tickers)
}
