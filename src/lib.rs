//! MACD/RSI stock screener with headline sentiment.
//!
//! Prices come from the public chart API, ticker lists and headlines are
//! scraped, and every report is written as a CSV spreadsheet and printed as a
//! terminal table.

pub mod analysis;
pub mod comfy_table;
pub mod error;
pub mod find_tickers;
pub mod html;
pub mod indicators;
pub mod news;
pub mod pool;
pub mod prices;
pub mod screener;
pub mod sentiment;
pub mod spreadsheet;
pub mod storage_utils;
pub mod summary;
