//! CSV output of every report, readable by any spreadsheet application.

use crate::analysis::ScoredHeadline;
use crate::news::PriceTarget;
use crate::screener::ScreeningResult;
use crate::summary::CloseSummary;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::info;

fn num(value: f64) -> String {
    if value.is_finite() {
        format!("{:.4}", value)
    } else {
        String::new()
    }
}

fn opt_num(value: Option<f64>) -> String {
    value.map(num).unwrap_or_default()
}

pub fn write_screening<W: Write>(writer: W, results: &[&ScreeningResult]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Ticker", "Date", "Close", "EMA Fast", "EMA Slow", "MACD", "Signal", "Histogram", "RSI",
        "Flagged", "Sentiment",
    ])?;
    for r in results {
        wtr.write_record([
            r.ticker.clone(),
            r.last_date.format("%Y-%m-%d").to_string(),
            num(r.close),
            num(r.ema_fast),
            num(r.ema_slow),
            num(r.macd),
            num(r.signal),
            num(r.histogram()),
            num(r.rsi),
            r.flagged.to_string(),
            opt_num(r.sentiment),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_headlines<W: Write>(writer: W, rows: &[ScoredHeadline]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Ticker", "Date", "Time", "Headline", "RSI", "neg", "neu", "pos", "compound",
    ])?;
    for row in rows {
        wtr.write_record([
            row.headline.ticker.clone(),
            row.headline.date.map(|d| d.to_string()).unwrap_or_default(),
            row.headline.time.clone(),
            row.headline.title.clone(),
            opt_num(row.rsi),
            num(row.score.negative),
            num(row.score.neutral),
            num(row.score.positive),
            num(row.score.compound),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_targets<W: Write>(writer: W, targets: &[PriceTarget]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Ticker", "Date", "Action", "Analyst", "Rating", "Price Target"])?;
    for t in targets {
        wtr.write_record([
            t.ticker.clone(),
            t.date.to_string(),
            t.action.clone(),
            t.analyst.clone(),
            t.rating.clone(),
            t.price_target.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_summaries<W: Write>(writer: W, summaries: &[CloseSummary]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Ticker", "Observations", "Min", "Q1", "Median", "Q3", "Max", "Last Close", "Change (%)",
    ])?;
    for s in summaries {
        wtr.write_record([
            s.ticker.clone(),
            s.observations.to_string(),
            num(s.min),
            num(s.q1),
            num(s.median),
            num(s.q3),
            num(s.max),
            num(s.last_close),
            opt_num(s.change_pct),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Creates `path` and hands a buffered file to `write`.
pub fn save_to<F>(path: &Path, rows: usize, write: F) -> Result<()>
where
    F: FnOnce(std::io::BufWriter<std::fs::File>) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write(std::io::BufWriter::new(file))?;
    info!(path = %path.display(), rows, "Spreadsheet written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::Headline;
    use crate::sentiment::SentimentScore;
    use chrono::{DateTime, NaiveDate, Utc};
    use tempfile::tempdir;

    fn result(ticker: &str, flagged: bool) -> ScreeningResult {
        ScreeningResult {
            ticker: ticker.to_string(),
            last_date: DateTime::<Utc>::from_timestamp(1_710_460_800, 0).unwrap(),
            close: 101.5,
            ema_fast: 100.0,
            ema_slow: 99.0,
            macd: 1.0,
            signal: 0.25,
            rsi: 64.123456,
            flagged,
            sentiment: None,
        }
    }

    #[test]
    fn test_screening_csv() {
        let a = result("AAPL", true);
        let mut buf = Vec::new();
        write_screening(&mut buf, &[&a]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Ticker,Date,Close"));
        assert_eq!(
            lines[1],
            "AAPL,2024-03-15,101.5000,100.0000,99.0000,1.0000,0.2500,0.7500,64.1235,true,"
        );
    }

    #[test]
    fn test_headline_csv_quotes_commas() {
        let row = ScoredHeadline {
            headline: Headline {
                ticker: "MSFT".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 3, 15),
                time: "09:30AM".to_string(),
                title: "Microsoft, OpenAI expand deal".to_string(),
            },
            rsi: None,
            score: SentimentScore::default(),
        };
        let mut buf = Vec::new();
        write_headlines(&mut buf, &[row]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"Microsoft, OpenAI expand deal\""));
        assert!(text.contains("MSFT,2024-03-15,09:30AM"));
    }

    #[test]
    fn test_save_to_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("signals.csv");
        let a = result("AAPL", true);
        save_to(&path, 1, |w| write_screening(w, &[&a])).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "AAPL");
    }
}
