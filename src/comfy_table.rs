use crate::news::PriceTarget;
use crate::screener::ScreeningResult;
use crate::summary::CloseSummary;
use chrono::{DateTime, Utc};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_BORDERS_ONLY,
};
use std::collections::BTreeMap;

const MAX_ROWS: usize = 25;

fn get_visibility_ratio(current: f64, top: f64) -> f64 {
    let ratio = 0.4 + 0.6 * (current / top);
    ratio.clamp(0.4, 1.0)
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%d-%m-%Y %H:%M:%S").to_string()
}

fn base_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    let cell = Cell::new(h).add_attribute(Attribute::Bold);
                    if i == 0 { cell } else { cell.set_alignment(CellAlignment::Right) }
                })
                .collect::<Vec<_>>(),
        );
    table
}

fn rsi_color(rsi: f64) -> Color {
    if rsi >= 70.0 {
        Color::Red
    } else if rsi <= 30.0 {
        Color::Green
    } else {
        Color::Reset
    }
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn opt(value: Option<f64>, suffix: &str) -> String {
    value.map(|v| format!("{:.2}{}", v, suffix)).unwrap_or_else(|| "N/A".to_string())
}

pub fn screening_table(results: &[&ScreeningResult], last_updated: DateTime<Utc>) -> String {
    let mut table = base_table(&[
        "Ticker", "Close", "MACD", "Signal", "Histogram", "RSI", "Sentiment", "Flag",
    ]);

    let top = results
        .iter()
        .map(|r| r.histogram())
        .fold(0.0_f64, f64::max);
    let safe_top = if top <= 0.0 { 1.0 } else { top };

    for r in results.iter().take(MAX_ROWS) {
        let shade = (255.0 * get_visibility_ratio(r.histogram().max(0.0), safe_top)) as u8;

        table.add_row(vec![
            Cell::new(&r.ticker).fg(Color::Rgb { r: 0, g: shade, b: shade }),
            right(format!("{:.2}", r.close)),
            right(format!("{:.4}", r.macd)),
            right(format!("{:.4}", r.signal)),
            right(format!("{:.4}", r.histogram())).fg(Color::Rgb { r: 0, g: shade, b: 0 }),
            right(format!("{:.2}", r.rsi)).fg(rsi_color(r.rsi)),
            right(opt(r.sentiment, "")),
            Cell::new(if r.flagged { "▲" } else { "" }).fg(Color::Green),
        ]);
    }

    format!(
        "(Data taken at {} UTC, {} shown of {})\n{}",
        format_timestamp(last_updated),
        results.len().min(MAX_ROWS),
        results.len(),
        table
    )
}

pub fn sentiment_table(
    top: &[(String, f64)],
    bottom: &[(String, f64)],
    rsi: &BTreeMap<String, f64>,
) -> String {
    let mut table = base_table(&["Ticker", "Avg Sentiment", "RSI (14)", "Group"]);

    let rows = top
        .iter()
        .map(|row| (row, "Top", Color::Green))
        .chain(bottom.iter().map(|row| (row, "Bottom", Color::Red)));

    for ((ticker, score), group, color) in rows {
        table.add_row(vec![
            Cell::new(ticker).fg(color),
            right(format!("{:.3}", score)),
            right(opt(rsi.get(ticker).copied(), "")),
            Cell::new(group).fg(Color::DarkGrey),
        ]);
    }
    table.to_string()
}

pub fn targets_table(targets: &[PriceTarget]) -> String {
    let mut table = base_table(&["Ticker", "Date", "Action", "Analyst", "Rating", "Price Target"]);
    for t in targets.iter().take(MAX_ROWS * 2) {
        table.add_row(vec![
            Cell::new(&t.ticker).fg(Color::Cyan),
            right(t.date.format("%d-%m-%Y").to_string()),
            right(t.action.clone()),
            right(t.analyst.clone()),
            right(t.rating.clone()),
            right(t.price_target.clone()),
        ]);
    }
    table.to_string()
}

pub fn summary_table(summaries: &[CloseSummary]) -> String {
    let mut table = base_table(&["Ticker", "Min", "Q1", "Median", "Q3", "Max", "Last", "Change"]);
    for s in summaries {
        let change_color = match s.change_pct {
            Some(c) if c >= 0.0 => Color::Green,
            Some(_) => Color::Red,
            None => Color::DarkGrey,
        };
        table.add_row(vec![
            Cell::new(&s.ticker).fg(Color::Cyan),
            right(format!("{:.2}", s.min)),
            right(format!("{:.2}", s.q1)),
            right(format!("{:.2}", s.median)),
            right(format!("{:.2}", s.q3)),
            right(format!("{:.2}", s.max)),
            right(format!("{:.2}", s.last_close)),
            right(opt(s.change_pct, "%")).fg(change_color),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_ratio_bounds() {
        assert_eq!(get_visibility_ratio(0.0, 1.0), 0.4);
        assert_eq!(get_visibility_ratio(1.0, 1.0), 1.0);
        assert_eq!(get_visibility_ratio(-5.0, 1.0), 0.4);
    }

    #[test]
    fn test_format_timestamp() {
        let ts = DateTime::<Utc>::from_timestamp(1_710_460_800, 0).unwrap();
        assert_eq!(format_timestamp(ts), "15-03-2024 00:00:00");
    }

    #[test]
    fn test_sentiment_table_lists_both_groups() {
        let top = vec![("AAA".to_string(), 0.8)];
        let bottom = vec![("ZZZ".to_string(), -0.6)];
        let mut rsi = BTreeMap::new();
        rsi.insert("AAA".to_string(), 71.5);

        let rendered = sentiment_table(&top, &bottom, &rsi);
        assert!(rendered.contains("AAA"));
        assert!(rendered.contains("ZZZ"));
        assert!(rendered.contains("71.50"));
        assert!(rendered.contains("N/A"));
    }
}
