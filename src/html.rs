//! Just enough HTML handling to pull cells out of the scraped tables.

use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));
static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("row pattern"));
static CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("cell pattern"));
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a>").expect("anchor pattern"));

/// Inner HTML of the first `<table>` whose `id` attribute equals `id`.
pub fn table_by_id<'a>(html: &'a str, id: &str) -> Option<&'a str> {
    let pattern = format!(
        r#"(?is)<table\b[^>]*\bid\s*=\s*["']{}["'][^>]*>(.*?)</table>"#,
        regex::escape(id)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Inner HTML of the first `<table>` carrying `class` among its classes.
pub fn table_by_class<'a>(html: &'a str, class: &str) -> Option<&'a str> {
    let pattern = format!(
        r#"(?is)<table\b[^>]*\bclass\s*=\s*["'](?:[^"']*\s)?{}(?:\s[^"']*)?["'][^>]*>(.*?)</table>"#,
        regex::escape(class)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Inner HTML of every `<tr>` in `html`, in document order.
pub fn rows(html: &str) -> Vec<&str> {
    ROW.captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Raw inner HTML of every `<td>` in a row. Header cells are not included.
pub fn raw_cells(row: &str) -> Vec<&str> {
    CELL.captures_iter(row)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Text of every `<td>` in a row.
pub fn cells(row: &str) -> Vec<String> {
    raw_cells(row).into_iter().map(text).collect()
}

/// Text of the first `<a>` in `html`.
pub fn first_anchor_text(html: &str) -> Option<String> {
    ANCHOR
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| text(m.as_str()))
}

/// Strips tags, decodes common entities and collapses whitespace.
pub fn text(html: &str) -> String {
    let stripped = TAG.replace_all(html, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
