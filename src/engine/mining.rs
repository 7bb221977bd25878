//! Best-effort extraction of numbers from freeform bullet text, used when a chart or
//! metrics slide arrives without structured data.
//!
//! Both parsers are lossy on purpose: they return a guess, never validated data. Chart
//! tokens that do not match are dropped and metric bullets without a number keep their
//! text as a label with no value.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::engine::format::group_number;
use crate::models::chart::{Chart, ChartKind};

/// Currency symbol, numeric literal (with grouping or decimal separators), optional
/// magnitude suffix and optional percent sign.
static METRIC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<currency>[$€£¥])?\s*(?P<number>\d[\d.,\x{2009}\x{202F}]*\d|\d)(?:\s*(?P<suffix>[kKmMbB])\b)?\s*(?P<percent>%)?",
    )
    .expect("BUG: invalid METRIC_PATTERN regex literal")
});

/// `label (: or space) value suffix? %?` on one comma-separated token.
static CHART_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?P<label>.+?)\s*(?::|\s)\s*[$€£¥]?(?P<number>-?\d+(?:\.\d+)?)\s*(?P<suffix>[kKmMbB])?\s*%?\s*$",
    )
    .expect("BUG: invalid CHART_TOKEN regex literal")
});

const LABEL_TRIM: &[char] = &[':', ';', ',', '.', '-', '–', '—', '(', ')', ' '];

/// One metric guessed from a bullet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedMetric {
    pub label: String,
    pub value: Option<f64>,
    /// Compact display text such as `$1,200` or `45%`. Empty when there is no value.
    pub display: String,
}

fn magnitude(suffix: Option<&str>) -> f64 {
    match suffix.map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("k") => 1e3,
        Some("m") => 1e6,
        Some("b") => 1e9,
        _ => 1.0,
    }
}

/// Parses a numeric literal that may use `,` or `.` for either grouping or decimals.
///
/// Thin spaces always group. When both `,` and `.` appear, the last one is the decimal
/// separator. A lone separator followed by exactly three digits groups thousands;
/// otherwise it is a decimal point.
pub fn parse_localized_number(literal: &str) -> Option<f64> {
    let compact: String = literal
        .chars()
        .filter(|c| !matches!(c, '\u{2009}' | '\u{202F}'))
        .collect();

    let last_comma = compact.rfind(',');
    let last_dot = compact.rfind('.');
    let decimal = match (last_comma, last_dot) {
        (Some(c), Some(d)) => Some(c.max(d)),
        (Some(p), None) | (None, Some(p)) => {
            let separator = compact.as_bytes()[p] as char;
            let occurrences = compact.matches(separator).count();
            let digits_after = compact.len() - p - 1;
            if occurrences > 1 || digits_after == 3 {
                None
            } else {
                Some(p)
            }
        }
        (None, None) => None,
    };

    let normalized: String = compact
        .char_indices()
        .filter_map(|(i, c)| match c {
            '0'..='9' => Some(c),
            ',' | '.' if Some(i) == decimal => Some('.'),
            _ => None,
        })
        .collect();
    normalized.parse().ok()
}

fn clean_label(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(LABEL_TRIM)
        .to_string()
}

/// Extracts a labelled value from one bullet.
///
/// `"Revenue: $1.2k"` yields label `Revenue`, value `1200` and display `$1,200`.
/// A bullet without any number keeps its text as the label and has no value.
pub fn parse_metric(text: &str) -> ParsedMetric {
    let Some(captures) = METRIC_PATTERN.captures(text) else {
        return ParsedMetric {
            label: text.to_string(),
            value: None,
            display: String::new(),
        };
    };
    let whole = captures.get(0).map(|m| m.range()).unwrap_or(0..0);
    let literal = captures.name("number").map(|m| m.as_str()).unwrap_or("");

    let Some(base) = parse_localized_number(literal) else {
        debug!("Unparseable number '{}' in metric '{}'", literal, text);
        return ParsedMetric {
            label: text.to_string(),
            value: None,
            display: String::new(),
        };
    };

    let value = base * magnitude(captures.name("suffix").map(|m| m.as_str()));
    let currency = captures.name("currency").map(|m| m.as_str()).unwrap_or("");
    let percent = if captures.name("percent").is_some() {
        "%"
    } else {
        ""
    };
    let display = format!("{}{}{}", currency, group_number(value, 2), percent);

    let mut remainder = String::with_capacity(text.len());
    remainder.push_str(&text[..whole.start]);
    remainder.push(' ');
    remainder.push_str(&text[whole.end..]);

    ParsedMetric {
        label: clean_label(&remainder),
        value: Some(value),
        display,
    }
}

/// Runs [`parse_metric`] over every bullet.
pub fn parse_metrics(bullets: &[String]) -> Vec<ParsedMetric> {
    bullets.iter().map(|b| parse_metric(b)).collect()
}

/// Collects `label: value` pairs from comma-separated bullet text, in order of appearance.
///
/// `["Jan: 100, Feb: 250, Mar: 75"]` yields `Jan=100`, `Feb=250` and `Mar=75`.
pub fn parse_chart_from_text(bullets: &[String]) -> Vec<(String, f64)> {
    let mut pairs = Vec::new();
    for token in bullets.iter().flat_map(|b| b.split([',', '\n'])) {
        let Some(captures) = CHART_TOKEN.captures(token) else {
            continue;
        };
        let label = clean_label(captures.name("label").map(|m| m.as_str()).unwrap_or(""));
        let number = captures
            .name("number")
            .and_then(|m| m.as_str().parse::<f64>().ok());
        match number {
            Some(number) if !label.is_empty() => {
                let value = number * magnitude(captures.name("suffix").map(|m| m.as_str()));
                pairs.push((label, value));
            }
            _ => continue,
        }
    }
    pairs
}

/// Builds a single-series bar chart from bullet text, or `None` when nothing parses.
pub fn chart_from_text(bullets: &[String]) -> Option<Chart> {
    let pairs = parse_chart_from_text(bullets);
    if pairs.is_empty() {
        return None;
    }
    let (categories, values): (Vec<String>, Vec<f64>) = pairs.into_iter().unzip();
    Some(Chart::single_series(
        ChartKind::Bar,
        categories,
        "Series 1",
        values,
    ))
}
