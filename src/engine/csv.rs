//! CSV import for chart data, as pasted into the chart editor.

use crate::models::chart::{Chart, ChartKind, Series};

/// Splits CSV text into rows of fields.
///
/// Supports quoted fields with `""` escapes and embedded separators or line breaks.
/// `\r\n` counts as one line break. A final row without a trailing newline is kept.
pub fn parse_csv(input: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' | '\n' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

/// Builds a chart from CSV: the header row holds the categories after its first cell,
/// each following row is a series name followed by its values.
///
/// Values that are not numbers are dropped. Returns `None` without a header row.
pub fn chart_from_csv(input: &str, kind: ChartKind) -> Option<Chart> {
    let mut rows = parse_csv(input)
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()));
    let header = rows.next()?;

    let categories: Vec<String> = header
        .iter()
        .skip(1)
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect();

    let series = rows
        .enumerate()
        .map(|(i, row)| {
            let name = row
                .first()
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Series {}", i + 1));
            let values = row
                .iter()
                .skip(1)
                .filter_map(|cell| cell.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .collect();
            Series::new(name, values)
        })
        .collect();

    let mut chart = Chart::single_series(kind, categories, "", Vec::new());
    chart.series = series;
    Some(chart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_quotes_and_line_endings() {
        let rows = parse_csv("a,\"b, c\",\"say \"\"hi\"\"\"\r\n1,2,3\n4,5,6");
        assert_eq!(
            rows,
            vec![
                vec!["a", "b, c", "say \"hi\""],
                vec!["1", "2", "3"],
                vec!["4", "5", "6"],
            ]
        );
    }

    #[test]
    fn trailing_newline_adds_no_empty_row() {
        assert_eq!(parse_csv("x,y\n").len(), 1);
    }

    #[test]
    fn builds_chart_series_from_rows() {
        let chart = chart_from_csv(
            "Metric,Q1,Q2,Q3\nRevenue,10,20,n/a\n,1,2,3\n",
            ChartKind::Line,
        )
        .unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.categories, vec!["Q1", "Q2", "Q3"]);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "Revenue");
        assert_eq!(chart.series[0].values, vec![10.0, 20.0]);
        assert_eq!(chart.series[1].name, "Series 2");
        assert!(chart_from_csv("", ChartKind::Bar).is_none());
    }
}
