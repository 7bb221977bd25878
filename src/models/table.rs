use serde::{Deserialize, Serialize};
use std::fmt;

/// A table cell as it arrives from the editor: either free text or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => f.write_str(text),
            // Integers print without a trailing ".0"
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Tabular data attached to a slide. Rows may be ragged; missing cells render empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<CellValue>>,
    /// Relative column weights. Ignored when the length does not match the column count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_widths: Option<Vec<f64>>,
}

impl Table {
    /// Number of columns: the widest of the header row and every body row.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Text of a body cell, or an empty string when the row is short.
    pub fn cell_text(&self, row: usize, column: usize) -> String {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Text of a header cell, or an empty string when the header row is short.
    pub fn header_text(&self, column: usize) -> &str {
        self.headers.get(column).map(String::as_str).unwrap_or("")
    }

    /// Splits `total` across the columns, honoring `column_widths` as relative weights
    /// when they are usable and falling back to an equal split otherwise.
    pub fn column_extents(&self, total: f64) -> Vec<f64> {
        let count = self.column_count();
        if count == 0 {
            return Vec::new();
        }
        if let Some(weights) = &self.column_widths {
            let usable = weights.len() == count && weights.iter().all(|w| w.is_finite() && *w > 0.0);
            if usable {
                let sum: f64 = weights.iter().sum();
                return weights.iter().map(|w| total * w / sum).collect();
            }
        }
        vec![total / count as f64; count]
    }

    pub fn is_empty(&self) -> bool {
        self.column_count() == 0
    }
}
