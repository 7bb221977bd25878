//! Helpers shared by the backends: escaping, number formatting for markup and content
//! streams, image fitting and the common type scale.

use crate::engine::geometry::{palette_color, LabelPlacement, ValueLabel};
use crate::engine::layout::Rect;
use crate::models::colors::Color;
use crate::models::table::Table;
use crate::models::theme::Theme;

// --- Type scale (points, design space) ---

pub const TITLE_SLIDE_SIZE: f64 = 44.0;
pub const SUBTITLE_SIZE: f64 = 22.0;
pub const TITLE_SIZE: f64 = 30.0;
pub const BODY_SIZE: f64 = 18.0;
pub const QUOTE_SIZE: f64 = 28.0;
pub const ATTRIBUTION_SIZE: f64 = 16.0;
pub const METRIC_VALUE_SIZE: f64 = 36.0;
pub const METRIC_LABEL_SIZE: f64 = 14.0;
pub const TABLE_SIZE: f64 = 12.0;
pub const CHART_LABEL_SIZE: f64 = 10.0;
pub const PLACEHOLDER_SIZE: f64 = 14.0;

/// Line height as a multiple of the font size.
pub const LINE_SPACING: f64 = 1.3;
/// Extra space after each bullet, in points.
pub const BULLET_SPACING: f64 = 8.0;
/// Row height of table cells, in points.
pub const TABLE_ROW_HEIGHT: f64 = 28.0;

/// Tables wider than this fall back to a bullet list in every backend.
pub const MAX_TABLE_COLUMNS: usize = 12;

/// Text shown in an empty chart frame.
pub const CHART_PLACEHOLDER_TEXT: &str = "Chart data unavailable";

// --- Escaping ---

/// Escapes text for XML element content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // Control characters other than tab and newline are invalid in XML 1.0
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

/// Formats a coordinate compactly: at most two decimals, no trailing zeros.
pub fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

// --- Image fitting ---

/// Portion of the source image to keep so it covers a frame without distortion, as
/// `(left, top, right, bottom)` crop fractions.
pub fn cover_crop(image_aspect: f64, frame: &Rect) -> (f64, f64, f64, f64) {
    if image_aspect <= 0.0 || frame.width <= 0.0 || frame.height <= 0.0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let frame_aspect = frame.width / frame.height;
    if image_aspect > frame_aspect {
        let side = (1.0 - frame_aspect / image_aspect) / 2.0;
        (side, 0.0, side, 0.0)
    } else {
        let side = (1.0 - image_aspect / frame_aspect) / 2.0;
        (0.0, side, 0.0, side)
    }
}

/// Largest rectangle of the given aspect centered inside `frame`.
pub fn contain_rect(image_aspect: f64, frame: &Rect) -> Rect {
    if image_aspect <= 0.0 || frame.height <= 0.0 {
        return *frame;
    }
    let frame_aspect = frame.width / frame.height;
    if image_aspect > frame_aspect {
        let height = frame.width / image_aspect;
        Rect::new(frame.x, frame.y + (frame.height - height) / 2.0, frame.width, height)
    } else {
        let width = frame.height * image_aspect;
        Rect::new(frame.x + (frame.width - width) / 2.0, frame.y, width, frame.height)
    }
}

/// Square icon cells laid out left to right in the icon strip.
pub fn icon_cells(strip: &Rect, count: usize) -> Vec<Rect> {
    let size = strip.height;
    let gap = size * 0.4;
    (0..count)
        .map(|i| Rect::new(strip.x + i as f64 * (size + gap), strip.y, size, size))
        .filter(|cell| cell.right() <= strip.right() + 1e-9)
        .collect()
}

// --- Shared content decisions ---

/// Text color of a chart value label: contrasting on a fill, body text otherwise.
pub fn label_color(label: &ValueLabel, palette: &[Color], theme: &Theme) -> Color {
    match label.on_fill {
        Some(index) => palette_color(palette, index).contrasting_text(),
        None => theme.text,
    }
}

/// Top edge of a value label's line box in a drawn (non-native) chart.
///
/// Inside labels hang just below the bar top, labels above sit just over it, and centered
/// labels straddle their anchor.
pub fn value_label_top(label: &ValueLabel, size: f64) -> f64 {
    match label.placement {
        LabelPlacement::Inside => label.y + 4.0,
        LabelPlacement::Above => label.y - size * LINE_SPACING - 2.0,
        LabelPlacement::Center => label.y - size / 2.0,
    }
}

/// Bullet lines standing in for a table that cannot be drawn: the header row, then
/// every row with its cells joined by ` | `.
pub fn table_as_bullets(table: &Table) -> Vec<String> {
    let columns = table.column_count();
    let header = table
        .headers
        .iter()
        .any(|h| !h.trim().is_empty())
        .then(|| table.headers.join(" | "));
    header
        .into_iter()
        .chain((0..table.rows.len()).map(|r| {
            (0..columns)
                .map(|c| table.cell_text(r, c))
                .collect::<Vec<_>>()
                .join(" | ")
        }))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Fill of table body row `row`: the slide background, banded with a light primary tint.
pub fn table_row_fill(theme: &Theme, row: usize) -> Color {
    if row % 2 == 0 {
        theme.background
    } else {
        theme.primary.tint(0.9)
    }
}

/// Number of body rows that fit under the header row in `frame`.
pub fn visible_table_rows(table: &Table, frame: &Rect) -> usize {
    let capacity = (frame.height / TABLE_ROW_HEIGHT).floor() as usize;
    let header_rows = usize::from(!table.headers.is_empty());
    table.rows.len().min(capacity.saturating_sub(header_rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_drops_control_chars() {
        assert_eq!(escape_xml("a<b & \"c\"\u{1}"), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn numbers_are_compact() {
        assert_eq!(fmt_num(12.0), "12");
        assert_eq!(fmt_num(12.346), "12.35");
        assert_eq!(fmt_num(-0.001), "0");
        assert_eq!(fmt_num(0.5), "0.5");
    }

    #[test]
    fn cover_crops_the_long_side() {
        let frame = Rect::new(0.0, 0.0, 100.0, 100.0);
        let (l, t, r, b) = cover_crop(2.0, &frame);
        assert!((l - 0.25).abs() < 1e-9 && (r - 0.25).abs() < 1e-9);
        assert_eq!((t, b), (0.0, 0.0));
    }

    #[test]
    fn contain_centers_inside_frame() {
        let rect = contain_rect(2.0, &Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(rect, Rect::new(0.0, 25.0, 100.0, 50.0));
    }

    #[test]
    fn tables_flatten_to_pipe_joined_lines() {
        use crate::models::table::CellValue;
        let table = Table {
            headers: vec!["Region".into(), "Sales".into()],
            rows: vec![
                vec![CellValue::Text("EU".into()), CellValue::Number(12.0)],
                vec![CellValue::Text("US".into())],
            ],
            column_widths: None,
        };
        assert_eq!(
            table_as_bullets(&table),
            vec!["Region | Sales", "EU | 12", "US | "]
        );
        assert_eq!(visible_table_rows(&table, &Rect::new(0.0, 0.0, 100.0, 60.0)), 1);
    }

    #[test]
    fn icon_cells_fit_the_strip() {
        let strip = Rect::new(0.0, 0.0, 100.0, 20.0);
        assert_eq!(icon_cells(&strip, 6).len(), 3);
    }
}
