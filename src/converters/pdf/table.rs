use log::debug;

use super::canvas::{Align, Canvas};
use super::text::{fit_line, PdfFont, TextStyle};
use crate::converters::utils::{table_row_fill, visible_table_rows, TABLE_ROW_HEIGHT, TABLE_SIZE};
use crate::engine::layout::Rect;
use crate::models::colors::Color;
use crate::models::table::Table;
use crate::models::theme::Theme;

const CELL_PADDING: f64 = 6.0;

/// Draws a grid of fixed-height rows: a header on the primary color, then banded body
/// rows. Cell text is cut to one line; rows below the frame are left out.
pub(crate) fn draw_table(canvas: &mut Canvas, table: &Table, frame: &Rect, theme: &Theme) {
    let columns = table.column_count();
    let widths = table.column_extents(frame.width);
    let rows = visible_table_rows(table, frame);
    if rows < table.rows.len() {
        debug!("Table shows {} of {} rows", rows, table.rows.len());
    }

    let mut y = frame.y;
    if !table.headers.is_empty() {
        let style = TextStyle::new(PdfFont::Bold, TABLE_SIZE, theme.subtitle);
        let cells: Vec<String> = (0..columns).map(|c| table.header_text(c).to_string()).collect();
        draw_row(canvas, frame.x, y, &widths, &cells, theme.primary, &style, theme);
        y += TABLE_ROW_HEIGHT;
    }

    let style = TextStyle::new(PdfFont::Regular, TABLE_SIZE, theme.text);
    for r in 0..rows {
        let cells: Vec<String> = (0..columns).map(|c| table.cell_text(r, c)).collect();
        draw_row(canvas, frame.x, y, &widths, &cells, table_row_fill(theme, r), &style, theme);
        y += TABLE_ROW_HEIGHT;
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    canvas: &mut Canvas,
    x: f64,
    y: f64,
    widths: &[f64],
    cells: &[String],
    fill: Color,
    style: &TextStyle,
    theme: &Theme,
) {
    let mut left = x;
    for (width, text) in widths.iter().zip(cells) {
        let cell = Rect::new(left, y, *width, TABLE_ROW_HEIGHT);
        canvas.fill_stroke_rect(&cell, fill, theme.border, 0.75);
        let room = width - 2.0 * CELL_PADDING;
        if room > 0.0 && !text.is_empty() {
            let line = fit_line(text, style.font, style.size, room);
            let top = y + (TABLE_ROW_HEIGHT - style.size) / 2.0;
            canvas.aligned_line(left + CELL_PADDING, room, top, &line, style, Align::Left);
        }
        left += width;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::templates::resolve_theme;
    use crate::models::table::CellValue;

    #[test]
    fn one_cell_per_visible_row_and_column() {
        let theme = resolve_theme("corporate", None, None);
        let table = Table {
            headers: vec!["Region".into(), "Sales".into()],
            rows: (0..20)
                .map(|i| vec![CellValue::Text(format!("R{}", i)), CellValue::Number(i as f64)])
                .collect(),
            column_widths: None,
        };
        let frame = Rect::new(48.0, 120.0, 864.0, 140.0);
        let mut canvas = Canvas::new();
        draw_table(&mut canvas, &table, &frame, &theme);
        let ops = canvas.into_content().operations;
        // 140pt holds five rows: the header and four body rows.
        assert_eq!(ops.iter().filter(|op| op.operator == "B").count(), 5 * 2);
        assert_eq!(ops.iter().filter(|op| op.operator == "Tj").count(), 5 * 2);
    }
}
