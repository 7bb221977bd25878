use std::fmt::Write;

use log::debug;

use super::constants::DEFAULT_FONT;
use super::error::{PptxError, Result};
use super::utils::{emu, solid_fill, write_run, RunStyle};
use crate::converters::utils::{
    table_row_fill, visible_table_rows, MAX_TABLE_COLUMNS, TABLE_ROW_HEIGHT, TABLE_SIZE,
};
use crate::engine::layout::Rect;
use crate::models::colors::Color;
use crate::models::table::Table;
use crate::models::theme::Theme;

/// Builds an `a:tbl` element sized to `frame`.
///
/// Column widths follow `columnWidths` as relative weights, or split the frame evenly.
/// Rows that do not fit under the header are left out.
pub(crate) fn build_table(table: &Table, frame: &Rect, theme: &Theme) -> Result<String> {
    let columns = table.column_count();
    if columns == 0 {
        return Err(PptxError::UnsupportedTable("table has no columns".to_string()));
    }
    if columns > MAX_TABLE_COLUMNS {
        return Err(PptxError::UnsupportedTable(format!(
            "{} columns exceed the limit of {}",
            columns, MAX_TABLE_COLUMNS
        )));
    }

    let rows = visible_table_rows(table, frame);
    if rows < table.rows.len() {
        debug!(
            "Table shows {} of {} rows in a {}pt frame",
            rows,
            table.rows.len(),
            frame.height
        );
    }

    let font = theme.body_font_or(DEFAULT_FONT);
    let mut xml = String::new();
    write!(
        xml,
        r#"<a:tbl><a:tblPr firstRow="{}" bandRow="1"/><a:tblGrid>"#,
        u8::from(!table.headers.is_empty())
    )?;
    for width in table.column_extents(frame.width) {
        write!(xml, r#"<a:gridCol w="{}"/>"#, emu(width))?;
    }
    xml.push_str("</a:tblGrid>");

    if !table.headers.is_empty() {
        let style = RunStyle::new(TABLE_SIZE, theme.subtitle, font).bold();
        write_row(
            &mut xml,
            theme,
            &style,
            theme.primary,
            (0..columns).map(|c| table.header_text(c).to_string()),
        )?;
    }
    let style = RunStyle::new(TABLE_SIZE, theme.text, font);
    for r in 0..rows {
        write_row(
            &mut xml,
            theme,
            &style,
            table_row_fill(theme, r),
            (0..columns).map(|c| table.cell_text(r, c)),
        )?;
    }
    xml.push_str("</a:tbl>");
    Ok(xml)
}

fn write_row(
    xml: &mut String,
    theme: &Theme,
    style: &RunStyle,
    fill: Color,
    cells: impl Iterator<Item = String>,
) -> Result<()> {
    write!(xml, r#"<a:tr h="{}">"#, emu(TABLE_ROW_HEIGHT))?;
    let border = solid_fill(theme.border);
    for text in cells {
        xml.push_str("<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p>");
        if text.is_empty() {
            xml.push_str(r#"<a:endParaRPr lang="en-US"/>"#);
        } else {
            write_run(xml, &text, style)?;
        }
        write!(
            xml,
            r#"</a:p></a:txBody><a:tcPr marL="{0}" marR="{0}" marT="0" marB="0" anchor="ctr">"#,
            emu(6.0)
        )?;
        for side in ["lnL", "lnR", "lnT", "lnB"] {
            write!(xml, r#"<a:{0} w="{1}">{2}</a:{0}>"#, side, emu(0.75), border)?;
        }
        write!(xml, "{}</a:tcPr></a:tc>", solid_fill(fill))?;
    }
    xml.push_str("</a:tr>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::templates::resolve_theme;
    use crate::models::table::CellValue;

    fn table(columns: usize) -> Table {
        Table {
            headers: (0..columns).map(|c| format!("H{}", c)).collect(),
            rows: vec![(0..columns).map(|c| CellValue::Number(c as f64)).collect()],
            column_widths: None,
        }
    }

    #[test]
    fn too_many_columns_is_unsupported() {
        let theme = resolve_theme("modern", None, None);
        let frame = Rect::new(0.0, 0.0, 864.0, 352.0);
        assert!(matches!(
            build_table(&table(13), &frame, &theme),
            Err(PptxError::UnsupportedTable(_))
        ));
        assert!(matches!(
            build_table(&Table::default(), &frame, &theme),
            Err(PptxError::UnsupportedTable(_))
        ));
    }

    #[test]
    fn grid_columns_follow_relative_widths() {
        let theme = resolve_theme("modern", None, None);
        let mut t = table(2);
        t.column_widths = Some(vec![1.0, 3.0]);
        let xml = build_table(&t, &Rect::new(0.0, 0.0, 400.0, 352.0), &theme).unwrap();
        assert!(xml.contains(&format!(r#"<a:gridCol w="{}"/>"#, emu(100.0))));
        assert!(xml.contains(&format!(r#"<a:gridCol w="{}"/>"#, emu(300.0))));
        assert_eq!(xml.matches("<a:tr ").count(), 2);
        assert!(xml.contains("<a:t>H1</a:t>"));
    }
}
