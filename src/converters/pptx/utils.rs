use std::fmt::Write;

use super::constants::{EMU_PER_PT, FONT_SIZE_SCALE, PERCENT_SCALE};
use super::error::Result;
use crate::converters::utils::{escape_xml, BULLET_SPACING, LINE_SPACING};
use crate::engine::layout::Rect;
use crate::models::colors::Color;

/// Converts design points to EMU.
pub(crate) fn emu(pt: f64) -> i64 {
    (pt * EMU_PER_PT).round() as i64
}

/// Converts a 0.0..=1.0 fraction to DrawingML's thousandths of a percent.
pub(crate) fn percent(fraction: f64) -> i64 {
    (fraction * PERCENT_SCALE).round() as i64
}

/// Writes `<{prefix}:xfrm>` with offset and extent for `rect`.
pub(crate) fn write_xfrm(xml: &mut String, prefix: &str, rect: &Rect) -> Result<()> {
    write!(
        xml,
        r#"<{0}:xfrm><a:off x="{1}" y="{2}"/><a:ext cx="{3}" cy="{4}"/></{0}:xfrm>"#,
        prefix,
        emu(rect.x),
        emu(rect.y),
        emu(rect.width.max(0.0)),
        emu(rect.height.max(0.0))
    )?;
    Ok(())
}

pub(crate) fn solid_fill(color: Color) -> String {
    format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, color.to_ooxml())
}

pub(crate) fn solid_fill_alpha(color: Color, alpha: f64) -> String {
    format!(
        r#"<a:solidFill><a:srgbClr val="{}"><a:alpha val="{}"/></a:srgbClr></a:solidFill>"#,
        color.to_ooxml(),
        percent(alpha.clamp(0.0, 1.0))
    )
}

/// `<a:ln>` with a solid stroke, or a hidden stroke when `color` is `None`.
pub(crate) fn line(color: Option<Color>, width_pt: f64) -> String {
    match color {
        Some(color) => format!(r#"<a:ln w="{}">{}</a:ln>"#, emu(width_pt), solid_fill(color)),
        None => "<a:ln><a:noFill/></a:ln>".to_string(),
    }
}

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Center,
}

impl Align {
    fn as_ooxml(&self) -> &'static str {
        match self {
            Align::Left => "l",
            Align::Center => "ctr",
        }
    }
}

/// Character formatting of a run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunStyle<'a> {
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
    pub font: &'a str,
}

impl<'a> RunStyle<'a> {
    pub(crate) fn new(size: f64, color: Color, font: &'a str) -> Self {
        RunStyle {
            size,
            bold: false,
            italic: false,
            color,
            font,
        }
    }

    pub(crate) fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub(crate) fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// Writes `<a:rPr>` (or `<a:defRPr>` and friends via `tag`) for a run style.
pub(crate) fn write_run_properties(xml: &mut String, tag: &str, style: &RunStyle) -> Result<()> {
    write!(
        xml,
        r#"<a:{} lang="en-US" sz="{}" b="{}" i="{}" dirty="0">{}<a:latin typeface="{}"/></a:{}>"#,
        tag,
        (style.size * FONT_SIZE_SCALE).round() as i64,
        u8::from(style.bold),
        u8::from(style.italic),
        solid_fill(style.color),
        escape_xml(style.font),
        tag
    )?;
    Ok(())
}

/// Writes one run of text.
pub(crate) fn write_run(xml: &mut String, text: &str, style: &RunStyle) -> Result<()> {
    xml.push_str("<a:r>");
    write_run_properties(xml, "rPr", style)?;
    write!(xml, "<a:t>{}</a:t></a:r>", escape_xml(text))?;
    Ok(())
}

/// Line spacing pinned to the shared multiple of the font size.
fn write_line_spacing(xml: &mut String, size: f64) -> Result<()> {
    write!(
        xml,
        r#"<a:lnSpc><a:spcPts val="{}"/></a:lnSpc>"#,
        (size * LINE_SPACING * FONT_SIZE_SCALE).round() as i64
    )?;
    Ok(())
}

/// Writes a plain paragraph with a single run.
pub(crate) fn write_paragraph(
    xml: &mut String,
    text: &str,
    style: &RunStyle,
    align: Align,
) -> Result<()> {
    write!(xml, r#"<a:p><a:pPr algn="{}">"#, align.as_ooxml())?;
    write_line_spacing(xml, style.size)?;
    xml.push_str("<a:buNone/></a:pPr>");
    write_run(xml, text, style)?;
    xml.push_str("</a:p>");
    Ok(())
}

/// Writes a list of bullet paragraphs.
///
/// Numbered lists use PowerPoint's own auto-numbering starting at `start_at`, so editing
/// the deck renumbers correctly; other lists get a bullet glyph in `marker_color`.
pub(crate) fn write_bullets(
    xml: &mut String,
    items: &[String],
    numbered: bool,
    start_at: usize,
    style: &RunStyle,
    marker_color: Color,
) -> Result<()> {
    let indent = emu(style.size * 1.4);
    for item in items {
        write!(
            xml,
            r#"<a:p><a:pPr marL="{}" indent="-{}" algn="l">"#,
            indent, indent
        )?;
        write_line_spacing(xml, style.size)?;
        write!(
            xml,
            r#"<a:spcAft><a:spcPts val="{}"/></a:spcAft><a:buClr><a:srgbClr val="{}"/></a:buClr>"#,
            (BULLET_SPACING * FONT_SIZE_SCALE).round() as i64,
            marker_color.to_ooxml()
        )?;
        if numbered {
            write!(
                xml,
                r#"<a:buFont typeface="+mj-lt"/><a:buAutoNum type="arabicPeriod" startAt="{}"/>"#,
                start_at.max(1)
            )?;
        } else {
            xml.push_str(r#"<a:buFont typeface="Arial"/><a:buChar char="&#8226;"/>"#);
        }
        xml.push_str("</a:pPr>");
        write_run(xml, item, style)?;
        xml.push_str("</a:p>");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_points_to_emu() {
        assert_eq!(emu(960.0), 12_192_000);
        assert_eq!(emu(0.5), 6350);
        assert_eq!(percent(0.25), 25_000);
    }

    #[test]
    fn numbered_bullets_continue_from_start() {
        let mut xml = String::new();
        let style = RunStyle::new(18.0, Color::BLACK, "Calibri");
        write_bullets(&mut xml, &["b".to_string()], true, 4, &style, Color::WHITE).unwrap();
        assert!(xml.contains(r#"<a:buAutoNum type="arabicPeriod" startAt="4"/>"#));
        assert!(xml.contains(r#"sz="1800""#));
        assert!(xml.contains(r#"<a:spcPts val="2340"/>"#));
    }

    #[test]
    fn run_text_is_escaped() {
        let mut xml = String::new();
        let style = RunStyle::new(10.0, Color::BLACK, "A&B").bold();
        write_run(&mut xml, "<R&D>", &style).unwrap();
        assert!(xml.contains("<a:t>&lt;R&amp;D&gt;</a:t>"));
        assert!(xml.contains(r#"b="1""#));
        assert!(xml.contains(r#"typeface="A&amp;B""#));
    }
}
