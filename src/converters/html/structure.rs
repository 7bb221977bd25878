//! Slide markup: one absolutely positioned block per frame of the resolved layout.

use std::fmt::Write;

use log::{debug, warn};

use super::chart::write_chart;
use super::error::Result;
use super::utils::{box_style, px};
use crate::converters::utils::*;
use crate::engine::geometry::GeometryOptions;
use crate::engine::layout::{
    EffectiveLayout, Rect, CAPTION_BAND, CAPTION_BAND_ALPHA, TITLE_SLIDE_HEADING,
    TITLE_SLIDE_SUBTITLE,
};
use crate::engine::prepare::{MetricCard, PreparedDeck, PreparedSlide, QuoteBlock};
use crate::media::ImageCache;
use crate::models::colors::Color;
use crate::models::table::Table;
use crate::models::theme::Theme;

const ORIGIN: (f64, f64) = (0.0, 0.0);

/// Shared state while writing the slides of one document.
pub(crate) struct HtmlContext<'a> {
    pub theme: &'a Theme,
    pub images: &'a ImageCache,
    pub options: &'a GeometryOptions,
}

impl HtmlContext<'_> {
    /// `src` of an image: the inlined data URI when it was loaded, the remote URL
    /// otherwise so the browser can still try it. Anything else yields `None`.
    fn image_source(&self, url: &str) -> Option<String> {
        if let Some(asset) = self.images.get(url) {
            return Some(asset.to_data_uri());
        }
        let remote = url.starts_with("https://") || url.starts_with("http://");
        remote.then(|| url.to_string())
    }
}

fn open_frame(html: &mut String, class: &str, rect: &Rect) -> Result<()> {
    write!(html, r#"<div class="frame {}" style="{}">"#, class, box_style(rect, ORIGIN))?;
    Ok(())
}

fn text_frame(html: &mut String, class: &str, rect: &Rect, text: &str) -> Result<()> {
    open_frame(html, class, rect)?;
    html.push_str(&escape_xml(text));
    html.push_str("</div>");
    Ok(())
}

/// Writes the leading title slide.
pub(crate) fn write_title_slide(html: &mut String, deck: &PreparedDeck) -> Result<()> {
    html.push_str(r#"<section class="slide title-slide">"#);
    text_frame(html, "text bottom center deck-title", &TITLE_SLIDE_HEADING, &deck.topic)?;
    if let Some(subtitle) = &deck.subtitle {
        text_frame(html, "text center deck-subtitle", &TITLE_SLIDE_SUBTITLE, subtitle)?;
    }
    html.push_str("</section>\n");
    Ok(())
}

fn write_bullets(
    html: &mut String,
    frame: &Rect,
    items: &[String],
    numbered: bool,
    start_at: usize,
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    open_frame(html, "body", frame)?;
    if numbered {
        write!(html, r#"<ol class="bullets" start="{}">"#, start_at)?;
    } else {
        html.push_str(r#"<ul class="bullets">"#);
    }
    for item in items {
        write!(html, "<li>{}</li>", escape_xml(item))?;
    }
    html.push_str(if numbered { "</ol>" } else { "</ul>" });
    html.push_str("</div>");
    Ok(())
}

/// Bullet text of the slide: one or two columns, or the list standing in for a table
/// that cannot be drawn.
///
/// # Returns
///
/// Whether the table frame was used for a list.
fn write_slide_bullets(html: &mut String, slide: &PreparedSlide) -> Result<bool> {
    let frames = &slide.frames;
    let list = &slide.bullets;
    if let (Some(left), Some(right)) = (frames.body, frames.body_secondary) {
        let (first, second) = list.split_columns();
        write_bullets(html, &left, first, list.numbered, 1)?;
        write_bullets(html, &right, second, list.numbered, first.len() + 1)?;
        return Ok(false);
    }
    if let Some(body) = frames.body {
        write_bullets(html, &body, &list.items, list.numbered, 1)?;
        return Ok(false);
    }
    let Some(frame) = frames.table else {
        return Ok(false);
    };
    let drawable = slide
        .table
        .as_ref()
        .is_some_and(|t| (1..=MAX_TABLE_COLUMNS).contains(&t.column_count()));
    if drawable {
        return Ok(false);
    }
    if let Some(table) = &slide.table {
        warn!(
            "Slide {}: table with {} columns cannot be drawn; falling back to a list",
            slide.index + 1,
            table.column_count()
        );
    }
    if !list.is_empty() {
        write_bullets(html, &frame, &list.items, list.numbered, 1)?;
    } else {
        let lines = slide.table.as_ref().map(table_as_bullets).unwrap_or_default();
        write_bullets(html, &frame, &lines, false, 1)?;
    }
    Ok(true)
}

fn write_placeholder(html: &mut String, frame: &Rect, text: &str) -> Result<()> {
    text_frame(html, "placeholder", frame, text)
}

fn write_image(html: &mut String, ctx: &HtmlContext, url: Option<&str>, frame: &Rect) -> Result<()> {
    match url.and_then(|u| ctx.image_source(u)) {
        Some(src) => {
            open_frame(html, "media", frame)?;
            write!(html, r#"<img class="cover" src="{}" alt="">"#, escape_xml(&src))?;
            html.push_str("</div>");
            Ok(())
        }
        None => write_placeholder(html, frame, ""),
    }
}

fn write_icons(html: &mut String, ctx: &HtmlContext, slide: &PreparedSlide) -> Result<()> {
    let Some(strip) = slide.frames.icons else {
        return Ok(());
    };
    for (url, cell) in slide.icons.iter().zip(icon_cells(&strip, slide.icons.len())) {
        let Some(src) = ctx.image_source(url) else {
            continue;
        };
        // Cached icons are placed exactly; remote ones are letterboxed by the browser.
        let rect = ctx
            .images
            .get(url)
            .map(|asset| contain_rect(asset.aspect_ratio(), &cell))
            .unwrap_or(cell);
        open_frame(html, "icon", &rect)?;
        write!(html, r#"<img class="contain" src="{}" alt="">"#, escape_xml(&src))?;
        html.push_str("</div>");
    }
    Ok(())
}

fn write_chart_frame(html: &mut String, ctx: &HtmlContext, slide: &PreparedSlide, frame: &Rect) -> Result<()> {
    match slide.chart().filter(|chart| !chart.is_empty()) {
        Some(chart) => {
            open_frame(html, "chart", frame)?;
            write_chart(html, chart, frame, ctx.theme, ctx.options)?;
            html.push_str("</div>");
            Ok(())
        }
        None => {
            debug!("Slide {}: no chart data, writing placeholder", slide.index + 1);
            write_placeholder(html, frame, CHART_PLACEHOLDER_TEXT)
        }
    }
}

fn write_table(html: &mut String, table: &Table, frame: &Rect, theme: &Theme) -> Result<()> {
    let widths = table.column_extents(frame.width);
    let rows = visible_table_rows(table, frame);
    open_frame(html, "table", frame)?;
    html.push_str(r#"<table class="data-table"><colgroup>"#);
    for width in &widths {
        write!(html, r#"<col style="width:{}">"#, px(*width))?;
    }
    html.push_str("</colgroup>");
    if !table.headers.is_empty() {
        html.push_str("<thead><tr>");
        for column in 0..widths.len() {
            write!(html, "<th>{}</th>", escape_xml(table.header_text(column)))?;
        }
        html.push_str("</tr></thead>");
    }
    html.push_str("<tbody>");
    for row in 0..rows {
        write!(
            html,
            r#"<tr style="background:{}">"#,
            table_row_fill(theme, row).to_css_hex()
        )?;
        for column in 0..widths.len() {
            write!(html, "<td>{}</td>", escape_xml(&table.cell_text(row, column)))?;
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");
    Ok(())
}

fn write_metrics(html: &mut String, cards: &[MetricCard], frame: &Rect) -> Result<()> {
    open_frame(html, "metrics", frame)?;
    for card in cards {
        write!(
            html,
            r#"<div class="card"><div class="value">{}</div><div class="label">{}</div></div>"#,
            escape_xml(&card.display),
            escape_xml(&card.label)
        )?;
    }
    html.push_str("</div>");
    Ok(())
}

fn write_quote(html: &mut String, slide: &PreparedSlide, quote: &QuoteBlock) -> Result<()> {
    let Some(frame) = slide.frames.quote else {
        return Ok(());
    };
    open_frame(html, "accent", &Rect::new(frame.x - 20.0, frame.y, 4.0, frame.height))?;
    html.push_str("</div>");
    text_frame(
        html,
        "text middle quote",
        &frame,
        &format!("\u{201C}{}\u{201D}", quote.text),
    )?;
    if let Some(attribution) = &quote.attribution {
        text_frame(
            html,
            "text attribution",
            &slide.frames.title,
            &format!("\u{2014} {}", attribution),
        )?;
    }
    Ok(())
}

/// Writes one prepared slide as a `section`.
pub(crate) fn write_slide(html: &mut String, ctx: &HtmlContext, slide: &PreparedSlide) -> Result<()> {
    let frames = &slide.frames;
    write!(
        html,
        r#"<section class="slide" data-layout="{}">"#,
        slide.layout
    )?;

    match slide.layout {
        EffectiveLayout::ImageFull => {
            if let Some(frame) = frames.image {
                write_image(html, ctx, slide.image_url.as_deref(), &frame)?;
            }
            write!(
                html,
                r#"<div class="frame" style="{};background:{}"></div>"#,
                box_style(&CAPTION_BAND, ORIGIN),
                Color::BLACK.to_css_rgba(CAPTION_BAND_ALPHA)
            )?;
            text_frame(html, "text middle title caption", &frames.title, &slide.title)?;
        }
        EffectiveLayout::Quote => {
            if let Some(quote) = &slide.quote {
                write_quote(html, slide, quote)?;
            }
        }
        EffectiveLayout::TitleOnly => {
            text_frame(html, "text middle center title title-only", &frames.title, &slide.title)?;
        }
        _ => {
            text_frame(html, "text middle title", &frames.title, &slide.title)?;
            let table_as_list = write_slide_bullets(html, slide)?;
            if let Some(frame) = frames.image {
                write_image(html, ctx, slide.image_url.as_deref(), &frame)?;
            }
            if let Some(frame) = frames.chart {
                write_chart_frame(html, ctx, slide, &frame)?;
            }
            if let (Some(frame), Some(table), false) = (frames.table, slide.table.as_ref(), table_as_list) {
                write_table(html, table, &frame, ctx.theme)?;
            }
            if let Some(frame) = frames.metrics {
                write_metrics(html, &slide.metrics, &frame)?;
            }
        }
    }

    write_icons(html, ctx, slide)?;
    html.push_str("</section>\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::prepare::prepare_deck;
    use crate::models::deck::DeckRequest;
    use crate::models::slide::{LayoutKind, Slide};
    use crate::models::table::CellValue;

    fn slide_html(slide: Slide) -> String {
        let deck = prepare_deck(&DeckRequest::new("Deck", vec![slide]).resolve().unwrap());
        let images = ImageCache::new();
        let options = GeometryOptions::default();
        let ctx = HtmlContext {
            theme: &deck.theme,
            images: &images,
            options: &options,
        };
        let mut html = String::new();
        write_slide(&mut html, &ctx, &deck.slides[0]).unwrap();
        html
    }

    #[test]
    fn two_columns_continue_numbering() {
        let mut slide = Slide::new(
            "Steps",
            vec!["1. One".into(), "2. Two".into(), "3. Three".into()],
        );
        slide.layout = LayoutKind::TwoColumn;
        let html = slide_html(slide);
        assert!(html.contains(r#"<ol class="bullets" start="1"><li>One</li><li>Two</li></ol>"#));
        assert!(html.contains(r#"<ol class="bullets" start="3"><li>Three</li></ol>"#));
    }

    #[test]
    fn wide_tables_fall_back_to_bullets() {
        let mut slide = Slide::new("Wide", vec![]);
        slide.layout = LayoutKind::Table;
        slide.table = Some(Table {
            headers: (0..13).map(|i| format!("C{}", i)).collect(),
            rows: vec![(0..13).map(|i| CellValue::Number(i as f64)).collect()],
            column_widths: None,
        });
        let html = slide_html(slide);
        assert!(!html.contains("data-table"));
        assert!(html.contains("<li>C0 | C1 |"));
    }

    #[test]
    fn missing_images_become_placeholders() {
        let mut slide = Slide::new("Photo", vec!["- caption".into()]);
        slide.image_url = Some("file:///nowhere.png".into());
        slide.layout = LayoutKind::ImageRight;
        let html = slide_html(slide);
        assert!(html.contains(r#"class="frame placeholder""#));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn remote_images_are_left_for_the_browser() {
        let mut slide = Slide::new("Photo", vec![]);
        slide.image_url = Some("https://img.example/a.png?x=1&y=2".into());
        slide.layout = LayoutKind::ImageFull;
        let html = slide_html(slide);
        assert!(html.contains(r#"src="https://img.example/a.png?x=1&amp;y=2""#));
        assert!(html.contains("background:rgba(0, 0, 0, 0.55)"));
    }
}
