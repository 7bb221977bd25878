//! Slide parts: background, shape tree and relationships for each prepared slide.

use std::fmt::Write;

use log::{debug, warn};

use super::chart::build_chart;
use super::constants::{DEFAULT_FONT, NS_A, NS_P, NS_R, REL_CHART, REL_IMAGE, REL_SLIDE_LAYOUT, XML_DECLARATION};
use super::error::{PptxError, Result};
use super::package::Relationships;
use super::shapes::{Anchor, ShapeStyle, ShapeTree};
use super::table::build_table;
use super::utils::{solid_fill, write_bullets, write_paragraph, Align, RunStyle};
use crate::converters::utils::*;
use crate::engine::geometry::GeometryOptions;
use crate::engine::layout::{
    EffectiveLayout, Rect, CAPTION_BAND, CAPTION_BAND_ALPHA, TITLE_SLIDE_HEADING,
    TITLE_SLIDE_SUBTITLE,
};
use crate::engine::prepare::{MetricCard, PreparedDeck, PreparedSlide, QuoteBlock};
use crate::media::ImageCache;
use crate::models::chart::Chart;
use crate::models::colors::Color;
use crate::models::table::Table;
use crate::models::theme::Theme;

/// An embedded media file.
#[derive(Debug, Clone)]
pub(crate) struct MediaPart {
    pub path: String,
    pub extension: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// A chart part.
#[derive(Debug, Clone)]
pub(crate) struct ChartPart {
    pub path: String,
    pub xml: String,
}

/// Everything one slide contributes to the package.
#[derive(Debug)]
pub(crate) struct SlidePart {
    pub xml: String,
    pub rels: Relationships,
    pub media: Vec<MediaPart>,
    pub charts: Vec<ChartPart>,
}

/// Deck-wide state shared while building slides: numbering of media and chart parts.
pub(crate) struct DeckContext<'a> {
    pub theme: &'a Theme,
    pub images: &'a ImageCache,
    pub options: &'a GeometryOptions,
    media_count: usize,
    chart_count: usize,
}

impl<'a> DeckContext<'a> {
    pub(crate) fn new(theme: &'a Theme, images: &'a ImageCache, options: &'a GeometryOptions) -> Self {
        DeckContext {
            theme,
            images,
            options,
            media_count: 0,
            chart_count: 0,
        }
    }
}

struct SlideBuilder<'c, 'a> {
    ctx: &'c mut DeckContext<'a>,
    tree: ShapeTree,
    rels: Relationships,
    media: Vec<MediaPart>,
    charts: Vec<ChartPart>,
    title_font: &'a str,
    body_font: &'a str,
}

impl<'c, 'a> SlideBuilder<'c, 'a> {
    fn new(ctx: &'c mut DeckContext<'a>) -> Self {
        let mut rels = Relationships::new();
        rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
        let theme: &'a Theme = ctx.theme;
        SlideBuilder {
            ctx,
            tree: ShapeTree::new(),
            rels,
            media: Vec::new(),
            charts: Vec::new(),
            title_font: theme.title_font_or(DEFAULT_FONT),
            body_font: theme.body_font_or(DEFAULT_FONT),
        }
    }

    fn theme(&self) -> &'a Theme {
        self.ctx.theme
    }

    fn finish(self, background: Color) -> Result<SlidePart> {
        let mut xml = String::new();
        writeln!(xml, "{}", XML_DECLARATION)?;
        write!(
            xml,
            r#"<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:bg><p:bgPr>{}<a:effectLst/></p:bgPr></p:bg>"#,
            NS_A,
            NS_R,
            NS_P,
            solid_fill(background)
        )?;
        xml.push_str(&self.tree.into_xml());
        xml.push_str("</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>");
        Ok(SlidePart {
            xml,
            rels: self.rels,
            media: self.media,
            charts: self.charts,
        })
    }

    /// Single-paragraph text box.
    fn text(
        &mut self,
        name: &str,
        rect: &Rect,
        text: &str,
        style: &RunStyle,
        align: Align,
        anchor: Anchor,
    ) -> Result<()> {
        let mut paragraphs = String::new();
        write_paragraph(&mut paragraphs, text, style, align)?;
        self.tree
            .text_box(name, rect, anchor, &paragraphs, ShapeStyle::none())
    }

    fn title(&mut self, slide: &PreparedSlide) -> Result<()> {
        if slide.title.is_empty() {
            return Ok(());
        }
        let theme = self.theme();
        let style = RunStyle::new(TITLE_SIZE, theme.title, self.title_font).bold();
        self.text(
            "Title",
            &slide.frames.title,
            &slide.title,
            &style,
            Align::Left,
            Anchor::Middle,
        )
    }

    fn bullets(&mut self, rect: &Rect, items: &[String], numbered: bool, start_at: usize) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let theme = self.theme();
        let style = RunStyle::new(BODY_SIZE, theme.text, self.body_font);
        let mut paragraphs = String::new();
        write_bullets(&mut paragraphs, items, numbered, start_at, &style, theme.primary)?;
        self.tree
            .text_box("Body", rect, Anchor::Top, &paragraphs, ShapeStyle::none())
    }

    /// Embeds an image once per slide part and returns its relationship id.
    fn embed(&mut self, url: &str) -> Option<(String, f64)> {
        let asset = self.ctx.images.get(url)?;
        self.ctx.media_count += 1;
        let name = format!("image{}.{}", self.ctx.media_count, asset.kind.extension());
        let rel_id = self.rels.add(REL_IMAGE, format!("../media/{}", name));
        self.media.push(MediaPart {
            path: format!("ppt/media/{}", name),
            extension: asset.kind.extension(),
            mime_type: asset.kind.mime_type(),
            bytes: asset.bytes.clone(),
        });
        Some((rel_id, asset.aspect_ratio()))
    }

    /// Slide image cropped to cover `frame`, or an empty framed placeholder.
    fn image(&mut self, url: Option<&str>, frame: &Rect) -> Result<()> {
        match url.and_then(|u| self.embed(u)) {
            Some((rel_id, aspect)) => {
                self.tree
                    .picture("Image", frame, &rel_id, cover_crop(aspect, frame))
            }
            None => {
                let theme = self.theme();
                self.tree.rect(
                    "Image Placeholder",
                    frame,
                    ShapeStyle::filled(theme.border.tint(0.6)).with_line(theme.border),
                )
            }
        }
    }

    fn icons(&mut self, slide: &PreparedSlide) -> Result<()> {
        let Some(strip) = slide.frames.icons else {
            return Ok(());
        };
        for (url, cell) in slide.icons.iter().zip(icon_cells(&strip, slide.icons.len())) {
            if let Some((rel_id, aspect)) = self.embed(url) {
                let rect = contain_rect(aspect, &cell);
                self.tree.picture("Icon", &rect, &rel_id, (0.0, 0.0, 0.0, 0.0))?;
            }
        }
        Ok(())
    }

    fn chart_placeholder(&mut self, frame: &Rect) -> Result<()> {
        let theme = self.theme();
        let style = RunStyle::new(PLACEHOLDER_SIZE, theme.text, self.body_font);
        let mut paragraph = String::new();
        write_paragraph(&mut paragraph, CHART_PLACEHOLDER_TEXT, &style, Align::Center)?;
        self.tree.text_box(
            "Chart Placeholder",
            frame,
            Anchor::Middle,
            &paragraph,
            ShapeStyle::filled(theme.border.tint(0.6)).with_line(theme.border),
        )
    }

    fn chart(&mut self, slide_number: usize, chart: Option<&Chart>, frame: &Rect) -> Result<()> {
        let Some(chart) = chart else {
            debug!("Slide {}: no chart data, drawing placeholder", slide_number);
            return self.chart_placeholder(frame);
        };
        let native = match build_chart(chart, *frame, self.theme(), self.ctx.options) {
            Ok(native) => native,
            Err(e @ PptxError::UnsupportedChart(_)) => {
                warn!("Slide {}: {}; drawing placeholder", slide_number, e);
                return self.chart_placeholder(frame);
            }
            Err(e) => return Err(e),
        };

        self.ctx.chart_count += 1;
        let name = format!("chart{}.xml", self.ctx.chart_count);
        let rel_id = self.rels.add(REL_CHART, format!("../charts/{}", name));
        self.charts.push(ChartPart {
            path: format!("ppt/charts/{}", name),
            xml: native.xml,
        });
        self.tree.chart("Chart", frame, &rel_id)?;

        let theme = self.theme();
        let style = RunStyle::new(CHART_LABEL_SIZE, theme.text, self.body_font).bold();
        for overlay in &native.overlays {
            self.text(
                "Total",
                &overlay.rect,
                &overlay.text,
                &style,
                Align::Center,
                Anchor::Bottom,
            )?;
        }
        Ok(())
    }

    fn table(&mut self, slide: &PreparedSlide, table: Option<&Table>, frame: &Rect) -> Result<()> {
        if let Some(table) = table {
            match build_table(table, frame, self.theme()) {
                Ok(xml) => return self.tree.table("Table", frame, &xml),
                Err(e @ PptxError::UnsupportedTable(_)) => {
                    warn!("Slide {}: {}; falling back to a list", slide.index + 1, e);
                }
                Err(e) => return Err(e),
            }
        }
        if !slide.bullets.is_empty() {
            return self.bullets(frame, &slide.bullets.items, slide.bullets.numbered, 1);
        }
        let lines = table.map(table_as_bullets).unwrap_or_default();
        self.bullets(frame, &lines, false, 1)
    }

    fn metrics(&mut self, cards: &[MetricCard], frame: &Rect) -> Result<()> {
        let theme = self.theme();
        let value_style = RunStyle::new(METRIC_VALUE_SIZE, theme.primary, self.title_font).bold();
        let label_style = RunStyle::new(METRIC_LABEL_SIZE, theme.text, self.body_font);
        for (card, cell) in cards.iter().zip(frame.columns(3, 24.0)) {
            self.tree.rect(
                "Metric Card",
                &cell,
                ShapeStyle::filled(theme.primary.tint(0.92)).with_line(theme.border),
            )?;
            let inner = cell.inset(16.0);
            let value_rect = Rect::new(inner.x, inner.y, inner.width, inner.height * 0.55);
            let label_rect = Rect::new(
                inner.x,
                value_rect.bottom(),
                inner.width,
                inner.height - value_rect.height,
            );
            if !card.display.is_empty() {
                self.text("Metric Value", &value_rect, &card.display, &value_style, Align::Center, Anchor::Bottom)?;
            }
            self.text("Metric Label", &label_rect, &card.label, &label_style, Align::Center, Anchor::Top)?;
        }
        Ok(())
    }

    fn quote(&mut self, slide: &PreparedSlide, quote: &QuoteBlock) -> Result<()> {
        let theme = self.theme();
        let Some(frame) = slide.frames.quote else {
            return Ok(());
        };
        self.tree.rect(
            "Quote Accent",
            &Rect::new(frame.x - 20.0, frame.y, 4.0, frame.height),
            ShapeStyle::filled(theme.primary),
        )?;
        let style = RunStyle::new(QUOTE_SIZE, theme.title, self.title_font).italic();
        self.text(
            "Quote",
            &frame,
            &format!("\u{201C}{}\u{201D}", quote.text),
            &style,
            Align::Left,
            Anchor::Middle,
        )?;
        if let Some(attribution) = &quote.attribution {
            let style = RunStyle::new(ATTRIBUTION_SIZE, theme.text, self.body_font);
            self.text(
                "Attribution",
                &slide.frames.title,
                &format!("\u{2014} {}", attribution),
                &style,
                Align::Left,
                Anchor::Top,
            )?;
        }
        Ok(())
    }
}

/// Builds the leading title slide: topic and subtitle on the primary color.
pub(crate) fn build_title_slide(deck: &PreparedDeck, ctx: &mut DeckContext) -> Result<SlidePart> {
    let theme = ctx.theme;
    let mut builder = SlideBuilder::new(ctx);
    let heading = RunStyle::new(TITLE_SLIDE_SIZE, theme.subtitle, builder.title_font).bold();
    builder.text(
        "Deck Title",
        &TITLE_SLIDE_HEADING,
        &deck.topic,
        &heading,
        Align::Center,
        Anchor::Bottom,
    )?;
    if let Some(subtitle) = &deck.subtitle {
        let style = RunStyle::new(SUBTITLE_SIZE, theme.subtitle, builder.body_font);
        builder.text(
            "Subtitle",
            &TITLE_SLIDE_SUBTITLE,
            subtitle,
            &style,
            Align::Center,
            Anchor::Top,
        )?;
    }
    builder.finish(theme.primary)
}

/// Builds one content slide for its effective layout.
///
/// Chart and table failures are recovered here with a placeholder or a plain list, so a
/// single bad element never fails the deck.
pub(crate) fn build_slide(slide: &PreparedSlide, ctx: &mut DeckContext) -> Result<SlidePart> {
    let theme = ctx.theme;
    let mut builder = SlideBuilder::new(ctx);
    let frames = &slide.frames;
    let number = slide.index + 1;

    match slide.layout {
        EffectiveLayout::ImageFull => {
            if let Some(frame) = frames.image {
                builder.image(slide.image_url.as_deref(), &frame)?;
            }
            builder.tree.rect(
                "Caption Band",
                &CAPTION_BAND,
                ShapeStyle::filled(Color::BLACK).with_alpha(CAPTION_BAND_ALPHA),
            )?;
            if !slide.title.is_empty() {
                let style = RunStyle::new(TITLE_SIZE, Color::WHITE, builder.title_font).bold();
                builder.text("Title", &frames.title, &slide.title, &style, Align::Left, Anchor::Middle)?;
            }
        }
        EffectiveLayout::Quote => {
            if let Some(quote) = &slide.quote {
                builder.quote(slide, quote)?;
            }
        }
        EffectiveLayout::TitleOnly => {
            let style = RunStyle::new(TITLE_SLIDE_SIZE, theme.title, builder.title_font).bold();
            builder.text("Title", &frames.title, &slide.title, &style, Align::Center, Anchor::Middle)?;
        }
        _ => {
            builder.title(slide)?;
            if let (Some(left), Some(right)) = (frames.body, frames.body_secondary) {
                let (first, second) = slide.bullets.split_columns();
                builder.bullets(&left, first, slide.bullets.numbered, 1)?;
                builder.bullets(&right, second, slide.bullets.numbered, first.len() + 1)?;
            } else if let Some(body) = frames.body {
                builder.bullets(&body, &slide.bullets.items, slide.bullets.numbered, 1)?;
            }
            if let Some(frame) = frames.image {
                builder.image(slide.image_url.as_deref(), &frame)?;
            }
            if let Some(frame) = frames.chart {
                builder.chart(number, slide.chart(), &frame)?;
            }
            if let Some(frame) = frames.table {
                builder.table(slide, slide.table.as_ref(), &frame)?;
            }
            if let Some(frame) = frames.metrics {
                builder.metrics(&slide.metrics, &frame)?;
            }
        }
    }

    builder.icons(slide)?;
    builder.finish(theme.background)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::prepare::prepare_slide;
    use crate::engine::templates::resolve_theme;
    use crate::media::tests::tiny_png;
    use crate::media::ImageAsset;
    use crate::models::chart::ChartKind;
    use crate::models::slide::{LayoutKind, Slide};
    use crate::models::table::CellValue;

    fn build(slide: &Slide, images: &ImageCache) -> SlidePart {
        let theme = resolve_theme("modern", None, None);
        let options = GeometryOptions::default();
        let mut ctx = DeckContext::new(&theme, images, &options);
        build_slide(&prepare_slide(0, slide), &mut ctx).unwrap()
    }

    #[test]
    fn numbered_two_column_continues_numbering() {
        let mut slide = Slide::new(
            "Steps",
            vec!["1. a".into(), "2. b".into(), "3. c".into()],
        );
        slide.layout = LayoutKind::TwoColumn;
        let part = build(&slide, &ImageCache::new());
        assert!(part.xml.contains(r#"startAt="1""#));
        assert!(part.xml.contains(r#"startAt="3""#));
    }

    #[test]
    fn images_are_embedded_with_relationships() {
        let url = "https://img/x.png".to_string();
        let mut images = ImageCache::new();
        images.insert(url.clone(), ImageAsset::from_bytes(tiny_png()).unwrap());
        let mut slide = Slide::new("Pic", vec!["a".into()]);
        slide.image_url = Some(url.clone());
        slide.icons = vec![url];

        let part = build(&slide, &images);
        assert_eq!(part.media.len(), 2);
        assert_eq!(part.media[0].path, "ppt/media/image1.png");
        assert!(part.xml.contains(r#"<a:blip r:embed="rId2"/>"#));
        assert!(part.rels.to_xml().unwrap().contains("../media/image2.png"));
    }

    #[test]
    fn missing_image_draws_a_placeholder_frame() {
        let mut slide = Slide::new("Pic", vec!["a".into()]);
        slide.image_url = Some("https://unreachable/x.png".into());
        let part = build(&slide, &ImageCache::new());
        assert!(part.media.is_empty());
        assert!(part.xml.contains("Image Placeholder"));
    }

    #[test]
    fn chart_without_data_draws_placeholder() {
        let mut slide = Slide::new("Chart", vec!["no numbers here".into()]);
        slide.layout = LayoutKind::ChartRight;
        let part = build(&slide, &ImageCache::new());
        assert!(part.charts.is_empty());
        assert!(part.xml.contains(CHART_PLACEHOLDER_TEXT));
    }

    #[test]
    fn structured_chart_becomes_a_chart_part() {
        let mut slide = Slide::new("Chart", vec![]);
        slide.layout = LayoutKind::ChartLeft;
        slide.chart = Some(Chart::single_series(
            ChartKind::Bar,
            vec!["a".into(), "b".into()],
            "s",
            vec![1.0, 2.0],
        ));
        let part = build(&slide, &ImageCache::new());
        assert_eq!(part.charts.len(), 1);
        assert_eq!(part.charts[0].path, "ppt/charts/chart1.xml");
        assert!(part.xml.contains(r#"<c:chart xmlns:c="#));
    }

    #[test]
    fn wide_table_falls_back_to_row_list() {
        let mut slide = Slide::new("Data", vec![]);
        slide.layout = LayoutKind::Table;
        slide.table = Some(Table {
            headers: Vec::new(),
            rows: vec![(0..14).map(|c| CellValue::Number(c as f64)).collect()],
            column_widths: None,
        });
        let part = build(&slide, &ImageCache::new());
        assert!(!part.xml.contains("<a:tbl>"));
        assert!(part.xml.contains("<a:t>0 | 1 | 2"));
    }

    #[test]
    fn quote_slide_shows_attribution() {
        let mut slide = Slide::new("Ada Lovelace", vec!["Imagination is discovery".into()]);
        slide.layout = LayoutKind::Quote;
        let part = build(&slide, &ImageCache::new());
        assert!(part.xml.contains("\u{201C}Imagination is discovery\u{201D}"));
        assert!(part.xml.contains("\u{2014} Ada Lovelace"));
    }
}
