//! Document assembly and per-layout page drawing.

use std::collections::HashMap;

use log::{debug, warn};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::canvas::{Align, Canvas, VAlign};
use super::chart::draw_chart;
use super::constants::{BAND_STATE, PDF_VERSION};
use super::error::Result;
use super::table::draw_table;
use super::text::{to_win_ansi, wrap_text, PdfFont, TextStyle};
use crate::converters::utils::*;
use crate::engine::geometry::GeometryOptions;
use crate::engine::layout::{
    EffectiveLayout, Rect, CAPTION_BAND, CAPTION_BAND_ALPHA, SLIDE_HEIGHT, SLIDE_WIDTH,
    TITLE_SLIDE_HEADING, TITLE_SLIDE_SUBTITLE,
};
use crate::engine::prepare::{MetricCard, PreparedDeck, PreparedSlide, QuoteBlock};
use crate::media::ImageCache;
use crate::models::colors::Color;
use crate::models::theme::Theme;

const PAGE: Rect = Rect::new(0.0, 0.0, SLIDE_WIDTH, SLIDE_HEIGHT);

/// Owns the object graph: fonts, shared resources, image XObjects and the page tree.
pub(crate) struct PdfBuilder<'a> {
    document: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    font_ids: Vec<(PdfFont, ObjectId)>,
    page_ids: Vec<ObjectId>,
    xobjects: Vec<(String, ObjectId)>,
    /// Image XObject name and aspect ratio per URL; `None` when the image is unusable.
    embedded: HashMap<String, Option<(String, f64)>>,
    images: &'a ImageCache,
    pub theme: &'a Theme,
    pub options: &'a GeometryOptions,
}

impl<'a> PdfBuilder<'a> {
    pub(crate) fn new(
        title: &str,
        theme: &'a Theme,
        images: &'a ImageCache,
        options: &'a GeometryOptions,
    ) -> Self {
        let mut document = Document::with_version(PDF_VERSION);
        let pages_id = document.new_object_id();
        let resources_id = document.new_object_id();

        let font_ids = PdfFont::ALL
            .iter()
            .map(|font| {
                let id = document.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => font.base_font(),
                    "Encoding" => "WinAnsiEncoding",
                });
                (*font, id)
            })
            .collect();

        let catalog_id = document.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        document.trailer.set("Root", catalog_id);
        let info_id = document.add_object(dictionary! {
            "Title" => Object::String(to_win_ansi(title), StringFormat::Literal),
            "Producer" => Object::String(b"deck-render".to_vec(), StringFormat::Literal),
        });
        document.trailer.set("Info", info_id);

        PdfBuilder {
            document,
            pages_id,
            resources_id,
            font_ids,
            page_ids: Vec::new(),
            xobjects: Vec::new(),
            embedded: HashMap::new(),
            images,
            theme,
            options,
        }
    }

    pub(crate) fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// A fresh page canvas painted with `background`.
    pub(crate) fn begin_page(&self, background: Color) -> Canvas {
        let mut canvas = Canvas::new();
        canvas.fill_rect(&PAGE, background);
        canvas
    }

    pub(crate) fn add_page(&mut self, canvas: Canvas) -> Result<()> {
        let content = canvas.into_content();
        let content_id = self
            .document
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (SLIDE_WIDTH as f32).into(), (SLIDE_HEIGHT as f32).into()],
            "Contents" => content_id,
            "Resources" => self.resources_id,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    /// Registers the image at `url` as an XObject once and returns its resource name and
    /// aspect ratio. Missing or undecodable images yield `None`.
    pub(crate) fn image_xobject(&mut self, url: &str) -> Option<(String, f64)> {
        if let Some(known) = self.embedded.get(url) {
            return known.clone();
        }
        let images = self.images;
        let entry = match images.get(url).map(|asset| (asset.decode_rgb(), asset.aspect_ratio())) {
            Some((Ok(pixels), aspect)) => {
                let mut stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => pixels.width as i64,
                        "Height" => pixels.height as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                    },
                    pixels.data,
                );
                if let Err(e) = stream.compress() {
                    debug!("Keeping image {} uncompressed: {}", url, e);
                }
                let id = self.document.add_object(stream);
                let name = format!("Im{}", self.xobjects.len() + 1);
                self.xobjects.push((name.clone(), id));
                Some((name, aspect))
            }
            Some((Err(e), _)) => {
                warn!("Skipping image {}: {}", url, e);
                None
            }
            None => None,
        };
        self.embedded.insert(url.to_string(), entry.clone());
        entry
    }

    /// Writes the shared resources and the page tree, then serializes the document.
    pub(crate) fn finish(mut self) -> Result<Vec<u8>> {
        let mut fonts = Dictionary::new();
        for (font, id) in &self.font_ids {
            fonts.set(font.resource_name(), *id);
        }
        let mut xobjects = Dictionary::new();
        for (name, id) in &self.xobjects {
            xobjects.set(name.as_bytes().to_vec(), *id);
        }
        let band_alpha = CAPTION_BAND_ALPHA as f32;
        let resources = dictionary! {
            "Font" => fonts,
            "XObject" => xobjects,
            "ExtGState" => dictionary! {
                BAND_STATE => dictionary! { "Type" => "ExtGState", "ca" => band_alpha, "CA" => band_alpha },
            },
        };
        self.document
            .objects
            .insert(self.resources_id, Object::Dictionary(resources));

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::from(*id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

// --- Bullet flow ---

/// One wrapped bullet line placed relative to the top of its frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlacedLine {
    /// Marker drawn before the first line of an item.
    pub marker: Option<String>,
    pub text: String,
    pub top: f64,
}

fn bullet_indent() -> f64 {
    BODY_SIZE * 1.4
}

/// Wraps bullet items into `frame` and splits them into pages of lines.
///
/// Items are separated by the bullet spacing. A line that would cross the frame bottom
/// starts the next page, so an item may continue on the following page.
pub(crate) fn flow_bullets(
    items: &[String],
    numbered: bool,
    start_at: usize,
    frame: &Rect,
) -> Vec<Vec<PlacedLine>> {
    let line_height = BODY_SIZE * LINE_SPACING;
    let width = frame.width - bullet_indent();
    let mut pages = Vec::new();
    let mut current: Vec<PlacedLine> = Vec::new();
    let mut y = 0.0;

    for (i, item) in items.iter().enumerate() {
        let marker = if numbered {
            format!("{}.", start_at + i)
        } else {
            "\u{2022}".to_string()
        };
        for (j, line) in wrap_text(item, PdfFont::Regular, BODY_SIZE, width)
            .into_iter()
            .enumerate()
        {
            if y + line_height > frame.height && !current.is_empty() {
                pages.push(std::mem::take(&mut current));
                y = 0.0;
            }
            current.push(PlacedLine {
                marker: (j == 0).then(|| marker.clone()),
                text: line,
                top: y,
            });
            y += line_height;
        }
        y += BULLET_SPACING;
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

fn draw_placed_lines(canvas: &mut Canvas, frame: &Rect, lines: &[PlacedLine], theme: &Theme) {
    let text_style = TextStyle::new(PdfFont::Regular, BODY_SIZE, theme.text);
    let marker_style = TextStyle::new(PdfFont::Regular, BODY_SIZE, theme.primary);
    let leading = BODY_SIZE * (LINE_SPACING - 1.0) / 2.0;
    for line in lines {
        let top = frame.y + line.top + leading;
        if let Some(marker) = &line.marker {
            canvas.text_line(frame.x, top, marker, &marker_style);
        }
        canvas.text_line(frame.x + bullet_indent(), top, &line.text, &text_style);
    }
}

/// A text region and its lines, page by page.
struct Flow {
    frame: Rect,
    pages: Vec<Vec<PlacedLine>>,
}

// --- Page elements ---

fn placeholder(canvas: &mut Canvas, frame: &Rect, theme: &Theme) {
    canvas.fill_stroke_rect(frame, theme.border.tint(0.6), theme.border, 1.0);
}

/// Image cropped to cover `frame`, or an empty framed placeholder.
fn draw_image(canvas: &mut Canvas, builder: &mut PdfBuilder, url: Option<&str>, frame: &Rect) {
    let Some((name, aspect)) = url.and_then(|u| builder.image_xobject(u)) else {
        placeholder(canvas, frame, builder.theme);
        return;
    };
    let (left, top, right, bottom) = cover_crop(aspect, frame);
    let width = frame.width / (1.0 - left - right);
    let height = frame.height / (1.0 - top - bottom);
    let drawn = Rect::new(frame.x - left * width, frame.y - top * height, width, height);
    canvas.save();
    canvas.clip_rect(frame);
    canvas.image(&name, &drawn);
    canvas.restore();
}

fn draw_icons(canvas: &mut Canvas, builder: &mut PdfBuilder, slide: &PreparedSlide) {
    let Some(strip) = slide.frames.icons else {
        return;
    };
    for (url, cell) in slide.icons.iter().zip(icon_cells(&strip, slide.icons.len())) {
        if let Some((name, aspect)) = builder.image_xobject(url) {
            canvas.image(&name, &contain_rect(aspect, &cell));
        }
    }
}

fn draw_chart_frame(canvas: &mut Canvas, builder: &PdfBuilder, slide: &PreparedSlide, frame: &Rect) {
    match slide.chart().filter(|chart| !chart.is_empty()) {
        Some(chart) => draw_chart(canvas, chart, *frame, builder.theme, builder.options),
        None => {
            debug!("Slide {}: no chart data, drawing placeholder", slide.index + 1);
            let theme = builder.theme;
            placeholder(canvas, frame, theme);
            let style = TextStyle::new(PdfFont::Regular, PLACEHOLDER_SIZE, theme.text);
            canvas.text_block(frame, CHART_PLACEHOLDER_TEXT, &style, Align::Center, VAlign::Middle);
        }
    }
}

fn draw_metrics(canvas: &mut Canvas, cards: &[MetricCard], frame: &Rect, theme: &Theme) {
    let value_style = TextStyle::new(PdfFont::Bold, METRIC_VALUE_SIZE, theme.primary);
    let label_style = TextStyle::new(PdfFont::Regular, METRIC_LABEL_SIZE, theme.text);
    for (card, cell) in cards.iter().zip(frame.columns(3, 24.0)) {
        canvas.fill_stroke_rect(&cell, theme.primary.tint(0.92), theme.border, 1.0);
        let inner = cell.inset(16.0);
        let value_rect = Rect::new(inner.x, inner.y, inner.width, inner.height * 0.55);
        let label_rect = Rect::new(
            inner.x,
            value_rect.bottom(),
            inner.width,
            inner.height - value_rect.height,
        );
        if !card.display.is_empty() {
            canvas.text_block(&value_rect, &card.display, &value_style, Align::Center, VAlign::Bottom);
        }
        canvas.text_block(&label_rect, &card.label, &label_style, Align::Center, VAlign::Top);
    }
}

fn draw_quote(canvas: &mut Canvas, slide: &PreparedSlide, quote: &QuoteBlock, theme: &Theme) {
    let Some(frame) = slide.frames.quote else {
        return;
    };
    canvas.fill_rect(&Rect::new(frame.x - 20.0, frame.y, 4.0, frame.height), theme.primary);
    let style = TextStyle::new(PdfFont::Italic, QUOTE_SIZE, theme.title);
    canvas.text_block(
        &frame,
        &format!("\u{201C}{}\u{201D}", quote.text),
        &style,
        Align::Left,
        VAlign::Middle,
    );
    if let Some(attribution) = &quote.attribution {
        let style = TextStyle::new(PdfFont::Regular, ATTRIBUTION_SIZE, theme.text);
        canvas.text_block(
            &slide.frames.title,
            &format!("\u{2014} {}", attribution),
            &style,
            Align::Left,
            VAlign::Top,
        );
    }
}

fn draw_title(canvas: &mut Canvas, frame: &Rect, title: &str, theme: &Theme) {
    let style = TextStyle::new(PdfFont::Bold, TITLE_SIZE, theme.title);
    canvas.text_block(frame, title, &style, Align::Left, VAlign::Middle);
}

/// Draws the leading title page: topic and subtitle on the primary color.
pub(crate) fn draw_title_page(builder: &mut PdfBuilder, deck: &PreparedDeck) -> Result<()> {
    let theme = builder.theme;
    let mut canvas = builder.begin_page(theme.primary);
    let heading = TextStyle::new(PdfFont::Bold, TITLE_SLIDE_SIZE, theme.subtitle);
    canvas.text_block(&TITLE_SLIDE_HEADING, &deck.topic, &heading, Align::Center, VAlign::Bottom);
    if let Some(subtitle) = &deck.subtitle {
        let style = TextStyle::new(PdfFont::Regular, SUBTITLE_SIZE, theme.subtitle);
        canvas.text_block(&TITLE_SLIDE_SUBTITLE, subtitle, &style, Align::Center, VAlign::Top);
    }
    builder.add_page(canvas)
}

/// Bullet regions of a content slide. The table layout only gets one when its table
/// falls back to a list.
fn bullet_flows(slide: &PreparedSlide) -> Vec<Flow> {
    let frames = &slide.frames;
    let list = &slide.bullets;
    if let (Some(left), Some(right)) = (frames.body, frames.body_secondary) {
        let (first, second) = list.split_columns();
        return vec![
            Flow {
                frame: left,
                pages: flow_bullets(first, list.numbered, 1, &left),
            },
            Flow {
                frame: right,
                pages: flow_bullets(second, list.numbered, first.len() + 1, &right),
            },
        ];
    }
    if let Some(body) = frames.body {
        return vec![Flow {
            frame: body,
            pages: flow_bullets(&list.items, list.numbered, 1, &body),
        }];
    }
    if let Some(frame) = frames.table {
        let drawable = slide
            .table
            .as_ref()
            .is_some_and(|t| (1..=MAX_TABLE_COLUMNS).contains(&t.column_count()));
        if !drawable {
            if let Some(table) = &slide.table {
                warn!(
                    "Slide {}: table with {} columns cannot be drawn; falling back to a list",
                    slide.index + 1,
                    table.column_count()
                );
            }
            let pages = if !list.is_empty() {
                flow_bullets(&list.items, list.numbered, 1, &frame)
            } else {
                let lines = slide.table.as_ref().map(table_as_bullets).unwrap_or_default();
                flow_bullets(&lines, false, 1, &frame)
            };
            return vec![Flow { frame, pages }];
        }
    }
    Vec::new()
}

/// Draws one prepared slide.
///
/// Bullet text that overflows its frame continues on extra pages that repeat the title
/// and carry only the remaining lines.
///
/// # Returns
///
/// The number of pages the slide took.
pub(crate) fn draw_slide(builder: &mut PdfBuilder, slide: &PreparedSlide) -> Result<usize> {
    let theme = builder.theme;
    let frames = &slide.frames;
    let mut canvas = builder.begin_page(theme.background);
    let mut flows = Vec::new();

    match slide.layout {
        EffectiveLayout::ImageFull => {
            if let Some(frame) = frames.image {
                draw_image(&mut canvas, builder, slide.image_url.as_deref(), &frame);
            }
            canvas.save();
            canvas.graphics_state(BAND_STATE);
            canvas.fill_rect(&CAPTION_BAND, Color::BLACK);
            canvas.restore();
            let style = TextStyle::new(PdfFont::Bold, TITLE_SIZE, Color::WHITE);
            canvas.text_block(&frames.title, &slide.title, &style, Align::Left, VAlign::Middle);
        }
        EffectiveLayout::Quote => {
            if let Some(quote) = &slide.quote {
                draw_quote(&mut canvas, slide, quote, theme);
            }
        }
        EffectiveLayout::TitleOnly => {
            let style = TextStyle::new(PdfFont::Bold, TITLE_SLIDE_SIZE, theme.title);
            canvas.text_block(&frames.title, &slide.title, &style, Align::Center, VAlign::Middle);
        }
        _ => {
            draw_title(&mut canvas, &frames.title, &slide.title, theme);
            flows = bullet_flows(slide);
            if let Some(frame) = frames.image {
                draw_image(&mut canvas, builder, slide.image_url.as_deref(), &frame);
            }
            if let Some(frame) = frames.chart {
                draw_chart_frame(&mut canvas, builder, slide, &frame);
            }
            if let (Some(frame), Some(table)) = (frames.table, slide.table.as_ref()) {
                if flows.is_empty() {
                    draw_table(&mut canvas, table, &frame, theme);
                }
            }
            if let Some(frame) = frames.metrics {
                draw_metrics(&mut canvas, &slide.metrics, &frame, theme);
            }
        }
    }

    for flow in &flows {
        if let Some(lines) = flow.pages.first() {
            draw_placed_lines(&mut canvas, &flow.frame, lines, theme);
        }
    }
    draw_icons(&mut canvas, builder, slide);
    builder.add_page(canvas)?;

    let page_count = flows.iter().map(|f| f.pages.len()).max().unwrap_or(1).max(1);
    if page_count > 1 {
        debug!(
            "Slide {}: bullets continue on {} more page(s)",
            slide.index + 1,
            page_count - 1
        );
    }
    let continued = format!("{} (cont.)", slide.title);
    for page in 1..page_count {
        let mut canvas = builder.begin_page(theme.background);
        draw_title(&mut canvas, &frames.title, &continued, theme);
        for flow in &flows {
            if let Some(lines) = flow.pages.get(page) {
                draw_placed_lines(&mut canvas, &flow.frame, lines, theme);
            }
        }
        builder.add_page(canvas)?;
    }
    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullets_flow_onto_further_pages() {
        let frame = Rect::new(0.0, 0.0, 400.0, 100.0);
        let items: Vec<String> = (0..8).map(|i| format!("Point {}", i)).collect();
        let pages = flow_bullets(&items, true, 1, &frame);
        // 23.4pt lines plus 8pt spacing: three items per 100pt page.
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].len(), 3);
        assert_eq!(pages[1][0].marker.as_deref(), Some("4."));
        assert_eq!(pages[1][0].top, 0.0);
        assert!(pages.iter().flatten().all(|l| l.top + BODY_SIZE * LINE_SPACING <= 100.0));
    }

    #[test]
    fn continued_items_keep_one_marker() {
        let frame = Rect::new(0.0, 0.0, 120.0, 500.0);
        let pages = flow_bullets(
            &["a rather long bullet that wraps over several lines".to_string()],
            false,
            1,
            &frame,
        );
        let lines = &pages[0];
        assert!(lines.len() > 1);
        assert_eq!(lines.iter().filter(|l| l.marker.is_some()).count(), 1);
    }

    #[test]
    fn empty_lists_take_no_pages() {
        assert!(flow_bullets(&[], false, 1, &Rect::new(0.0, 0.0, 100.0, 100.0)).is_empty());
    }
}
