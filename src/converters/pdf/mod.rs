//! Vector-PDF backend: draws every slide with `lopdf` content-stream operators.
//!
//! Pages are 960 x 540 pt, the slide design space itself. Text uses the built-in
//! Helvetica faces with `WinAnsiEncoding`, so no font files are embedded. Charts are
//! drawn from the shared geometry with rectangles, polylines and Bézier wedges, and
//! raster images are embedded as `DeviceRGB` XObjects.

mod canvas;
mod chart;
mod constants;
mod error;
mod structure;
mod table;
mod text;

pub use error::{PdfError, Result};

use log::{debug, info};

use crate::engine::geometry::GeometryOptions;
use crate::engine::prepare::PreparedDeck;
use crate::media::ImageCache;
use structure::{draw_slide, draw_title_page, PdfBuilder};

/// Renders a prepared deck into PDF bytes.
///
/// # Arguments
///
/// * `deck` - The prepared deck.
/// * `images` - Images loaded for the deck; slides whose image is missing or cannot be
///   decoded render without it.
/// * `options` - Geometry thresholds shared with the other backends.
///
/// # Returns
///
/// The serialized document, or a `PdfError` when the object graph cannot be written.
pub fn render_pdf(
    deck: &PreparedDeck,
    images: &ImageCache,
    options: &GeometryOptions,
) -> Result<Vec<u8>> {
    let mut builder = PdfBuilder::new(&deck.topic, &deck.theme, images, options);

    // 1. Title page
    draw_title_page(&mut builder, deck)?;

    // 2. One or more pages per slide
    for slide in &deck.slides {
        let pages = draw_slide(&mut builder, slide)?;
        debug!(
            "Drew slide {} ({}) on {} page(s)",
            slide.index + 1,
            slide.layout,
            pages
        );
    }

    // 3. Resources, page tree and serialization
    let page_count = builder.page_count();
    let bytes = builder.finish()?;
    info!(
        "Rendered PDF for '{}': {} slides on {} pages, {} bytes",
        deck.topic,
        deck.slides.len() + 1,
        page_count,
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::prepare::prepare_deck;
    use crate::media::tests::tiny_png;
    use crate::media::ImageAsset;
    use crate::models::deck::DeckRequest;
    use crate::models::slide::{LayoutKind, Slide};
    use lopdf::content::Content;
    use lopdf::Document;

    fn render(request: &DeckRequest, images: &ImageCache) -> Document {
        let deck = prepare_deck(&request.resolve().unwrap());
        let bytes = render_pdf(&deck, images, &GeometryOptions::default()).unwrap();
        Document::load_mem(&bytes).unwrap()
    }

    fn page_text(doc: &Document, page_number: u32) -> String {
        let pages = doc.get_pages();
        let content = doc.get_page_content(pages[&page_number]).unwrap();
        let content = Content::decode(&content).unwrap();
        let mut text = Vec::new();
        for op in content.operations.iter().filter(|op| op.operator == "Tj") {
            if let Ok(bytes) = op.operands[0].as_str() {
                text.extend_from_slice(bytes);
                text.push(b'\n');
            }
        }
        String::from_utf8_lossy(&text).into_owned()
    }

    /// Numeric list markers (`"7."`) in drawing order.
    fn list_markers(text: &str) -> Vec<usize> {
        text.lines()
            .filter_map(|line| line.strip_suffix('.')?.parse().ok())
            .collect()
    }

    #[test]
    fn title_page_then_one_page_per_slide() {
        let request = DeckRequest::new(
            "Roadmap",
            vec![
                Slide::new("Now", vec!["- Ship".into()]),
                Slide::new("Next", vec!["- Scale".into()]),
            ],
        );
        let doc = render(&request, &ImageCache::new());
        assert_eq!(doc.get_pages().len(), 3);
        assert!(page_text(&doc, 1).contains("Roadmap"));
        assert!(page_text(&doc, 2).contains("Ship"));
        assert!(page_text(&doc, 3).contains("Next"));
    }

    #[test]
    fn pages_use_the_slide_design_size() {
        let request = DeckRequest::new("Size", vec![Slide::new("One", vec![])]);
        let doc = render(&request, &ImageCache::new());
        let pages = doc.get_pages();
        let page = doc.get_dictionary(pages[&1]).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 960.0);
        assert_eq!(media_box[3].as_float().unwrap(), 540.0);
    }

    #[test]
    fn overflowing_bullets_continue_on_a_new_page() {
        let bullets = (1..=30).map(|i| format!("{}. Step number {}", i, i)).collect();
        let request = DeckRequest::new("Plan", vec![Slide::new("Steps", bullets)]);
        let doc = render(&request, &ImageCache::new());
        assert!(doc.get_pages().len() >= 3);
        let continued = page_text(&doc, 3);
        assert!(continued.contains("Steps (cont.)"));

        let first_page = list_markers(&page_text(&doc, 2));
        let second_page = list_markers(&continued);
        assert_eq!(first_page.first(), Some(&1));
        let last_on_first = *first_page.last().unwrap();
        assert!(last_on_first < 30);
        assert_eq!(second_page.first(), Some(&(last_on_first + 1)));
        // Markers stay consecutive across the page break.
        let all: Vec<usize> = first_page.iter().chain(&second_page).copied().collect();
        assert!(all.windows(2).all(|w| w[1] == w[0] + 1));
        assert!(continued.contains(&format!("Step number {}", last_on_first + 1)));
    }

    #[test]
    fn images_are_embedded_as_xobjects() {
        let url = "https://img/photo.png".to_string();
        let mut images = ImageCache::new();
        images.insert(url.clone(), ImageAsset::from_bytes(tiny_png()).unwrap());
        let mut slide = Slide::new("Photo", vec!["caption".into()]);
        slide.image_url = Some(url);
        slide.layout = LayoutKind::ImageFull;

        let doc = render(&DeckRequest::new("Gallery", vec![slide]), &images);
        let images: Vec<_> = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                s.dict
                    .get(b"Subtype")
                    .and_then(|v| v.as_name())
                    .map(|n| n == b"Image")
                    .unwrap_or(false)
            })
            .collect();
        assert_eq!(images.len(), 1);
        let content = doc.get_page_content(doc.get_pages()[&2]).unwrap();
        let content = Content::decode(&content).unwrap();
        assert!(content.operations.iter().any(|op| op.operator == "Do"));
        assert!(content.operations.iter().any(|op| op.operator == "gs"));
    }
}
