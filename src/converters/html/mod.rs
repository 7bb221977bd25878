//! Markup backend and the Hi-Fi PDF built from it.
//!
//! `render_html` serializes the whole deck into one self-contained document: an inline
//! stylesheet carrying the theme as custom properties (plus `@font-face` rules for remote
//! fonts), then one 1280 x 720 px `section` per slide with every frame absolutely
//! positioned from the shared layout. Charts come from the shared geometry: bars as
//! percentage-positioned blocks, lines and wedges as inline SVG.
//!
//! `render_hifi_pdf` hands that document to the configured headless-browser strategies.
//! If none of them succeeds the render fails; it never substitutes the vector PDF.

pub mod browser;
mod chart;
mod constants;
mod error;
mod structure;
mod styles;
mod utils;

pub use browser::{BrowserError, BrowserStrategy};
pub use error::{HtmlError, Result};

use std::fmt::Write;

use log::info;

use crate::converters::utils::escape_xml;
use crate::engine::geometry::GeometryOptions;
use crate::engine::prepare::PreparedDeck;
use crate::errors::DeckError;
use crate::media::ImageCache;
use crate::models::deck::ExportFormat;
use constants::HTML_DOCTYPE;
use structure::{write_slide, write_title_slide, HtmlContext};
use styles::write_stylesheet;

/// Renders a prepared deck into a standalone HTML document.
///
/// # Arguments
///
/// * `deck` - The prepared deck.
/// * `images` - Images loaded for the deck; they are inlined as data URIs.
/// * `options` - Geometry thresholds shared with the other backends.
///
/// # Returns
///
/// The document text, or an `HtmlError` if formatting fails.
pub fn render_html(
    deck: &PreparedDeck,
    images: &ImageCache,
    options: &GeometryOptions,
) -> Result<String> {
    let mut html = String::with_capacity(16 * 1024);
    let ctx = HtmlContext {
        theme: &deck.theme,
        images,
        options,
    };

    // 1. Head with the stylesheet
    writeln!(html, "{}", HTML_DOCTYPE)?;
    writeln!(html, r#"<html lang="en"><head><meta charset="utf-8">"#)?;
    writeln!(html, "<title>{}</title>", escape_xml(&deck.topic))?;
    html.push_str("<style>\n");
    write_stylesheet(&mut html, &deck.theme)?;
    html.push_str("</style></head>\n<body>\n");

    // 2. Title slide, then the content slides
    write_title_slide(&mut html, deck)?;
    for slide in &deck.slides {
        write_slide(&mut html, &ctx, slide)?;
    }
    html.push_str("</body></html>\n");

    info!(
        "Rendered HTML for '{}': {} slides, {} bytes",
        deck.topic,
        deck.slides.len() + 1,
        html.len()
    );
    Ok(html)
}

/// Renders a prepared deck to PDF through a headless browser.
///
/// Strategies are tried in order and the first successful one wins. When all of them
/// fail the error is `DeckError::Browser`, distinct from content errors.
pub async fn render_hifi_pdf(
    deck: &PreparedDeck,
    images: &ImageCache,
    options: &GeometryOptions,
    strategies: &[Box<dyn BrowserStrategy>],
) -> crate::errors::Result<Vec<u8>> {
    let html = render_html(deck, images, options)
        .map_err(|e| DeckError::render(ExportFormat::HifiPdf, e.to_string()))?;
    let bytes = browser::print_to_pdf(&html, strategies).await?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::browser::tests::FakeStrategy;
    use super::*;
    use crate::engine::prepare::prepare_deck;
    use crate::models::chart::{Chart, ChartKind};
    use crate::models::deck::DeckRequest;
    use crate::models::slide::{LayoutKind, Slide};

    fn prepared(request: &DeckRequest) -> PreparedDeck {
        prepare_deck(&request.resolve().unwrap())
    }

    #[test]
    fn one_section_per_slide_after_the_title() {
        let request = DeckRequest::new(
            "Launch <plan>",
            vec![
                Slide::new("Why", vec!["- Growth".into()]),
                Slide::new("How", vec!["- Focus".into()]),
            ],
        );
        let html = render_html(&prepared(&request), &ImageCache::new(), &GeometryOptions::default())
            .unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("<section class=\"slide").count(), 3);
        assert!(html.contains("<title>Launch &lt;plan&gt;</title>"));
        assert!(html.contains(r#"data-layout="text""#));
    }

    #[test]
    fn chart_slides_embed_bars() {
        let mut slide = Slide::new("Revenue", vec![]);
        slide.layout = LayoutKind::ChartRight;
        slide.chart = Some(Chart::single_series(
            ChartKind::Bar,
            vec!["Q1".into(), "Q2".into()],
            "Revenue",
            vec![10.0, 20.0],
        ));
        let request = DeckRequest::new("Numbers", vec![slide]);
        let html = render_html(&prepared(&request), &ImageCache::new(), &GeometryOptions::default())
            .unwrap();
        assert_eq!(html.matches(r#"<div class="bar""#).count(), 2);
        assert!(!html.contains("Chart data unavailable"));
    }

    #[tokio::test]
    async fn hifi_pdf_uses_the_fallback_engine() {
        let request = DeckRequest::new("Deck", vec![Slide::new("One", vec![])]);
        let strategies = vec![
            FakeStrategy::boxed("broken", None),
            FakeStrategy::boxed("working", Some(b"%PDF-1.4 fake".as_slice())),
        ];
        let bytes = render_hifi_pdf(
            &prepared(&request),
            &ImageCache::new(),
            &GeometryOptions::default(),
            &strategies,
        )
        .await
        .unwrap();
        assert_eq!(bytes, b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn hifi_pdf_failure_is_a_browser_error() {
        let request = DeckRequest::new("Deck", vec![Slide::new("One", vec![])]);
        let strategies = vec![FakeStrategy::boxed("broken", None)];
        let err = render_hifi_pdf(
            &prepared(&request),
            &ImageCache::new(),
            &GeometryOptions::default(),
            &strategies,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            DeckError::Browser(BrowserError::AllStrategiesFailed(_))
        ));
        assert!(err.is_infrastructure());
    }
}
