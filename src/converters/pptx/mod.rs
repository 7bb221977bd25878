//! Editable-document backend: writes a PresentationML (`.pptx`) package.
//!
//! The package is assembled by hand from XML templates inside a `zip` archive:
//! *   A 16:9 presentation (13.333in x 7.5in) with one master and one blank layout.
//! *   A theme part whose color scheme and fonts are the resolved deck theme.
//! *   A leading title slide, then one slide part per prepared slide.
//! *   Native chart parts (`c:chartSpace`) configured from the shared geometry, and native
//!     `a:tbl` tables.
//! *   Embedded images under `ppt/media/`.
//!
//! A chart that cannot be expressed natively becomes a placeholder rectangle; a table that
//! cannot becomes a plain bullet list.

mod chart;
mod constants;
mod error;
mod package;
mod shapes;
mod structure;
mod table;
mod utils;

pub use error::{PptxError, Result};

use log::{debug, info};

use crate::engine::geometry::GeometryOptions;
use crate::engine::prepare::PreparedDeck;
use crate::media::ImageCache;
use constants::{CT_CHART, CT_SLIDE};
use package::{write_fixed_parts, PackageWriter};
use structure::{build_slide, build_title_slide, DeckContext, SlidePart};

/// Renders a prepared deck into the bytes of a `.pptx` package.
///
/// # Arguments
///
/// * `deck` - The prepared deck (layouts, normalized text and charts already resolved).
/// * `images` - Images loaded for the deck; slides whose image is missing render without it.
/// * `options` - Geometry thresholds shared with the other backends.
///
/// # Returns
///
/// The zipped package, or a `PptxError` when the package itself cannot be written.
pub fn render_pptx(
    deck: &PreparedDeck,
    images: &ImageCache,
    options: &GeometryOptions,
) -> Result<Vec<u8>> {
    let mut package = PackageWriter::new();
    let mut ctx = DeckContext::new(&deck.theme, images, options);

    // 1. Build every slide first so the fixed parts know the slide count.
    let mut slides = Vec::with_capacity(deck.slides.len() + 1);
    slides.push(build_title_slide(deck, &mut ctx)?);
    for slide in &deck.slides {
        debug!("Building slide {} ({})", slide.index + 1, slide.layout);
        slides.push(build_slide(slide, &mut ctx)?);
    }

    // 2. Presentation, master, layout, theme and document properties.
    write_fixed_parts(&mut package, &deck.theme, &deck.topic, slides.len())?;

    // 3. Slide parts with their media and charts.
    let mut media_count = 0;
    let mut chart_count = 0;
    for (i, part) in slides.into_iter().enumerate() {
        let SlidePart {
            xml,
            rels,
            media,
            charts,
        } = part;
        let number = i + 1;
        package.add_part(&format!("ppt/slides/slide{}.xml", number), Some(CT_SLIDE), &xml)?;
        package.add_part(
            &format!("ppt/slides/_rels/slide{}.xml.rels", number),
            None,
            &rels.to_xml()?,
        )?;
        for item in media {
            package.add_media(&item.path, item.extension, item.mime_type, &item.bytes)?;
            media_count += 1;
        }
        for chart in charts {
            package.add_part(&chart.path, Some(CT_CHART), &chart.xml)?;
            chart_count += 1;
        }
    }

    let bytes = package.finish()?;
    info!(
        "Rendered PPTX for '{}': {} slides, {} images, {} charts, {} bytes",
        deck.topic,
        deck.slides.len() + 1,
        media_count,
        chart_count,
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::prepare::prepare_deck;
    use crate::models::chart::{Chart, ChartKind};
    use crate::models::deck::DeckRequest;
    use crate::models::slide::{LayoutKind, Slide};
    use std::io::{Cursor, Read};

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut text = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    fn sample_deck() -> PreparedDeck {
        let mut chart_slide = Slide::new("Growth", vec!["Revenue doubled".into()]);
        chart_slide.layout = LayoutKind::ChartRight;
        chart_slide.chart = Some(Chart::single_series(
            ChartKind::Pie,
            vec!["A".into(), "B".into()],
            "Share",
            vec![40.0, 60.0],
        ));
        let mut request = DeckRequest::new(
            "Quarterly Review",
            vec![Slide::new("Agenda", vec!["- One".into(), "- Two".into()]), chart_slide],
        );
        request.subtitle = Some("Q3 2026".to_string());
        prepare_deck(&request.resolve().unwrap())
    }

    #[test]
    fn package_contains_every_part() {
        let bytes = render_pptx(&sample_deck(), &ImageCache::new(), &GeometryOptions::default())
            .unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for expected in [
            "[Content_Types].xml",
            "_rels/.rels",
            "ppt/presentation.xml",
            "ppt/theme/theme1.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide3.xml",
            "ppt/slides/_rels/slide3.xml.rels",
            "ppt/charts/chart1.xml",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }

        let types = read_part(&bytes, "[Content_Types].xml");
        assert!(types.contains(r#"PartName="/ppt/charts/chart1.xml""#));
        assert!(types.contains(r#"PartName="/ppt/slides/slide3.xml""#));
    }

    #[test]
    fn title_slide_comes_first_on_primary() {
        let deck = sample_deck();
        let bytes = render_pptx(&deck, &ImageCache::new(), &GeometryOptions::default()).unwrap();
        let title = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(title.contains("<a:t>Quarterly Review</a:t>"));
        assert!(title.contains("<a:t>Q3 2026</a:t>"));
        assert!(title.contains(&format!(
            r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/>"#,
            deck.theme.primary.to_ooxml()
        )));

        let agenda = read_part(&bytes, "ppt/slides/slide2.xml");
        assert!(agenda.contains("<a:t>One</a:t>"));
        assert!(agenda.contains(r#"<a:buChar char="&#8226;"/>"#));
    }
}
