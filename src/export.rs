//! Top-level rendering entry points: request in, finished artifact out.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::RenderConfig;
use crate::converters::html::browser::{strategies_from_config, BrowserStrategy};
use crate::converters::{html, pdf, pptx};
use crate::engine::prepare::{prepare_deck, PreparedDeck};
use crate::errors::{DeckError, Result};
use crate::media::{collect_images, ImageCache, ImageFetcher};
use crate::models::deck::{DeckRequest, ExportFormat};

/// Longest filename stem produced by [`sanitize_filename`].
pub const MAX_FILENAME_LEN: usize = 50;
/// Stem used when the topic has no usable characters.
pub const FALLBACK_FILENAME: &str = "presentation";

static UNSAFE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("BUG: invalid UNSAFE_RUN regex literal"));

/// A rendered deck ready to hand to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedArtifact {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    pub format: ExportFormat,
}

/// Stages of one render, reported in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStep {
    Validating,
    Preparing,
    LoadingImages,
    Rendering,
    Packaging,
}

impl RenderStep {
    /// Rough completion percentage once this step starts.
    pub fn percent(&self) -> u8 {
        match self {
            RenderStep::Validating => 5,
            RenderStep::Preparing => 15,
            RenderStep::LoadingImages => 30,
            RenderStep::Rendering => 60,
            RenderStep::Packaging => 95,
        }
    }
}

/// Turns a deck topic into a filename stem.
///
/// Runs of characters other than ASCII letters and digits collapse to one `_`, leading
/// and trailing underscores are dropped and the result is cut to 50 characters.
pub fn sanitize_filename(topic: &str) -> String {
    let collapsed = UNSAFE_RUN.replace_all(topic, "_");
    let stem: String = collapsed
        .trim_matches('_')
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect();
    let stem = stem.trim_end_matches('_');
    if stem.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        stem.to_string()
    }
}

/// Renders decks with one configuration, HTTP client and browser chain.
pub struct Exporter {
    config: RenderConfig,
    fetcher: ImageFetcher,
    strategies: Vec<Box<dyn BrowserStrategy>>,
}

impl Exporter {
    /// Creates an exporter whose browser chain follows `config.browsers`.
    pub fn new(config: RenderConfig) -> Self {
        let strategies = strategies_from_config(&config);
        Exporter::with_strategies(config, strategies)
    }

    /// Creates an exporter with an explicit browser chain.
    pub fn with_strategies(config: RenderConfig, strategies: Vec<Box<dyn BrowserStrategy>>) -> Self {
        let fetcher = ImageFetcher::new(reqwest::Client::new(), &config);
        Exporter {
            config,
            fetcher,
            strategies,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders `request` into `format`.
    pub async fn render(&self, request: &DeckRequest, format: ExportFormat) -> Result<RenderedArtifact> {
        self.render_with_progress(request, format, |_| {}).await
    }

    /// Renders `request` into `format`, calling `progress` as each step starts.
    ///
    /// # Arguments
    ///
    /// * `request` - The deck as received from the caller.
    /// * `format` - The artifact to produce.
    /// * `progress` - Observer notified once per [`RenderStep`].
    ///
    /// # Returns
    ///
    /// The artifact, or a `DeckError` naming the phase that failed. Per-slide problems
    /// (bad chart data, unreachable images) never fail the render.
    pub async fn render_with_progress<F>(
        &self,
        request: &DeckRequest,
        format: ExportFormat,
        mut progress: F,
    ) -> Result<RenderedArtifact>
    where
        F: FnMut(RenderStep) + Send,
    {
        // 1. Reject unusable input before any work
        progress(RenderStep::Validating);
        let deck = request.resolve()?;

        // 2. Normalize, resolve layouts and mine charts
        progress(RenderStep::Preparing);
        let prepared = prepare_deck(&deck);
        debug!(
            "Prepared '{}' with template '{}': {} slides",
            prepared.topic,
            deck.template,
            prepared.slides.len()
        );

        // 3. Images
        progress(RenderStep::LoadingImages);
        let images = collect_images(&prepared, &self.fetcher).await;

        // 4. Backend
        progress(RenderStep::Rendering);
        let bytes = self.render_prepared(&prepared, &images, format).await?;

        // 5. Artifact
        progress(RenderStep::Packaging);
        if bytes.is_empty() {
            return Err(DeckError::Export(format!("{} output is empty", format)));
        }
        let artifact = RenderedArtifact {
            filename: format!("{}.{}", sanitize_filename(&prepared.topic), format.extension()),
            mime_type: format.mime_type().to_string(),
            format,
            bytes,
        };
        info!(
            "Exported '{}' as {} ({} bytes)",
            artifact.filename,
            format,
            artifact.bytes.len()
        );
        Ok(artifact)
    }

    /// Runs one backend over an already prepared deck.
    pub async fn render_prepared(
        &self,
        deck: &PreparedDeck,
        images: &ImageCache,
        format: ExportFormat,
    ) -> Result<Vec<u8>> {
        let options = &self.config.geometry;
        match format {
            ExportFormat::EditableDocument => pptx::render_pptx(deck, images, options)
                .map_err(|e| DeckError::render(format, e.to_string())),
            ExportFormat::VectorPdf => pdf::render_pdf(deck, images, options)
                .map_err(|e| DeckError::render(format, e.to_string())),
            ExportFormat::HifiPdf => {
                html::render_hifi_pdf(deck, images, options, &self.strategies).await
            }
        }
    }
}

/// Renders `request` into `format` with a one-off [`Exporter`].
pub async fn render_deck(
    request: &DeckRequest,
    format: ExportFormat,
    config: &RenderConfig,
) -> Result<RenderedArtifact> {
    Exporter::new(config.clone()).render(request, format).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::html::browser::tests::FakeStrategy;
    use crate::engine::geometry::{compute_bar_layout, legend_spec, plot_area_for, BarLayout};
    use crate::engine::layout::Rect;
    use crate::models::chart::{Chart, ChartKind};
    use crate::models::slide::{LayoutKind, Slide};
    use lopdf::content::Content;
    use lopdf::Document;
    use rstest::rstest;
    use std::io::{Cursor, Read};

    fn offline() -> RenderConfig {
        RenderConfig {
            fetch_images: false,
            ..Default::default()
        }
    }

    fn chart_request() -> DeckRequest {
        let mut slide = Slide::new("Revenue", vec!["Up and to the right".into()]);
        slide.layout = LayoutKind::ChartLeft;
        slide.chart = Some(Chart::single_series(
            ChartKind::Bar,
            vec!["Q1".into(), "Q2".into(), "Q3".into()],
            "Revenue",
            vec![120.0, 340.0, 275.0],
        ));
        DeckRequest::new("Q3 Report: Growth & Risk!", vec![slide])
    }

    #[rstest]
    #[case("Q3 Report: Growth & Risk!", "Q3_Report_Growth_Risk")]
    #[case("  hello   world  ", "hello_world")]
    #[case("!!!", "presentation")]
    #[case("", "presentation")]
    fn sanitizes_filenames(#[case] topic: &str, #[case] expected: &str) {
        assert_eq!(sanitize_filename(topic), expected);
    }

    #[test]
    fn long_topics_are_truncated() {
        let stem = sanitize_filename(&"word ".repeat(40));
        assert!(stem.len() <= MAX_FILENAME_LEN);
        assert!(!stem.ends_with('_'));
        assert!(stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[tokio::test]
    async fn artifacts_carry_filename_and_mime_type() {
        let artifact = render_deck(&chart_request(), ExportFormat::EditableDocument, &offline())
            .await
            .unwrap();
        assert_eq!(artifact.filename, "Q3_Report_Growth_Risk.pptx");
        assert_eq!(
            artifact.mime_type,
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        );
        assert!(artifact.bytes.starts_with(b"PK"));

        let artifact = render_deck(&chart_request(), ExportFormat::VectorPdf, &offline())
            .await
            .unwrap();
        assert_eq!(artifact.filename, "Q3_Report_Growth_Risk.pdf");
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn invalid_requests_fail_before_rendering() {
        let mut steps = Vec::new();
        let request = DeckRequest::new("", vec![]);
        let err = Exporter::new(offline())
            .render_with_progress(&request, ExportFormat::VectorPdf, |step| steps.push(step))
            .await
            .unwrap_err();
        assert!(matches!(err, DeckError::InvalidInput(_)));
        assert_eq!(steps, vec![RenderStep::Validating]);
    }

    #[tokio::test]
    async fn progress_reports_every_step_in_order() {
        let mut steps = Vec::new();
        Exporter::new(offline())
            .render_with_progress(&chart_request(), ExportFormat::VectorPdf, |step| {
                steps.push(step)
            })
            .await
            .unwrap();
        assert_eq!(
            steps,
            vec![
                RenderStep::Validating,
                RenderStep::Preparing,
                RenderStep::LoadingImages,
                RenderStep::Rendering,
                RenderStep::Packaging,
            ]
        );
        assert!(steps.windows(2).all(|w| w[0].percent() < w[1].percent()));
    }

    #[tokio::test]
    async fn hifi_failure_does_not_fall_back_to_vector_pdf() {
        let exporter =
            Exporter::with_strategies(offline(), vec![FakeStrategy::boxed("broken", None)]);
        let err = exporter
            .render(&chart_request(), ExportFormat::HifiPdf)
            .await
            .unwrap_err();
        assert!(err.is_infrastructure());
    }

    /// Tallest bar over the axis maximum, read back from the native chart part.
    fn pptx_tallest_ratio(bytes: &[u8]) -> f64 {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("ppt/charts/chart1.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        let max: f64 = Regex::new(r#"<c:max val="([^"]+)"/>"#).unwrap().captures(&xml).unwrap()[1]
            .parse()
            .unwrap();
        let values = Regex::new(r"(?s)<c:numLit>(.*?)</c:numLit>").unwrap().captures(&xml).unwrap()[1]
            .to_string();
        let tallest = Regex::new(r"<c:v>([^<]+)</c:v>")
            .unwrap()
            .captures_iter(&values)
            .map(|c| c[1].parse::<f64>().unwrap())
            .fold(0.0, f64::max);
        tallest / max
    }

    /// Filled rectangles on a page, in top-down page coordinates.
    fn pdf_filled_rects(bytes: &[u8], page: u32) -> Vec<Rect> {
        let doc = Document::load_mem(bytes).unwrap();
        let pages = doc.get_pages();
        let content = Content::decode(&doc.get_page_content(pages[&page]).unwrap()).unwrap();
        let page_height = 540.0;
        let mut last_rect = None;
        let mut filled = Vec::new();
        for op in &content.operations {
            match op.operator.as_str() {
                "re" => {
                    let n: Vec<f64> = op
                        .operands
                        .iter()
                        .map(|o| o.as_float().unwrap() as f64)
                        .collect();
                    last_rect = Some(Rect::new(n[0], page_height - n[1] - n[3], n[2], n[3]));
                }
                "f" => filled.extend(last_rect.take()),
                _ => last_rect = None,
            }
        }
        filled
    }

    /// Height of the tallest drawn bar, found by matching each bar of the shared layout
    /// against the filled rectangles on the chart page.
    fn pdf_tallest_bar(bytes: &[u8], layout: &BarLayout) -> f64 {
        let filled = pdf_filled_rects(bytes, 2);
        let close = |a: f64, b: f64| (a - b).abs() < 0.01;
        let mut tallest = 0.0f64;
        for bar in &layout.bars {
            let drawn = filled
                .iter()
                .find(|r| {
                    close(r.x, bar.rect.x)
                        && close(r.y, bar.rect.y)
                        && close(r.width, bar.rect.width)
                        && close(r.height, bar.rect.height)
                })
                .unwrap_or_else(|| panic!("bar {:?} not drawn", bar.rect));
            tallest = tallest.max(drawn.height);
        }
        tallest
    }

    #[tokio::test]
    async fn pptx_and_pdf_bars_agree_on_proportions() {
        let request = chart_request();
        let exporter = Exporter::new(offline());
        let pptx = exporter.render(&request, ExportFormat::EditableDocument).await.unwrap();
        let pdf = exporter.render(&request, ExportFormat::VectorPdf).await.unwrap();

        let prepared = prepare_deck(&request.resolve().unwrap());
        let slide = &prepared.slides[0];
        let chart = slide.chart().unwrap();
        let plot = plot_area_for(
            slide.frames.chart.unwrap(),
            legend_spec(chart).as_ref(),
            chart.kind,
        )
        .plot;

        let layout = compute_bar_layout(chart, plot, &exporter.config().geometry);
        assert_eq!(layout.bars.len(), 3);

        let native = pptx_tallest_ratio(&pptx.bytes);
        let drawn = pdf_tallest_bar(&pdf.bytes, &layout) / plot.height;
        assert!(native > 0.0 && drawn > 0.0);
        assert!(
            (native - drawn).abs() <= 0.02,
            "pptx {:.4} vs pdf {:.4}",
            native,
            drawn
        );
    }
}
