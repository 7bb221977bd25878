//! Layout Resolver and the shared slide frame table.
//!
//! Every backend places content into the same frames, expressed in a 960 x 540 point design
//! space with y growing downward. Backends only scale (EMU, CSS px) or flip (PDF) them.

use serde::Serialize;
use std::fmt;

use crate::models::slide::{LayoutKind, Slide};

/// Width of the design space in points (16:9).
pub const SLIDE_WIDTH: f64 = 960.0;
/// Height of the design space in points.
pub const SLIDE_HEIGHT: f64 = 540.0;

const MARGIN: f64 = 48.0;
const CONTENT_TOP: f64 = 112.0;
const CONTENT_HEIGHT: f64 = 352.0;
const GUTTER: f64 = 24.0;
const ICON_STRIP_TOP: f64 = 476.0;
const ICON_STRIP_HEIGHT: f64 = 40.0;

/// Deck topic on the leading title slide.
pub const TITLE_SLIDE_HEADING: Rect = Rect::new(80.0, 170.0, 800.0, 120.0);
/// Optional subtitle under the topic on the title slide.
pub const TITLE_SLIDE_SUBTITLE: Rect = Rect::new(80.0, 300.0, 800.0, 60.0);
/// Dark band behind the title of `image-full` slides.
pub const CAPTION_BAND: Rect = Rect::new(0.0, 424.0, SLIDE_WIDTH, SLIDE_HEIGHT - 424.0);
/// Opacity of the caption band.
pub const CAPTION_BAND_ALPHA: f64 = 0.55;

/// An axis-aligned rectangle in whatever unit the caller works in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Shrinks the rectangle by `amount` on every side, never below zero size.
    pub fn inset(&self, amount: f64) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            (self.width - 2.0 * amount).max(0.0),
            (self.height - 2.0 * amount).max(0.0),
        )
    }

    /// Multiplies every coordinate by `factor` (design points to EMU or CSS pixels).
    pub fn scale(&self, factor: f64) -> Rect {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Splits the rectangle into `count` equal columns separated by `gap`.
    pub fn columns(&self, count: usize, gap: f64) -> Vec<Rect> {
        if count == 0 {
            return Vec::new();
        }
        let width = ((self.width - gap * (count - 1) as f64) / count as f64).max(0.0);
        (0..count)
            .map(|i| Rect::new(self.x + i as f64 * (width + gap), self.y, width, self.height))
            .collect()
    }
}

/// A concrete layout. Has no `auto` member, so an unresolved layout cannot reach a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectiveLayout {
    Text,
    ImageRight,
    ImageLeft,
    TwoColumn,
    Quote,
    TitleOnly,
    ImageFull,
    #[serde(rename = "metrics-3")]
    Metrics3,
    ChartRight,
    ChartLeft,
    Table,
}

impl EffectiveLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectiveLayout::Text => "text",
            EffectiveLayout::ImageRight => "image-right",
            EffectiveLayout::ImageLeft => "image-left",
            EffectiveLayout::TwoColumn => "two-column",
            EffectiveLayout::Quote => "quote",
            EffectiveLayout::TitleOnly => "title-only",
            EffectiveLayout::ImageFull => "image-full",
            EffectiveLayout::Metrics3 => "metrics-3",
            EffectiveLayout::ChartRight => "chart-right",
            EffectiveLayout::ChartLeft => "chart-left",
            EffectiveLayout::Table => "table",
        }
    }

    /// Layouts that show a bullet list somewhere on the slide.
    pub fn renders_bullets(&self) -> bool {
        !matches!(
            self,
            EffectiveLayout::Quote | EffectiveLayout::TitleOnly | EffectiveLayout::ImageFull
        )
    }

    pub fn shows_image(&self) -> bool {
        matches!(
            self,
            EffectiveLayout::ImageRight | EffectiveLayout::ImageLeft | EffectiveLayout::ImageFull
        )
    }

    pub fn shows_chart(&self) -> bool {
        matches!(self, EffectiveLayout::ChartRight | EffectiveLayout::ChartLeft)
    }

    /// Frames for this layout in design points.
    pub fn frames(&self) -> SlideFrames {
        SlideFrames::for_layout(*self)
    }
}

impl fmt::Display for EffectiveLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a slide's declared layout to the layout every backend renders.
///
/// `auto` becomes `image-right` when the slide has a non-blank image URL and `text`
/// otherwise. Every other layout passes through unchanged.
pub fn resolve_layout(slide: &Slide) -> EffectiveLayout {
    match slide.layout {
        LayoutKind::Auto if slide.image().is_some() => EffectiveLayout::ImageRight,
        LayoutKind::Auto | LayoutKind::Text => EffectiveLayout::Text,
        LayoutKind::ImageRight => EffectiveLayout::ImageRight,
        LayoutKind::ImageLeft => EffectiveLayout::ImageLeft,
        LayoutKind::TwoColumn => EffectiveLayout::TwoColumn,
        LayoutKind::Quote => EffectiveLayout::Quote,
        LayoutKind::TitleOnly => EffectiveLayout::TitleOnly,
        LayoutKind::ImageFull => EffectiveLayout::ImageFull,
        LayoutKind::Metrics3 => EffectiveLayout::Metrics3,
        LayoutKind::ChartRight => EffectiveLayout::ChartRight,
        LayoutKind::ChartLeft => EffectiveLayout::ChartLeft,
        LayoutKind::Table => EffectiveLayout::Table,
    }
}

/// Where each kind of content goes on a slide of a given layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SlideFrames {
    pub title: Rect,
    /// Main bullet column.
    pub body: Option<Rect>,
    /// Second bullet column of `two-column` slides.
    pub body_secondary: Option<Rect>,
    pub image: Option<Rect>,
    pub chart: Option<Rect>,
    pub table: Option<Rect>,
    pub metrics: Option<Rect>,
    pub quote: Option<Rect>,
    pub icons: Option<Rect>,
}

impl SlideFrames {
    pub fn for_layout(layout: EffectiveLayout) -> SlideFrames {
        let title = Rect::new(MARGIN, 32.0, SLIDE_WIDTH - 2.0 * MARGIN, 64.0);
        let content = Rect::new(MARGIN, CONTENT_TOP, SLIDE_WIDTH - 2.0 * MARGIN, CONTENT_HEIGHT);
        let icons = Some(Rect::new(
            MARGIN,
            ICON_STRIP_TOP,
            SLIDE_WIDTH - 2.0 * MARGIN,
            ICON_STRIP_HEIGHT,
        ));
        let base = SlideFrames {
            title,
            icons,
            ..Default::default()
        };

        // Narrow column beside a wide one, left or right.
        let split = |narrow: f64, narrow_first: bool| {
            let wide = content.width - narrow - GUTTER;
            if narrow_first {
                (
                    Rect::new(content.x, content.y, narrow, content.height),
                    Rect::new(content.x + narrow + GUTTER, content.y, wide, content.height),
                )
            } else {
                (
                    Rect::new(content.x, content.y, wide, content.height),
                    Rect::new(content.x + wide + GUTTER, content.y, narrow, content.height),
                )
            }
        };

        match layout {
            EffectiveLayout::Text => SlideFrames {
                body: Some(content),
                ..base
            },
            EffectiveLayout::ImageRight => {
                let (body, image) = split(340.0, false);
                SlideFrames {
                    body: Some(body),
                    image: Some(image),
                    ..base
                }
            }
            EffectiveLayout::ImageLeft => {
                let (image, body) = split(340.0, true);
                SlideFrames {
                    body: Some(body),
                    image: Some(image),
                    ..base
                }
            }
            EffectiveLayout::TwoColumn => {
                let columns = content.columns(2, GUTTER);
                SlideFrames {
                    body: columns.first().copied(),
                    body_secondary: columns.get(1).copied(),
                    ..base
                }
            }
            EffectiveLayout::Quote => SlideFrames {
                quote: Some(Rect::new(120.0, 140.0, 720.0, 220.0)),
                // The title becomes the attribution line under the quote.
                title: Rect::new(120.0, 380.0, 720.0, 40.0),
                ..base
            },
            EffectiveLayout::TitleOnly => SlideFrames {
                title: Rect::new(MARGIN, 210.0, SLIDE_WIDTH - 2.0 * MARGIN, 120.0),
                ..base
            },
            EffectiveLayout::ImageFull => SlideFrames {
                image: Some(Rect::new(0.0, 0.0, SLIDE_WIDTH, SLIDE_HEIGHT)),
                title: Rect::new(MARGIN, 440.0, SLIDE_WIDTH - 2.0 * MARGIN, 64.0),
                icons: None,
                ..base
            },
            EffectiveLayout::Metrics3 => SlideFrames {
                metrics: Some(Rect::new(content.x, 150.0, content.width, 200.0)),
                ..base
            },
            EffectiveLayout::ChartRight => {
                let (body, chart) = split(480.0, false);
                SlideFrames {
                    body: Some(body),
                    chart: Some(chart),
                    ..base
                }
            }
            EffectiveLayout::ChartLeft => {
                let (chart, body) = split(480.0, true);
                SlideFrames {
                    body: Some(body),
                    chart: Some(chart),
                    ..base
                }
            }
            EffectiveLayout::Table => SlideFrames {
                table: Some(content),
                ..base
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(layout: LayoutKind, image: Option<&str>) -> Slide {
        Slide {
            layout,
            image_url: image.map(str::to_string),
            ..Slide::new("t", vec!["a".to_string()])
        }
    }

    #[test]
    fn auto_depends_on_image_presence() {
        assert_eq!(
            resolve_layout(&slide(LayoutKind::Auto, Some("https://x/a.png"))),
            EffectiveLayout::ImageRight
        );
        assert_eq!(resolve_layout(&slide(LayoutKind::Auto, None)), EffectiveLayout::Text);
        assert_eq!(resolve_layout(&slide(LayoutKind::Auto, Some("  "))), EffectiveLayout::Text);
    }

    #[test]
    fn explicit_layouts_pass_through() {
        assert_eq!(
            resolve_layout(&slide(LayoutKind::ImageLeft, None)),
            EffectiveLayout::ImageLeft
        );
        assert_eq!(
            resolve_layout(&slide(LayoutKind::Metrics3, Some("https://x/a.png"))),
            EffectiveLayout::Metrics3
        );
    }

    #[test]
    fn frames_stay_inside_the_slide() {
        let all = [
            EffectiveLayout::Text,
            EffectiveLayout::ImageRight,
            EffectiveLayout::ImageLeft,
            EffectiveLayout::TwoColumn,
            EffectiveLayout::Quote,
            EffectiveLayout::TitleOnly,
            EffectiveLayout::ImageFull,
            EffectiveLayout::Metrics3,
            EffectiveLayout::ChartRight,
            EffectiveLayout::ChartLeft,
            EffectiveLayout::Table,
        ];
        for layout in all {
            let frames = layout.frames();
            let rects = [
                Some(frames.title),
                frames.body,
                frames.body_secondary,
                frames.image,
                frames.chart,
                frames.table,
                frames.metrics,
                frames.quote,
                frames.icons,
            ];
            for rect in rects.into_iter().flatten() {
                assert!(rect.x >= 0.0 && rect.right() <= SLIDE_WIDTH, "{}", layout);
                assert!(rect.y >= 0.0 && rect.bottom() <= SLIDE_HEIGHT, "{}", layout);
            }
            assert_eq!(frames.chart.is_some(), layout.shows_chart());
        }
    }

    #[test]
    fn chart_left_mirrors_chart_right() {
        let right = EffectiveLayout::ChartRight.frames();
        let left = EffectiveLayout::ChartLeft.frames();
        assert_eq!(right.chart.unwrap().width, left.chart.unwrap().width);
        assert!(left.chart.unwrap().x < left.body.unwrap().x);
    }

    #[test]
    fn columns_partition_width() {
        let cols = Rect::new(0.0, 0.0, 100.0, 10.0).columns(3, 5.0);
        assert_eq!(cols.len(), 3);
        assert!((cols[2].right() - 100.0).abs() < 1e-9);
    }
}
