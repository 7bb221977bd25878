//! Per-slide preparation shared by every backend.
//!
//! Normalization, layout resolution, chart mining and metric extraction run exactly once
//! per slide here, so the backends cannot disagree about numbering, layouts or data.

use log::debug;
use serde::Serialize;

use crate::engine::format::format_value;
use crate::engine::layout::{resolve_layout, EffectiveLayout, SlideFrames};
use crate::engine::mining::{chart_from_text, parse_metrics};
use crate::engine::normalize::{clean_inline, normalize_bullets, NormalizedList};
use crate::models::chart::{Chart, ValueFormat};
use crate::models::deck::Deck;
use crate::models::slide::Slide;
use crate::models::table::Table;
use crate::models::theme::Theme;

/// Most icons drawn in a slide's icon strip.
pub const MAX_ICONS: usize = 6;
/// Number of cards on a `metrics-3` slide.
pub const METRIC_CARDS: usize = 3;

/// Where a slide's chart data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartSource {
    Structured,
    Mined,
}

/// One metric card of a `metrics-3` slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub label: String,
    /// Value text, empty when the metric has no number.
    pub display: String,
}

/// The quote layout's text and attribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteBlock {
    pub text: String,
    pub attribution: Option<String>,
}

/// A slide with every backend-independent decision already made.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedSlide {
    /// Zero-based position in the deck (the title slide is not counted).
    pub index: usize,
    pub title: String,
    pub layout: EffectiveLayout,
    pub frames: SlideFrames,
    pub bullets: NormalizedList,
    pub image_url: Option<String>,
    pub icons: Vec<String>,
    /// Chart data for chart layouts, with its origin.
    pub chart: Option<(Chart, ChartSource)>,
    /// Table data for the table layout. `None` means the slide falls back to bullets.
    pub table: Option<Table>,
    pub metrics: Vec<MetricCard>,
    pub quote: Option<QuoteBlock>,
}

impl PreparedSlide {
    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_ref().map(|(chart, _)| chart)
    }
}

/// A deck ready for any backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedDeck {
    pub topic: String,
    pub subtitle: Option<String>,
    pub theme: Theme,
    pub slides: Vec<PreparedSlide>,
}

fn resolve_chart(slide: &Slide, bullets: &NormalizedList) -> Option<(Chart, ChartSource)> {
    if let Some(chart) = slide.chart.as_ref().filter(|c| !c.is_empty()) {
        return Some((chart.clone(), ChartSource::Structured));
    }
    chart_from_text(&bullets.items).map(|chart| (chart, ChartSource::Mined))
}

fn resolve_metrics(slide: &Slide, bullets: &NormalizedList) -> Vec<MetricCard> {
    match slide.metrics.as_deref() {
        Some(metrics) if !metrics.is_empty() => metrics
            .iter()
            .take(METRIC_CARDS)
            .map(|m| MetricCard {
                label: clean_inline(&m.label),
                display: m.display.clone().unwrap_or_else(|| {
                    m.value
                        .map(|v| format_value(v, ValueFormat::Auto))
                        .unwrap_or_default()
                }),
            })
            .collect(),
        _ => parse_metrics(&bullets.items)
            .into_iter()
            .take(METRIC_CARDS)
            .map(|m| MetricCard {
                label: m.label,
                display: m.display,
            })
            .collect(),
    }
}

fn resolve_quote(title: &str, bullets: &NormalizedList) -> QuoteBlock {
    match bullets.items.first() {
        Some(text) => QuoteBlock {
            text: text.clone(),
            attribution: Some(title.to_string()).filter(|t| !t.is_empty()),
        },
        None => QuoteBlock {
            text: title.to_string(),
            attribution: None,
        },
    }
}

/// Prepares one slide.
pub fn prepare_slide(index: usize, slide: &Slide) -> PreparedSlide {
    let layout = resolve_layout(slide);
    let title = clean_inline(&slide.title);
    let bullets = normalize_bullets(&slide.bullets);

    let chart = if layout.shows_chart() {
        resolve_chart(slide, &bullets)
    } else {
        None
    };
    let table = match layout {
        EffectiveLayout::Table => slide.table.clone().filter(|t| !t.is_empty()),
        _ => None,
    };
    let metrics = match layout {
        EffectiveLayout::Metrics3 => resolve_metrics(slide, &bullets),
        _ => Vec::new(),
    };
    let quote = match layout {
        EffectiveLayout::Quote => Some(resolve_quote(&title, &bullets)),
        _ => None,
    };
    let icons = if layout == EffectiveLayout::ImageFull {
        Vec::new()
    } else {
        slide
            .icon_urls()
            .take(MAX_ICONS)
            .map(str::to_string)
            .collect()
    };

    debug!(
        "Slide {} resolved to layout '{}' ({} bullets, numbered: {}, chart: {:?})",
        index + 1,
        layout,
        bullets.items.len(),
        bullets.numbered,
        chart.as_ref().map(|(_, source)| *source)
    );

    PreparedSlide {
        index,
        title,
        layout,
        frames: layout.frames(),
        bullets,
        image_url: slide.image().map(str::to_string),
        icons,
        chart,
        table,
        metrics,
        quote,
    }
}

/// Prepares every slide of a resolved deck.
pub fn prepare_deck(deck: &Deck) -> PreparedDeck {
    PreparedDeck {
        topic: clean_inline(&deck.topic),
        subtitle: deck.subtitle.as_deref().map(clean_inline),
        theme: deck.theme.clone(),
        slides: deck
            .slides
            .iter()
            .enumerate()
            .map(|(i, slide)| prepare_slide(i, slide))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chart::ChartKind;
    use crate::models::slide::{LayoutKind, Metric};

    fn slide(layout: LayoutKind, bullets: &[&str]) -> Slide {
        Slide {
            layout,
            ..Slide::new("**Title**", bullets.iter().map(|s| s.to_string()).collect())
        }
    }

    #[test]
    fn chart_layout_mines_bullets_without_structured_data() {
        let prepared = prepare_slide(0, &slide(LayoutKind::ChartRight, &["Jan: 100, Feb: 250"]));
        let (chart, source) = prepared.chart.unwrap();
        assert_eq!(source, ChartSource::Mined);
        assert_eq!(chart.categories, vec!["Jan", "Feb"]);
        assert_eq!(prepared.title, "Title");
    }

    #[test]
    fn structured_chart_wins_over_text() {
        let mut s = slide(LayoutKind::ChartLeft, &["Jan: 100"]);
        s.chart = Some(Chart::single_series(
            ChartKind::Pie,
            vec!["x".into()],
            "s",
            vec![1.0],
        ));
        let prepared = prepare_slide(0, &s);
        assert_eq!(prepared.chart.unwrap().1, ChartSource::Structured);
    }

    #[test]
    fn non_chart_layouts_carry_no_chart() {
        let prepared = prepare_slide(0, &slide(LayoutKind::Text, &["Jan: 100"]));
        assert!(prepared.chart.is_none());
    }

    #[test]
    fn metrics_prefer_structured_values() {
        let mut s = slide(LayoutKind::Metrics3, &["Revenue: $1.2k", "Users 5k", "Plain", "Extra 9"]);
        let prepared = prepare_slide(0, &s);
        assert_eq!(prepared.metrics.len(), 3);
        assert_eq!(prepared.metrics[0].display, "$1,200");
        assert_eq!(prepared.metrics[2].display, "");

        s.metrics = Some(vec![Metric {
            label: "NPS".to_string(),
            value: Some(72.0),
            display: None,
        }]);
        let prepared = prepare_slide(0, &s);
        assert_eq!(
            prepared.metrics,
            vec![MetricCard {
                label: "NPS".to_string(),
                display: "72".to_string()
            }]
        );
    }

    #[test]
    fn quote_uses_first_bullet_and_title_attribution() {
        let prepared = prepare_slide(0, &slide(LayoutKind::Quote, &["Stay hungry"]));
        let quote = prepared.quote.unwrap();
        assert_eq!(quote.text, "Stay hungry");
        assert_eq!(quote.attribution.as_deref(), Some("Title"));
    }

    #[test]
    fn icons_are_capped_and_hidden_on_full_images() {
        let mut s = slide(LayoutKind::Text, &[]);
        s.icons = (0..9).map(|i| format!("https://i/{}.png", i)).collect();
        assert_eq!(prepare_slide(0, &s).icons.len(), MAX_ICONS);
        s.layout = LayoutKind::ImageFull;
        assert!(prepare_slide(0, &s).icons.is_empty());
    }
}
