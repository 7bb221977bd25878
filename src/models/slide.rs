use serde::{Deserialize, Serialize};

use crate::models::chart::Chart;
use crate::models::table::Table;

/// The layout a slide asks for. `Auto` is resolved to a concrete layout before any
/// backend sees the slide; unknown names also deserialize to `Auto`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
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
    #[default]
    #[serde(other)]
    Auto,
}

/// A key figure shown on `metrics-3` slides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub label: String,
    #[serde(default)]
    pub value: Option<f64>,
    /// Preformatted display text; derived from `value` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// One slide of the abstract deck.
///
/// Accepts the content generator's outline shape directly: `content` is an alias for
/// `bullets` and unknown keys such as `image_prompt` are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub bullets: Vec<String>,
    /// Remote URL or `data:` URI of the slide image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<Chart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<Metric>>,
    #[serde(default)]
    pub layout: LayoutKind,
}

impl Slide {
    pub fn new(title: impl Into<String>, bullets: Vec<String>) -> Self {
        Slide {
            title: title.into(),
            bullets,
            ..Default::default()
        }
    }

    /// The image URL when one is present and not blank.
    pub fn image(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Icon URLs that are not blank.
    pub fn icon_urls(&self) -> impl Iterator<Item = &str> {
        self.icons.iter().map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_generator_outline_items() {
        let json = r#"{ "title": "Intro", "content": ["a", "b"], "image_prompt": "a cat" }"#;
        let slide: Slide = serde_json::from_str(json).unwrap();
        assert_eq!(slide.bullets, vec!["a", "b"]);
        assert_eq!(slide.layout, LayoutKind::Auto);
    }

    #[test]
    fn layout_names_are_kebab_case() {
        let slide: Slide =
            serde_json::from_str(r#"{ "title": "M", "layout": "metrics-3" }"#).unwrap();
        assert_eq!(slide.layout, LayoutKind::Metrics3);
        let slide: Slide =
            serde_json::from_str(r#"{ "title": "C", "layout": "chart-left" }"#).unwrap();
        assert_eq!(slide.layout, LayoutKind::ChartLeft);
        let slide: Slide =
            serde_json::from_str(r#"{ "title": "?", "layout": "hexagon-grid" }"#).unwrap();
        assert_eq!(slide.layout, LayoutKind::Auto);
    }

    #[test]
    fn blank_image_url_counts_as_absent() {
        let mut slide = Slide::new("t", vec![]);
        slide.image_url = Some("   ".to_string());
        assert_eq!(slide.image(), None);
        slide.image_url = Some(" https://x/y.png ".to_string());
        assert_eq!(slide.image(), Some("https://x/y.png"));
    }
}
