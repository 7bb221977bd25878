use serde::{Deserialize, Serialize};

use crate::models::colors::Color;

/// A fully resolved theme. Built once per render call by the theme resolver and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    /// Accent color: title slide background, bullet glyphs, first chart series.
    pub primary: Color,
    /// Slide background.
    pub background: Color,
    /// Slide titles.
    pub title: Color,
    /// Text drawn on top of the primary color (title slide subtitle, header bands).
    pub subtitle: Color,
    /// Body text.
    pub text: Color,
    /// Frames around images, table grid lines and metric cards.
    pub border: Color,
    /// Series palette for charts, in assignment order.
    pub chart_palette: Vec<Color>,
    /// Optional font family for titles.
    pub title_font: Option<String>,
    /// Optional font family for body text.
    pub body_font: Option<String>,
    /// Remote font file for the title family (Hi-Fi output only).
    pub title_font_url: Option<String>,
    /// Remote font file for the body family (Hi-Fi output only).
    pub body_font_url: Option<String>,
}

impl Theme {
    /// Title font family, falling back to the backend default.
    pub fn title_font_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title_font.as_deref().unwrap_or(fallback)
    }

    /// Body font family, falling back to the backend default.
    pub fn body_font_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.body_font.as_deref().unwrap_or(fallback)
    }
}

/// Caller-supplied partial color overrides. Every field that is set and parses as a
/// color replaces the preset's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "bg")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
}

/// Font overrides from the template settings (brand kit).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_font_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_font_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_font_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_font_url: Option<String>,
}
