use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::templates::{resolve_theme, DEFAULT_TEMPLATE};
use crate::errors::{DeckError, Result};
use crate::models::slide::Slide;
use crate::models::theme::{FontOverrides, Theme, ThemeOverrides};

/// The three output artifacts the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Editable office presentation (PPTX).
    #[serde(alias = "pptx")]
    EditableDocument,
    /// PDF drawn from vector primitives.
    #[serde(alias = "pdf")]
    VectorPdf,
    /// PDF printed by a headless browser from the generated markup document.
    #[serde(alias = "hifi")]
    HifiPdf,
}

impl ExportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::EditableDocument => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ExportFormat::VectorPdf | ExportFormat::HifiPdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::EditableDocument => "pptx",
            ExportFormat::VectorPdf | ExportFormat::HifiPdf => "pdf",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::EditableDocument => "editable-document",
            ExportFormat::VectorPdf => "vector-pdf",
            ExportFormat::HifiPdf => "hifi-pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive fields about how the content was generated. Not used for rendering;
/// carried through to the persistence record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// The JSON-shaped render request as it arrives from the editor or the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default, alias = "themeOverrides", skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeOverrides>,
    #[serde(default, alias = "templateFonts", skip_serializing_if = "Option::is_none")]
    pub fonts: Option<FontOverrides>,
    #[serde(default)]
    pub slides: Vec<Slide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_format: Option<ExportFormat>,
    #[serde(default, flatten)]
    pub metadata: GenerationMetadata,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl DeckRequest {
    pub fn new(topic: impl Into<String>, slides: Vec<Slide>) -> Self {
        DeckRequest {
            topic: topic.into(),
            subtitle: None,
            template: default_template(),
            theme: None,
            fonts: None,
            slides,
            export_format: None,
            metadata: GenerationMetadata::default(),
        }
    }

    /// Parses a request from JSON. Shape errors are reported as outline-parsing failures.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rejects requests that cannot be rendered at all. Runs before any backend work.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(DeckError::InvalidInput("Topic is required".to_string()));
        }
        if self.slides.is_empty() {
            return Err(DeckError::InvalidInput(
                "At least one slide is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates the request and resolves its theme, producing the immutable deck the
    /// backends read from.
    pub fn resolve(&self) -> Result<Deck> {
        self.validate()?;
        let theme = resolve_theme(&self.template, self.theme.as_ref(), self.fonts.as_ref());
        Ok(Deck {
            topic: self.topic.trim().to_string(),
            subtitle: self
                .subtitle
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            template: self.template.clone(),
            theme,
            slides: self.slides.clone(),
        })
    }
}

/// Parses the content generator's outline (`[{title, content, image_prompt?}]`) into slides.
pub fn slides_from_outline(json: &str) -> Result<Vec<Slide>> {
    let slides: Vec<Slide> = serde_json::from_str(json)?;
    if slides.is_empty() {
        return Err(DeckError::InvalidInput(
            "Outline contains no slides".to_string(),
        ));
    }
    Ok(slides)
}

/// A validated deck with its theme resolved. Read-only for the duration of a render.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    pub topic: String,
    pub subtitle: Option<String>,
    pub template: String,
    pub theme: Theme,
    pub slides: Vec<Slide>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_topic_and_slides() {
        let request = DeckRequest::new("  ", vec![Slide::new("a", vec![])]);
        assert!(matches!(request.validate(), Err(DeckError::InvalidInput(_))));
        let request = DeckRequest::new("Topic", vec![]);
        assert!(matches!(request.validate(), Err(DeckError::InvalidInput(_))));
    }

    #[test]
    fn parses_full_request() {
        let json = r##"{
            "topic": "Quarterly Review",
            "template": "ocean",
            "theme": { "primary": "#FF0000" },
            "fonts": { "titleFontName": "Inter", "titleFontUrl": "https://f/inter.woff2" },
            "exportFormat": "pptx",
            "tone": "formal",
            "slides": [{ "title": "One", "bullets": ["x"] }]
        }"##;
        let request = DeckRequest::from_json(json).unwrap();
        assert_eq!(request.export_format, Some(ExportFormat::EditableDocument));
        assert_eq!(request.metadata.tone.as_deref(), Some("formal"));
        let deck = request.resolve().unwrap();
        assert_eq!(deck.theme.primary.to_css_hex(), "#FF0000");
        assert_eq!(deck.theme.title_font.as_deref(), Some("Inter"));
    }

    #[test]
    fn malformed_json_is_an_outline_error() {
        let err = DeckRequest::from_json("{ not json").unwrap_err();
        assert_eq!(err.phase(), crate::errors::Phase::OutlineParsing);
    }

    #[test]
    fn outline_items_become_slides() {
        let slides =
            slides_from_outline(r#"[{ "title": "A", "content": ["1", "2"], "image_prompt": "p" }]"#)
                .unwrap();
        assert_eq!(slides[0].bullets.len(), 2);
        assert!(slides_from_outline("[]").is_err());
    }

    #[test]
    fn formats_expose_mime_and_extension() {
        assert_eq!(ExportFormat::HifiPdf.mime_type(), "application/pdf");
        assert_eq!(ExportFormat::EditableDocument.extension(), "pptx");
        assert_eq!(ExportFormat::VectorPdf.to_string(), "vector-pdf");
    }
}
