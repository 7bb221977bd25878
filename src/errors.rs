use serde::Serialize;
use thiserror::Error;

use crate::converters::html::browser::BrowserError;
use crate::models::deck::ExportFormat;

/// The pipeline phase an error belongs to. Callers surface this next to the message so
/// users can tell a bad outline apart from a broken renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    ContentGeneration,
    OutlineParsing,
    Rendering,
    Export,
}

/// Represents errors that can occur while turning a deck request into a rendered artifact.
#[derive(Error, Debug)]
pub enum DeckError {
    /// The caller's outline generator failed before a deck request existed.
    #[error("Content generation failed: {0}")]
    Generation(String),

    /// The request was rejected before any rendering started (missing topic, no slides, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The slide outline JSON could not be parsed into slides.
    #[error("Failed to parse slide outline: {0}")]
    Outline(#[from] serde_json::Error),

    /// A backend failed while assembling its output document.
    #[error("Rendering {format} failed: {message}")]
    Render {
        format: ExportFormat,
        message: String,
    },

    /// Every configured headless browser failed to print the Hi-Fi document.
    #[error("Browser rendering failed: {0}")]
    Browser(#[from] BrowserError),

    /// The rendered output could not be packaged for the caller.
    #[error("Export failed: {0}")]
    Export(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error originating from the underlying HTTP client (`reqwest`).
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// An I/O error occurred, e.g. while staging files for the browser.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An unexpected or unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DeckError {
    /// Creates a render error for the given backend.
    pub fn render(format: ExportFormat, message: impl Into<String>) -> Self {
        DeckError::Render {
            format,
            message: message.into(),
        }
    }

    /// Returns the pipeline phase this error is attributed to.
    pub fn phase(&self) -> Phase {
        match self {
            DeckError::Generation(_) => Phase::ContentGeneration,
            DeckError::InvalidInput(_) | DeckError::Outline(_) => Phase::OutlineParsing,
            DeckError::Render { .. } | DeckError::Browser(_) | DeckError::Network(_) => {
                Phase::Rendering
            }
            DeckError::Export(_)
            | DeckError::Config(_)
            | DeckError::Io(_)
            | DeckError::Unknown(_) => Phase::Export,
        }
    }

    /// True when the failure came from rendering infrastructure rather than from content.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, DeckError::Browser(_) | DeckError::Io(_))
    }
}

/// A structured, serializable view of an error for API responses and job streams.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub phase: Phase,
    pub message: String,
}

impl From<&DeckError> for ErrorReport {
    fn from(error: &DeckError) -> Self {
        ErrorReport {
            phase: error.phase(),
            message: error.to_string(),
        }
    }
}

/// A type alias for `Result<T, DeckError>` for convenience within the crate.
pub type Result<T> = std::result::Result<T, DeckError>;
