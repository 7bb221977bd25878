//! Renders abstract slide decks to three artifacts: an editable PPTX package, a vector
//! PDF drawn from primitives, and a Hi-Fi PDF printed by a headless browser from a
//! generated markup document.
//!
//! All three backends read the same [`engine::prepare::PreparedDeck`] and the same chart
//! geometry, so a chart's proportions agree across formats.

pub mod config;
pub mod converters;
pub mod engine;
pub mod errors;
pub mod export;
pub mod jobs;
pub mod media;
pub mod models;
pub mod persistence;

pub use config::RenderConfig;
pub use errors::{DeckError, Result};
pub use export::{render_deck, sanitize_filename, Exporter, RenderStep, RenderedArtifact};
pub use jobs::{JobEvent, JobId, JobRegistry, JobStream};
pub use models::deck::{DeckRequest, ExportFormat};
pub use persistence::{render_and_persist, spawn_persist, ArtifactStore, PersistRecord};
