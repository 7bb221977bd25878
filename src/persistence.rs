//! Best-effort storage of finished artifacts.
//!
//! Storing runs on a detached task after the render has produced its bytes. A storage
//! failure is logged and never reaches the caller, who already holds the artifact.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::Result;
use crate::export::{Exporter, RenderedArtifact};
use crate::models::deck::{DeckRequest, ExportFormat};
use crate::models::slide::Slide;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Metadata write failed: {0}")]
    Metadata(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Everything written for one rendered deck: the binary plus its descriptive record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistRecord {
    pub id: Uuid,
    #[serde(skip)]
    pub binary: Vec<u8>,
    pub filename: String,
    pub topic: String,
    pub slide_count: usize,
    pub template: String,
    pub tone: Option<String>,
    pub language: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub export_format: ExportFormat,
    pub slides: Vec<Slide>,
}

impl PersistRecord {
    pub fn new(request: &DeckRequest, artifact: &RenderedArtifact) -> Self {
        let metadata = &request.metadata;
        PersistRecord {
            id: Uuid::new_v4(),
            binary: artifact.bytes.clone(),
            filename: artifact.filename.clone(),
            topic: request.topic.clone(),
            slide_count: request.slides.len(),
            template: request.template.clone(),
            tone: metadata.tone.clone(),
            language: metadata.language.clone(),
            provider: metadata.provider.clone(),
            model: metadata.model.clone(),
            export_format: artifact.format,
            slides: request.slides.clone(),
        }
    }
}

/// Destination for rendered artifacts and their metadata.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores the binary and writes the metadata record.
    async fn store(&self, record: PersistRecord) -> std::result::Result<(), StoreError>;
}

/// Stores artifacts as `<id>.<ext>` next to a `<id>.json` metadata file.
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    pub async fn new(base_path: PathBuf) -> std::result::Result<Self, StoreError> {
        tokio::fs::create_dir_all(&base_path).await?;
        Ok(FilesystemStore { base_path })
    }

    fn binary_path(&self, record: &PersistRecord) -> PathBuf {
        self.base_path
            .join(format!("{}.{}", record.id, record.export_format.extension()))
    }

    fn metadata_path(&self, id: Uuid) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }
}

#[async_trait]
impl ArtifactStore for FilesystemStore {
    async fn store(&self, record: PersistRecord) -> std::result::Result<(), StoreError> {
        tokio::fs::write(self.binary_path(&record), &record.binary)
            .await
            .map_err(|e| StoreError::Upload(e.to_string()))?;
        let metadata = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(self.metadata_path(record.id), metadata)
            .await
            .map_err(|e| StoreError::Metadata(e.to_string()))?;
        Ok(())
    }
}

/// Stores `record` on a detached task. Failures are logged, never returned.
pub fn spawn_persist(store: Arc<dyn ArtifactStore>, record: PersistRecord) -> JoinHandle<()> {
    tokio::spawn(async move {
        let id = record.id;
        let filename = record.filename.clone();
        match store.store(record).await {
            Ok(()) => info!("Stored {} as {}", filename, id),
            Err(e) => error!("Failed to store {} ({}): {}", filename, id, e),
        }
    })
}

/// Renders `request` and hands the result to `store` without waiting for it.
///
/// # Returns
///
/// The artifact together with the handle of the storage task. Dropping the handle does
/// not cancel storage.
pub async fn render_and_persist(
    exporter: &Exporter,
    request: &DeckRequest,
    format: ExportFormat,
    store: Arc<dyn ArtifactStore>,
) -> Result<(RenderedArtifact, JoinHandle<()>)> {
    let artifact = exporter.render(request, format).await?;
    let handle = spawn_persist(store, PersistRecord::new(request, &artifact));
    Ok((artifact, handle))
}
