//! Generation-specific error types.
//!
//! Item-level errors ([`GenerationError`], [`IntegrityError`]) never escape a
//! batch: the orchestrator folds them into a failed result. Only
//! [`PipelineError`] aborts a run, and it does so before any item starts.

use thiserror::Error;

use crate::registry::RegistryError;
use crate::render::RenderError;

#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("Artifact missing after write: {path}")]
    Missing { path: String },

    #[error("Artifact {path} is {size} bytes, below the {floor}-byte floor")]
    TooSmall { path: String, size: u64, floor: u64 },

    #[error("Artifact {path} is not a PDF")]
    NotPdf { path: String },
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Asset not found in registry: {0}")]
    NotFound(String),

    #[error("{0} is not a catalog asset; discovered files are never regenerated")]
    NotCatalogAsset(String),

    #[error("No generation strategy for {format} asset {id}")]
    NotGeneratable { id: String, format: String },

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Render task failed: {0}")]
    Join(String),

    #[error("Integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),
}

impl GenerationError {
    /// Worth re-running unchanged: I/O hiccups and crashed worker tasks.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Join(_))
    }
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("I/O error on manifest {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run-level failures: configuration or inputs unusable before generation starts.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Nothing selected: pass asset ids, --missing or --all")]
    EmptySelection,
}
