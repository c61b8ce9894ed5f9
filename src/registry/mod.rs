//! Asset registry: catalog → reconciled build artifact → canonical runtime view.

pub mod audit;
pub mod builder;
pub mod canonical;
pub mod reconcile;
pub mod resolver;
pub mod runtime;

pub use audit::{audit, AuditReport};
pub use builder::{write_registry, GeneratedRegistry, RegistryBuilder};
pub use canonical::{CanonicalPolicy, UNRECOGNIZED_TIER_FALLBACK};
pub use reconcile::{FactSource, IgnoreSet, LocalDisk, StorageDiff};
pub use resolver::{PathResolver, Resolution};
pub use runtime::{RegistryStats, RuntimeRegistry};

use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Registry file not found: {0}")]
    NotFound(String),

    #[error("Registry cache lock poisoned")]
    LockPoisoned,
}
