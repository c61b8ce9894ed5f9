//! Application constants and the on-disk configuration file.
//!
//! Every field of [`FolioConfig`] has a default, so a missing `folio.toml`
//! is a valid configuration. Paths are relative to the working directory
//! unless absolute.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Folio";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "folio.toml";

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "FOLIO_CONFIG";

/// Artifacts smaller than this are treated as corrupt placeholders.
pub const MIN_ARTIFACT_BYTES: u64 = 20 * 1024;

/// Hard ceiling on generation concurrency, whatever the machine offers.
pub const MAX_CONCURRENCY: usize = 4;

/// Items per batch before the orchestrator flushes the manifest.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "folio=info,folio_lib=info"
}

/// Concurrency derived from available parallelism, capped at [`MAX_CONCURRENCY`].
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_CONCURRENCY)
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: String, reason: String },
}

// ═══════════════════════════════════════════════════════════
// FolioConfig
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FolioConfig {
    /// Directory served at `/` by the web application.
    pub site_root: PathBuf,
    /// Site-rooted directory where generated documents land.
    pub documents_root: String,
    /// Site-rooted directories searched, in order, when resolving a descriptor.
    pub candidate_roots: Vec<String>,
    /// Legacy path prefixes stripped during canonicalization.
    pub legacy_prefixes: Vec<String>,
    /// Glob patterns (relative to a storage root) never treated as assets.
    pub ignore_patterns: Vec<String>,
    /// Hand-authored descriptor catalog.
    pub catalog_path: PathBuf,
    /// Output of the registry builder, input of the runtime registry.
    pub registry_path: PathBuf,
    /// Ledger of generated artifacts.
    pub manifest_path: PathBuf,
    pub concurrency: usize,
    pub batch_size: usize,
    pub min_artifact_bytes: u64,
    /// Brand line printed in every document footer.
    pub brand: String,
    pub log_filter: Option<String>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            site_root: PathBuf::from("public"),
            documents_root: "/assets/downloads".into(),
            candidate_roots: vec![
                "/assets/downloads".into(),
                "/downloads".into(),
                "/assets/vault".into(),
            ],
            legacy_prefixes: vec!["/public".into()],
            ignore_patterns: vec![
                "**/.*".into(),
                "**/_*".into(),
                "**/*.tmp".into(),
                "**/Thumbs.db".into(),
                "**/manifest.json".into(),
            ],
            catalog_path: PathBuf::from("content/catalog.json"),
            registry_path: PathBuf::from("content/generated/registry.json"),
            manifest_path: PathBuf::from("public/assets/downloads/manifest.json"),
            concurrency: default_concurrency(),
            batch_size: DEFAULT_BATCH_SIZE,
            min_artifact_bytes: MIN_ARTIFACT_BYTES,
            brand: "Folio Library".into(),
            log_filter: None,
        }
    }
}

impl FolioConfig {
    /// Load config from an explicit path, `$FOLIO_CONFIG`, or `./folio.toml`.
    ///
    /// An explicit or env-provided path must exist; the implicit default
    /// file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.documents_root.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "documents_root".into(),
                reason: "must be site-rooted (start with '/')".into(),
            });
        }
        if let Some(root) = self.candidate_roots.iter().find(|r| !r.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "candidate_roots".into(),
                reason: format!("'{root}' must start with '/'"),
            });
        }
        if self.concurrency == 0 || self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency/batch_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Candidate roots with the documents root guaranteed first.
    pub fn storage_roots(&self) -> Vec<String> {
        let mut roots = vec![self.documents_root.clone()];
        for root in &self.candidate_roots {
            if !roots.contains(root) {
                roots.push(root.clone());
            }
        }
        roots
    }

    /// Map a site-rooted path onto the filesystem under `site_root`.
    pub fn disk_path(&self, site_path: &str) -> PathBuf {
        self.site_root.join(site_path.trim_start_matches('/'))
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(default_log_filter())
    }
}
