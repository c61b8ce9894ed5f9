//! Filesystem reconciler: gathers facts about storage, decides nothing.
//!
//! All paths crossing this boundary are site-rooted strings (`/assets/x.pdf`).
//! [`LocalDisk`] maps them under the configured site root; tests use an
//! in-memory fact source instead.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use super::RegistryError;
use crate::models::ReconciliationRecord;

/// Read-only view of storage.
pub trait FactSource: Send + Sync {
    /// Stat and hash one file. Any failure reads as missing.
    fn stat(&self, site_path: &str) -> ReconciliationRecord;

    /// Cheap existence check, no hashing.
    fn exists(&self, site_path: &str) -> bool;

    /// Every file below a site-rooted directory, recursively, as site paths.
    fn list(&self, site_dir: &str) -> Vec<String>;
}

/// Compute SHA-256 content hash (base64) of a whole file.
pub fn compute_content_hash(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read(path)?;
    let hash = Sha256::digest(&content);
    Ok(base64::engine::general_purpose::STANDARD.encode(hash))
}

/// Real filesystem under a site root directory.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    site_root: PathBuf,
}

impl LocalDisk {
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
        }
    }

    fn disk_path(&self, site_path: &str) -> PathBuf {
        self.site_root.join(site_path.trim_start_matches('/'))
    }

    fn try_stat(&self, path: &Path) -> std::io::Result<ReconciliationRecord> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            ));
        }
        let mtime = meta.modified().ok().map(|m| {
            let at: DateTime<Utc> = m.into();
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        });
        Ok(ReconciliationRecord {
            exists: true,
            size_bytes: meta.len(),
            mtime,
            hash: Some(compute_content_hash(path)?),
        })
    }
}

impl FactSource for LocalDisk {
    fn stat(&self, site_path: &str) -> ReconciliationRecord {
        let path = self.disk_path(site_path);
        match self.try_stat(&path) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Stat failed, recording as missing");
                ReconciliationRecord::missing()
            }
        }
    }

    fn exists(&self, site_path: &str) -> bool {
        self.disk_path(site_path).is_file()
    }

    fn list(&self, site_dir: &str) -> Vec<String> {
        let dir = self.disk_path(site_dir);
        if !dir.is_dir() {
            return Vec::new();
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.site_root) else {
                continue;
            };
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(format!("/{rel}"));
        }
        files.sort();
        files
    }
}

// ═══════════════════════════════════════════
// Ignore patterns
// ═══════════════════════════════════════════

/// Deny-list of internal/system files that are never assets.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    globs: GlobSet,
}

impl IgnoreSet {
    pub fn new(patterns: &[String]) -> Result<Self, RegistryError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| RegistryError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|e| RegistryError::InvalidPattern {
            pattern: patterns.join(", "),
            reason: e.to_string(),
        })?;
        Ok(Self { globs })
    }

    pub fn empty() -> Self {
        Self {
            globs: GlobSet::empty(),
        }
    }

    pub fn is_ignored(&self, site_path: &str) -> bool {
        self.globs.is_match(site_path.trim_start_matches('/'))
    }
}

// ═══════════════════════════════════════════
// Three-way diff
// ═══════════════════════════════════════════

/// Drift between declared paths and storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDiff {
    /// Declared but absent: broken links.
    pub missing_on_disk: Vec<String>,
    /// Present but undeclared, after the ignore list.
    pub unregistered_on_disk: Vec<String>,
}

impl StorageDiff {
    pub fn is_clean(&self) -> bool {
        self.missing_on_disk.is_empty() && self.unregistered_on_disk.is_empty()
    }
}

/// Files under every storage root, ignore list applied, deduplicated and sorted.
pub fn walk_storage(facts: &dyn FactSource, roots: &[String], ignore: &IgnoreSet) -> BTreeSet<String> {
    roots
        .iter()
        .flat_map(|root| facts.list(root))
        .filter(|path| !ignore.is_ignored(path))
        .collect()
}

/// `registry − disk` and `disk − registry − ignored`.
///
/// `registry_paths` must already exclude paths treated as missing for other
/// reasons (extension mismatch); those are passed via `forced_missing`.
pub fn diff_paths(
    registry_paths: &BTreeSet<String>,
    forced_missing: &BTreeSet<String>,
    disk_paths: &BTreeSet<String>,
    ignore: &IgnoreSet,
) -> StorageDiff {
    let mut missing: BTreeSet<String> = registry_paths.difference(disk_paths).cloned().collect();
    missing.extend(forced_missing.iter().cloned());

    let unregistered = disk_paths
        .iter()
        .filter(|p| !registry_paths.contains(*p) && !forced_missing.contains(*p))
        .filter(|p| !ignore.is_ignored(p))
        .cloned()
        .collect();

    StorageDiff {
        missing_on_disk: missing.into_iter().collect(),
        unregistered_on_disk: unregistered,
    }
}

// ═══════════════════════════════════════════
// In-memory fact source (tests)
// ═══════════════════════════════════════════
