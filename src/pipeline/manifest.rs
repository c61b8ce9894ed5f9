//! Ledger of generated artifacts.
//!
//! Entries are keyed by (id, path) so paper variants of one asset coexist.
//! Every save resorts the whole list (tier rank, title, id, path) so the
//! file diffs cleanly between runs.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::ManifestError;
use crate::models::RuntimeAssetRecord;
use crate::render::RenderOptions;
use crate::registry::builder::write_atomic;
use crate::registry::canonical;
use crate::registry::CanonicalPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    pub title: String,
    pub path: String,
    pub size_bytes: u64,
    pub size_kb: u64,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub tier: String,
    pub interactive: bool,
    pub fillable: bool,
    pub generated_at: String,
    pub version: String,
}

impl ManifestEntry {
    /// Describe the artifact as rendered: flags come from the effective
    /// options, which may override the record.
    pub fn from_record(
        record: &RuntimeAssetRecord,
        options: &RenderOptions,
        path: &str,
        size_bytes: u64,
    ) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            path: path.to_string(),
            size_bytes,
            size_kb: size_bytes.div_ceil(1024),
            asset_type: record.asset_type.as_str().to_string(),
            tier: record.tier.as_str().to_string(),
            interactive: options.interactive,
            fillable: options.fillable,
            generated_at: now_rfc3339(),
            version: record.version.clone(),
        }
    }

    fn tier_rank(&self) -> u8 {
        canonical::canonical_tier(&self.tier, &CanonicalPolicy::default()).rank()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Manifest {
    /// Missing file → empty manifest. A corrupt file is replaced rather
    /// than blocking generation, with a warning.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ManifestError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(manifest) => Ok(manifest),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable manifest, starting fresh");
                Ok(Self::default())
            }
        }
    }

    /// Replace the entry with the same (id, path) or append.
    pub fn upsert(&mut self, entry: ManifestEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id && e.path == entry.path)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            a.tier_rank()
                .cmp(&b.tier_rank())
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.path.cmp(&b.path))
        });
    }

    pub fn save(&mut self, path: &Path) -> Result<(), ManifestError> {
        self.sort();
        self.generated_at = now_rfc3339();
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        write_atomic(path, &bytes).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Load, upsert `entries`, save. One call per completed batch.
pub fn merge_into(path: &Path, entries: Vec<ManifestEntry>) -> Result<usize, ManifestError> {
    let mut manifest = Manifest::load(path)?;
    for entry in entries {
        manifest.upsert(entry);
    }
    manifest.save(path)?;
    Ok(manifest.entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, path: &str, tier: &str, title: &str) -> ManifestEntry {
        ManifestEntry {
            id: id.into(),
            title: title.into(),
            path: path.into(),
            size_bytes: 30_000,
            size_kb: 30,
            asset_type: "canvas".into(),
            tier: tier.into(),
            interactive: false,
            fillable: false,
            generated_at: "2026-01-01T00:00:00Z".into(),
            version: "1.0.0".into(),
        }
    }

    #[test]
    fn upsert_never_duplicates() {
        let mut m = Manifest::default();
        m.upsert(entry("a", "/d/a.pdf", "free", "A"));
        m.upsert(entry("a", "/d/a-letter.pdf", "free", "A"));
        let mut again = entry("a", "/d/a.pdf", "free", "A");
        again.size_bytes = 99;
        m.upsert(again);
        assert_eq!(m.entries.len(), 2);
        assert_eq!(m.entries[0].size_bytes, 99);
    }

    #[test]
    fn sort_is_tier_then_title_then_id_then_path() {
        let mut m = Manifest::default();
        m.upsert(entry("z", "/d/z.pdf", "inner-circle", "Alpha"));
        m.upsert(entry("b", "/d/b.pdf", "free", "Beta"));
        m.upsert(entry("a", "/d/a2.pdf", "free", "Beta"));
        m.upsert(entry("a", "/d/a1.pdf", "free", "Beta"));
        m.upsert(entry("c", "/d/c.pdf", "member", "Aardvark"));
        m.sort();
        let order: Vec<_> = m.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            order,
            vec!["/d/a1.pdf", "/d/a2.pdf", "/d/b.pdf", "/d/c.pdf", "/d/z.pdf"]
        );
    }

    #[test]
    fn merge_round_trip_and_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        assert_eq!(merge_into(&path, vec![entry("a", "/d/a.pdf", "free", "A")]).unwrap(), 1);
        assert_eq!(merge_into(&path, vec![entry("a", "/d/a.pdf", "free", "A")]).unwrap(), 1);
        assert_eq!(merge_into(&path, vec![entry("b", "/d/b.pdf", "free", "B")]).unwrap(), 2);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw["generatedAt"].is_string());
        assert_eq!(raw["entries"][0]["sizeKb"], 30);
        assert_eq!(raw["entries"][0]["type"], "canvas");

        std::fs::write(&path, b"{ not json").unwrap();
        assert!(Manifest::load(&path).unwrap().entries.is_empty());
    }

    #[test]
    fn size_kb_rounds_up() {
        use crate::models::{AssetTier, AssetType, Confidence, FileFormat, RecordSource};
        let record = RuntimeAssetRecord {
            id: "x".into(),
            key: "x".into(),
            title: "X".into(),
            description: String::new(),
            asset_type: AssetType::Guide,
            tier: AssetTier::Member,
            category: String::new(),
            tags: Vec::new(),
            paper_formats: Vec::new(),
            paper_variant: None,
            file_format: FileFormat::Pdf,
            output_path: "/d/x.pdf".into(),
            interactive: false,
            fillable: false,
            requires_auth: false,
            version: "1.2.0".into(),
            source: RecordSource::Catalog,
            confidence: Confidence::Declared,
            mime_type: "application/pdf".into(),
            exists: true,
            size_bytes: 0,
            mtime: None,
            hash: None,
        };
        let plain = RenderOptions::for_record(&record, "Folio");
        let e = ManifestEntry::from_record(&record, &plain, "/d/x.pdf", 20_481);
        assert_eq!(e.size_kb, 21);
        assert_eq!(e.tier, "member");
        assert_eq!(e.asset_type, "guide");
        assert!(!e.interactive && !e.fillable);

        let overridden = RenderOptions {
            interactive: true,
            fillable: true,
            ..plain
        };
        let e = ManifestEntry::from_record(&record, &overridden, "/d/x.pdf", 20_481);
        assert!(e.interactive && e.fillable);
    }
}
