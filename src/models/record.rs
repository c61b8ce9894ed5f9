use serde::{Deserialize, Serialize};

use super::descriptor::AssetDescriptor;
use super::enums::{
    AssetTier, AssetType, Confidence, FileFormat, PaperFormat, RecordSource,
};

// ═══════════════════════════════════════════
// Build-time records
// ═══════════════════════════════════════════

/// Facts about one path, gathered in the current build pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRecord {
    pub exists: bool,
    #[serde(default)]
    pub size_bytes: u64,
    /// RFC 3339, UTC, second precision.
    #[serde(default)]
    pub mtime: Option<String>,
    /// Base64 SHA-256 of the whole file.
    #[serde(default)]
    pub hash: Option<String>,
}

impl ReconciliationRecord {
    pub fn missing() -> Self {
        Self {
            exists: false,
            size_bytes: 0,
            mtime: None,
            hash: None,
        }
    }
}

/// Descriptor enriched with reconciliation data. One per descriptor × paper variant,
/// plus one per discovered file nobody declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAssetRecord {
    /// `id` for single-format descriptors, `id@paper` for variants.
    pub key: String,
    /// `outputPath` here is the resolved path, not necessarily the declared one.
    #[serde(flatten)]
    pub descriptor: AssetDescriptor,
    pub declared_path: String,
    #[serde(default)]
    pub paper_variant: Option<PaperFormat>,
    pub source: RecordSource,
    pub confidence: Confidence,
    pub mime_type: String,
    #[serde(flatten)]
    pub reconciliation: ReconciliationRecord,
}

// ═══════════════════════════════════════════
// Runtime record
// ═══════════════════════════════════════════

/// A generated record after canonicalization: every enumerated field is a
/// closed value and `output_path` is site-rooted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeAssetRecord {
    pub id: String,
    pub key: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub tier: AssetTier,
    pub category: String,
    pub tags: Vec<String>,
    pub paper_formats: Vec<PaperFormat>,
    pub paper_variant: Option<PaperFormat>,
    pub file_format: FileFormat,
    pub output_path: String,
    pub interactive: bool,
    pub fillable: bool,
    pub requires_auth: bool,
    pub version: String,
    pub source: RecordSource,
    pub confidence: Confidence,
    pub mime_type: String,
    pub exists: bool,
    pub size_bytes: u64,
    pub mtime: Option<String>,
    pub hash: Option<String>,
}

impl RuntimeAssetRecord {
    /// Lower-cased haystack for free-text search.
    pub fn search_text(&self) -> String {
        let mut text = String::with_capacity(
            self.title.len() + self.description.len() + self.tags.len() * 8,
        );
        text.push_str(&self.title);
        text.push('\n');
        text.push_str(&self.description);
        for tag in &self.tags {
            text.push('\n');
            text.push_str(tag);
        }
        text.to_lowercase()
    }
}
