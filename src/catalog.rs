//! Source catalog — the hand-authored list of document descriptors.
//!
//! The catalog file is JSON: either `{ "version": "...", "assets": [...] }`
//! or a bare array of descriptors. Loading never judges the content; the
//! validation pass reports declaration issues without aborting anything.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{AssetDescriptor, AssetTier, AssetType, FileFormat};
use crate::registry::canonical::{
    canonical_format, canonical_paper, canonical_tier, canonical_type, CanonicalPolicy,
};
use crate::registry::FactSource;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cannot read catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub version: String,
    pub assets: Vec<AssetDescriptor>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped(Catalog),
    Bare(Vec<AssetDescriptor>),
}

impl Catalog {
    pub fn new(assets: Vec<AssetDescriptor>) -> Self {
        Self {
            version: String::new(),
            assets,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(match serde_json::from_str::<CatalogFile>(text)? {
            CatalogFile::Wrapped(catalog) => catalog,
            CatalogFile::Bare(assets) => Self::new(assets),
        })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), assets = catalog.assets.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Stable digest of the catalog contents, recorded in the generated registry.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(&self.assets).unwrap_or_default();
        let hash = Sha256::digest(&bytes);
        hash.iter().map(|b| format!("{b:02x}")).collect()
    }
}

// ═══════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DuplicateId,
    InvalidId,
    MalformedPath,
    ExtensionMismatch,
    UnknownPaperFormat,
    NoGenerationStrategy,
    UnrecognizedTier,
    UnrecognizedType,
}

/// One problem found in a descriptor. Never fatal to the catalog as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclarationIssue {
    pub asset_id: String,
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub message: String,
}

impl DeclarationIssue {
    fn error(asset_id: &str, kind: IssueKind, message: String) -> Self {
        Self {
            asset_id: asset_id.into(),
            kind,
            severity: IssueSeverity::Error,
            message,
        }
    }

    fn warning(asset_id: &str, kind: IssueKind, message: String) -> Self {
        Self {
            asset_id: asset_id.into(),
            kind,
            severity: IssueSeverity::Warning,
            message,
        }
    }
}

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}

/// Check every descriptor. `facts` is used only to decide whether a
/// non-generatable artifact already exists somewhere.
pub fn validate(catalog: &Catalog, facts: &dyn FactSource) -> Vec<DeclarationIssue> {
    let strict = CanonicalPolicy::default();
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for d in &catalog.assets {
        if !seen.insert(d.id.as_str()) {
            issues.push(DeclarationIssue::error(
                &d.id,
                IssueKind::DuplicateId,
                format!("id '{}' is declared more than once", d.id),
            ));
        }
        if !ID_PATTERN.is_match(&d.id) {
            issues.push(DeclarationIssue::error(
                &d.id,
                IssueKind::InvalidId,
                "id must be lower-case kebab-case".into(),
            ));
        }

        let path = d.output_path.trim();
        let ext = extension(path);
        if !path.starts_with('/') || path.ends_with('/') || ext.is_none() {
            issues.push(DeclarationIssue::error(
                &d.id,
                IssueKind::MalformedPath,
                format!("output path '{path}' must be site-rooted and name a file with an extension"),
            ));
        }

        let format = canonical_format(&d.file_format, path);
        if ext.is_some() && !format.matches_extension(ext) {
            issues.push(DeclarationIssue::error(
                &d.id,
                IssueKind::ExtensionMismatch,
                format!(
                    "declared format {} disagrees with extension .{}; the file will be treated as missing",
                    format,
                    ext.unwrap_or_default()
                ),
            ));
        }

        for paper in &d.paper_formats {
            if canonical_paper(paper).is_none() {
                issues.push(DeclarationIssue::error(
                    &d.id,
                    IssueKind::UnknownPaperFormat,
                    format!("paper format '{paper}' is not one of A4, Letter, A3"),
                ));
            }
        }

        if !format.is_generatable() && !facts.exists(path) {
            issues.push(DeclarationIssue::error(
                &d.id,
                IssueKind::NoGenerationStrategy,
                format!("{format} artifact is missing and cannot be generated"),
            ));
        }

        // Exact spellings only; anything else is coerced at runtime.
        let tier = canonical_tier(&d.tier, &strict);
        if tier.as_str() != d.tier.trim().to_ascii_lowercase() {
            issues.push(DeclarationIssue::warning(
                &d.id,
                IssueKind::UnrecognizedTier,
                format!("tier '{}' will be read as '{}'", d.tier, tier),
            ));
        }
        let asset_type = canonical_type(&d.asset_type);
        if asset_type == AssetType::Other && !d.asset_type.trim().eq_ignore_ascii_case("other") {
            issues.push(DeclarationIssue::warning(
                &d.id,
                IssueKind::UnrecognizedType,
                format!("type '{}' will be read as 'other'", d.asset_type),
            ));
        }
    }

    issues
}

pub fn has_errors(issues: &[DeclarationIssue]) -> bool {
    issues.iter().any(|i| i.severity == IssueSeverity::Error)
}

/// Format and tier as the builder and reports see them.
pub fn declared_format(d: &AssetDescriptor) -> FileFormat {
    canonical_format(&d.file_format, &d.output_path)
}

pub fn declared_tier(d: &AssetDescriptor) -> AssetTier {
    canonical_tier(&d.tier, &CanonicalPolicy::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::reconcile::memory::MemoryFacts;

    fn descriptor(id: &str, path: &str) -> AssetDescriptor {
        AssetDescriptor {
            tier: "free".into(),
            asset_type: "worksheet".into(),
            file_format: "PDF".into(),
            ..AssetDescriptor::new(id, "Title", path)
        }
    }

    fn kinds(issues: &[DeclarationIssue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind.clone()).collect()
    }

    #[test]
    fn parses_wrapped_and_bare_forms() {
        let wrapped = Catalog::from_json(
            r#"{"version":"3","assets":[{"id":"a","title":"A","outputPath":"/d/a.pdf"}]}"#,
        )
        .unwrap();
        let bare = Catalog::from_json(r#"[{"id":"a","title":"A","outputPath":"/d/a.pdf"}]"#).unwrap();
        assert_eq!(wrapped.version, "3");
        assert_eq!(wrapped.assets, bare.assets);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Catalog::load(&dir.path().join("none.json")),
            Err(CatalogError::Read { .. })
        ));
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = Catalog::new(vec![descriptor("a", "/d/a.pdf")]);
        let b = Catalog::new(vec![descriptor("b", "/d/b.pdf")]);
        assert_eq!(a.digest(), a.clone().digest());
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn clean_catalog_has_no_issues() {
        let catalog = Catalog::new(vec![descriptor("a-one", "/d/a.pdf")]);
        assert!(validate(&catalog, &MemoryFacts::new()).is_empty());
    }

    #[test]
    fn reports_declaration_errors() {
        let mut docx = descriptor("notes", "/d/notes.docx");
        docx.file_format = "DOCX".into();
        let mut bad_paper = descriptor("paper", "/d/paper.pdf");
        bad_paper.paper_formats = vec!["B5".into()];

        let catalog = Catalog::new(vec![
            descriptor("dup", "/d/a.pdf"),
            descriptor("dup", "/d/b.pdf"),
            descriptor("Bad_Id", "/d/c.pdf"),
            descriptor("rel", "d/rel.pdf"),
            descriptor("mismatch", "/d/m.docx"),
            docx,
            bad_paper,
        ]);
        let issues = validate(&catalog, &MemoryFacts::new());
        let kinds = kinds(&issues);

        assert!(kinds.contains(&IssueKind::DuplicateId));
        assert!(kinds.contains(&IssueKind::InvalidId));
        assert!(kinds.contains(&IssueKind::MalformedPath));
        assert!(kinds.contains(&IssueKind::ExtensionMismatch));
        assert!(kinds.contains(&IssueKind::NoGenerationStrategy));
        assert!(kinds.contains(&IssueKind::UnknownPaperFormat));
        assert!(has_errors(&issues));
    }

    #[test]
    fn existing_non_pdf_needs_no_strategy() {
        let mut docx = descriptor("notes", "/d/notes.docx");
        docx.file_format = "DOCX".into();
        let facts = MemoryFacts::new().with_file("/d/notes.docx", b"PK");
        let issues = validate(&Catalog::new(vec![docx]), &facts);
        assert!(issues.is_empty());
    }

    #[test]
    fn loose_enums_are_warnings_only() {
        let mut d = descriptor("loose", "/d/loose.pdf");
        d.tier = "Public".into();
        d.asset_type = "whitepaper".into();
        let issues = validate(&Catalog::new(vec![d]), &MemoryFacts::new());
        assert_eq!(kinds(&issues), vec![IssueKind::UnrecognizedTier, IssueKind::UnrecognizedType]);
        assert!(!has_errors(&issues));
    }
}
