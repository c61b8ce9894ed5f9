use serde::Serialize;

use super::builder::GeneratedRegistry;
use crate::models::RecordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    /// Declared in the catalog, absent from storage.
    BrokenLink,
    /// Present in storage, declared nowhere.
    Unlisted,
}

/// A single discrepancy detected by the audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditIssue {
    pub category: AuditCategory,
    pub path: String,
    pub asset_key: Option<String>,
    pub description: String,
}

/// Result of auditing one registry build against storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub issues: Vec<AuditIssue>,
    pub records_checked: usize,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn broken_links(&self) -> impl Iterator<Item = &AuditIssue> {
        self.issues
            .iter()
            .filter(|i| i.category == AuditCategory::BrokenLink)
    }

    pub fn unlisted(&self) -> impl Iterator<Item = &AuditIssue> {
        self.issues
            .iter()
            .filter(|i| i.category == AuditCategory::Unlisted)
    }
}

/// Report broken links and unlisted files from a fresh build.
///
/// The ignore list has already been applied by the builder's walk, so
/// internal files never show up here.
pub fn audit(registry: &GeneratedRegistry) -> AuditReport {
    let mut issues = Vec::new();

    for record in &registry.records {
        if record.source == RecordSource::Catalog && !record.reconciliation.exists {
            issues.push(AuditIssue {
                category: AuditCategory::BrokenLink,
                path: record.descriptor.output_path.clone(),
                asset_key: Some(record.key.clone()),
                description: format!("'{}' points at a file that does not exist", record.key),
            });
        }
    }

    for path in &registry.unregistered_on_disk {
        issues.push(AuditIssue {
            category: AuditCategory::Unlisted,
            path: path.clone(),
            asset_key: None,
            description: "file is not declared in the catalog".into(),
        });
    }

    let records_checked = registry
        .records
        .iter()
        .filter(|r| r.source == RecordSource::Catalog)
        .count();

    if !issues.is_empty() {
        tracing::warn!(
            issues = issues.len(),
            records_checked,
            "Audit found discrepancies"
        );
    }

    AuditReport {
        issues,
        records_checked,
    }
}

#[cfg(test)]
mod tests {
    use super::super::reconcile::memory::MemoryFacts;
    use super::super::{CanonicalPolicy, IgnoreSet, PathResolver, RegistryBuilder};
    use super::*;
    use crate::catalog::Catalog;
    use crate::models::AssetDescriptor;

    fn build(facts: &MemoryFacts, assets: Vec<AssetDescriptor>) -> GeneratedRegistry {
        RegistryBuilder::new(
            facts,
            PathResolver::new(&["/assets/downloads".into()]),
            IgnoreSet::new(&["**/.*".into(), "**/_*".into()]).unwrap(),
            CanonicalPolicy::default(),
        )
        .build(&Catalog::new(assets))
    }

    #[test]
    fn clean_storage_is_clean() {
        let facts = MemoryFacts::new().with_file("/assets/downloads/a.pdf", b"a");
        let report = audit(&build(
            &facts,
            vec![AssetDescriptor::new("a", "A", "/assets/downloads/a.pdf")],
        ));
        assert!(report.is_clean());
        assert_eq!(report.records_checked, 1);
    }

    #[test]
    fn reports_broken_and_unlisted_but_not_ignored() {
        let facts = MemoryFacts::new()
            .with_file("/assets/downloads/a.pdf", b"a")
            .with_file("/assets/downloads/stray.pdf", b"s")
            .with_file("/assets/downloads/.DS_Store", b"")
            .with_file("/assets/downloads/_drafts/wip.pdf", b"w");
        let report = audit(&build(
            &facts,
            vec![
                AssetDescriptor::new("a", "A", "/assets/downloads/a.pdf"),
                AssetDescriptor::new("b", "B", "/assets/downloads/b.pdf"),
            ],
        ));

        let broken: Vec<_> = report.broken_links().map(|i| i.path.as_str()).collect();
        let unlisted: Vec<_> = report.unlisted().map(|i| i.path.as_str()).collect();
        assert_eq!(broken, vec!["/assets/downloads/b.pdf"]);
        assert_eq!(unlisted, vec!["/assets/downloads/stray.pdf"]);
        assert!(!report.is_clean());
    }
}
