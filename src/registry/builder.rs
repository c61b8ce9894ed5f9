//! Registry builder — decides what the reconciler's facts mean.
//!
//! Expands paper-format variants, resolves and stats every declared path,
//! diffs declared against stored, and materializes undeclared files as
//! low-confidence records. The output carries no wall-clock data, so
//! unchanged inputs produce byte-identical registries.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::canonical::{canonical_format, canonical_paper, canonical_path, CanonicalPolicy};
use super::reconcile::{diff_paths, walk_storage, FactSource, IgnoreSet};
use super::resolver::PathResolver;
use super::RegistryError;
use crate::catalog::Catalog;
use crate::config::FolioConfig;
use crate::models::{
    AssetDescriptor, Confidence, GeneratedAssetRecord, PaperFormat, ReconciliationRecord,
    RecordSource,
};

pub const REGISTRY_SCHEMA_VERSION: u32 = 1;

/// The build artifact consumed by the runtime registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRegistry {
    pub schema_version: u32,
    pub catalog_digest: String,
    pub records: Vec<GeneratedAssetRecord>,
    pub missing_on_disk: Vec<String>,
    pub unregistered_on_disk: Vec<String>,
    pub warnings: Vec<String>,
}

impl GeneratedRegistry {
    pub fn to_json(&self) -> Result<Vec<u8>, RegistryError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// `/a/b/file.pdf` + Letter → `/a/b/file-letter.pdf`.
pub fn variant_path(path: &str, paper: PaperFormat) -> String {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (format!("{dir}/"), name),
        None => (String::new(), path),
    };
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{dir}{stem}-{}.{ext}", paper.token()),
        _ => format!("{dir}{name}-{}", paper.token()),
    }
}

fn extension(path: &str) -> Option<&str> {
    path.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

fn mime_for(path: &str) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// `/assets/downloads/Old Notes.docx` → `unregistered-assets-downloads-old-notes-docx`.
fn synthetic_id(path: &str) -> String {
    let mut slug = String::from("unregistered");
    let mut dash = true;
    for c in path.chars() {
        if c.is_ascii_alphanumeric() {
            if dash {
                slug.push('-');
                dash = false;
            }
            slug.push(c.to_ascii_lowercase());
        } else {
            dash = true;
        }
    }
    slug
}

fn title_from_path(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    stem.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One descriptor × paper variant, before reconciliation.
struct Planned<'a> {
    descriptor: &'a AssetDescriptor,
    key: String,
    declared: String,
    variant: Option<PaperFormat>,
}

pub struct RegistryBuilder<'a> {
    facts: &'a dyn FactSource,
    resolver: PathResolver,
    ignore: IgnoreSet,
    policy: CanonicalPolicy,
}

impl<'a> RegistryBuilder<'a> {
    pub fn new(
        facts: &'a dyn FactSource,
        resolver: PathResolver,
        ignore: IgnoreSet,
        policy: CanonicalPolicy,
    ) -> Self {
        Self {
            facts,
            resolver,
            ignore,
            policy,
        }
    }

    pub fn from_config(config: &FolioConfig, facts: &'a dyn FactSource) -> Result<Self, RegistryError> {
        Ok(Self::new(
            facts,
            PathResolver::new(&config.storage_roots()),
            IgnoreSet::new(&config.ignore_patterns)?,
            CanonicalPolicy::with_legacy_prefixes(&config.legacy_prefixes),
        ))
    }

    fn plan<'c>(&self, catalog: &'c Catalog, warnings: &mut Vec<String>) -> Vec<Planned<'c>> {
        let mut seen_ids = HashSet::new();
        let mut ordered: Vec<(usize, &AssetDescriptor)> = Vec::new();
        for (idx, d) in catalog.assets.iter().enumerate() {
            if !seen_ids.insert(d.id.as_str()) {
                warnings.push(format!("duplicate id '{}' skipped", d.id));
                continue;
            }
            ordered.push((idx, d));
        }
        // Stable: declared priorities first (ascending), then catalog order.
        ordered.sort_by_key(|(idx, d)| (d.priority.is_none(), d.priority.unwrap_or(0), *idx));

        let mut planned = Vec::new();
        for (_, d) in ordered {
            let declared = canonical_path(&d.output_path, &self.policy);
            let mut papers: Vec<PaperFormat> = Vec::new();
            for raw in &d.paper_formats {
                match canonical_paper(raw) {
                    Some(p) if !papers.contains(&p) => papers.push(p),
                    Some(_) => {}
                    None => warnings.push(format!("{}: unknown paper format '{raw}' ignored", d.id)),
                }
            }
            if papers.len() > 1 {
                for paper in papers {
                    planned.push(Planned {
                        descriptor: d,
                        key: format!("{}@{}", d.id, paper.token()),
                        declared: variant_path(&declared, paper),
                        variant: Some(paper),
                    });
                }
            } else {
                planned.push(Planned {
                    descriptor: d,
                    key: d.id.clone(),
                    declared,
                    variant: None,
                });
            }
        }
        planned
    }

    pub fn build(&self, catalog: &Catalog) -> GeneratedRegistry {
        let mut warnings = Vec::new();
        let planned = self.plan(catalog, &mut warnings);

        let mut records = Vec::with_capacity(planned.len());
        let mut registry_paths = BTreeSet::new();
        let mut forced_missing = BTreeSet::new();
        let mut existing = BTreeSet::new();

        for p in planned {
            let format = canonical_format(&p.descriptor.file_format, &p.declared);
            let (path, reconciliation) = if !format.matches_extension(extension(&p.declared)) {
                warnings.push(format!(
                    "{}: extension of {} disagrees with declared format {format}, treated as missing",
                    p.key, p.declared
                ));
                forced_missing.insert(p.declared.clone());
                (p.declared.clone(), ReconciliationRecord::missing())
            } else {
                let resolution = self.resolver.resolve(&p.declared, self.facts);
                let stat = self.facts.stat(&resolution.path);
                registry_paths.insert(resolution.path.clone());
                if stat.exists {
                    existing.insert(resolution.path.clone());
                }
                (resolution.path, stat)
            };

            let mut descriptor = p.descriptor.clone();
            descriptor.output_path = path.clone();
            records.push(GeneratedAssetRecord {
                key: p.key,
                declared_path: p.declared,
                paper_variant: p.variant,
                source: RecordSource::Catalog,
                confidence: Confidence::Declared,
                mime_type: mime_for(&path),
                reconciliation,
                descriptor,
            });
        }

        let mut disk_paths = walk_storage(self.facts, self.resolver.roots(), &self.ignore);
        disk_paths.extend(existing);
        let diff = diff_paths(&registry_paths, &forced_missing, &disk_paths, &self.ignore);

        for path in &diff.missing_on_disk {
            warnings.push(format!("broken link: {path}"));
        }

        let mut used_keys: HashSet<String> = records.iter().map(|r| r.key.clone()).collect();
        for path in &diff.unregistered_on_disk {
            warnings.push(format!("unlisted file: {path}"));
            let mut id = synthetic_id(path);
            while !used_keys.insert(id.clone()) {
                id.push_str("-x");
            }
            let mut descriptor = AssetDescriptor::new(&id, &title_from_path(path), path);
            descriptor.tier = self.policy.unrecognized_tier.as_str().into();
            descriptor.asset_type = "other".into();
            descriptor.file_format = canonical_format("", path).as_str().into();
            records.push(GeneratedAssetRecord {
                key: id,
                declared_path: path.clone(),
                paper_variant: None,
                source: RecordSource::Discovered,
                confidence: Confidence::Low,
                mime_type: mime_for(path),
                reconciliation: self.facts.stat(path),
                descriptor,
            });
        }

        tracing::info!(
            records = records.len(),
            missing = diff.missing_on_disk.len(),
            unregistered = diff.unregistered_on_disk.len(),
            "Registry built"
        );

        GeneratedRegistry {
            schema_version: REGISTRY_SCHEMA_VERSION,
            catalog_digest: catalog.digest(),
            records,
            missing_on_disk: diff.missing_on_disk,
            unregistered_on_disk: diff.unregistered_on_disk,
            warnings,
        }
    }
}

/// Write the registry atomically: temp file in the target directory, then rename.
pub fn write_registry(registry: &GeneratedRegistry, path: &Path) -> Result<(), RegistryError> {
    let bytes = registry.to_json()?;
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Temp file beside `path`, then rename over it. Readers never see a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::reconcile::memory::MemoryFacts;
    use super::super::reconcile::LocalDisk;
    use super::*;

    fn descriptor(id: &str, path: &str) -> AssetDescriptor {
        AssetDescriptor {
            tier: "member".into(),
            asset_type: "worksheet".into(),
            file_format: "PDF".into(),
            ..AssetDescriptor::new(id, "Title", path)
        }
    }

    fn builder(facts: &dyn FactSource) -> RegistryBuilder<'_> {
        RegistryBuilder::new(
            facts,
            PathResolver::new(&["/assets/downloads".into(), "/downloads".into()]),
            IgnoreSet::new(&["**/.*".into(), "**/manifest.json".into()]).unwrap(),
            CanonicalPolicy::default(),
        )
    }

    #[test]
    fn variant_path_inserts_token_before_extension() {
        assert_eq!(variant_path("/d/grid.pdf", PaperFormat::Letter), "/d/grid-letter.pdf");
        assert_eq!(variant_path("/d/v1.2/grid.pdf", PaperFormat::A3), "/d/v1.2/grid-a3.pdf");
        assert_eq!(variant_path("/d/grid", PaperFormat::A4), "/d/grid-a4");
    }

    #[test]
    fn three_paper_formats_expand_to_three_siblings() {
        let mut d = descriptor("grid", "/assets/downloads/grid.pdf");
        d.paper_formats = vec!["A4".into(), "Letter".into(), "A3".into()];
        let registry = builder(&MemoryFacts::new()).build(&Catalog::new(vec![d]));

        assert_eq!(registry.records.len(), 3);
        assert!(registry.records.iter().all(|r| r.descriptor.id == "grid"));
        let paths: BTreeSet<_> = registry.records.iter().map(|r| r.descriptor.output_path.clone()).collect();
        assert_eq!(paths.len(), 3);
        assert!(paths.contains("/assets/downloads/grid-letter.pdf"));
        let keys: Vec<_> = registry.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["grid@a4", "grid@letter", "grid@a3"]);
    }

    #[test]
    fn single_paper_format_keeps_plain_path() {
        let mut d = descriptor("one", "/assets/downloads/one.pdf");
        d.paper_formats = vec!["A4".into()];
        let registry = builder(&MemoryFacts::new()).build(&Catalog::new(vec![d]));
        assert_eq!(registry.records.len(), 1);
        assert_eq!(registry.records[0].key, "one");
        assert_eq!(registry.records[0].descriptor.output_path, "/assets/downloads/one.pdf");
    }

    #[test]
    fn missing_file_is_retained_not_removed() {
        let registry = builder(&MemoryFacts::new())
            .build(&Catalog::new(vec![descriptor("gone", "/assets/downloads/gone.pdf")]));
        assert_eq!(registry.records.len(), 1);
        assert!(!registry.records[0].reconciliation.exists);
        assert_eq!(registry.missing_on_disk, vec!["/assets/downloads/gone.pdf"]);
    }

    #[test]
    fn resolves_to_alternate_root_and_stats_it() {
        let facts = MemoryFacts::new().with_file("/downloads/moved.pdf", b"%PDF moved");
        let registry = builder(&facts)
            .build(&Catalog::new(vec![descriptor("moved", "/assets/downloads/moved.pdf")]));
        let record = &registry.records[0];
        assert_eq!(record.descriptor.output_path, "/downloads/moved.pdf");
        assert_eq!(record.declared_path, "/assets/downloads/moved.pdf");
        assert!(record.reconciliation.exists);
        assert_eq!(record.reconciliation.size_bytes, 10);
        assert!(registry.missing_on_disk.is_empty());
    }

    #[test]
    fn extension_mismatch_is_missing_even_when_file_exists() {
        let facts = MemoryFacts::new().with_file("/assets/downloads/notes.docx", b"PK");
        let registry = builder(&facts)
            .build(&Catalog::new(vec![descriptor("notes", "/assets/downloads/notes.docx")]));
        assert!(!registry.records[0].reconciliation.exists);
        assert_eq!(registry.missing_on_disk, vec!["/assets/downloads/notes.docx"]);
        // Declared, so never reported as unlisted.
        assert!(registry.unregistered_on_disk.is_empty());
    }

    #[test]
    fn undeclared_files_become_low_confidence_records() {
        let facts = MemoryFacts::new()
            .with_file("/assets/downloads/a.pdf", b"a")
            .with_file("/assets/downloads/orphan-notes.pdf", b"o")
            .with_file("/assets/downloads/.DS_Store", b"")
            .with_file("/assets/downloads/manifest.json", b"{}");
        let registry = builder(&facts)
            .build(&Catalog::new(vec![descriptor("a", "/assets/downloads/a.pdf")]));

        assert_eq!(registry.unregistered_on_disk, vec!["/assets/downloads/orphan-notes.pdf"]);
        let orphan = registry.records.last().unwrap();
        assert_eq!(orphan.source, RecordSource::Discovered);
        assert_eq!(orphan.confidence, Confidence::Low);
        assert_eq!(orphan.key, "unregistered-assets-downloads-orphan-notes-pdf");
        assert_eq!(orphan.descriptor.title, "Orphan Notes");
        assert_eq!(orphan.descriptor.file_format, "PDF");
        assert!(orphan.reconciliation.exists);
    }

    #[test]
    fn priority_sorts_stably() {
        let mut a = descriptor("a", "/assets/downloads/a.pdf");
        let b = descriptor("b", "/assets/downloads/b.pdf");
        let mut c = descriptor("c", "/assets/downloads/c.pdf");
        let d = descriptor("d", "/assets/downloads/d.pdf");
        a.priority = Some(5);
        c.priority = Some(1);
        let registry = builder(&MemoryFacts::new()).build(&Catalog::new(vec![a, b, c, d]));
        let keys: Vec<_> = registry.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let registry = builder(&MemoryFacts::new()).build(&Catalog::new(vec![
            descriptor("a", "/assets/downloads/a.pdf"),
            descriptor("a", "/assets/downloads/other.pdf"),
        ]));
        assert_eq!(registry.records.len(), 1);
        assert!(registry.warnings.iter().any(|w| w.contains("duplicate id")));
    }

    #[test]
    fn rebuild_on_unchanged_disk_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("assets/downloads");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.pdf"), b"%PDF-1.4 a").unwrap();
        std::fs::write(docs.join("stray.pdf"), b"%PDF-1.4 stray").unwrap();
        let disk = LocalDisk::new(dir.path());

        let mut multi = descriptor("m", "/assets/downloads/m.pdf");
        multi.paper_formats = vec!["A4".into(), "Letter".into()];
        let catalog = Catalog::new(vec![descriptor("a", "/assets/downloads/a.pdf"), multi]);

        let first = builder(&disk).build(&catalog).to_json().unwrap();
        let second = builder(&disk).build(&catalog).to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn write_registry_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated/registry.json");
        let registry = builder(&MemoryFacts::new())
            .build(&Catalog::new(vec![descriptor("a", "/assets/downloads/a.pdf")]));
        write_registry(&registry, &path).unwrap();

        let back: GeneratedRegistry =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, registry);
    }
}
