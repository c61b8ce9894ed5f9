//! Runtime registry: read-only, canonical view over the generated artifact.
//!
//! The generated JSON is read into loosely-typed [`RawAssetRecord`]s and run
//! through canonicalization before anything is exposed. The canonical
//! snapshot is memoized in an explicit cache; call [`RuntimeRegistry::invalidate`]
//! after the artifact is rebuilt.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use super::canonical::{canonicalize, CanonicalPolicy, RawAssetRecord};
use super::RegistryError;
use crate::models::{AssetTier, AssetType, PaperFormat, RuntimeAssetRecord};

enum Source {
    File(PathBuf),
    Raw(Vec<RawAssetRecord>),
}

struct Snapshot {
    records: Vec<RuntimeAssetRecord>,
    by_key: HashMap<String, usize>,
}

impl Snapshot {
    fn new(records: Vec<RuntimeAssetRecord>) -> Self {
        let mut by_key = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            by_key.entry(record.key.clone()).or_insert(idx);
        }
        Self { records, by_key }
    }
}

/// Aggregate counts over the whole registry, missing records included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total: usize,
    pub existing: usize,
    pub missing: usize,
    pub interactive: usize,
    pub fillable: usize,
    pub by_tier: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

pub struct RuntimeRegistry {
    source: Source,
    policy: CanonicalPolicy,
    cache: RwLock<Option<Arc<Snapshot>>>,
}

/// Pull raw records out of either `{ "records": [...] }` or a bare array.
/// Fields are lenient one by one; an item that is not even an object keeps
/// whatever id it has.
fn parse_raw_records(bytes: &[u8]) -> Result<Vec<RawAssetRecord>, RegistryError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("records") {
            Some(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    Ok(items
        .into_iter()
        .map(|item| {
            let id = item
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            serde_json::from_value::<RawAssetRecord>(item).unwrap_or_else(|e| {
                tracing::warn!(id = %id, error = %e, "Malformed registry record, keeping id only");
                RawAssetRecord {
                    id,
                    ..RawAssetRecord::default()
                }
            })
        })
        .collect())
}

impl RuntimeRegistry {
    /// Lazily reads `path` on first query.
    pub fn open(path: impl Into<PathBuf>, policy: CanonicalPolicy) -> Self {
        Self {
            source: Source::File(path.into()),
            policy,
            cache: RwLock::new(None),
        }
    }

    pub fn from_raw(records: Vec<RawAssetRecord>, policy: CanonicalPolicy) -> Self {
        Self {
            source: Source::Raw(records),
            policy,
            cache: RwLock::new(None),
        }
    }

    pub fn from_json(bytes: &[u8], policy: CanonicalPolicy) -> Result<Self, RegistryError> {
        Ok(Self::from_raw(parse_raw_records(bytes)?, policy))
    }

    /// Drop the memoized snapshot; the next query reloads.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.write() {
            *cache = None;
        }
    }

    fn load(&self) -> Result<Snapshot, RegistryError> {
        let raw = match &self.source {
            Source::File(path) => read_registry_file(path)?,
            Source::Raw(records) => records.clone(),
        };
        let records = raw.iter().map(|r| canonicalize(r, &self.policy)).collect();
        Ok(Snapshot::new(records))
    }

    fn snapshot(&self) -> Result<Arc<Snapshot>, RegistryError> {
        {
            let guard = self.cache.read().map_err(|_| RegistryError::LockPoisoned)?;
            if let Some(snapshot) = guard.as_ref() {
                return Ok(Arc::clone(snapshot));
            }
        }
        let snapshot = Arc::new(self.load()?);
        let mut guard = self.cache.write().map_err(|_| RegistryError::LockPoisoned)?;
        *guard = Some(Arc::clone(&snapshot));
        tracing::debug!(records = snapshot.records.len(), "Registry snapshot loaded");
        Ok(snapshot)
    }

    fn collect<F>(&self, keep: F) -> Result<Vec<RuntimeAssetRecord>, RegistryError>
    where
        F: Fn(&RuntimeAssetRecord) -> bool,
    {
        Ok(self
            .snapshot()?
            .records
            .iter()
            .filter(|r| keep(r))
            .cloned()
            .collect())
    }

    // ── Lookups ─────────────────────────────────────────

    /// Primary record for an id: the record keyed by the id itself, else the
    /// first paper variant.
    pub fn get(&self, id: &str) -> Result<Option<RuntimeAssetRecord>, RegistryError> {
        let snapshot = self.snapshot()?;
        if let Some(&idx) = snapshot.by_key.get(id) {
            return Ok(Some(snapshot.records[idx].clone()));
        }
        Ok(snapshot.records.iter().find(|r| r.id == id).cloned())
    }

    pub fn get_by_key(&self, key: &str) -> Result<Option<RuntimeAssetRecord>, RegistryError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.by_key.get(key).map(|&idx| snapshot.records[idx].clone()))
    }

    /// Every sibling sharing a base id, in registry order.
    pub fn variants(&self, id: &str) -> Result<Vec<RuntimeAssetRecord>, RegistryError> {
        self.collect(|r| r.id == id)
    }

    /// The record for one paper size. A record without a variant suffix
    /// answers for its single declared size (or A4 when none is declared).
    pub fn variant(
        &self,
        id: &str,
        paper: PaperFormat,
    ) -> Result<Option<RuntimeAssetRecord>, RegistryError> {
        let siblings = self.variants(id)?;
        if let Some(exact) = siblings.iter().find(|r| r.paper_variant == Some(paper)) {
            return Ok(Some(exact.clone()));
        }
        Ok(siblings.into_iter().find(|r| {
            r.paper_variant.is_none()
                && match r.paper_formats.as_slice() {
                    [] => paper == PaperFormat::default(),
                    formats => formats.contains(&paper),
                }
        }))
    }

    // ── Listings ────────────────────────────────────────

    pub fn all(&self, include_missing: bool) -> Result<Vec<RuntimeAssetRecord>, RegistryError> {
        self.collect(|r| include_missing || r.exists)
    }

    pub fn by_tier(&self, tier: AssetTier) -> Result<Vec<RuntimeAssetRecord>, RegistryError> {
        self.collect(|r| r.tier == tier)
    }

    pub fn by_type(&self, asset_type: AssetType) -> Result<Vec<RuntimeAssetRecord>, RegistryError> {
        self.collect(|r| r.asset_type == asset_type)
    }

    pub fn interactive(&self) -> Result<Vec<RuntimeAssetRecord>, RegistryError> {
        self.collect(|r| r.interactive)
    }

    pub fn fillable(&self) -> Result<Vec<RuntimeAssetRecord>, RegistryError> {
        self.collect(|r| r.fillable)
    }

    /// Case-insensitive search over title, description and tags. Every
    /// whitespace-separated term must match; an empty query matches all.
    pub fn search(&self, query: &str) -> Result<Vec<RuntimeAssetRecord>, RegistryError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        self.collect(|r| {
            let haystack = r.search_text();
            terms.iter().all(|t| haystack.contains(t.as_str()))
        })
    }

    pub fn stats(&self) -> Result<RegistryStats, RegistryError> {
        let snapshot = self.snapshot()?;
        let mut stats = RegistryStats {
            total: snapshot.records.len(),
            ..RegistryStats::default()
        };
        for record in &snapshot.records {
            if record.exists {
                stats.existing += 1;
            } else {
                stats.missing += 1;
            }
            if record.interactive {
                stats.interactive += 1;
            }
            if record.fillable {
                stats.fillable += 1;
            }
            *stats.by_tier.entry(record.tier.to_string()).or_default() += 1;
            *stats.by_type.entry(record.asset_type.to_string()).or_default() += 1;
        }
        Ok(stats)
    }
}

fn read_registry_file(path: &Path) -> Result<Vec<RawAssetRecord>, RegistryError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RegistryError::NotFound(path.display().to_string()),
        _ => RegistryError::Io(e),
    })?;
    parse_raw_records(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileFormat;

    fn raw(id: &str, tier: &str, kind: &str, path: &str) -> RawAssetRecord {
        RawAssetRecord {
            id: id.into(),
            title: format!("{id} title"),
            tier: tier.into(),
            asset_type: kind.into(),
            output_path: path.into(),
            exists: true,
            ..RawAssetRecord::default()
        }
    }

    fn registry() -> RuntimeRegistry {
        let mut missing = raw("gone", "member", "guide", "/d/gone.pdf");
        missing.exists = false;
        let mut tagged = raw("grid", "Inner_Circle", "canvas", "public/d/grid.pdf");
        tagged.tags = vec!["Strategy".into(), "planning".into()];
        tagged.description = "A one-page strategy canvas".into();
        tagged.interactive = true;
        tagged.fillable = true;

        let mut a4 = raw("sheet", "free", "worksheet", "/d/sheet-a4.pdf");
        a4.paper_variant = Some("A4".into());
        a4.paper_formats = vec!["A4".into(), "Letter".into()];
        let mut letter = raw("sheet", "free", "worksheet", "/d/sheet-letter.pdf");
        letter.paper_variant = Some("Letter".into());
        letter.paper_formats = vec!["A4".into(), "Letter".into()];

        RuntimeRegistry::from_raw(
            vec![
                raw("plan", "platinum", "downloads", "d/plan.pdf"),
                missing,
                tagged,
                a4,
                letter,
            ],
            CanonicalPolicy::default(),
        )
    }

    #[test]
    fn records_are_canonical() {
        let plan = registry().get("plan").unwrap().unwrap();
        assert_eq!(plan.tier, AssetTier::Free);
        assert_eq!(plan.asset_type, AssetType::Tool);
        assert_eq!(plan.output_path, "/d/plan.pdf");
        assert_eq!(plan.file_format, FileFormat::Pdf);

        let grid = registry().get("grid").unwrap().unwrap();
        assert_eq!(grid.output_path, "/d/grid.pdf");
        assert_eq!(grid.tier, AssetTier::InnerCircle);
    }

    #[test]
    fn variants_share_id_and_resolve_by_paper() {
        let reg = registry();
        let siblings = reg.variants("sheet").unwrap();
        assert_eq!(siblings.len(), 2);
        assert_eq!(siblings[0].key, "sheet@a4");

        let primary = reg.get("sheet").unwrap().unwrap();
        assert_eq!(primary.paper_variant, Some(PaperFormat::A4));
        let letter = reg.variant("sheet", PaperFormat::Letter).unwrap().unwrap();
        assert_eq!(letter.output_path, "/d/sheet-letter.pdf");
        assert!(reg.variant("sheet", PaperFormat::A3).unwrap().is_none());
        // Unsuffixed record answers for the default size.
        assert!(reg.variant("plan", PaperFormat::A4).unwrap().is_some());
        assert!(reg.get_by_key("sheet@letter").unwrap().is_some());
    }

    #[test]
    fn listings_and_filters() {
        let reg = registry();
        assert_eq!(reg.all(true).unwrap().len(), 5);
        assert_eq!(reg.all(false).unwrap().len(), 4);
        assert_eq!(reg.by_tier(AssetTier::Free).unwrap().len(), 3);
        assert_eq!(reg.by_type(AssetType::Canvas).unwrap().len(), 1);
        assert_eq!(reg.interactive().unwrap().len(), 1);
        assert_eq!(reg.fillable().unwrap().len(), 1);
    }

    #[test]
    fn search_requires_every_term() {
        let reg = registry();
        assert_eq!(reg.search("STRATEGY canvas").unwrap().len(), 1);
        assert_eq!(reg.search("strategy missing-term").unwrap().len(), 0);
        assert_eq!(reg.search("planning").unwrap()[0].id, "grid");
        assert_eq!(reg.search("  ").unwrap().len(), 5);
    }

    #[test]
    fn stats_count_everything() {
        let stats = registry().stats().unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.existing, 4);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.interactive, 1);
        assert_eq!(stats.by_tier["free"], 3);
        assert_eq!(stats.by_type["worksheet"], 2);
    }

    #[test]
    fn file_source_reloads_after_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, r#"{"records":[{"id":"a","outputPath":"/d/a.pdf"}]}"#).unwrap();
        let reg = RuntimeRegistry::open(&path, CanonicalPolicy::default());
        assert_eq!(reg.all(true).unwrap().len(), 1);

        std::fs::write(&path, r#"[{"id":"a"},{"id":"b"}]"#).unwrap();
        // Still memoized.
        assert_eq!(reg.all(true).unwrap().len(), 1);
        reg.invalidate();
        assert_eq!(reg.all(true).unwrap().len(), 2);
    }

    #[test]
    fn loose_and_malformed_records_survive() {
        let json = br#"{"records":[
            {"id":"x","exists":"true","sizeBytes":"42","tier":"MEMBERS"},
            {"id":"y","title":{"nested":true}},
            {"id":"z","title":"Zine","tags":"x","mtime":1700000000,"paperFormats":"A4",
             "outputPath":"/d/z.pdf","tier":"member"}
        ]}"#;
        let reg = RuntimeRegistry::from_json(json, CanonicalPolicy::default()).unwrap();
        let x = reg.get("x").unwrap().unwrap();
        assert!(x.exists);
        assert_eq!(x.size_bytes, 42);
        assert_eq!(x.tier, AssetTier::Member);
        let y = reg.get("y").unwrap().unwrap();
        assert_eq!(y.title, "y");
        assert_eq!(y.output_path, "/");

        let z = reg.get("z").unwrap().unwrap();
        assert_eq!(z.title, "Zine");
        assert_eq!(z.tags, vec!["x"]);
        assert_eq!(z.paper_formats, vec![PaperFormat::A4]);
        assert_eq!(z.output_path, "/d/z.pdf");
        assert_eq!(z.tier, AssetTier::Member);
        assert_eq!(z.mtime.as_deref(), Some("1700000000"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let reg = RuntimeRegistry::open("/nonexistent/registry.json", CanonicalPolicy::default());
        assert!(matches!(reg.all(true), Err(RegistryError::NotFound(_))));
    }
}
