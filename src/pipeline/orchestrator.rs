//! Batch orchestrator: selection → bounded concurrent generation →
//! integrity check → publish → manifest upsert.
//!
//! Each item is isolated: whatever goes wrong inside one generation becomes
//! a failed [`GenerationResult`], never an early return. Batches run strictly
//! one after another and the manifest is written once per finished batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::error::{GenerationError, PipelineError};
use super::generator::AssetGenerator;
use super::integrity::verify_artifact;
use super::manifest::{merge_into, ManifestEntry};
use super::pool::BoundedPool;
use super::types::*;
use crate::config::FolioConfig;
use crate::models::{PaperFormat, RecordSource, RuntimeAssetRecord};
use crate::registry::builder::variant_path;
use crate::registry::RuntimeRegistry;
use crate::render::RenderOptions;

impl OrchestratorConfig {
    pub fn from_config(config: &FolioConfig, skip_manifest: bool) -> Self {
        Self {
            output_root: config.site_root.clone(),
            concurrency: config.concurrency,
            batch_size: config.batch_size,
            min_artifact_bytes: config.min_artifact_bytes,
            manifest_path: (!skip_manifest).then(|| config.manifest_path.clone()),
        }
    }
}

/// One unit of work: a resolved record and the options it renders with.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub record: RuntimeAssetRecord,
    pub options: RenderOptions,
}

/// What a selection resolved to. `rejected` holds ids that never became jobs.
#[derive(Debug, Default)]
pub struct GenerationPlan {
    pub jobs: Vec<GenerationJob>,
    pub rejected: Vec<GenerationResult>,
}

// ═══════════════════════════════════════════
// Selection
// ═══════════════════════════════════════════

/// Strip a `-token` paper suffix that a variant path carries.
fn base_path(record: &RuntimeAssetRecord) -> String {
    let Some(paper) = record.paper_variant else {
        return record.output_path.clone();
    };
    let suffix = format!("-{}", paper.token());
    let path = &record.output_path;
    let (stem, ext) = match path.rfind('.') {
        Some(dot) if dot > path.rfind('/').unwrap_or(0) => path.split_at(dot),
        _ => (path.as_str(), ""),
    };
    match stem.strip_suffix(&suffix) {
        Some(stripped) => format!("{stripped}{ext}"),
        None => path.clone(),
    }
}

/// The record to generate for `id`, optionally at a specific paper size.
///
/// A declared variant is used as is. For an undeclared size the primary
/// record is re-targeted at a suffixed sibling path.
pub fn target_for(
    registry: &RuntimeRegistry,
    id: &str,
    paper: Option<PaperFormat>,
) -> Result<Option<RuntimeAssetRecord>, PipelineError> {
    let Some(paper) = paper else {
        return Ok(registry.get(id)?);
    };
    if let Some(variant) = registry.variant(id, paper)? {
        return Ok(Some(variant));
    }
    Ok(registry.get(id)?.map(|primary| {
        let output_path = variant_path(&base_path(&primary), paper);
        RuntimeAssetRecord {
            key: format!("{}@{}", primary.id, paper.token()),
            paper_variant: Some(paper),
            output_path,
            exists: false,
            size_bytes: 0,
            mtime: None,
            hash: None,
            ..primary
        }
    }))
}

/// Resolve a selection against the registry.
///
/// `--missing` and `--all` only pick catalog records the template engine can
/// produce. Discovered files are never overwritten, even when named by id.
pub fn plan(
    registry: &RuntimeRegistry,
    selection: &Selection,
    paper: Option<PaperFormat>,
    options: &GenerationOptions,
) -> Result<GenerationPlan, PipelineError> {
    let mut out = GenerationPlan::default();
    let push = |record: RuntimeAssetRecord, out: &mut GenerationPlan| {
        let options = options.render_options(&record);
        out.jobs.push(GenerationJob { record, options });
    };

    match selection {
        Selection::Ids(ids) => {
            if ids.is_empty() {
                return Err(PipelineError::EmptySelection);
            }
            for id in ids {
                match target_for(registry, id, paper)? {
                    Some(record) if record.source == RecordSource::Discovered => {
                        tracing::warn!(
                            asset_id = %id,
                            path = %record.output_path,
                            "Refusing to regenerate a discovered file"
                        );
                        out.rejected.push(GenerationResult::failed(
                            id,
                            &record.key,
                            &record.output_path,
                            GenerationState::FailedFatal,
                            GenerationError::NotCatalogAsset(id.clone()).to_string(),
                            0,
                        ));
                    }
                    Some(record) => push(record, &mut out),
                    None => {
                        tracing::warn!(asset_id = %id, "Unknown asset id");
                        out.rejected.push(GenerationResult::failed(
                            id,
                            id,
                            "",
                            GenerationState::FailedFatal,
                            GenerationError::NotFound(id.clone()).to_string(),
                            0,
                        ));
                    }
                }
            }
        }
        Selection::Missing | Selection::All => {
            let only_missing = *selection == Selection::Missing;
            for record in registry.all(true)? {
                if record.source != RecordSource::Catalog || !record.file_format.is_generatable() {
                    continue;
                }
                if only_missing && record.exists {
                    continue;
                }
                push(record, &mut out);
            }
        }
    }
    Ok(out)
}

// ═══════════════════════════════════════════
// Orchestrator
// ═══════════════════════════════════════════

pub struct Orchestrator {
    generator: Arc<dyn AssetGenerator>,
    config: OrchestratorConfig,
    pool: BoundedPool,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn AssetGenerator>, config: OrchestratorConfig) -> Self {
        let pool = BoundedPool::new(config.concurrency);
        Self {
            generator,
            config,
            pool,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn disk_path(&self, site_path: &str) -> PathBuf {
        self.config
            .output_root
            .join(site_path.trim_start_matches('/'))
    }

    /// Plan a selection and run it, folding unknown ids into the report.
    pub async fn run_selection(
        &self,
        registry: &RuntimeRegistry,
        selection: &Selection,
        paper: Option<PaperFormat>,
        options: &GenerationOptions,
    ) -> Result<BatchReport, PipelineError> {
        let GenerationPlan { jobs, rejected } = plan(registry, selection, paper, options)?;
        let mut report = self.run(jobs).await;
        report.results.extend(rejected);
        Ok(report)
    }

    /// Run jobs in sequential batches of `batch_size`, each bounded by the pool.
    pub async fn run(&self, jobs: Vec<GenerationJob>) -> BatchReport {
        let start = Instant::now();
        let mut report = BatchReport::default();
        let total = jobs.len();
        let batch_size = self.config.batch_size.max(1);

        tracing::info!(
            items = total,
            batch_size,
            concurrency = self.pool.limit(),
            "Starting generation run"
        );

        let mut remaining = jobs.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<GenerationJob> = remaining.by_ref().take(batch_size).collect();
            report.batches += 1;
            let batch_no = report.batches;

            let outcomes = self.pool.run(batch, |job| self.generate_one(job)).await;

            let mut entries = Vec::new();
            for (result, entry) in outcomes {
                entries.extend(entry);
                report.results.push(result);
            }

            if let Some(manifest) = &self.config.manifest_path {
                if !entries.is_empty() {
                    match merge_into(manifest, entries) {
                        Ok(count) => tracing::debug!(batch = batch_no, entries = count, "Manifest updated"),
                        Err(e) => {
                            tracing::error!(batch = batch_no, error = %e, "Manifest update failed");
                            report.errors.push(format!("batch {batch_no}: {e}"));
                        }
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "Generation run complete"
        );
        report
    }

    /// Generate one job. Never fails: errors come back inside the result.
    pub async fn generate_one(&self, job: GenerationJob) -> (GenerationResult, Option<ManifestEntry>) {
        let start = Instant::now();
        tracing::debug!(
            asset_id = %job.record.id,
            key = %job.record.key,
            state = %GenerationState::Generating,
            "Generating"
        );

        let site_path = job.record.output_path.clone();
        match self.produce(&job).await {
            Ok((size, warnings)) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                tracing::info!(
                    asset_id = %job.record.id,
                    path = %site_path,
                    size_bytes = size,
                    duration_ms,
                    "Generated"
                );
                let entry =
                    ManifestEntry::from_record(&job.record, &job.options, &site_path, size);
                (
                    GenerationResult::succeeded(&job.record, &site_path, size, duration_ms, warnings),
                    Some(entry),
                )
            }
            Err(e) => {
                let next = if e.is_transient() {
                    GenerationState::FailedTransient
                } else {
                    GenerationState::FailedFatal
                };
                tracing::warn!(asset_id = %job.record.id, state = %next, error = %e, "Generation failed");
                (
                    GenerationResult::failed(
                        &job.record.id,
                        &job.record.key,
                        &site_path,
                        next,
                        e.to_string(),
                        start.elapsed().as_millis() as u64,
                    ),
                    None,
                )
            }
        }
    }

    /// Render, stage to a hidden `.part` file, verify the staged bytes and
    /// only then rename over the target. A rejected render leaves the
    /// published file untouched. Returns the size.
    async fn produce(&self, job: &GenerationJob) -> Result<(u64, Vec<String>), GenerationError> {
        let generator = Arc::clone(&self.generator);
        let record = job.record.clone();
        let options = job.options.clone();
        let document = tokio::task::spawn_blocking(move || generator.generate(&record, &options))
            .await
            .map_err(|e| GenerationError::Join(e.to_string()))??;

        let target = self.disk_path(&job.record.output_path);
        let part = stage_artifact(&target, &document.bytes).await?;
        let size = verify_artifact(&part, self.config.min_artifact_bytes).await?;
        if let Err(e) = tokio::fs::rename(&part, &target).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(io_err(&target)(e));
        }
        Ok((size, document.warnings))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> GenerationError + '_ {
    move |source| GenerationError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn part_path(target: &Path) -> PathBuf {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".into());
    dir.join(format!(".{name}.part"))
}

/// Write `bytes` to `.<name>.part` beside the target and return that path.
async fn stage_artifact(target: &Path, bytes: &[u8]) -> Result<PathBuf, GenerationError> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir).await.map_err(io_err(dir))?;

    let part = part_path(target);
    if let Err(e) = tokio::fs::write(&part, bytes).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(io_err(&part)(e));
    }
    Ok(part)
}
