//! Core types for the generation pipeline.
//!
//! Lifecycle per item: Pending → Generating → {Succeeded, FailedTransient, FailedFatal}.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{AssetTier, PaperFormat, QualityTier, RuntimeAssetRecord};
use crate::render::{Margins, RenderOptions};

// ═══════════════════════════════════════════
// Generation state
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Pending,
    Generating,
    Succeeded,
    FailedTransient,
    FailedFatal,
}

impl GenerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Succeeded => "succeeded",
            Self::FailedTransient => "failed_transient",
            Self::FailedFatal => "failed_fatal",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedTransient | Self::FailedFatal)
    }

    /// Forward-only; no in-run retry edge from a failure back to Generating.
    pub fn can_transition_to(&self, next: GenerationState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Generating)
                | (Self::Generating, Self::Succeeded)
                | (Self::Generating, Self::FailedTransient)
                | (Self::Generating, Self::FailedFatal)
        )
    }
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Per-item result
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub asset_id: String,
    pub key: String,
    pub success: bool,
    pub state: GenerationState,
    pub duration_ms: u64,
    pub size_bytes: u64,
    pub output_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn succeeded(
        record: &RuntimeAssetRecord,
        output_path: &str,
        size_bytes: u64,
        duration_ms: u64,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            asset_id: record.id.clone(),
            key: record.key.clone(),
            success: true,
            state: GenerationState::Succeeded,
            duration_ms,
            size_bytes,
            output_path: output_path.to_string(),
            warnings,
            error: None,
        }
    }

    pub fn failed(
        asset_id: &str,
        key: &str,
        output_path: &str,
        state: GenerationState,
        error: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            key: key.to_string(),
            success: false,
            state,
            duration_ms,
            size_bytes: 0,
            output_path: output_path.to_string(),
            warnings: Vec::new(),
            error: Some(error),
        }
    }
}

// ═══════════════════════════════════════════
// Options and selection
// ═══════════════════════════════════════════

/// Caller overrides applied on top of each record's own settings.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub paper: Option<PaperFormat>,
    pub quality: QualityTier,
    pub presentation_tier: Option<AssetTier>,
    pub interactive: Option<bool>,
    pub fillable: Option<bool>,
    pub margins: Option<Margins>,
    pub brand: String,
    pub date: Option<NaiveDate>,
}

impl GenerationOptions {
    pub fn render_options(&self, record: &RuntimeAssetRecord) -> RenderOptions {
        let base = RenderOptions::for_record(record, &self.brand);
        RenderOptions {
            paper: record.paper_variant.or(self.paper).unwrap_or(base.paper),
            quality: self.quality,
            presentation_tier: self.presentation_tier.unwrap_or(base.presentation_tier),
            margins: self.margins.unwrap_or(base.margins),
            interactive: self.interactive.unwrap_or(base.interactive),
            fillable: self.fillable.unwrap_or(base.fillable),
            date: self.date.unwrap_or(base.date),
            ..base
        }
    }
}

/// Which records a batch covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Ids(Vec<String>),
    /// Every generatable record whose file does not exist.
    Missing,
    /// Every generatable record.
    All,
}

/// Settings the orchestrator needs from configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory site-rooted output paths are written under.
    pub output_root: PathBuf,
    pub concurrency: usize,
    pub batch_size: usize,
    pub min_artifact_bytes: u64,
    /// `None` skips manifest maintenance.
    pub manifest_path: Option<PathBuf>,
}

// ═══════════════════════════════════════════
// Batch report
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub results: Vec<GenerationResult>,
    pub batches: usize,
    pub duration_ms: u64,
    /// Run-level problems that are not tied to one item (manifest writes).
    pub errors: Vec<String>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.errors.is_empty()
    }

    /// 0 when everything succeeded, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Tally line followed by one line per failure.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} succeeded, {} failed, {} batch(es) in {:.1}s",
            self.succeeded(),
            self.failed(),
            self.batches,
            self.duration_ms as f64 / 1000.0
        )];
        for r in self.results.iter().filter(|r| !r.success) {
            lines.push(format!(
                "  FAILED {} [{}]: {}",
                r.key,
                r.state,
                r.error.as_deref().unwrap_or("unknown error")
            ));
        }
        for e in &self.errors {
            lines.push(format!("  ERROR {e}"));
        }
        lines
    }
}
