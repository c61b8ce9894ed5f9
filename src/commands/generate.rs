//! Generation commands: `generate` (one asset) and `batch` (a selection).

use std::sync::Arc;

use super::registry::open_registry;
use super::{print_json, CommandError};
use crate::cli::{BatchArgs, GenerateArgs, RenderArgs};
use crate::config::FolioConfig;
use crate::models::{AssetTier, PaperFormat};
use crate::pipeline::{
    BatchReport, GenerationOptions, Orchestrator, OrchestratorConfig, Selection,
    TemplateGenerator,
};
use crate::render::{parse_paper, parse_quality};

/// Validate every render argument up front; a bad value aborts before any item starts.
fn generation_options(config: &FolioConfig, args: &RenderArgs) -> Result<GenerationOptions, CommandError> {
    let presentation_tier = args
        .presentation_tier
        .as_deref()
        .map(|raw| {
            raw.parse::<AssetTier>()
                .map_err(|_| CommandError::InvalidArgument(format!("unknown tier '{raw}'")))
        })
        .transpose()?;
    Ok(GenerationOptions {
        paper: None,
        quality: parse_quality(&args.quality)?,
        presentation_tier,
        interactive: args.interactive,
        fillable: args.fillable,
        margins: None,
        brand: config.brand.clone(),
        date: None,
    })
}

fn orchestrator_config(config: &FolioConfig, args: &RenderArgs) -> OrchestratorConfig {
    let mut out = OrchestratorConfig::from_config(config, args.skip_manifest);
    if let Some(root) = &args.output_root {
        out.output_root = root.clone();
    }
    out
}

fn report(report: &BatchReport, json: bool) -> Result<u8, CommandError> {
    if json {
        print_json(report)?;
    } else {
        for r in report.results.iter().filter(|r| r.success) {
            println!("  ok {} → {} ({} KB)", r.key, r.output_path, r.size_bytes.div_ceil(1024));
            for w in &r.warnings {
                println!("     warning: {w}");
            }
        }
        for line in report.summary_lines() {
            println!("{line}");
        }
    }
    Ok(report.exit_code())
}

pub async fn generate(config: &FolioConfig, args: GenerateArgs) -> Result<u8, CommandError> {
    let paper = parse_paper(&args.paper)?;
    let options = generation_options(config, &args.render)?;
    let orchestrator = Orchestrator::new(
        Arc::new(TemplateGenerator),
        orchestrator_config(config, &args.render),
    );
    let registry = open_registry(config);
    let outcome = orchestrator
        .run_selection(&registry, &Selection::Ids(vec![args.id]), Some(paper), &options)
        .await?;
    report(&outcome, args.render.json)
}

pub async fn batch(config: &FolioConfig, args: BatchArgs) -> Result<u8, CommandError> {
    let paper: Option<PaperFormat> = args.paper.as_deref().map(parse_paper).transpose()?;
    let options = generation_options(config, &args.render)?;
    let selection = if args.missing {
        Selection::Missing
    } else if args.all {
        Selection::All
    } else {
        Selection::Ids(args.ids)
    };

    let mut settings = orchestrator_config(config, &args.render);
    if let Some(n) = args.concurrency {
        settings.concurrency = n.max(1);
    }
    if let Some(n) = args.batch_size {
        settings.batch_size = n.max(1);
    }
    let orchestrator = Orchestrator::new(Arc::new(TemplateGenerator), settings);
    let registry = open_registry(config);
    let outcome = orchestrator
        .run_selection(&registry, &selection, paper, &options)
        .await?;
    report(&outcome, args.render.json)
}
