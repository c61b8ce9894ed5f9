//! Registry commands: build, validate, audit and the read-only queries.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::{print_json, CommandError, EXIT_FAILURE, EXIT_OK};
use crate::catalog::{self, Catalog, IssueSeverity};
use crate::cli::ListArgs;
use crate::config::FolioConfig;
use crate::models::{AssetTier, AssetType, RuntimeAssetRecord};
use crate::registry::{
    self as reg, write_registry, CanonicalPolicy, GeneratedRegistry, LocalDisk, RegistryBuilder,
    RegistryError, RuntimeRegistry,
};

pub fn open_registry(config: &FolioConfig) -> RuntimeRegistry {
    RuntimeRegistry::open(
        &config.registry_path,
        CanonicalPolicy::with_legacy_prefixes(&config.legacy_prefixes),
    )
}

/// Load the catalog and reconcile it against the configured site root.
fn reconcile(
    config: &FolioConfig,
) -> Result<(GeneratedRegistry, Vec<catalog::DeclarationIssue>), CommandError> {
    let catalog = Catalog::load(&config.catalog_path)?;
    let facts = LocalDisk::new(&config.site_root);
    let issues = catalog::validate(&catalog, &facts);
    for issue in &issues {
        tracing::warn!(asset_id = %issue.asset_id, kind = ?issue.kind, "{}", issue.message);
    }
    let builder = RegistryBuilder::from_config(config, &facts)?;
    let generated = builder.build(&catalog);
    Ok((generated, issues))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildSummary<'a> {
    registry_path: String,
    records: usize,
    existing: usize,
    missing_on_disk: &'a [String],
    unregistered_on_disk: &'a [String],
    warnings: &'a [String],
    declaration_issues: usize,
}

pub fn build(config: &FolioConfig, json: bool) -> Result<u8, CommandError> {
    let (generated, issues) = reconcile(config)?;
    write_registry(&generated, &config.registry_path)?;

    let summary = BuildSummary {
        registry_path: config.registry_path.display().to_string(),
        records: generated.records.len(),
        existing: generated
            .records
            .iter()
            .filter(|r| r.reconciliation.exists)
            .count(),
        missing_on_disk: &generated.missing_on_disk,
        unregistered_on_disk: &generated.unregistered_on_disk,
        warnings: &generated.warnings,
        declaration_issues: issues.len(),
    };
    tracing::info!(
        records = summary.records,
        existing = summary.existing,
        missing = summary.missing_on_disk.len(),
        unregistered = summary.unregistered_on_disk.len(),
        "Registry built"
    );

    if json {
        print_json(&summary)?;
    } else {
        println!(
            "Wrote {} ({} records, {} on disk, {} missing, {} unregistered)",
            summary.registry_path,
            summary.records,
            summary.existing,
            summary.missing_on_disk.len(),
            summary.unregistered_on_disk.len()
        );
        for warning in summary.warnings {
            println!("  warning: {warning}");
        }
    }
    Ok(EXIT_OK)
}

pub fn validate(config: &FolioConfig, json: bool) -> Result<u8, CommandError> {
    let catalog = Catalog::load(&config.catalog_path)?;
    let facts = LocalDisk::new(&config.site_root);
    let issues = catalog::validate(&catalog, &facts);

    let generatable = catalog
        .assets
        .iter()
        .filter(|d| catalog::declared_format(d).is_generatable())
        .count();
    let mut by_tier: BTreeMap<&str, usize> = BTreeMap::new();
    for d in &catalog.assets {
        *by_tier.entry(catalog::declared_tier(d).as_str()).or_default() += 1;
    }

    if json {
        print_json(&serde_json::json!({
            "descriptors": catalog.assets.len(),
            "generatable": generatable,
            "byTier": by_tier,
            "issues": issues,
        }))?;
    } else {
        println!(
            "{} descriptors, {} generatable, {} issue(s)",
            catalog.assets.len(),
            generatable,
            issues.len()
        );
        for issue in &issues {
            let level = match issue.severity {
                IssueSeverity::Error => "error",
                IssueSeverity::Warning => "warning",
            };
            println!("  {level}: [{}] {}", issue.asset_id, issue.message);
        }
    }
    Ok(if catalog::has_errors(&issues) {
        EXIT_FAILURE
    } else {
        EXIT_OK
    })
}

pub fn audit(config: &FolioConfig, json: bool) -> Result<u8, CommandError> {
    let (generated, _) = reconcile(config)?;
    let report = reg::audit(&generated);

    if json {
        print_json(&report)?;
    } else {
        for issue in report.broken_links() {
            println!(
                "BROKEN    {} ({})",
                issue.path,
                issue.asset_key.as_deref().unwrap_or("-")
            );
        }
        for issue in report.unlisted() {
            println!("UNLISTED  {}", issue.path);
        }
        println!(
            "{} record(s) checked, {} broken link(s), {} unlisted file(s)",
            report.records_checked,
            report.broken_links().count(),
            report.unlisted().count()
        );
    }
    Ok(if report.is_clean() { EXIT_OK } else { EXIT_FAILURE })
}

// ═══════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════

fn parse_tier(raw: &str) -> Result<AssetTier, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidArgument(format!("unknown tier '{raw}'")))
}

fn parse_type(raw: &str) -> Result<AssetType, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidArgument(format!("unknown asset type '{raw}'")))
}

/// Keep only records whose key also appears in `subset`.
fn narrow(records: &mut Vec<RuntimeAssetRecord>, subset: Vec<RuntimeAssetRecord>) {
    let keys: HashSet<String> = subset.into_iter().map(|r| r.key).collect();
    records.retain(|r| keys.contains(&r.key));
}

/// Apply every list filter; all of them must hold.
pub fn select(
    registry: &RuntimeRegistry,
    args: &ListArgs,
) -> Result<Vec<RuntimeAssetRecord>, CommandError> {
    let mut records = match &args.search {
        Some(query) => registry.search(query)?,
        None => registry.all(true)?,
    };
    if !args.include_missing {
        records.retain(|r| r.exists);
    }
    if let Some(tier) = &args.tier {
        narrow(&mut records, registry.by_tier(parse_tier(tier)?)?);
    }
    if let Some(asset_type) = &args.asset_type {
        narrow(&mut records, registry.by_type(parse_type(asset_type)?)?);
    }
    if args.interactive {
        narrow(&mut records, registry.interactive()?);
    }
    if args.fillable {
        narrow(&mut records, registry.fillable()?);
    }
    Ok(records)
}

fn row(r: &RuntimeAssetRecord) -> String {
    format!(
        "{:<36} {:<12} {:<10} {:<7} {}",
        r.key,
        r.tier.as_str(),
        r.asset_type.as_str(),
        if r.exists { "present" } else { "missing" },
        r.output_path
    )
}

pub fn list(config: &FolioConfig, args: &ListArgs) -> Result<u8, CommandError> {
    let registry = open_registry(config);
    let records = select(&registry, args)?;
    if args.json {
        print_json(&records)?;
    } else {
        for r in &records {
            println!("{}", row(r));
        }
        println!("{} record(s)", records.len());
    }
    Ok(EXIT_OK)
}

pub fn show(config: &FolioConfig, id: &str, json: bool) -> Result<u8, CommandError> {
    let registry = open_registry(config);
    let variants = registry.variants(id)?;
    if variants.is_empty() {
        return Err(RegistryError::NotFound(id.to_string()).into());
    }
    if json {
        print_json(&variants)?;
        return Ok(EXIT_OK);
    }

    let primary = &variants[0];
    println!("{} ({})", primary.title, primary.id);
    println!("  type: {}  tier: {}  version: {}", primary.asset_type, primary.tier, primary.version);
    println!(
        "  interactive: {}  fillable: {}  source: {} ({})",
        primary.interactive, primary.fillable, primary.source, primary.confidence
    );
    if !primary.description.is_empty() {
        println!("  {}", primary.description);
    }
    for v in &variants {
        let paper = v.paper_variant.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "  [{paper}] {} {} {}",
            v.output_path,
            if v.exists { "present" } else { "missing" },
            v.size_bytes
        );
    }
    Ok(EXIT_OK)
}

pub fn stats(config: &FolioConfig, json: bool) -> Result<u8, CommandError> {
    let stats = open_registry(config).stats()?;
    if json {
        print_json(&stats)?;
        return Ok(EXIT_OK);
    }
    println!(
        "{} records: {} present, {} missing, {} interactive, {} fillable",
        stats.total, stats.existing, stats.missing, stats.interactive, stats.fillable
    );
    for (tier, count) in &stats.by_tier {
        println!("  tier {tier:<14} {count}");
    }
    for (asset_type, count) in &stats.by_type {
        println!("  type {asset_type:<14} {count}");
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn site(dir: &Path) -> FolioConfig {
        let config = FolioConfig {
            site_root: dir.join("public"),
            catalog_path: dir.join("catalog.json"),
            registry_path: dir.join("generated/registry.json"),
            manifest_path: dir.join("public/assets/downloads/manifest.json"),
            ..FolioConfig::default()
        };
        let downloads = config.site_root.join("assets/downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::write(downloads.join("present.pdf"), b"%PDF-1.3 present").unwrap();
        std::fs::write(downloads.join("orphan.pdf"), b"%PDF-1.3 orphan").unwrap();
        std::fs::write(
            &config.catalog_path,
            r#"{"assets":[
                {"id":"present","title":"Present Guide","type":"guide","tier":"Public",
                 "format":"PDF","outputPath":"/assets/downloads/present.pdf"},
                {"id":"absent","title":"Absent Canvas","type":"canvas","tier":"architect",
                 "format":"PDF","outputPath":"/assets/downloads/absent.pdf",
                 "interactive":true,"fillable":true}
            ]}"#,
        )
        .unwrap();
        config
    }

    #[test]
    fn build_writes_registry_and_audit_flags_discrepancies() {
        let dir = tempfile::tempdir().unwrap();
        let config = site(dir.path());

        assert_eq!(build(&config, true).unwrap(), EXIT_OK);
        assert!(config.registry_path.exists());

        let (generated, _) = reconcile(&config).unwrap();
        let report = reg::audit(&generated);
        let unlisted: Vec<_> = report.unlisted().map(|i| i.path.as_str()).collect();
        assert_eq!(unlisted, vec!["/assets/downloads/orphan.pdf"]);
        assert_eq!(report.broken_links().count(), 1);
        assert_eq!(audit(&config, true).unwrap(), EXIT_FAILURE);
    }

    #[test]
    fn legacy_public_tier_lists_as_free() {
        let dir = tempfile::tempdir().unwrap();
        let config = site(dir.path());
        build(&config, true).unwrap();
        let registry = open_registry(&config);

        let free = select(
            &registry,
            &ListArgs {
                tier: Some("free".into()),
                ..ListArgs::default()
            },
        )
        .unwrap();
        let keys: Vec<_> = free.iter().map(|r| r.key.as_str()).collect();
        assert!(keys.contains(&"present"));

        let fillable_missing = select(
            &registry,
            &ListArgs {
                fillable: true,
                include_missing: true,
                ..ListArgs::default()
            },
        )
        .unwrap();
        assert_eq!(fillable_missing.len(), 1);
        assert_eq!(fillable_missing[0].id, "absent");
    }

    #[test]
    fn bad_filter_values_are_argument_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config = site(dir.path());
        build(&config, true).unwrap();
        let err = select(
            &open_registry(&config),
            &ListArgs {
                tier: Some("platinum".into()),
                ..ListArgs::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), crate::commands::EXIT_CONFIG);
    }

    #[test]
    fn show_unknown_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = site(dir.path());
        build(&config, true).unwrap();
        assert!(matches!(
            show(&config, "nope", true),
            Err(CommandError::Registry(RegistryError::NotFound(_)))
        ));
        assert_eq!(show(&config, "present", true).unwrap(), EXIT_OK);
    }
}
