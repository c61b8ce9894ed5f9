use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "folio",
    about = "Folio: build, reconcile and generate a site's downloadable document library",
    version
)]
pub struct Cli {
    /// Config file (default: $FOLIO_CONFIG, then ./folio.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the catalog against storage and write the generated registry
    Build {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check catalog declarations without touching the registry
    Validate {
        #[arg(long)]
        json: bool,
    },

    /// Report broken links and unlisted files; exit 1 on any discrepancy
    Audit {
        #[arg(long)]
        json: bool,
    },

    /// List registry records
    List(ListArgs),

    /// Show every paper variant of one asset
    Show {
        /// Asset id
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Aggregate counts by tier, type, existence and interactivity
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Generate one asset
    Generate(GenerateArgs),

    /// Generate a selection of assets in bounded concurrent batches
    Batch(BatchArgs),
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only this tier (free, member, architect, inner-circle)
    #[arg(long)]
    pub tier: Option<String>,

    /// Only this asset type
    #[arg(long = "type")]
    pub asset_type: Option<String>,

    /// Only interactive records
    #[arg(long)]
    pub interactive: bool,

    /// Only fillable records
    #[arg(long)]
    pub fillable: bool,

    /// Free-text search over title, description and tags
    #[arg(long)]
    pub search: Option<String>,

    /// Include records whose file does not exist
    #[arg(long)]
    pub include_missing: bool,

    #[arg(long)]
    pub json: bool,
}

/// Render overrides shared by `generate` and `batch`.
#[derive(Args, Debug, Default)]
pub struct RenderArgs {
    /// Quality tier: draft, standard or premium
    #[arg(long, default_value = "standard")]
    pub quality: String,

    /// Watermark tier; defaults to each record's own tier
    #[arg(long)]
    pub presentation_tier: Option<String>,

    /// Force interactive on or off (`--interactive` alone means on)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub interactive: Option<bool>,

    /// Force fillable on or off (`--fillable` alone means on)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub fillable: Option<bool>,

    /// Directory site paths are written under (default: config site_root)
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Leave the manifest untouched
    #[arg(long)]
    pub skip_manifest: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Asset id
    pub id: String,

    /// Paper format: A4, Letter or A3
    #[arg(long, default_value = "A4")]
    pub paper: String,

    #[command(flatten)]
    pub render: RenderArgs,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("selection").required(true).args(["ids", "missing", "all"])))]
pub struct BatchArgs {
    /// Explicit asset ids
    pub ids: Vec<String>,

    /// Every generatable record whose file does not exist
    #[arg(long)]
    pub missing: bool,

    /// Every generatable catalog record
    #[arg(long)]
    pub all: bool,

    /// Paper format override; default is each record's own variant
    #[arg(long)]
    pub paper: Option<String>,

    /// Concurrent generations (default: config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Items per batch (default: config)
    #[arg(long)]
    pub batch_size: Option<usize>,

    #[command(flatten)]
    pub render: RenderArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_defaults_and_overrides() {
        let cli = Cli::parse_from(["folio", "generate", "grid", "--paper", "letter", "--fillable"]);
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.id, "grid");
        assert_eq!(args.paper, "letter");
        assert_eq!(args.render.quality, "standard");
        assert_eq!(args.render.fillable, Some(true));
        assert_eq!(args.render.interactive, None);
    }

    #[test]
    fn batch_requires_a_selection() {
        assert!(Cli::try_parse_from(["folio", "batch"]).is_err());
        assert!(Cli::try_parse_from(["folio", "batch", "--missing", "--all"]).is_err());
        let cli = Cli::parse_from(["folio", "--config", "x.toml", "batch", "a", "b"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        let Commands::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.ids, vec!["a", "b"]);
    }
}
