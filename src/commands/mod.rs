//! CLI command handlers. Each returns the process exit code on success;
//! errors map to codes through [`CommandError::exit_code`].

pub mod generate;
pub mod registry;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::cli::Commands;
use crate::config::{ConfigError, FolioConfig};
use crate::pipeline::PipelineError;
use crate::registry::RegistryError;
use crate::render::RenderError;

/// Exit code for a clean run.
pub const EXIT_OK: u8 = 0;
/// Exit code when any item or check failed.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for unusable configuration or arguments.
pub const EXIT_CONFIG: u8 = 2;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CommandError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_)
            | Self::InvalidArgument(_)
            | Self::Render(_)
            | Self::Pipeline(PipelineError::Render(_))
            | Self::Pipeline(PipelineError::EmptySelection) => EXIT_CONFIG,
            _ => EXIT_FAILURE,
        }
    }
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn dispatch(command: Commands, config: &FolioConfig) -> Result<u8, CommandError> {
    match command {
        Commands::Build { json } => registry::build(config, json),
        Commands::Validate { json } => registry::validate(config, json),
        Commands::Audit { json } => registry::audit(config, json),
        Commands::List(args) => registry::list(config, &args),
        Commands::Show { id, json } => registry::show(config, &id, json),
        Commands::Stats { json } => registry::stats(config, json),
        Commands::Generate(args) => generate::generate(config, args).await,
        Commands::Batch(args) => generate::batch(config, args).await,
    }
}
