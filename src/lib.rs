pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod render;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::FolioConfig;

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Config first: its log_filter feeds the subscriber.
    let loaded = FolioConfig::load(cli.config.as_deref());
    let filter = match &loaded {
        Ok(config) => config.log_filter().to_string(),
        Err(_) => config::default_log_filter().to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration rejected");
            eprintln!("error: {e}");
            return ExitCode::from(commands::EXIT_CONFIG);
        }
    };
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: cannot start runtime: {e}");
            return ExitCode::from(commands::EXIT_FAILURE);
        }
    };

    match runtime.block_on(commands::dispatch(cli.command, &config)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
