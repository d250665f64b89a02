//! pfx-export - export store certificates to PKCS#12 and PEM
//!
//! Commands:
//! - `list`: enumerate a certificate store
//! - `export`: store certificate → PKCS#12 archive → PEM files
//! - `convert`: existing PKCS#12 archive → PEM files
//! - `history`: recent runs from the history archive

use clap::Parser;
use console::style;
use pfx_export::cli::{Cli, Commands};
use pfx_export::commands;
use pfx_export::config;
use pfx_export::models::PipelineState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(PipelineState::Complete) => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Run the selected command; `list` and `history` report `Complete` on success
async fn run(cli: Cli) -> anyhow::Result<PipelineState> {
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let settings = config::load_config(cli.config.as_deref())?;
    tracing::debug!("Loaded settings: {:?}", settings);

    match cli.command {
        Commands::List(args) => {
            commands::run_list(&settings, &args)?;
            Ok(PipelineState::Complete)
        }
        Commands::Export(args) => commands::run_export(&settings, &args).await,
        Commands::Convert(args) => commands::run_convert(&settings, &args).await,
        Commands::History(args) => {
            commands::run_history(&settings, &args)?;
            Ok(PipelineState::Complete)
        }
    }
}
