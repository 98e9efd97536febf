//! Main CLI entry point for the buildd build daemon

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

mod commands;

/// buildd - build packages taken from wanna-build and upload them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    quiet: u8,

    /// Configuration file (default: /etc/buildd.yaml overlaid by ~/.buildd.yaml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Take jobs from the queue and build them until SIGUSR1
    Run,

    /// Check the configuration and the signing key
    Validate,

    /// Write a sample configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, value_name = "FILE", default_value = "buildd.yaml")]
        output: PathBuf,

        /// Force overwrite existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet)?;

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::RunCommand::new(cli.config).execute().await,
        Commands::Validate => commands::ValidateCommand::new(cli.config).execute().await,
        Commands::Init { output, force } => commands::InitCommand::new(output, force).execute(),
    };

    // Supervision restarts the daemon on a non-zero exit
    if let Err(e) = result {
        tracing::error!("{:?}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn setup_logging(verbose: u8, quiet: u8) -> Result<()> {
    let log_level = match (verbose, quiet) {
        (0, 0) => "info",
        (1, 0) => "debug",
        (_, 0) => "trace",
        (0, 1) => "warn",
        (0, 2) => "error",
        (0, _) => "off",
        _ => "info",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}
