//! CLI command implementations

pub mod init;
pub mod run;
pub mod validate;

use std::path::PathBuf;

use buildd_config::Config;
use color_eyre::eyre::{Context, Result};

pub use init::InitCommand;
pub use run::RunCommand;
pub use validate::ValidateCommand;

/// Load the given configuration file, or the first one found in the default
/// locations
pub fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::discover().context("Failed to load configuration"),
    }
}
