//! Validate command implementation

use std::path::PathBuf;

use buildd_build::{GpgKeyLister, KeySource};
use color_eyre::eyre::{Context, Result};
use tracing::{info, warn};

use super::load_config;

/// Validate command implementation
pub struct ValidateCommand {
    config_path: Option<PathBuf>,
}

impl ValidateCommand {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    pub async fn execute(&self) -> Result<()> {
        info!("Validating configuration and signing key");

        let config = load_config(self.config_path.as_ref())?;
        println!("✓ Configuration loaded successfully");
        println!("  Architectures: {}", config.architectures.join(", "));
        println!("  Distributions: {}", config.distributions.join(", "));
        println!("  Build root: {}", config.build_root.display());
        for (archive, target) in &config.upload.targets {
            println!("  Upload {archive} -> {target}");
        }

        if !config.build_root.exists() {
            warn!("Build root does not exist yet: {}", config.build_root.display());
        }

        let key = GpgKeyLister::new(&config.tools.gpg)
            .active_key()
            .await
            .context("No usable signing key")?;
        println!(
            "✓ Signing key {} ({}) valid for {} more days",
            key.keyid,
            key.email.as_deref().unwrap_or("no email"),
            key.expiry.num_days()
        );

        println!("\n✓ All validation checks passed!");
        Ok(())
    }
}
