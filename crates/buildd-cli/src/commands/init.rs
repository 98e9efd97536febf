//! Init command implementation

use std::path::PathBuf;

use color_eyre::eyre::{eyre, Context, Result};
use tracing::info;

const SAMPLE_CONFIG: &str = r#"# buildd configuration

# Architectures to build for, in polling order
architectures:
  - amd64

# Distributions to poll, in order
distributions:
  - sid

# Seconds to sleep when no job is pending
idle_sleep_time: 60

# Placeholders: {architecture} {distribution} {source_package}
#               {hostname} {short_hostname} {email} {keyid}
maintainer_email_template: "{architecture} Build Daemon ({short_hostname}) <{email}>"

# Parent directory of the per-job working directories
build_root: ~/build

# Defaults to the output of `hostname -f`
# hostname: buildd.example.org

queue:
  ssh_user: wb-buildd
  ssh_socket: buildd.debian.org.ssh
  ssh_host: buildd.debian.org
  command: wanna-build

upload:
  # Archive name -> dupload target
  targets:
    debian: rsync-ftp-master
    debian-security: rsync-security
    debian-ports: rsync-ports
  max_attempts: 3
  # Seconds between upload attempts
  retry_delay: 120

tools:
  build: sbuild
  upload: dupload
  gpg: gpg
  ssh: ssh
"#;

/// Init command implementation
pub struct InitCommand {
    output_path: PathBuf,
    force: bool,
}

impl InitCommand {
    pub fn new(output_path: PathBuf, force: bool) -> Self {
        Self { output_path, force }
    }

    pub fn execute(&self) -> Result<()> {
        info!("Initializing configuration file at {}", self.output_path.display());

        if self.output_path.exists() && !self.force {
            return Err(eyre!(
                "Configuration file already exists: {}. Use --force to overwrite.",
                self.output_path.display()
            ));
        }

        std::fs::write(&self.output_path, SAMPLE_CONFIG)
            .with_context(|| format!("Failed to write config to {}", self.output_path.display()))?;

        println!("✓ Created configuration file: {}", self.output_path.display());
        println!("\nNext steps:");
        println!("1. Set the architectures and distributions this host builds");
        println!(
            "2. Run 'buildd validate -c {}' to check the config and signing key",
            self.output_path.display()
        );
        println!("3. Run 'buildd run -c {}' to start building", self.output_path.display());

        Ok(())
    }
}
