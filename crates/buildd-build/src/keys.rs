//! Sources of the signing key listing

use async_trait::async_trait;
use buildd_core::error::{Error, Result};
use buildd_core::{select_active_key, Key};
use chrono::Utc;
use tokio::process::Command;
use tracing::debug;

/// Provides the signing key to use right now
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Select the active key; `Error::KeyNotFound` when none is usable
    async fn active_key(&self) -> Result<Key>;
}

/// Reads secret keys from the local GPG keyring
#[derive(Debug, Clone)]
pub struct GpgKeyLister {
    gpg: String,
}

impl GpgKeyLister {
    pub fn new(gpg: impl Into<String>) -> Self {
        Self { gpg: gpg.into() }
    }

    /// Raw `--with-colons` listing of the secret keyring
    pub async fn listing(&self) -> Result<String> {
        let output = Command::new(&self.gpg)
            .args(["--with-colons", "--list-secret-keys"])
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::InvalidKeyListing {
                reason: format!(
                    "{} exited with {}: {}",
                    self.gpg,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| Error::InvalidKeyListing {
            reason: format!("non UTF-8 output: {e}"),
        })
    }
}

impl Default for GpgKeyLister {
    fn default() -> Self {
        Self::new("gpg")
    }
}

#[async_trait]
impl KeySource for GpgKeyLister {
    async fn active_key(&self) -> Result<Key> {
        let listing = self.listing().await?;
        let key = select_active_key(&listing, Utc::now())?;
        debug!("Selected key {} expiring in {}s", key.keyid, key.expiry.num_seconds());
        Ok(key)
    }
}
