//! Per-job working directory

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// Working directory owned by the job in flight.
///
/// [`WorkDir::remove`] is idempotent. If the directory is still present when
/// the value is dropped (for example while unwinding), it is removed then.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory and its parents if absent
    pub async fn create(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Remove the directory tree. A missing directory is not an error.
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {
                debug!("Removed working directory {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = self.remove() {
                warn!("Failed to remove working directory {}: {}", self.path.display(), e);
            }
        }
    }
}
