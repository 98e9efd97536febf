//! Main build loop

use std::time::Duration;

use buildd_core::{Key, PackageJob};
use buildd_queue::{QueueClient, QueueTransport};
use tracing::{debug, info, warn};

use crate::error::{BuildError, Result};
use crate::executor::BuildExecutor;
use crate::graceful_shutdown::ShutdownSignal;
use crate::keys::KeySource;
use crate::upload::UploadManager;
use crate::workdir::WorkDir;

/// Drives the daemon: select a key, take a job, build, upload, clean up.
///
/// Jobs are handled strictly one at a time. A shutdown request is honoured
/// between jobs and during idle waits, never in the middle of a build or an
/// upload.
pub struct BuildCoordinator<T> {
    queue: QueueClient<T>,
    keys: Box<dyn KeySource>,
    executor: BuildExecutor,
    uploader: UploadManager,
    shutdown: ShutdownSignal,
    idle_interval: Duration,
}

impl<T: QueueTransport> BuildCoordinator<T> {
    pub fn new(
        queue: QueueClient<T>,
        keys: Box<dyn KeySource>,
        executor: BuildExecutor,
        uploader: UploadManager,
        shutdown: ShutdownSignal,
        idle_interval: Duration,
    ) -> Self {
        Self { queue, keys, executor, uploader, shutdown, idle_interval }
    }

    /// Run cycles until shutdown is requested or a cycle fails
    pub async fn run(&self) -> Result<()> {
        info!("Starting build loop");
        while self.handle_next().await? {}
        info!("Shutting down");
        Ok(())
    }

    /// Run one cycle. Returns `false` once the loop should stop.
    pub async fn handle_next(&self) -> Result<bool> {
        if self.shutdown.is_triggered() {
            debug!("Shutdown flag set, not taking new jobs");
            return Ok(false);
        }

        let key = self.active_key().await?;

        let Some(job) = self.queue.next_job().await? else {
            info!("Nothing to do, sleeping for {}s", self.idle_interval.as_secs());
            self.shutdown.wait_timeout(self.idle_interval).await;
            return Ok(true);
        };

        let workdir = WorkDir::new(self.executor.work_dir(&job));
        let result = self.process(&job, &key, &workdir).await;
        let cleanup = workdir.remove();

        if let (Err(_), Err(e)) = (&result, &cleanup) {
            warn!("Failed to clean up {}: {}", workdir.path().display(), e);
        }
        result?;
        cleanup?;
        Ok(true)
    }

    async fn active_key(&self) -> Result<Key> {
        match self.keys.active_key().await {
            Ok(key) if key.email.is_none() => Err(BuildError::configuration(format!(
                "GPG signing key {} has no user ID with an email address",
                key.keyid
            ))),
            Ok(key) => Ok(key),
            Err(buildd_core::Error::KeyNotFound) => {
                Err(BuildError::configuration("No valid GPG signing key found"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn process(&self, job: &PackageJob, key: &Key, workdir: &WorkDir) -> Result<()> {
        let outcome = self.executor.build(job, key, workdir, &self.queue).await?;
        if outcome.is_success() {
            self.uploader.upload(job, workdir.path(), &self.queue).await?;
        }
        Ok(())
    }
}
