//! Upload of built packages with dupload

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use buildd_core::{PackageJob, Verdict};
use buildd_queue::{QueueClient, QueueTransport};
use tracing::{error, info};

use crate::error::{BuildError, Result};
use crate::recovery::RetryPolicy;
use crate::runner::{ToolInvocation, ToolRunner};

/// Uploads `.changes` files to the target configured for their archive
pub struct UploadManager {
    targets: BTreeMap<String, String>,
    upload_tool: String,
    runner: Arc<dyn ToolRunner>,
    policy: RetryPolicy,
}

impl UploadManager {
    pub fn new(
        targets: BTreeMap<String, String>,
        upload_tool: impl Into<String>,
        runner: Arc<dyn ToolRunner>,
        policy: RetryPolicy,
    ) -> Self {
        Self { targets, upload_tool: upload_tool.into(), runner, policy }
    }

    /// dupload target for an archive, if one is configured
    pub fn target(&self, archive: &str) -> Option<&str> {
        self.targets.get(archive).map(String::as_str)
    }

    /// Upload a built job and report the result.
    ///
    /// Reports `uploaded` on success. When every attempt fails the job is
    /// given back and the last error is returned. An archive without a
    /// target is neither uploaded nor reported.
    pub async fn upload<T: QueueTransport>(
        &self,
        job: &PackageJob,
        workdir: &Path,
        queue: &QueueClient<T>,
    ) -> Result<()> {
        let Some(target) = self.target(job.archive()) else {
            error!("Could not upload {} to {}: no upload target configured", job, job.archive());
            return Err(BuildError::UnknownArchive { archive: job.archive().to_string() });
        };

        info!("Uploading {} to {}", job.changes_file(), target);
        let invocation = ToolInvocation::new(
            self.upload_tool.clone(),
            vec!["--to".to_string(), target.to_string(), job.changes_file().to_string()],
            workdir,
        );

        let runner = &self.runner;
        let invocation = &invocation;
        let result = self
            .policy
            .run("upload", move || async move {
                match runner.run(invocation).await? {
                    Some(0) => Ok(()),
                    Some(code) => {
                        Err(BuildError::tool_failed(&invocation.program, code.to_string()))
                    }
                    None => Err(BuildError::tool_failed(&invocation.program, "signal")),
                }
            })
            .await;

        match result {
            Ok(()) => {
                info!("Uploaded {}", job);
                queue.report_job(job, Verdict::Uploaded).await?;
                Ok(())
            }
            Err(e) => {
                error!("Giving up on uploading {}: {}", job, e);
                queue.report_job(job, Verdict::GiveBack).await?;
                Err(e)
            }
        }
    }
}
