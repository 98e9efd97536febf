//! Queue client: listing, taking and reporting jobs

use buildd_core::{PackageJob, Verdict};
use tracing::{debug, info};

use crate::error::Result;
use crate::parse::{parse_pending, parse_take_response, JobIdentifier};
use crate::transport::QueueTransport;

/// Client for the wanna-build job queue
#[derive(Debug)]
pub struct QueueClient<T> {
    transport: T,
    /// Architectures polled, in order (inner loop)
    architectures: Vec<String>,
    /// Distributions polled, in order (outer loop)
    distributions: Vec<String>,
}

impl<T: QueueTransport> QueueClient<T> {
    /// Create a new queue client
    pub fn new(transport: T, architectures: Vec<String>, distributions: Vec<String>) -> Self {
        Self { transport, architectures, distributions }
    }

    /// Jobs waiting to be built for one architecture and distribution
    pub async fn list_pending(
        &self,
        architecture: &str,
        distribution: &str,
    ) -> Result<Vec<String>> {
        let response = self
            .transport
            .query(architecture, distribution, &["--list=needs-build".to_string()])
            .await?;
        Ok(parse_pending(&response))
    }

    /// Try to claim a pending job.
    ///
    /// Returns `None` when another daemon claimed it first.
    pub async fn take(&self, identifier: &str) -> Result<Option<PackageJob>> {
        let id = JobIdentifier::parse(identifier)?;
        let response = self
            .transport
            .query(
                &id.architecture,
                &id.distribution,
                &["--take".to_string(), identifier.to_string()],
            )
            .await?;
        parse_take_response(&response)
    }

    /// Send a status update. Failures are returned, never retried.
    pub async fn report(
        &self,
        architecture: &str,
        distribution: &str,
        verdict: Verdict,
        version: &str,
    ) -> Result<()> {
        info!("Reporting {} as {} for {}/{}", version, verdict, architecture, distribution);
        self.transport
            .query(architecture, distribution, &[verdict.flag(), version.to_string()])
            .await?;
        Ok(())
    }

    /// Report a verdict for a job using its binary version
    pub async fn report_job(&self, job: &PackageJob, verdict: Verdict) -> Result<()> {
        self.report(
            job.architecture(),
            job.distribution(),
            verdict,
            &job.source_package_binary_version(),
        )
        .await
    }

    /// Find the next job to build.
    ///
    /// Walks distributions (outer) and architectures (inner) in configured
    /// order and tries to take the first pending job of each pair. A lost take
    /// moves on to the next pair; `None` means every pair came up empty.
    pub async fn next_job(&self) -> Result<Option<PackageJob>> {
        for distribution in &self.distributions {
            for architecture in &self.architectures {
                let pending = self.list_pending(architecture, distribution).await?;
                let Some(first) = pending.first() else {
                    debug!("Nothing pending for {}/{}", architecture, distribution);
                    continue;
                };

                if let Some(job) = self.take(first).await? {
                    return Ok(Some(job));
                }
            }
        }

        Ok(None)
    }
}
