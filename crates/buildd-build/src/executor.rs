//! Build executor running sbuild for a single job

use std::path::PathBuf;
use std::sync::Arc;

use buildd_core::{BuildOutcome, Key, PackageJob};
use buildd_queue::{QueueClient, QueueTransport};
use tracing::{debug, info};

use crate::error::Result;
use crate::runner::{ToolInvocation, ToolRunner};
use crate::workdir::WorkDir;

/// Build executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Build tool to run
    pub build_tool: String,
    /// Parent of the per-job working directories
    pub build_root: PathBuf,
    /// Fully qualified host name
    pub hostname: String,
    /// Local user the daemon runs as
    pub user: String,
    /// Template for the maintainer field
    pub maintainer_template: String,
    /// Value for `DEB_BUILD_OPTIONS=parallel=N`
    pub parallel_jobs: usize,
}

impl ExecutorConfig {
    /// First label of the host name
    pub fn short_hostname(&self) -> &str {
        self.hostname.split('.').next().unwrap_or(&self.hostname)
    }

    /// Sender address for build log mails
    pub fn mail_from(&self) -> String {
        format!("buildd on {} <{}@{}>", self.short_hostname(), self.user, self.hostname)
    }

    /// Maintainer address for a job signed with `key`
    pub fn maintainer(&self, job: &PackageJob, key: &Key) -> String {
        let placeholders = [
            ("{architecture}", job.architecture()),
            ("{distribution}", job.distribution()),
            ("{source_package}", job.source_package()),
            ("{short_hostname}", self.short_hostname()),
            ("{hostname}", self.hostname.as_str()),
            ("{email}", key.email.as_deref().unwrap_or_default()),
            ("{keyid}", key.keyid.as_str()),
        ];

        placeholders
            .iter()
            .fold(self.maintainer_template.clone(), |rendered, (placeholder, value)| {
                rendered.replace(placeholder, value)
            })
    }
}

/// Runs sbuild and classifies its exit status
pub struct BuildExecutor {
    config: ExecutorConfig,
    runner: Arc<dyn ToolRunner>,
}

impl BuildExecutor {
    /// Create a new build executor
    pub fn new(config: ExecutorConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Working directory of a job
    pub fn work_dir(&self, job: &PackageJob) -> PathBuf {
        self.config.build_root.join(job.work_dir_name())
    }

    /// sbuild arguments for a job
    pub fn command_line(&self, job: &PackageJob, key: &Key) -> Vec<String> {
        let mut cmd = vec![
            "--apt-update".to_string(),
            "--no-apt-upgrade".to_string(),
            "--no-apt-distupgrade".to_string(),
            "--no-run-lintian".to_string(),
            "--batch".to_string(),
            format!("--dist={}", job.distribution()),
            "--sbuild-mode=buildd".to_string(),
            format!("--mailfrom={}", self.config.mail_from()),
            format!("--maintainer={}", self.config.maintainer(job, key)),
            format!("--keyid={}", key.keyid),
        ];

        if job.architecture() == "all" {
            cmd.extend(["--arch-all".to_string(), "--no-arch-any".to_string()]);
        } else {
            cmd.extend([format!("--arch={}", job.architecture()), "--no-arch-all".to_string()]);
        }

        if let Some(resolver) = job.build_dep_resolver() {
            cmd.push(format!("--build-dep-resolver={resolver}"));
        }
        if let Some(mail_logs) = job.mail_logs() {
            cmd.push(format!("--mail-log-to={mail_logs}"));
        }
        if let (Some(binnmu), Some(changelog)) = (job.binnmu(), job.binnmu_changelog()) {
            cmd.push(format!("--binNMU={binnmu}"));
            cmd.push(format!("--make-binNMU={changelog}"));
        }
        if let Some(depends) = job.extra_depends() {
            cmd.push(format!("--add-depends={depends}"));
        }
        if let Some(conflicts) = job.extra_conflicts() {
            cmd.push(format!("--add-conflicts={conflicts}"));
        }

        cmd.push(job.source_package_version());
        cmd
    }

    /// Build a job and report the verdict to the queue.
    ///
    /// The build tool's exit status never turns into an error; only failing
    /// to start it, to create the working directory or to report does.
    pub async fn build<T: QueueTransport>(
        &self,
        job: &PackageJob,
        key: &Key,
        workdir: &WorkDir,
        queue: &QueueClient<T>,
    ) -> Result<BuildOutcome> {
        info!("Building {}...", job);
        debug!("Metadata: {:?}", job);

        workdir.create().await?;

        let invocation = ToolInvocation::new(
            self.config.build_tool.clone(),
            self.command_line(job, key),
            workdir.path(),
        )
        .with_env("DEB_BUILD_OPTIONS", format!("parallel={}", self.config.parallel_jobs));

        let code = self.runner.run(&invocation).await?;
        let outcome = BuildOutcome::from_exit_code(code);
        match outcome {
            BuildOutcome::Built => info!("Build of {} succeeded.", job),
            BuildOutcome::Attempted => info!("Build of {} attempted unsuccessfully.", job),
            BuildOutcome::GiveBack => match code {
                Some(code) => info!("Build of {} exited with {}: giving back.", job, code),
                None => info!("Build of {} was killed by a signal: giving back.", job),
            },
        }

        queue.report_job(job, outcome.verdict()).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;

    struct NeverRun;

    #[async_trait]
    impl ToolRunner for NeverRun {
        async fn run(&self, _invocation: &ToolInvocation) -> Result<Option<i32>> {
            unreachable!("command construction must not run tools")
        }
    }

    fn config() -> ExecutorConfig {
        ExecutorConfig {
            build_tool: "sbuild".to_string(),
            build_root: PathBuf::from("/home/buildd/build"),
            hostname: "host.example.org".to_string(),
            user: "user".to_string(),
            maintainer_template: "{architecture} Build Daemon ({short_hostname}) <{email}>"
                .to_string(),
            parallel_jobs: 4,
        }
    }

    fn key() -> Key {
        Key::new(
            "DFE4C0B481F37BDB",
            Duration::days(30),
            Some("buildd_arch-hostname@example.com".to_string()),
        )
    }

    fn job(extra: &[(&str, &str)]) -> PackageJob {
        let mut fields: HashMap<String, String> = [
            ("pkg-ver", "pkg_1.2-3"),
            ("arch", "arch"),
            ("archive", "debian"),
            ("suite", "sid"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            fields.insert(k.to_string(), v.to_string());
        }
        PackageJob::from_fields("pkg", &fields).unwrap()
    }

    fn executor() -> BuildExecutor {
        BuildExecutor::new(config(), Arc::new(NeverRun))
    }

    #[test]
    fn test_email_addresses() {
        let config = config();
        assert_eq!(config.short_hostname(), "host");
        assert_eq!(config.mail_from(), "buildd on host <user@host.example.org>");
        assert_eq!(
            config.maintainer(&job(&[]), &key()),
            "arch Build Daemon (host) <buildd_arch-hostname@example.com>"
        );
    }

    #[test]
    fn test_construct_sbuild_cmd() {
        let cmd = executor().command_line(&job(&[("extra-depends", "glibc (>> 1)")]), &key());

        assert_eq!(cmd[0], "--apt-update");
        assert!(cmd.contains(&"--batch".to_string()));
        assert!(cmd.contains(&"--dist=sid".to_string()));
        assert!(cmd.contains(
            &"--maintainer=arch Build Daemon (host) <buildd_arch-hostname@example.com>".to_string()
        ));
        assert!(cmd.contains(&"--keyid=DFE4C0B481F37BDB".to_string()));
        assert!(cmd.contains(&"--arch=arch".to_string()));
        assert!(cmd.contains(&"--no-arch-all".to_string()));
        assert!(cmd.contains(&"--add-depends=glibc (>> 1)".to_string()));
        assert!(!cmd.iter().any(|arg| arg.starts_with("--add-conflicts")));
        assert_eq!(cmd.last().map(String::as_str), Some("pkg_1.2-3"));
    }

    #[test]
    fn test_arch_all_build() {
        let cmd = executor().command_line(&job(&[("arch", "all")]), &key());

        assert!(cmd.contains(&"--arch-all".to_string()));
        assert!(cmd.contains(&"--no-arch-any".to_string()));
        assert!(!cmd.iter().any(|arg| arg.starts_with("--arch=")));
    }

    #[test]
    fn test_binnmu_requires_changelog() {
        let cmd = executor().command_line(&job(&[("binNMU", "2")]), &key());
        assert!(!cmd.iter().any(|arg| arg.starts_with("--binNMU")));

        let cmd = executor().command_line(
            &job(&[("binNMU", "2"), ("extra-changelog", "Rebuild against libfoo2.")]),
            &key(),
        );
        assert!(cmd.contains(&"--binNMU=2".to_string()));
        assert!(cmd.contains(&"--make-binNMU=Rebuild against libfoo2.".to_string()));
        // sbuild is handed the source version; it appends the binNMU suffix.
        assert_eq!(cmd.last().map(String::as_str), Some("pkg_1.2-3"));
    }

    #[test]
    fn test_optional_flags() {
        let cmd = executor().command_line(
            &job(&[
                ("build_dep_resolver", "aptitude"),
                ("mail_logs", "logs@example.com"),
                ("extra-conflicts", "libbar"),
            ]),
            &key(),
        );

        assert!(cmd.contains(&"--build-dep-resolver=aptitude".to_string()));
        assert!(cmd.contains(&"--mail-log-to=logs@example.com".to_string()));
        assert!(cmd.contains(&"--add-conflicts=libbar".to_string()));
    }

    #[test]
    fn test_work_dir_uses_epochless_source_version() {
        let job = job(&[("pkg-ver", "pkg_1:1.2-3"), ("binNMU", "1")]);
        assert_eq!(executor().work_dir(&job), PathBuf::from("/home/buildd/build/pkg_1.2-3"));
    }
}
