//! Run command implementation

use std::path::PathBuf;
use std::sync::Arc;

use buildd_build::{
    setup_signal_handler, BuildCoordinator, BuildExecutor, ExecutorConfig, GpgKeyLister,
    ProcessRunner, RetryPolicy, ShutdownSignal, ToolRunner, UploadManager,
};
use buildd_config::Config;
use buildd_queue::{QueueClient, WannaBuildSsh};
use color_eyre::eyre::{eyre, Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use super::load_config;

/// Run command implementation
pub struct RunCommand {
    config_path: Option<PathBuf>,
}

impl RunCommand {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = load_config(self.config_path.as_ref())?;
        let hostname = resolve_hostname(&config).await?;
        info!(
            "Starting buildd on {} for {} ({})",
            hostname,
            config.architectures.join(", "),
            config.distributions.join(", ")
        );

        let shutdown = ShutdownSignal::new();
        setup_signal_handler(shutdown.clone()).context("Failed to install signal handler")?;

        let coordinator = build_coordinator(&config, hostname, shutdown);
        coordinator.run().await.context("Build loop failed")?;
        Ok(())
    }
}

fn build_coordinator(
    config: &Config,
    hostname: String,
    shutdown: ShutdownSignal,
) -> BuildCoordinator<WannaBuildSsh> {
    let transport = WannaBuildSsh::new(
        &config.tools.ssh,
        &config.queue.ssh_user,
        &config.queue.ssh_socket,
        &config.queue.ssh_host,
        &config.queue.command,
    );
    let queue =
        QueueClient::new(transport, config.architectures.clone(), config.distributions.clone());

    let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner);
    let executor = BuildExecutor::new(
        ExecutorConfig {
            build_tool: config.tools.build.clone(),
            build_root: config.build_root.clone(),
            hostname,
            user: local_user(),
            maintainer_template: config.maintainer_email_template.clone(),
            parallel_jobs: parallel_jobs(),
        },
        Arc::clone(&runner),
    );
    debug!("Executor configuration: {:?}", executor.config());

    let uploader = UploadManager::new(
        config.upload.targets.clone(),
        &config.tools.upload,
        runner,
        RetryPolicy::new(config.upload.max_attempts, config.upload_retry_delay()),
    );

    BuildCoordinator::new(
        queue,
        Box::new(GpgKeyLister::new(&config.tools.gpg)),
        executor,
        uploader,
        shutdown,
        config.idle_interval(),
    )
}

/// Configured host name, or the fully qualified name reported by `hostname -f`
pub async fn resolve_hostname(config: &Config) -> Result<String> {
    if let Some(hostname) = &config.hostname {
        return Ok(hostname.clone());
    }

    let output = Command::new("hostname")
        .arg("-f")
        .output()
        .await
        .context("Failed to run hostname -f")?;
    if !output.status.success() {
        return Err(eyre!("hostname -f exited with {}", output.status));
    }

    let hostname = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hostname.is_empty() {
        return Err(eyre!("hostname -f returned an empty name; set hostname in the config"));
    }
    Ok(hostname)
}

fn local_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "buildd".to_string())
}

fn parallel_jobs() -> usize {
    std::thread::available_parallelism().map(usize::from).unwrap_or(1)
}
