//! Transport used to reach wanna-build

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{QueueError, Result};

/// Carries one request to the queue and returns its raw answer
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Run a queue command scoped to one architecture and distribution
    async fn query(&self, architecture: &str, distribution: &str, args: &[String])
        -> Result<String>;
}

/// Talks to wanna-build through an established SSH control socket
#[derive(Debug, Clone)]
pub struct WannaBuildSsh {
    /// SSH client binary
    ssh: String,
    user: String,
    socket: String,
    host: String,
    /// Remote wanna-build command
    command: String,
}

impl WannaBuildSsh {
    /// Create a new transport
    pub fn new(
        ssh: impl Into<String>,
        user: impl Into<String>,
        socket: impl Into<String>,
        host: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            ssh: ssh.into(),
            user: user.into(),
            socket: socket.into(),
            host: host.into(),
            command: command.into(),
        }
    }

    /// Full argument vector for a query, without the ssh binary itself
    pub fn command_line(
        &self,
        architecture: &str,
        distribution: &str,
        args: &[String],
    ) -> Vec<String> {
        let mut cmd = vec![
            "-l".to_string(),
            self.user.clone(),
            "-S".to_string(),
            self.socket.clone(),
            self.host.clone(),
            self.command.clone(),
            "--api=2".to_string(),
            format!("--arch={architecture}"),
            format!("--dist={distribution}"),
        ];
        cmd.extend(args.iter().cloned());
        cmd
    }
}

#[async_trait]
impl QueueTransport for WannaBuildSsh {
    async fn query(
        &self,
        architecture: &str,
        distribution: &str,
        args: &[String],
    ) -> Result<String> {
        debug!("Querying for {}/{}: {:?}", architecture, distribution, args);

        let cmd = self.command_line(architecture, distribution, args);
        let output = Command::new(&self.ssh).args(&cmd).output().await?;

        if !output.status.success() {
            return Err(QueueError::CommandFailed {
                command: format!("{} {}", self.ssh, cmd.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|e| QueueError::invalid_response(format!("non UTF-8 output: {e}")))
    }
}
