//! Running external tools (sbuild, dupload)

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::Result;

/// One invocation of an external program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// Directory the program runs in
    pub cwd: PathBuf,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args, cwd: cwd.into(), env: Vec::new() }
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Runs external programs to completion
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the program and return its exit code, `None` if it was killed by
    /// a signal. Failing to start the program is an error.
    async fn run(&self, invocation: &ToolInvocation) -> Result<Option<i32>>;
}

/// Runs tools as child processes sharing the daemon's stdout and stderr
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<Option<i32>> {
        debug!(
            "Running {} {:?} in {}",
            invocation.program,
            invocation.args,
            invocation.cwd.display()
        );

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()
            .await?;

        Ok(status.code())
    }
}
