//! Build execution for the buildd build daemon
//!
//! This crate runs sbuild for jobs taken from the queue, uploads the results
//! with dupload, and drives the main polling loop with cooperative shutdown.

pub mod coordinator;
pub mod error;
pub mod executor;
pub mod graceful_shutdown;
pub mod keys;
pub mod recovery;
pub mod runner;
pub mod upload;
pub mod workdir;

pub use coordinator::BuildCoordinator;
pub use error::{BuildError, Result};
pub use executor::{BuildExecutor, ExecutorConfig};
pub use graceful_shutdown::{setup_signal_handler, ShutdownSignal};
pub use keys::{GpgKeyLister, KeySource};
pub use recovery::RetryPolicy;
pub use runner::{ProcessRunner, ToolInvocation, ToolRunner};
pub use upload::UploadManager;
pub use workdir::WorkDir;
