//! Cooperative shutdown between jobs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::Result;

/// One-shot flag asking the daemon to stop after the current job.
///
/// Clones share the same flag. Once triggered it is never cleared.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    notify: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(false);
        Self { triggered: Arc::new(AtomicBool::new(false)), notify: Arc::new(notify) }
    }

    /// Request shutdown and wake up anyone waiting in [`Self::wait_timeout`]
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::AcqRel) {
            info!("Shutdown requested; finishing the current job first");
        }
        self.notify.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless shutdown is requested first.
    ///
    /// Returns `true` when the wait ended because of a shutdown request.
    pub async fn wait_timeout(&self, duration: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }

        let mut receiver = self.notify.subscribe();
        tokio::select! {
            result = receiver.wait_for(|triggered| *triggered) => result.is_ok(),
            _ = tokio::time::sleep(duration) => self.is_triggered(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger `shutdown` when the process receives SIGUSR1
pub fn setup_signal_handler(shutdown: ShutdownSignal) -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigusr1 = signal::unix::signal(signal::unix::SignalKind::user_defined1())?;
        tokio::spawn(async move {
            while sigusr1.recv().await.is_some() {
                info!("Received SIGUSR1");
                shutdown.trigger();
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C");
                shutdown.trigger();
            }
        });
    }

    debug!("Signal handler installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_is_shared_and_sticky() {
        let shutdown = ShutdownSignal::new();
        let clone = shutdown.clone();
        assert!(!clone.is_triggered());

        shutdown.trigger();
        shutdown.trigger();
        assert!(clone.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_runs_full_duration_without_shutdown() {
        let shutdown = ShutdownSignal::new();
        let start = tokio::time::Instant::now();

        assert!(!shutdown.wait_timeout(Duration::from_secs(60)).await);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_early_on_shutdown() {
        let shutdown = ShutdownSignal::new();
        let trigger = shutdown.clone();
        let start = tokio::time::Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.trigger();
        });

        assert!(shutdown.wait_timeout(Duration::from_secs(60)).await);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_wait_after_trigger_is_immediate() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        assert!(shutdown.wait_timeout(Duration::from_secs(3600)).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigusr1_triggers_shutdown() {
        let shutdown = ShutdownSignal::new();
        setup_signal_handler(shutdown.clone()).unwrap();

        let status = std::process::Command::new("kill")
            .args(["-USR1", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        assert!(shutdown.wait_timeout(Duration::from_secs(10)).await);
    }
}
