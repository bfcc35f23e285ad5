//! Shell executor port
//!
//! The runner never spawns processes itself. Shell actions go through a
//! [`ShellExecutor`], which must settle for every call and must honor the
//! cancellation token promptly. Rolling back partial effects is not
//! required.

use crate::error::ExecutorError;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs the command of a shell action
#[async_trait]
pub trait ShellExecutor: Send + Sync {
    /// Execute `command`, returning once it has finished or was cancelled
    async fn execute(&self, command: &str, cancel: CancellationToken) -> Result<(), ExecutorError>;
}

/// Stand-in executor that succeeds after a fixed delay
#[derive(Debug, Clone)]
pub struct SimulatedShell {
    delay: Duration,
}

impl SimulatedShell {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedShell {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::types::DEFAULT_SHELL_DELAY_MS))
    }
}

#[async_trait]
impl ShellExecutor for SimulatedShell {
    async fn execute(&self, command: &str, cancel: CancellationToken) -> Result<(), ExecutorError> {
        info!("Simulating shell command: {}", command);
        tokio::select! {
            _ = cancel.cancelled() => Err(ExecutorError::Aborted),
            _ = tokio::time::sleep(self.delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_shell_completes_after_delay() {
        let shell = SimulatedShell::new(Duration::from_secs(1));
        let started = tokio::time::Instant::now();

        shell
            .execute("npm install", CancellationToken::new())
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_shell_honors_cancellation() {
        let shell = SimulatedShell::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let result = shell.execute("npm run dev", cancel).await;

        assert_eq!(result, Err(ExecutorError::Aborted));
        assert!(started.elapsed() < Duration::from_secs(60));
    }
}
