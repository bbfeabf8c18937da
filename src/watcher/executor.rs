//! WatcherExecutor - runs one watcher under a timeout
//!
//! The watcher call is spawned onto the runtime so that a timeout or a dropped
//! executor future can abandon it. Errors, panics and timeouts all become an
//! invalid `CheckResult` plus a `Fault` for the `on_error` hooks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::WatcherEntry;
use crate::domain::{CheckResult, Fault};
use crate::hooks::panic_message;

/// Outcome of one execution: the result, and the fault if the watcher misbehaved
#[derive(Debug, Clone)]
pub struct Execution {
    pub result: CheckResult,
    pub fault: Option<Fault>,
}

impl Execution {
    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

/// Aborts the spawned watcher call when the execution is abandoned
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs watchers, containing every failure
#[derive(Debug, Clone)]
pub struct WatcherExecutor {
    default_timeout: Duration,
}

impl Default for WatcherExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl WatcherExecutor {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute with the watcher's own timeout, or the default one
    pub async fn execute(&self, entry: &WatcherEntry) -> Execution {
        let timeout = entry.effective_timeout(self.default_timeout);
        self.run(entry, timeout).await
    }

    /// Execute under an explicit timeout. Never fails.
    pub async fn run(&self, entry: &WatcherEntry, timeout: Duration) -> Execution {
        let info = entry.info.clone();
        let watcher = Arc::clone(&entry.watcher);
        let started = Instant::now();
        let mut call = AbortOnDrop(tokio::spawn(async move { watcher.execute().await }));

        let outcome = tokio::time::timeout(timeout, &mut call.0).await;
        let elapsed = started.elapsed();

        let (result, fault) = match outcome {
            Ok(Ok(Ok(verdict))) => (CheckResult::from_verdict(info, verdict, elapsed), None),
            Ok(Ok(Err(e))) => {
                let message = e.to_string();
                (
                    CheckResult::failed(info.clone(), format!("watcher failed: {}", message), elapsed),
                    Some(Fault::watcher(&info.name, message)),
                )
            }
            Ok(Err(join_err)) => {
                let message = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    "execution cancelled".to_string()
                };
                (
                    CheckResult::failed(info.clone(), format!("watcher failed: {}", message), elapsed),
                    Some(Fault::watcher(&info.name, message)),
                )
            }
            Err(_) => {
                let message = format!("timed out after {}ms", timeout.as_millis());
                (
                    CheckResult::failed(info.clone(), message.clone(), elapsed),
                    Some(Fault::watcher(&info.name, message)),
                )
            }
        };

        match &fault {
            Some(fault) => tracing::warn!(
                watcher = %result.watcher.name,
                elapsed_ms = elapsed.as_millis() as u64,
                fault = %fault.message,
                "Watcher fault"
            ),
            None => tracing::debug!(
                watcher = %result.watcher.name,
                valid = result.is_valid,
                elapsed_ms = elapsed.as_millis() as u64,
                "Watcher executed"
            ),
        }

        Execution { result, fault }
    }
}
