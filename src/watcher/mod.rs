//! Watchers - pluggable checks
//!
//! The core only knows the `Watcher` capability. Concrete kinds (HTTP, shell
//! command, ...) live in submodules and are registered through the config builder.

pub mod command;
pub mod executor;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Verdict, WatcherInfo};
use crate::error::{BoxError, Result};
use crate::hooks::WatcherHooks;

pub use command::{CommandWatcher, CommandWatcherConfig};
pub use executor::{Execution, WatcherExecutor};
pub use http::HttpWatcher;

/// A pluggable health check
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Unique name within a configuration
    fn name(&self) -> &str;

    /// Watchers sharing a group never execute concurrently
    fn group(&self) -> Option<&str> {
        None
    }

    /// Preferred spacing between runs; the builder may override it
    fn interval(&self) -> Option<Duration> {
        None
    }

    /// Upper bound for one `execute` call; falls back to the configured default
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Called once when the configuration is built
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Perform the check
    async fn execute(&self) -> std::result::Result<Verdict, BoxError>;
}

/// A watcher as registered in a configuration, with its hooks and interval
#[derive(Clone)]
pub struct WatcherEntry {
    pub(crate) watcher: Arc<dyn Watcher>,
    pub(crate) info: WatcherInfo,
    pub(crate) hooks: WatcherHooks,
    pub(crate) interval: Option<Duration>,
}

impl WatcherEntry {
    pub fn new(watcher: Arc<dyn Watcher>, hooks: WatcherHooks, interval: Option<Duration>) -> Self {
        let info = WatcherInfo::new(watcher.name(), watcher.group().map(str::to_string));
        Self {
            watcher,
            info,
            hooks,
            interval,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &WatcherInfo {
        &self.info
    }

    pub fn hooks(&self) -> &WatcherHooks {
        &self.hooks
    }

    /// Registration override, then the watcher's own preference, then the default
    pub fn effective_interval(&self, default: Duration) -> Duration {
        self.interval
            .or_else(|| self.watcher.interval())
            .unwrap_or(default)
    }

    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.watcher.timeout().unwrap_or(default)
    }
}

impl std::fmt::Debug for WatcherEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherEntry")
            .field("info", &self.info)
            .field("interval", &self.interval)
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        interval: Option<Duration>,
    }

    #[async_trait]
    impl Watcher for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn group(&self) -> Option<&str> {
            Some("g1")
        }

        fn interval(&self) -> Option<Duration> {
            self.interval
        }

        async fn execute(&self) -> std::result::Result<Verdict, BoxError> {
            Ok(Verdict::valid("ok"))
        }
    }

    #[test]
    fn test_entry_info_from_watcher() {
        let entry = WatcherEntry::new(Arc::new(Fixed { interval: None }), WatcherHooks::new(), None);
        assert_eq!(entry.name(), "fixed");
        assert_eq!(entry.info().group.as_deref(), Some("g1"));
    }

    #[test]
    fn test_interval_precedence() {
        let default = Duration::from_secs(60);

        let plain = WatcherEntry::new(Arc::new(Fixed { interval: None }), WatcherHooks::new(), None);
        assert_eq!(plain.effective_interval(default), default);

        let own = WatcherEntry::new(
            Arc::new(Fixed {
                interval: Some(Duration::from_secs(10)),
            }),
            WatcherHooks::new(),
            None,
        );
        assert_eq!(own.effective_interval(default), Duration::from_secs(10));

        let overridden = WatcherEntry::new(
            Arc::new(Fixed {
                interval: Some(Duration::from_secs(10)),
            }),
            WatcherHooks::new(),
            Some(Duration::from_secs(5)),
        );
        assert_eq!(overridden.effective_interval(default), Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_falls_back_to_default() {
        let entry = WatcherEntry::new(Arc::new(Fixed { interval: None }), WatcherHooks::new(), None);
        assert_eq!(
            entry.effective_timeout(Duration::from_secs(30)),
            Duration::from_secs(30)
        );
    }
}
