//! File-backed settings for the `tickwatch` binary.
//!
//! Loaded from an explicit path, ~/.config/tickwatch/tickwatch.yml or
//! ./tickwatch.yml, in that order.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::builder::MonitorConfigBuilder;
use crate::error::TickwatchError;
use crate::watcher::{CommandWatcher, CommandWatcherConfig, HttpWatcher};

/// Settings file contents.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Log level when --verbose is not given.
    pub log_level: String,

    /// Interval for watchers without their own, in milliseconds.
    pub default_interval_ms: u64,

    /// Per-call watcher timeout in milliseconds.
    pub watcher_timeout_ms: u64,

    /// How often an idle loop checks for commands.
    pub poll_interval_ms: u64,

    /// Bound on concurrently executing watchers.
    pub max_in_flight: Option<usize>,

    /// Grace period for event delivery.
    pub event_grace_ms: u64,

    /// Completed iterations kept in memory.
    pub retain_iterations: usize,

    pub run_only_once: bool,

    pub watchers: Vec<WatcherSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            default_interval_ms: 60_000,
            watcher_timeout_ms: 30_000,
            poll_interval_ms: 1_000,
            max_in_flight: None,
            event_grace_ms: 5_000,
            retain_iterations: 10,
            run_only_once: false,
            watchers: Vec::new(),
        }
    }
}

/// Kind of built-in watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherKind {
    Http,
    Command,
}

/// One watcher entry in the settings file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WatcherSettings {
    pub name: String,
    pub kind: WatcherKind,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Target for `http` watchers.
    #[serde(default)]
    pub url: Option<String>,

    /// Exact status an `http` watcher expects; any 2xx otherwise.
    #[serde(default)]
    pub expect_status: Option<u16>,

    /// Shell command for `command` watchers.
    #[serde(default)]
    pub command: Option<String>,
}

impl Settings {
    /// Load settings with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. ~/.config/tickwatch/tickwatch.yml
    /// 3. tickwatch.yml in current directory
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let mut candidates = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("tickwatch").join("tickwatch.yml"));
        }
        candidates.push(PathBuf::from("tickwatch.yml"));

        for candidate in candidates {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(settings) => {
                    log::info!("Loaded config from {}", candidate.display());
                    return Ok(settings);
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", candidate.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let settings: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(settings)
    }

    /// Turn the settings into a builder with every watcher registered.
    ///
    /// Durations are checked later by `MonitorConfigBuilder::build`.
    pub fn into_builder(self) -> crate::error::Result<MonitorConfigBuilder> {
        let mut builder = MonitorConfigBuilder::new()
            .with_default_interval(Duration::from_millis(self.default_interval_ms))
            .with_watcher_timeout(Duration::from_millis(self.watcher_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_event_grace_period(Duration::from_millis(self.event_grace_ms))
            .retain_iterations(self.retain_iterations);

        if let Some(max) = self.max_in_flight {
            builder = builder.with_max_in_flight(max);
        }
        if self.run_only_once {
            builder = builder.run_only_once();
        }

        for watcher in self.watchers {
            let interval = watcher.interval_ms.map(Duration::from_millis);
            builder = match watcher.kind {
                WatcherKind::Http => builder.add_watcher(http_watcher(watcher)?, None, interval),
                WatcherKind::Command => builder.add_watcher(command_watcher(watcher)?, None, interval),
            };
        }

        Ok(builder)
    }
}

fn http_watcher(settings: WatcherSettings) -> crate::error::Result<HttpWatcher> {
    let url = settings.url.ok_or_else(|| {
        TickwatchError::Configuration(format!("http watcher '{}' has no url", settings.name))
    })?;
    let mut watcher = HttpWatcher::new(settings.name, url);
    if let Some(group) = settings.group {
        watcher = watcher.with_group(group);
    }
    if let Some(status) = settings.expect_status {
        watcher = watcher.with_expected_status(status);
    }
    if let Some(ms) = settings.timeout_ms {
        watcher = watcher.with_timeout(Duration::from_millis(ms));
    }
    Ok(watcher)
}

fn command_watcher(settings: WatcherSettings) -> crate::error::Result<CommandWatcher> {
    let command = settings.command.ok_or_else(|| {
        TickwatchError::Configuration(format!("command watcher '{}' has no command", settings.name))
    })?;
    let mut config = CommandWatcherConfig::new(command);
    if let Some(group) = settings.group {
        config = config.group(group);
    }
    if let Some(ms) = settings.timeout_ms {
        config = config.timeout(Duration::from_millis(ms));
    }
    Ok(CommandWatcher::new(settings.name, config))
}
