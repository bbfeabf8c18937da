//! MonitorConfig - validated, immutable configuration for a control loop

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::control::{CommandSource, EventHandler};
use crate::error::{Result, TickwatchError};
use crate::hooks::{IterationHooks, WatcherHooks};
use crate::watcher::{Watcher, WatcherEntry};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_WATCHER_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_EVENT_GRACE: Duration = Duration::from_secs(5);

/// Frozen configuration; only obtainable through `MonitorConfigBuilder::build`
#[derive(Clone)]
pub struct MonitorConfig {
    pub(crate) watchers: Vec<WatcherEntry>,
    pub(crate) global_watcher_hooks: WatcherHooks,
    pub(crate) iteration_hooks: IterationHooks,
    pub(crate) command_source: Option<Arc<dyn CommandSource>>,
    pub(crate) event_handler: Option<Arc<dyn EventHandler>>,
    pub(crate) run_only_once: bool,
    pub(crate) default_interval: Duration,
    pub(crate) watcher_timeout: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) max_in_flight: Option<usize>,
    pub(crate) event_grace_period: Duration,
    pub(crate) retain_iterations: usize,
}

impl MonitorConfig {
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    pub fn watcher_names(&self) -> Vec<&str> {
        self.watchers.iter().map(|w| w.name()).collect()
    }

    pub fn run_only_once(&self) -> bool {
        self.run_only_once
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    pub fn watcher_timeout(&self) -> Duration {
        self.watcher_timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }

    pub fn retain_iterations(&self) -> usize {
        self.retain_iterations
    }

    /// Without a command source nothing can send Start, so the loop starts itself
    pub fn auto_start(&self) -> bool {
        self.command_source.is_none()
    }
}

impl std::fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("watchers", &self.watcher_names())
            .field("run_only_once", &self.run_only_once)
            .field("default_interval", &self.default_interval)
            .field("watcher_timeout", &self.watcher_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("max_in_flight", &self.max_in_flight)
            .field("command_source", &self.command_source.is_some())
            .field("event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Assembles a `MonitorConfig`; all validation happens in `build`
pub struct MonitorConfigBuilder {
    watchers: Vec<WatcherEntry>,
    global_watcher_hooks: WatcherHooks,
    iteration_hooks: IterationHooks,
    command_source: Option<Arc<dyn CommandSource>>,
    event_handler: Option<Arc<dyn EventHandler>>,
    run_only_once: bool,
    default_interval: Duration,
    watcher_timeout: Duration,
    poll_interval: Duration,
    max_in_flight: Option<usize>,
    event_grace_period: Duration,
    retain_iterations: usize,
}

impl std::fmt::Debug for MonitorConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorConfigBuilder")
            .field("watchers", &self.watchers.iter().map(|w| w.name()).collect::<Vec<_>>())
            .field("run_only_once", &self.run_only_once)
            .field("default_interval", &self.default_interval)
            .field("watcher_timeout", &self.watcher_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("max_in_flight", &self.max_in_flight)
            .field("command_source", &self.command_source.is_some())
            .field("event_handler", &self.event_handler.is_some())
            .finish()
    }
}

impl Default for MonitorConfigBuilder {
    fn default() -> Self {
        Self {
            watchers: Vec::new(),
            global_watcher_hooks: WatcherHooks::default(),
            iteration_hooks: IterationHooks::default(),
            command_source: None,
            event_handler: None,
            run_only_once: false,
            default_interval: DEFAULT_INTERVAL,
            watcher_timeout: DEFAULT_WATCHER_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_in_flight: None,
            event_grace_period: DEFAULT_EVENT_GRACE,
            retain_iterations: 0,
        }
    }
}

impl MonitorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a watcher with optional hooks and interval override
    pub fn add_watcher<W: Watcher + 'static>(
        self,
        watcher: W,
        hooks: Option<WatcherHooks>,
        interval: Option<Duration>,
    ) -> Self {
        self.add_shared_watcher(Arc::new(watcher), hooks, interval)
    }

    pub fn add_shared_watcher(
        mut self,
        watcher: Arc<dyn Watcher>,
        hooks: Option<WatcherHooks>,
        interval: Option<Duration>,
    ) -> Self {
        self.watchers
            .push(WatcherEntry::new(watcher, hooks.unwrap_or_default(), interval));
        self
    }

    /// Iteration-level hooks; their `on_error` also receives control-plane faults
    pub fn set_hooks(mut self, hooks: IterationHooks) -> Self {
        self.iteration_hooks = hooks;
        self
    }

    /// Hooks applied to every watcher result, after the watcher's own hooks
    pub fn set_global_watcher_hooks(mut self, hooks: WatcherHooks) -> Self {
        self.global_watcher_hooks = hooks;
        self
    }

    pub fn set_command_source(mut self, source: Arc<dyn CommandSource>) -> Self {
        self.command_source = Some(source);
        self
    }

    pub fn set_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Run exactly one tick, then terminate
    pub fn run_only_once(mut self) -> Self {
        self.run_only_once = true;
        self
    }

    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    pub fn with_watcher_timeout(mut self, timeout: Duration) -> Self {
        self.watcher_timeout = timeout;
        self
    }

    /// How often a paused or idle loop checks for commands
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    pub fn with_event_grace_period(mut self, grace: Duration) -> Self {
        self.event_grace_period = grace;
        self
    }

    /// Keep the last `n` iterations for inspection through the control handle
    pub fn retain_iterations(mut self, n: usize) -> Self {
        self.retain_iterations = n;
        self
    }

    /// Validate and freeze
    pub fn build(self) -> Result<MonitorConfig> {
        for (name, value) in [
            ("default interval", self.default_interval),
            ("watcher timeout", self.watcher_timeout),
            ("poll interval", self.poll_interval),
            ("event grace period", self.event_grace_period),
        ] {
            if value.is_zero() {
                return Err(TickwatchError::Configuration(format!("{} must be non-zero", name)));
            }
        }

        if self.max_in_flight == Some(0) {
            return Err(TickwatchError::Configuration(
                "max in-flight watchers must be at least 1".to_string(),
            ));
        }

        if self.command_source.is_some() && self.event_handler.is_none() {
            return Err(TickwatchError::Configuration(
                "a command source requires an event handler".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.watchers {
            let name = entry.name();
            if name.trim().is_empty() {
                return Err(TickwatchError::Configuration("watcher name is empty".to_string()));
            }
            if !seen.insert(name.to_string()) {
                return Err(TickwatchError::Configuration(format!(
                    "duplicate watcher '{}'",
                    name
                )));
            }
            if entry.interval.is_some_and(|i| i.is_zero()) {
                return Err(TickwatchError::Configuration(format!(
                    "watcher '{}' has a zero interval",
                    name
                )));
            }
            entry.watcher.validate().map_err(|e| {
                TickwatchError::Configuration(format!("watcher '{}': {}", name, e))
            })?;
        }

        log::debug!(
            "Built monitor config with {} watchers (run_only_once={})",
            self.watchers.len(),
            self.run_only_once
        );

        Ok(MonitorConfig {
            watchers: self.watchers,
            global_watcher_hooks: self.global_watcher_hooks,
            iteration_hooks: self.iteration_hooks,
            command_source: self.command_source,
            event_handler: self.event_handler,
            run_only_once: self.run_only_once,
            default_interval: self.default_interval,
            watcher_timeout: self.watcher_timeout,
            poll_interval: self.poll_interval,
            max_in_flight: self.max_in_flight,
            event_grace_period: self.event_grace_period,
            retain_iterations: self.retain_iterations,
        })
    }
}
