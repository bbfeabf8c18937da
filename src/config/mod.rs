//! Configuration.
//!
//! Two layers:
//! 1. `MonitorConfigBuilder` / `MonitorConfig`: the programmatic, validated form
//! 2. `Settings`: the YAML file read by the binary, turned into a builder

pub use self::builder::{
    DEFAULT_EVENT_GRACE, DEFAULT_INTERVAL, DEFAULT_POLL_INTERVAL, DEFAULT_WATCHER_TIMEOUT, MonitorConfig,
    MonitorConfigBuilder,
};
pub use self::settings::{Settings, WatcherKind, WatcherSettings};

mod builder;
mod settings;
