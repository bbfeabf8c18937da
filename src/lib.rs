//! Tickwatch - periodic watchers under remote control
//!
//! Tickwatch runs pluggable watchers on their intervals, folds each tick's
//! results into an `Iteration`, fires lifecycle hooks around every result and
//! iteration, and accepts Start/Pause/Stop/Kill/Ping commands from an injected
//! command source, answering through an injected event handler.
//!
//! ```ignore
//! let config = MonitorConfig::builder()
//!     .add_watcher(HttpWatcher::new("api", "http://localhost:8080/health"), None, None)
//!     .build()?;
//! let monitor = ControlLoop::new(config).start();
//! monitor.handle().stop();
//! let summary = monitor.wait().await?;
//! ```

pub mod config;
pub mod control;
pub mod domain;
pub mod error;
pub mod hooks;
pub mod runner;
pub mod scheduler;
pub mod watcher;

pub use config::{MonitorConfig, MonitorConfigBuilder, Settings};
pub use domain::{CheckResult, Command, ControlState, Event, Fault, Iteration, Verdict};
pub use error::{BoxError, Result, TickwatchError};
pub use hooks::{Hook, Hooks, IterationHooks, WatcherHooks};
pub use runner::{ControlHandle, ControlLoop, RunSummary, RunningMonitor};
pub use watcher::{CommandWatcher, HttpWatcher, Watcher};
