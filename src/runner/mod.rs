//! Runner module - drives watchers under remote control.
//!
//! - `ControlLoop` owns the scheduler, the command controller and the event publisher
//! - `ControlHandle` lets the embedding process steer and observe a running loop
//! - `RunningMonitor` pairs a handle with the spawned driver task

mod control_loop;
mod handle;

pub use control_loop::{ControlLoop, run_once};
pub use handle::{ControlHandle, RunSummary, RunningMonitor};
