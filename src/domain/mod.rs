//! Domain types for tickwatch
//!
//! - CheckResult / Verdict: outcome of one watcher execution
//! - Iteration: the aggregated results of one tick
//! - Command / ControlState: the control plane's inputs and state
//! - Event: outbound notifications
//! - Fault: recovered runtime failures handed to `on_error` hooks

pub mod check_result;
pub mod command;
pub mod event;
pub mod fault;
pub mod iteration;

pub use check_result::{CheckResult, Verdict, WatcherInfo};
pub use command::{Command, ControlState};
pub use event::{Event, event_types};
pub use fault::{Fault, FaultSource};
pub use iteration::Iteration;
