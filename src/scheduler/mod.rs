//! Scheduler module for watcher selection and iteration assembly.
//!
//! This module provides:
//! - **Selection**: which watchers are due, and how they split into group lanes
//! - **Aggregation**: folding one tick's results into an `Iteration`
//! - **IterationScheduler**: runs a tick with concurrent lanes and hook dispatch
//!
//! # Example
//!
//! ```ignore
//! let scheduler = IterationScheduler::new(entries, interval, executor, dispatcher);
//! if let Some(due) = scheduler.due_watchers(Instant::now()) {
//!     let iteration = scheduler.run_tick(due, &cancel).await;
//! }
//! ```

mod aggregator;
mod select;
mod tick;

pub use aggregator::{IterationAccumulator, IterationAggregator};
pub use select::{DueTracker, DueWatcher, lanes};
pub use tick::IterationScheduler;
