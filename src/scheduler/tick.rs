//! IterationScheduler - runs one tick
//!
//! Each tick:
//! 1. Fires the iteration `on_start` hook with the next ordinal
//! 2. Runs every lane concurrently; a lane runs its watchers one by one and
//!    dispatches each result's hooks as soon as the result exists
//! 3. Aggregates results in registration order into an `Iteration`
//! 4. Fires the iteration outcome and `on_completed` hooks
//!
//! A cancelled tick is dropped as a whole: in-flight watcher calls are aborted
//! and no iteration is produced.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::aggregator::IterationAggregator;
use super::select::{DueTracker, DueWatcher, lanes};
use crate::domain::{CheckResult, Iteration};
use crate::hooks::HookDispatcher;
use crate::watcher::{WatcherEntry, WatcherExecutor};

/// Schedules watchers and assembles iterations
pub struct IterationScheduler {
    entries: Vec<Arc<WatcherEntry>>,
    default_interval: Duration,
    executor: WatcherExecutor,
    dispatcher: HookDispatcher,
    tracker: DueTracker,
    /// Ordinal of the last completed iteration
    ordinal: AtomicU64,
    /// Held for the whole tick: one iteration is assembled at a time
    tick_lock: Mutex<()>,
    in_flight: Option<Arc<Semaphore>>,
}

impl IterationScheduler {
    pub fn new(
        entries: Vec<WatcherEntry>,
        default_interval: Duration,
        executor: WatcherExecutor,
        dispatcher: HookDispatcher,
    ) -> Self {
        Self {
            entries: entries.into_iter().map(Arc::new).collect(),
            default_interval,
            executor,
            dispatcher,
            tracker: DueTracker::new(),
            ordinal: AtomicU64::new(0),
            tick_lock: Mutex::new(()),
            in_flight: None,
        }
    }

    /// Bound the number of watcher calls running at once across all lanes
    pub fn with_max_in_flight(mut self, max: Option<usize>) -> Self {
        self.in_flight = max.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// Number of iterations completed so far
    pub fn completed_iterations(&self) -> u64 {
        self.ordinal.load(Ordering::SeqCst)
    }

    /// Watchers due at `now`, or `None` when no tick should run
    pub fn due_watchers(&self, now: Instant) -> Option<Vec<DueWatcher>> {
        self.tracker
            .select_due(&self.entries, now, self.default_interval)
    }

    /// Every watcher, regardless of interval
    pub fn all_watchers(&self, now: Instant) -> Vec<DueWatcher> {
        self.tracker.select_all(&self.entries, now)
    }

    pub fn time_until_next_due(&self, now: Instant) -> Duration {
        self.tracker
            .time_until_next_due(&self.entries, now, self.default_interval)
    }

    /// Run one tick over `due`. Returns `None` if `cancel` fires first.
    pub async fn run_tick(
        &self,
        due: Vec<DueWatcher>,
        cancel: &CancellationToken,
    ) -> Option<Iteration> {
        let _tick = self.tick_lock.lock().await;
        let ordinal = self.ordinal.load(Ordering::SeqCst) + 1;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(ordinal, "Tick cancelled, iteration discarded");
                None
            }
            iteration = self.assemble(ordinal, due) => Some(iteration),
        }
    }

    async fn assemble(&self, ordinal: u64, due: Vec<DueWatcher>) -> Iteration {
        let watchers = due.len();
        tracing::debug!(ordinal, watchers, "Tick started");

        let mut acc = IterationAggregator::begin(ordinal);
        self.dispatcher.iteration_started(ordinal).await;

        let mut results: Vec<(usize, CheckResult)> = join_all(
            lanes(due)
                .into_iter()
                .map(|lane| self.run_lane(lane)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();
        results.sort_by_key(|(index, _)| *index);

        for (_, result) in results {
            IterationAggregator::add_result(&mut acc, result);
        }
        let iteration = IterationAggregator::finish(acc);
        self.ordinal.store(ordinal, Ordering::SeqCst);

        tracing::info!(
            ordinal,
            watchers,
            valid = iteration.is_valid(),
            elapsed_ms = iteration.execution_time.as_millis() as u64,
            "Iteration completed"
        );

        self.dispatcher.iteration_completed(&iteration).await;
        iteration
    }

    async fn run_lane(&self, lane: Vec<DueWatcher>) -> Vec<(usize, CheckResult)> {
        let mut results = Vec::with_capacity(lane.len());

        for due in lane {
            let entry = due.entry.as_ref();
            self.dispatcher
                .watcher_started(entry.info(), entry.hooks())
                .await;
            let execution = {
                let _permit = match &self.in_flight {
                    Some(semaphore) => semaphore.acquire().await.ok(),
                    None => None,
                };
                self.executor.execute(entry).await
            };
            self.dispatcher
                .watcher_finished(&execution, entry.hooks())
                .await;
            results.push((due.index, execution.result));
        }

        results
    }
}

impl std::fmt::Debug for IterationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationScheduler")
            .field("watchers", &self.entries.len())
            .field("default_interval", &self.default_interval)
            .field("completed", &self.completed_iterations())
            .finish()
    }
}
