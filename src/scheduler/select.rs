//! Due-watcher selection and group lanes.
//!
//! A watcher is due when `now - last_run_at >= interval`. `last_run_at` is
//! stamped when a watcher is selected, not when it completes, so slow watchers
//! do not drift their schedule.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::watcher::WatcherEntry;

/// A watcher selected for the current tick, with its registration index
#[derive(Debug, Clone)]
pub struct DueWatcher {
    pub index: usize,
    pub entry: Arc<WatcherEntry>,
}

#[derive(Debug, Default)]
struct TrackerState {
    last_run: HashMap<String, Instant>,
    /// Last tick of a configuration without watchers
    last_empty_tick: Option<Instant>,
}

/// Tracks when each watcher last ran
#[derive(Debug, Default)]
pub struct DueTracker {
    state: Mutex<TrackerState>,
}

impl DueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the due watchers and stamp them as run at `now`.
    ///
    /// Returns `None` when no tick should run. A configuration without watchers
    /// still yields an empty tick once per `default_interval`.
    pub fn select_due(
        &self,
        entries: &[Arc<WatcherEntry>],
        now: Instant,
        default_interval: Duration,
    ) -> Option<Vec<DueWatcher>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.is_empty() {
            let due = state
                .last_empty_tick
                .is_none_or(|last| now.saturating_duration_since(last) >= default_interval);
            if due {
                state.last_empty_tick = Some(now);
                return Some(Vec::new());
            }
            return None;
        }

        let mut due = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            let interval = entry.effective_interval(default_interval);
            let is_due = state
                .last_run
                .get(entry.name())
                .is_none_or(|last| now.saturating_duration_since(*last) >= interval);
            if is_due {
                state.last_run.insert(entry.name().to_string(), now);
                due.push(DueWatcher {
                    index,
                    entry: Arc::clone(entry),
                });
            }
        }

        if due.is_empty() { None } else { Some(due) }
    }

    /// Select every watcher regardless of interval
    pub fn select_all(&self, entries: &[Arc<WatcherEntry>], now: Instant) -> Vec<DueWatcher> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.last_empty_tick = Some(now);
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                state.last_run.insert(entry.name().to_string(), now);
                DueWatcher {
                    index,
                    entry: Arc::clone(entry),
                }
            })
            .collect()
    }

    /// How long until the next watcher becomes due
    pub fn time_until_next_due(
        &self,
        entries: &[Arc<WatcherEntry>],
        now: Instant,
        default_interval: Duration,
    ) -> Duration {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.is_empty() {
            return match state.last_empty_tick {
                Some(last) => (last + default_interval).saturating_duration_since(now),
                None => Duration::ZERO,
            };
        }

        entries
            .iter()
            .map(|entry| match state.last_run.get(entry.name()) {
                Some(last) => {
                    (*last + entry.effective_interval(default_interval)).saturating_duration_since(now)
                }
                None => Duration::ZERO,
            })
            .min()
            .unwrap_or(default_interval)
    }
}

/// Partition due watchers into lanes.
///
/// Watchers sharing a group share one lane and run sequentially; every
/// ungrouped watcher gets a lane of its own. Lane order and order within a lane
/// follow registration order.
pub fn lanes(due: Vec<DueWatcher>) -> Vec<Vec<DueWatcher>> {
    let mut lanes: Vec<Vec<DueWatcher>> = Vec::new();
    let mut by_group: HashMap<String, usize> = HashMap::new();

    for watcher in due {
        match watcher.entry.info().group.clone() {
            Some(group) => match by_group.get(&group) {
                Some(&lane) => lanes[lane].push(watcher),
                None => {
                    by_group.insert(group, lanes.len());
                    lanes.push(vec![watcher]);
                }
            },
            None => lanes.push(vec![watcher]),
        }
    }

    lanes
}
