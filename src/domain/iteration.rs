//! Iteration record: the aggregated results of one scheduling tick.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::check_result::{CheckResult, duration_ms};

/// Immutable record of one completed tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    /// Starts at 1, +1 per completed tick
    pub ordinal: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    /// Results in watcher registration order
    pub results: Vec<CheckResult>,
}

impl Iteration {
    /// True when every result is valid (vacuously true for an empty tick)
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|r| r.is_valid)
    }

    pub fn failed_results(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.is_valid)
    }

    pub fn result_for(&self, watcher: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.watcher.name == watcher)
    }
}
