//! IterationAggregator - folds a tick's results into an `Iteration`.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::domain::{CheckResult, Iteration};

/// Builds one iteration; consumed by `finish`
#[derive(Debug)]
pub struct IterationAccumulator {
    ordinal: u64,
    started_at: DateTime<Utc>,
    started: Instant,
    results: Vec<CheckResult>,
}

impl IterationAccumulator {
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Stateless aggregation steps
#[derive(Debug, Clone, Copy, Default)]
pub struct IterationAggregator;

impl IterationAggregator {
    pub fn begin(ordinal: u64) -> IterationAccumulator {
        IterationAccumulator {
            ordinal,
            started_at: Utc::now(),
            started: Instant::now(),
            results: Vec::new(),
        }
    }

    pub fn add_result(acc: &mut IterationAccumulator, result: CheckResult) {
        acc.results.push(result);
    }

    pub fn finish(acc: IterationAccumulator) -> Iteration {
        let execution_time = acc.started.elapsed();
        let completed_at = acc.started_at
            + chrono::Duration::from_std(execution_time).unwrap_or_else(|_| chrono::Duration::zero());
        Iteration {
            ordinal: acc.ordinal,
            started_at: acc.started_at,
            completed_at,
            execution_time,
            results: acc.results,
        }
    }
}
