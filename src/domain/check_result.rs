//! Outcome of one watcher execution.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a registered watcher, carried by every result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatcherInfo {
    pub name: String,
    pub group: Option<String>,
}

impl WatcherInfo {
    pub fn new(name: impl Into<String>, group: Option<String>) -> Self {
        Self {
            name: name.into(),
            group,
        }
    }
}

/// What a watcher reports back from a successful call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_valid: bool,
    pub description: String,
    pub payload: Option<Value>,
}

impl Verdict {
    /// A passing verdict
    pub fn valid(description: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            description: description.into(),
            payload: None,
        }
    }

    /// A failing verdict
    pub fn invalid(description: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            description: description.into(),
            payload: None,
        }
    }

    /// Attach structured data
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Result of one watcher execution within a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub watcher: WatcherInfo,
    pub is_valid: bool,
    pub description: String,
    pub payload: Option<Value>,
    pub checked_at: DateTime<Utc>,
    /// Wall time spent in the watcher call
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl CheckResult {
    /// Stamp a watcher verdict
    pub fn from_verdict(watcher: WatcherInfo, verdict: Verdict, elapsed: Duration) -> Self {
        Self {
            watcher,
            is_valid: verdict.is_valid,
            description: verdict.description,
            payload: verdict.payload,
            checked_at: Utc::now(),
            elapsed,
        }
    }

    /// Synthesized failure for faults and timeouts
    pub fn failed(watcher: WatcherInfo, description: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            watcher,
            is_valid: false,
            description: description.into(),
            payload: None,
            checked_at: Utc::now(),
            elapsed,
        }
    }

    pub fn watcher_name(&self) -> &str {
        &self.watcher.name
    }
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
