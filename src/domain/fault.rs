//! Runtime faults reported through `on_error` hooks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::command::Command;

/// Where a runtime fault originated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultSource {
    /// A watcher raised an error, panicked or timed out
    Watcher { name: String },
    /// A hook callback failed; `hook` names the slot, e.g. `api.on_success`
    Hook { hook: String },
    /// A command was rejected by the state machine
    Command { command: Command },
    /// The event handler did not accept an event
    EventDelivery,
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultSource::Watcher { name } => write!(f, "watcher {}", name),
            FaultSource::Hook { hook } => write!(f, "hook {}", hook),
            FaultSource::Command { command } => write!(f, "command {}", command),
            FaultSource::EventDelivery => write!(f, "event delivery"),
        }
    }
}

/// A recovered runtime failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub source: FaultSource,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl Fault {
    pub fn new(source: FaultSource, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn watcher(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultSource::Watcher { name: name.into() }, message)
    }

    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultSource::Hook { hook: hook.into() }, message)
    }

    pub fn command(command: Command, message: impl Into<String>) -> Self {
        Self::new(FaultSource::Command { command }, message)
    }

    pub fn is_watcher_fault(&self) -> bool {
        matches!(self.source, FaultSource::Watcher { .. })
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}
