//! Outbound domain events published to the event handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::command::Command;

/// Event type constants
pub mod event_types {
    pub const COMMAND_EXECUTED: &str = "command.executed";
    pub const PING_RESPONDED: &str = "ping.responded";
}

/// Notification describing a command's effect or a liveness response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A state-changing command took effect
    CommandExecuted {
        command: Command,
        timestamp: DateTime<Utc>,
    },
    /// A Ping was answered
    PingResponded { timestamp: DateTime<Utc> },
}

impl Event {
    /// Create a command-executed event stamped now
    pub fn command_executed(command: Command) -> Self {
        Event::CommandExecuted {
            command,
            timestamp: Utc::now(),
        }
    }

    /// Create a ping-responded event stamped now
    pub fn ping_responded() -> Self {
        Event::PingResponded {
            timestamp: Utc::now(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Event::CommandExecuted { .. } => event_types::COMMAND_EXECUTED,
            Event::PingResponded { .. } => event_types::PING_RESPONDED,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::CommandExecuted { timestamp, .. } | Event::PingResponded { timestamp } => {
                *timestamp
            }
        }
    }
}
