//! Error types for tickwatch
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::{Command, ControlState};

/// Boxed error returned by watchers, hooks and event handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All error types that can occur in tickwatch
#[derive(Debug, Error)]
pub enum TickwatchError {
    /// Invalid or incomplete configuration, raised at build time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Command not valid for the current control state
    #[error("Command {command} rejected in state {state}")]
    CommandRejected {
        command: Command,
        state: ControlState,
    },

    /// Watcher execution fault
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Hook callback fault
    #[error("Hook error: {0}")]
    Hook(String),

    /// Outbound event was not accepted by the handler
    #[error("Event delivery error: {0}")]
    EventDelivery(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML settings parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for tickwatch operations
pub type Result<T> = std::result::Result<T, TickwatchError>;
