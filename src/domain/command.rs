//! Control-plane commands and the control state they drive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Instruction delivered by an external actor through a command source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Activate or resume scheduling
    Start,
    /// Stop scheduling new ticks (resumable)
    Pause,
    /// Finish the in-flight tick, then halt permanently
    Stop,
    /// Abandon the in-flight tick and halt immediately
    Kill,
    /// Liveness probe
    Ping,
}

impl Command {
    /// Commands that can change the control state
    pub fn is_state_change(&self) -> bool {
        !matches!(self, Command::Ping)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::Kill => "kill",
            Command::Ping => "ping",
        };
        write!(f, "{}", name)
    }
}

/// State of a control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControlState {
    /// Built but never started
    #[default]
    Created,
    /// Scheduling ticks
    Running,
    /// Not scheduling, waiting for Start
    Paused,
    /// Halted gracefully
    Stopped,
    /// Halted immediately
    Killed,
}

impl ControlState {
    /// Stopped and Killed never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ControlState::Stopped | ControlState::Killed)
    }

    /// Whether ticks may be scheduled in this state
    pub fn is_running(&self) -> bool {
        matches!(self, ControlState::Running)
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlState::Created => "created",
            ControlState::Running => "running",
            ControlState::Paused => "paused",
            ControlState::Stopped => "stopped",
            ControlState::Killed => "killed",
        };
        write!(f, "{}", name)
    }
}
