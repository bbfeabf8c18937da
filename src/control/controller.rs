//! CommandController - the control state machine
//!
//! | Current          | Command | Next    |
//! |------------------|---------|---------|
//! | Created          | Start   | Running |
//! | Running          | Pause   | Paused  |
//! | Paused           | Start   | Running |
//! | Running/Paused   | Stop    | Stopped |
//! | any non-terminal | Kill    | Killed  |
//! | any              | Ping    | same    |
//!
//! Everything else is rejected and leaves the state untouched.

use crate::domain::{Command, ControlState};
use crate::error::{Result, TickwatchError};

/// What applying a command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    Transitioned {
        from: ControlState,
        to: ControlState,
    },
    PingAnswered,
}

/// Owns the control state; mutated only through `apply`
#[derive(Debug, Default)]
pub struct CommandController {
    state: ControlState,
}

impl CommandController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    /// The transition table. `None` means the command is not valid here.
    pub fn next_state(state: ControlState, command: Command) -> Option<ControlState> {
        use Command::*;
        use ControlState::*;

        match (state, command) {
            (s, Ping) => Some(s),
            (Created, Start) | (Paused, Start) => Some(Running),
            (Running, Pause) => Some(Paused),
            (Running, Stop) | (Paused, Stop) => Some(Stopped),
            (s, Kill) if !s.is_terminal() => Some(Killed),
            _ => None,
        }
    }

    /// Apply one command
    pub fn apply(&mut self, command: Command) -> Result<CommandEffect> {
        let from = self.state;
        let to = Self::next_state(from, command).ok_or(TickwatchError::CommandRejected {
            command,
            state: from,
        })?;

        if command == Command::Ping {
            return Ok(CommandEffect::PingAnswered);
        }

        self.state = to;
        log::info!("Control state {} -> {} ({})", from, to, command);
        Ok(CommandEffect::Transitioned { from, to })
    }
}
