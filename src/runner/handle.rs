//! Handles onto a running control loop

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};

use crate::domain::{Command, ControlState, Iteration};

/// How a control loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations_completed: u64,
    pub final_state: ControlState,
}

/// Queues commands for the driver, which applies them in send order
#[derive(Debug, Clone)]
pub(crate) struct CommandSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    pub(crate) fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Bounded buffer of the most recent iterations
#[derive(Debug, Clone)]
pub(crate) struct History {
    inner: Arc<Mutex<VecDeque<Iteration>>>,
    capacity: usize,
}

impl History {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub(crate) fn push(&self, iteration: Iteration) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        while inner.len() >= self.capacity {
            inner.pop_front();
        }
        inner.push_back(iteration);
    }

    pub(crate) fn snapshot(&self) -> Vec<Iteration> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Remote control for a control loop; cheap to clone
#[derive(Debug, Clone)]
pub struct ControlHandle {
    commands: CommandSender,
    state: watch::Receiver<ControlState>,
    history: History,
}

impl ControlHandle {
    pub(crate) fn new(commands: CommandSender, state: watch::Receiver<ControlState>, history: History) -> Self {
        Self {
            commands,
            state,
            history,
        }
    }

    /// Queue a command. Returns false once the loop has exited.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command)
    }

    pub fn stop(&self) -> bool {
        self.send(Command::Stop)
    }

    /// Abandon any in-flight tick and halt; ignored once stopped
    pub fn kill(&self) -> bool {
        self.send(Command::Kill)
    }

    pub fn pause(&self) -> bool {
        self.send(Command::Pause)
    }

    /// Start a created loop or resume a paused one
    pub fn resume(&self) -> bool {
        self.send(Command::Start)
    }

    pub fn ping(&self) -> bool {
        self.send(Command::Ping)
    }

    pub fn state(&self) -> ControlState {
        *self.state.borrow()
    }

    /// Wait until the loop reaches `target` or exits
    pub async fn wait_for_state(&self, target: ControlState) -> ControlState {
        let mut rx = self.state.clone();
        let reached = rx
            .wait_for(|s| *s == target || s.is_terminal())
            .await
            .map(|state| *state);
        reached.unwrap_or_else(|_| *rx.borrow())
    }

    /// Most recent iterations, oldest first
    pub fn recent_iterations(&self) -> Vec<Iteration> {
        self.history.snapshot()
    }
}

/// A control loop running on its own task
#[derive(Debug)]
pub struct RunningMonitor {
    handle: ControlHandle,
    task: JoinHandle<RunSummary>,
}

impl RunningMonitor {
    pub(crate) fn new(handle: ControlHandle, task: JoinHandle<RunSummary>) -> Self {
        Self { handle, task }
    }

    pub fn handle(&self) -> &ControlHandle {
        &self.handle
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the driver to exit
    pub async fn wait(self) -> std::result::Result<RunSummary, JoinError> {
        self.task.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn iteration(ordinal: u64) -> Iteration {
        Iteration {
            ordinal,
            started_at: Utc::now(),
            completed_at: Utc::now(),
            execution_time: Duration::ZERO,
            results: Vec::new(),
        }
    }

    #[test]
    fn test_history_keeps_most_recent() {
        let history = History::new(2);
        for n in 1..=3 {
            history.push(iteration(n));
        }
        let ordinals: Vec<u64> = history.snapshot().iter().map(|i| i.ordinal).collect();
        assert_eq!(ordinals, vec![2, 3]);
    }

    #[test]
    fn test_history_disabled() {
        let history = History::new(0);
        history.push(iteration(1));
        assert!(history.snapshot().is_empty());
    }

    #[test]
    fn test_sender_queues_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = CommandSender::new(tx);

        assert!(sender.send(Command::Stop));
        assert!(sender.send(Command::Kill));
        assert_eq!(rx.try_recv().unwrap(), Command::Stop);
        assert_eq!(rx.try_recv().unwrap(), Command::Kill);
    }

    #[test]
    fn test_handle_reports_closed_loop() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (_state_tx, state_rx) = watch::channel(ControlState::Created);
        let handle = ControlHandle::new(CommandSender::new(tx), state_rx, History::new(1));
        drop(rx);
        assert!(!handle.ping());
        assert_eq!(handle.state(), ControlState::Created);
    }
}
