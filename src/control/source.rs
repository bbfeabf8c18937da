//! Command sources - where remote commands come from
//!
//! A source pushes commands to the callbacks registered with it; the core
//! never polls a transport directly.

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::Command;

/// Callback invoked for every received command
pub type CommandCallback = Arc<dyn Fn(Command) + Send + Sync>;

/// Transport-agnostic inbound command contract
pub trait CommandSource: Send + Sync {
    /// Register a callback; it is invoked once per delivered command
    fn on_command_received(&self, callback: CommandCallback);

    /// Drop a callback registered earlier, matched by identity
    fn remove_callback(&self, _callback: &CommandCallback) {}
}

#[derive(Default)]
struct SourceState {
    callbacks: Vec<CommandCallback>,
    /// Commands sent before anyone registered
    backlog: Vec<Command>,
}

/// In-process command source. Clones share the same registrations.
///
/// Delivery happens under the source's lock so every callback sees commands
/// in send order; callbacks must not send back into the same source.
#[derive(Clone, Default)]
pub struct ChannelCommandSource {
    state: Arc<Mutex<SourceState>>,
}

impl ChannelCommandSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a command to every registered callback, or buffer it until one registers
    pub fn send(&self, command: Command) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.callbacks.is_empty() {
            state.backlog.push(command);
            return;
        }
        for callback in &state.callbacks {
            callback(command);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .len()
    }
}

impl CommandSource for ChannelCommandSource {
    fn on_command_received(&self, callback: CommandCallback) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for command in std::mem::take(&mut state.backlog) {
            callback(command);
        }
        state.callbacks.push(callback);
    }

    fn remove_callback(&self, callback: &CommandCallback) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .retain(|registered| !Arc::ptr_eq(registered, callback));
    }
}

impl std::fmt::Debug for ChannelCommandSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelCommandSource")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> (CommandCallback, Arc<Mutex<Vec<Command>>>) {
        let seen: Arc<Mutex<Vec<Command>>> = Arc::default();
        let s = seen.clone();
        (Arc::new(move |cmd: Command| s.lock().unwrap().push(cmd)), seen)
    }

    #[test]
    fn test_send_reaches_callback() {
        let source = ChannelCommandSource::new();
        let (callback, seen) = collector();
        source.on_command_received(callback);
        source.send(Command::Start);
        source.send(Command::Ping);
        assert_eq!(*seen.lock().unwrap(), vec![Command::Start, Command::Ping]);
    }

    #[test]
    fn test_backlog_flushed_in_order_on_registration() {
        let source = ChannelCommandSource::new();
        source.send(Command::Pause);
        source.send(Command::Start);
        let (callback, seen) = collector();
        source.on_command_received(callback);
        assert_eq!(*seen.lock().unwrap(), vec![Command::Pause, Command::Start]);
    }

    #[test]
    fn test_clones_share_registrations() {
        let source = ChannelCommandSource::new();
        let remote = source.clone();
        let (callback, seen) = collector();
        source.on_command_received(callback);
        remote.send(Command::Kill);
        assert_eq!(*seen.lock().unwrap(), vec![Command::Kill]);
        assert_eq!(remote.listener_count(), 1);
    }

    #[test]
    fn test_remove_callback_stops_delivery() {
        let source = ChannelCommandSource::new();
        let (first, first_seen) = collector();
        let (second, second_seen) = collector();
        source.on_command_received(first.clone());
        source.on_command_received(second);

        source.remove_callback(&first);
        assert_eq!(source.listener_count(), 1);
        source.send(Command::Stop);
        assert!(first_seen.lock().unwrap().is_empty());
        assert_eq!(*second_seen.lock().unwrap(), vec![Command::Stop]);
    }

    #[test]
    fn test_sends_racing_registration_stay_in_order() {
        let source = ChannelCommandSource::new();
        for _ in 0..50 {
            source.send(Command::Ping);
        }
        let sender = source.clone();
        let racer = std::thread::spawn(move || {
            for _ in 0..50 {
                sender.send(Command::Kill);
            }
        });
        let (callback, seen) = collector();
        source.on_command_received(callback);
        racer.join().unwrap();

        // every backlogged ping precedes any kill delivered live
        let seen = seen.lock().unwrap();
        let first_kill = seen.iter().position(|c| *c == Command::Kill).unwrap_or(seen.len());
        assert!(seen[..first_kill].iter().all(|c| *c == Command::Ping));
        assert!(seen[first_kill..].iter().all(|c| *c == Command::Kill));
        assert_eq!(seen.len(), 100);
    }
}
