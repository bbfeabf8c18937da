//! Control plane
//!
//! - `CommandController`: the Created/Running/Paused/Stopped/Killed state machine
//! - `CommandSource`: inbound commands, pushed by a transport
//! - `EventHandler` / `EventPublisher`: outbound events, fire-and-forget

pub mod controller;
pub mod handler;
pub mod publisher;
pub mod source;

pub use controller::{CommandController, CommandEffect};
pub use handler::{ChannelEventHandler, EventHandler, LogEventHandler};
pub use publisher::EventPublisher;
pub use source::{ChannelCommandSource, CommandCallback, CommandSource};
