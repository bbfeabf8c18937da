//! Event handlers - where outbound events go

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::Event;
use crate::error::BoxError;

/// Transport-agnostic outbound event contract
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> std::result::Result<(), BoxError>;
}

/// Forwards events into an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelEventHandler {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelEventHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventHandler for ChannelEventHandler {
    async fn handle(&self, event: Event) -> std::result::Result<(), BoxError> {
        self.tx
            .send(event)
            .map_err(|_| "event receiver dropped".into())
    }
}

/// Writes events to the log as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventHandler;

#[async_trait]
impl EventHandler for LogEventHandler {
    async fn handle(&self, event: Event) -> std::result::Result<(), BoxError> {
        let json = serde_json::to_string(&event)?;
        log::info!("event {}", json);
        Ok(())
    }
}
