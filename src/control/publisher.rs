//! EventPublisher - fire-and-forget delivery of outbound events
//!
//! `publish` only enqueues. A single delivery task hands events to the handler
//! in order, giving each one a bounded grace period. Failures are logged and
//! reported to the iteration `on_error` hook; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::handler::EventHandler;
use crate::domain::{Event, Fault, FaultSource};
use crate::hooks::HookDispatcher;

/// Publishes events without blocking the control loop
#[derive(Debug)]
pub struct EventPublisher {
    tx: Option<mpsc::UnboundedSender<Event>>,
    worker: Option<JoinHandle<()>>,
    grace: Duration,
}

impl EventPublisher {
    /// Spawn the delivery task. Must be called inside a Tokio runtime.
    pub fn spawn(
        handler: Option<Arc<dyn EventHandler>>,
        dispatcher: HookDispatcher,
        grace: Duration,
    ) -> Self {
        let Some(handler) = handler else {
            return Self {
                tx: None,
                worker: None,
                grace,
            };
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deliver(rx, handler, dispatcher, grace));
        Self {
            tx: Some(tx),
            worker: Some(worker),
            grace,
        }
    }

    /// Enqueue an event. Returns false when there is nowhere to deliver it.
    pub fn publish(&self, event: Event) -> bool {
        match &self.tx {
            Some(tx) => {
                tracing::debug!(event = event.event_type(), "Publishing event");
                tx.send(event).is_ok()
            }
            None => {
                tracing::trace!(event = event.event_type(), "No event handler configured");
                false
            }
        }
    }

    /// Close the queue and wait for pending deliveries, at most one grace period
    pub async fn shutdown(mut self) {
        self.tx.take();
        if let Some(mut worker) = self.worker.take() {
            if tokio::time::timeout(self.grace, &mut worker).await.is_err() {
                log::warn!("Event delivery did not drain within {:?}, abandoning", self.grace);
                worker.abort();
            }
        }
    }
}

async fn deliver(
    mut rx: mpsc::UnboundedReceiver<Event>,
    handler: Arc<dyn EventHandler>,
    dispatcher: HookDispatcher,
    grace: Duration,
) {
    while let Some(event) = rx.recv().await {
        let event_type = event.event_type();
        let message = match tokio::time::timeout(grace, handler.handle(event)).await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => format!("{} not delivered: {}", event_type, e),
            Err(_) => format!("{} not delivered within {}ms", event_type, grace.as_millis()),
        };
        log::error!("{}", message);
        dispatcher
            .report(&Fault::new(FaultSource::EventDelivery, message))
            .await;
    }
}
