//! Notification Service - drains the engine's event queue into rooms
//!
//! Runs in the host service's tokio runtime, polling the bounded event
//! queue the engine pushes to, and routing each event to the subscriber
//! registry. Keeps the engine's hot path free of fanout work.

use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use tokio::time::{Duration, interval};

use super::events::TransitionEvent;
use super::registry::SubscriberRegistry;

/// Bounded handoff between the engine and the notification service
pub type EventQueue = ArrayQueue<TransitionEvent>;

pub struct NotificationService {
    registry: Arc<SubscriberRegistry>,
    queue: Arc<EventQueue>,
}

impl NotificationService {
    pub fn new(registry: Arc<SubscriberRegistry>, queue: Arc<EventQueue>) -> Self {
        Self { registry, queue }
    }

    /// Run the service, continuously draining the queue
    pub async fn run(self) {
        let mut tick = interval(Duration::from_millis(5));
        tracing::info!("[NotificationService] Started - polling event queue");

        loop {
            tick.tick().await;
            self.drain_pending();
        }
    }

    /// Drain everything currently queued; returns events routed
    pub fn drain_pending(&self) -> usize {
        let mut count = 0;
        while let Some(event) = self.queue.pop() {
            self.route(&event);
            count += 1;
            // Yield back to the interval after a large batch
            if count >= 1024 {
                break;
            }
        }
        count
    }

    fn route(&self, event: &TransitionEvent) {
        let mut delivered = 0;
        for topic in event.routes() {
            delivered += self.registry.publish(&topic, event);
        }
        tracing::debug!(
            export_id = %event.export_id,
            action = %event.action,
            to_status = %event.to_status,
            delivered,
            "Transition event routed"
        );
    }
}
