//! Subscriber Registry
//!
//! Thread-safe topic rooms backed by DashMap. Supports multiple
//! subscriptions per topic (dashboard tabs, redundant service instances).
//! Delivery is at-most-once to currently-connected subscribers; there is no
//! replay buffer.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::core_types::{ExportId, OrgId, OrgKind};

use super::events::{TransitionEvent, topics};

pub type EventSender = mpsc::UnboundedSender<TransitionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TransitionEvent>;

/// Unique subscription identifier
pub type SubscriptionId = u64;

pub struct SubscriberRegistry {
    /// topic -> list of (subscription_id, sender)
    rooms: DashMap<String, Vec<(SubscriptionId, EventSender)>>,
    next_sub_id: AtomicU64,
    /// Sends that found a closed receiver
    dropped_sends: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            next_sub_id: AtomicU64::new(1),
            dropped_sends: AtomicU64::new(0),
        }
    }

    /// Subscribe to a topic; the receiver sees events published after this
    /// call only
    pub fn subscribe(&self, topic: impl Into<String>) -> (SubscriptionId, EventReceiver) {
        let topic = topic.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let sub_id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);

        self.rooms.entry(topic.clone()).or_default().push((sub_id, tx));

        tracing::debug!(topic = %topic, sub_id, "Subscriber added");
        (sub_id, rx)
    }

    /// Follow one export
    pub fn subscribe_export(&self, export_id: &ExportId) -> (SubscriptionId, EventReceiver) {
        self.subscribe(topics::export(export_id))
    }

    /// Follow the room of an organization kind
    pub fn subscribe_org_kind(&self, kind: OrgKind) -> (SubscriptionId, EventReceiver) {
        self.subscribe(topics::org_kind(kind))
    }

    /// Follow one concrete organization's room
    pub fn subscribe_org(&self, org: &OrgId) -> (SubscriptionId, EventReceiver) {
        self.subscribe(topics::org(org))
    }

    /// Remove one subscription; cleans up empty rooms
    pub fn unsubscribe(&self, topic: &str, sub_id: SubscriptionId) {
        if let Some(mut senders) = self.rooms.get_mut(topic) {
            senders.retain(|(id, _)| *id != sub_id);
            if senders.is_empty() {
                drop(senders);
                self.rooms.remove(topic);
            }
        }
    }

    /// Deliver an event to every live subscriber of a topic
    ///
    /// Closed receivers are dropped from the room; their missed events are
    /// gone by design - reconnecting clients re-read current state.
    pub fn publish(&self, topic: &str, event: &TransitionEvent) -> usize {
        let Some(mut senders) = self.rooms.get_mut(topic) else {
            return 0;
        };

        let mut delivered = 0;
        senders.retain(|(sub_id, tx)| match tx.send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                self.dropped_sends.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(topic = %topic, sub_id, "Dropping closed subscriber");
                false
            }
        });
        if senders.is_empty() {
            drop(senders);
            self.rooms.remove(topic);
        }
        delivered
    }

    /// (number of rooms, total subscriptions)
    pub fn stats(&self) -> (usize, usize) {
        let rooms = self.rooms.len();
        let subs = self.rooms.iter().map(|e| e.value().len()).sum();
        (rooms, subs)
    }

    /// Number of sends that hit a closed receiver since startup
    pub fn dropped_sends(&self) -> u64 {
        self.dropped_sends.load(Ordering::Relaxed)
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{ExportId, OrgId};
    use crate::lifecycle::status::ExportStatus;

    fn event() -> TransitionEvent {
        TransitionEvent {
            export_id: ExportId::new(),
            action: "verifyLot".to_string(),
            from_status: Some(ExportStatus::ExchangePending),
            to_status: ExportStatus::ExchangeVerified,
            actor_org: OrgId::from("ecx"),
            originating_org: OrgId::from("awash"),
            timestamp_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_subscribe_publish_unsubscribe() {
        let registry = SubscriberRegistry::new();
        let (sub_id, mut rx) = registry.subscribe("export.abc");
        assert_eq!(registry.stats(), (1, 1));

        assert_eq!(registry.publish("export.abc", &event()), 1);
        assert!(rx.try_recv().is_ok());

        registry.unsubscribe("export.abc", sub_id);
        assert_eq!(registry.stats(), (0, 0));
        assert_eq!(registry.publish("export.abc", &event()), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_per_topic() {
        let registry = SubscriberRegistry::new();
        let (_id1, mut rx1) = registry.subscribe("org.CUSTOMS");
        let (_id2, mut rx2) = registry.subscribe("org.CUSTOMS");

        assert_eq!(registry.publish("org.CUSTOMS", &event()), 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_closed_receiver_dropped_from_room() {
        let registry = SubscriberRegistry::new();
        let (_id, rx) = registry.subscribe("export.abc");
        drop(rx);

        assert_eq!(registry.publish("export.abc", &event()), 0);
        assert_eq!(registry.dropped_sends(), 1);
        // Room cleaned up entirely
        assert_eq!(registry.stats(), (0, 0));
    }
}
