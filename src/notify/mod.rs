//! Notification Fanout
//!
//! At-most-once delivery of transition events to subscribers grouped by
//! export id and by organization room. No replay buffer: a disconnected
//! subscriber misses events until it re-subscribes and re-reads current
//! state through the store.

pub mod events;
pub mod registry;
pub mod service;

pub use events::{TransitionEvent, topics};
pub use registry::{EventReceiver, EventSender, SubscriberRegistry, SubscriptionId};
pub use service::{EventQueue, NotificationService};
