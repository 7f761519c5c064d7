//! Publish/subscribe event bus.
//!
//! All components communicate observable transitions through the bus without
//! direct coupling. Handlers for a topic run synchronously, in subscription
//! order, at publish time. A failing handler is logged and never prevents
//! the remaining handlers for that publish from running.

use std::collections::HashMap;
use std::fmt;

use crate::event::{GameEvent, Topic};

/// Error type handlers may return; it is logged, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed handler invoked with each published event for its topic.
pub type Handler = Box<dyn FnMut(&GameEvent) -> Result<(), HandlerError> + Send>;

/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
///
/// Closures are not comparable, so removal is by token rather than by
/// handler identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    once: bool,
    handler: Handler,
}

/// Process-wide publish/subscribe channel.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<Topic, Vec<Subscription>>,
    next_id: u64,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a handler to a topic.
    pub fn subscribe(&mut self, topic: Topic, handler: Handler) -> SubscriptionId {
        self.add(topic, handler, false)
    }

    /// Subscribes a handler that is removed before its first invocation, so
    /// a re-entrant publish of the same topic cannot re-trigger it.
    pub fn subscribe_once(&mut self, topic: Topic, handler: Handler) -> SubscriptionId {
        self.add(topic, handler, true)
    }

    fn add(&mut self, topic: Topic, handler: Handler, once: bool) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners
            .entry(topic)
            .or_default()
            .push(Subscription { id, once, handler });
        id
    }

    /// Removes a subscription. Returns `true` if it was present.
    pub fn unsubscribe(&mut self, topic: Topic, id: SubscriptionId) -> bool {
        let Some(subs) = self.listeners.get_mut(&topic) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|sub| sub.id != id);
        subs.len() != before
    }

    /// Publishes an event to every subscriber of its topic, in subscription
    /// order. A topic with no subscribers is a no-op. Handler errors are
    /// logged and do not abort sibling handlers.
    pub fn publish(&mut self, event: &GameEvent) {
        let topic = event.topic();
        let Some(subs) = self.listeners.remove(&topic) else {
            return;
        };

        let mut kept = Vec::with_capacity(subs.len());
        for mut sub in subs {
            if let Err(error) = (sub.handler)(event) {
                tracing::error!(topic = %topic, %error, "event handler failed");
            }
            if !sub.once {
                kept.push(sub);
            }
        }
        if !kept.is_empty() {
            self.listeners.insert(topic, kept);
        }
    }

    /// Removes all subscriptions for a topic, or every subscription when
    /// `topic` is `None`.
    pub fn clear(&mut self, topic: Option<Topic>) {
        match topic {
            Some(topic) => {
                self.listeners.remove(&topic);
            }
            None => self.listeners.clear(),
        }
    }

    /// Number of live subscriptions for a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.listeners.get(&topic).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
