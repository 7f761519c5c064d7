//! Recording sink for bus events.

use std::sync::{Arc, Mutex};

use storyweave_core::bus::{EventBus, Handler};
use storyweave_core::event::{GameEvent, Topic};

/// Collects every event published on the topics it is attached to.
///
/// Clones share the same log, so a test keeps one handle while the bus owns
/// the subscribed handlers.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<GameEvent>>>);

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a bus handler that appends to this log.
    #[must_use]
    pub fn handler(&self) -> Handler {
        let log = Arc::clone(&self.0);
        Box::new(move |event| {
            log.lock().unwrap().push(event.clone());
            Ok(())
        })
    }

    /// Subscribes this log to the given topics.
    pub fn attach(&self, bus: &mut EventBus, topics: &[Topic]) {
        for topic in topics {
            bus.subscribe(*topic, self.handler());
        }
    }

    /// Subscribes this log to every topic.
    pub fn attach_all(&self, bus: &mut EventBus) {
        self.attach(bus, &Topic::ALL);
    }

    /// Snapshot of the recorded events.
    ///
    /// # Panics
    ///
    /// Panics if a handler panicked while holding the lock.
    #[must_use]
    pub fn events(&self) -> Vec<GameEvent> {
        self.0.lock().unwrap().clone()
    }

    /// Topics of the recorded events, in publish order.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.events().iter().map(GameEvent::topic).collect()
    }

    /// Empties the log.
    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}
