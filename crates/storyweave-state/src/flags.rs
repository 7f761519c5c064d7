//! Flag system.
//!
//! Two disjoint sets of named boolean facts: regular flags (cleared on
//! "play again") and key flags (cleared only on full reset). Requirement
//! expressions are evaluated against the union of both sets. Every mutation
//! fully re-mirrors both sets into the store.

use std::collections::BTreeSet;

use storyweave_core::bus::EventBus;
use storyweave_core::event::GameEvent;
use storyweave_core::types::Requirement;

use crate::store::StateStore;

/// Owner of the in-memory flag sets; the store is its durability layer.
#[derive(Debug, Default)]
pub struct FlagManager {
    regular: BTreeSet<String>,
    key: BTreeSet<String>,
}

impl FlagManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrates both sets from the store's last-known arrays, so a
    /// resumed save has correct flag state before any scene logic runs.
    #[must_use]
    pub fn hydrate(store: &StateStore) -> Self {
        let manager = Self {
            regular: store.flags().regular.iter().cloned().collect(),
            key: store.flags().key.iter().cloned().collect(),
        };
        tracing::debug!(
            regular = manager.regular.len(),
            key = manager.key.len(),
            "flag manager hydrated"
        );
        manager
    }

    fn sync(&self, store: &mut StateStore, bus: &mut EventBus) {
        store.set_flag_arrays(
            self.regular.iter().cloned().collect(),
            self.key.iter().cloned().collect(),
            bus,
        );
    }

    /// Sets a regular flag. Empty names are ignored.
    pub fn set(&mut self, flag: &str, store: &mut StateStore, bus: &mut EventBus) {
        if flag.is_empty() {
            return;
        }
        self.regular.insert(flag.to_owned());
        self.sync(store, bus);
        bus.publish(&GameEvent::FlagSet {
            flag: flag.to_owned(),
            is_key: false,
        });
    }

    /// Clears a regular flag. Empty names are ignored.
    pub fn clear(&mut self, flag: &str, store: &mut StateStore, bus: &mut EventBus) {
        if flag.is_empty() {
            return;
        }
        self.regular.remove(flag);
        self.sync(store, bus);
        bus.publish(&GameEvent::FlagCleared {
            flag: flag.to_owned(),
            is_key: false,
        });
    }

    /// `true` if the regular set contains `flag`.
    #[must_use]
    pub fn has(&self, flag: &str) -> bool {
        self.regular.contains(flag)
    }

    /// Sets a key (persistent) flag. Empty names are ignored.
    pub fn set_key(&mut self, flag: &str, store: &mut StateStore, bus: &mut EventBus) {
        if flag.is_empty() {
            return;
        }
        self.key.insert(flag.to_owned());
        self.sync(store, bus);
        bus.publish(&GameEvent::FlagSet {
            flag: flag.to_owned(),
            is_key: true,
        });
    }

    /// Clears a key flag. Empty names are ignored.
    pub fn clear_key(&mut self, flag: &str, store: &mut StateStore, bus: &mut EventBus) {
        if flag.is_empty() {
            return;
        }
        self.key.remove(flag);
        self.sync(store, bus);
        bus.publish(&GameEvent::FlagCleared {
            flag: flag.to_owned(),
            is_key: true,
        });
    }

    /// `true` if the key set contains `flag`.
    #[must_use]
    pub fn has_key(&self, flag: &str) -> bool {
        self.key.contains(flag)
    }

    fn has_any(&self, flag: &str) -> bool {
        self.has(flag) || self.has_key(flag)
    }

    /// Evaluates a requirement expression against the union of both sets.
    /// An empty expression is vacuously true.
    #[must_use]
    pub fn check_requirements(&self, requirements: &[Requirement]) -> bool {
        requirements.iter().all(|req| {
            if req.negated {
                !self.has_any(&req.flag)
            } else {
                self.has_any(&req.flag)
            }
        })
    }

    /// Clears the regular set, and the key set unless `keep_key_flags`.
    pub fn reset(&mut self, keep_key_flags: bool, store: &mut StateStore, bus: &mut EventBus) {
        self.regular.clear();
        if !keep_key_flags {
            self.key.clear();
        }
        self.sync(store, bus);
    }
}

#[cfg(test)]
mod tests {
    use storyweave_core::event::Topic;
    use storyweave_test_support::EventLog;

    use super::*;

    fn reqs(terms: &[&str]) -> Vec<Requirement> {
        terms.iter().map(|t| Requirement::parse(t)).collect()
    }

    #[test]
    fn test_set_mirrors_both_arrays_into_store_and_publishes() {
        // Arrange
        let mut flags = FlagManager::new();
        let mut store = StateStore::new();
        let mut bus = EventBus::new();
        let log = EventLog::new();
        log.attach(&mut bus, &[Topic::FlagSet, Topic::FlagCleared]);

        // Act
        flags.set("met_hero", &mut store, &mut bus);
        flags.set_key("completed", &mut store, &mut bus);
        flags.clear("met_hero", &mut store, &mut bus);

        // Assert
        assert!(store.flags().regular.is_empty());
        assert_eq!(store.flags().key, vec!["completed".to_owned()]);
        match &log.events()[1] {
            GameEvent::FlagSet { flag, is_key } => {
                assert_eq!(flag, "completed");
                assert!(*is_key);
            }
            other => panic!("expected FlagSet, got {other:?}"),
        }
        assert_eq!(
            log.topics(),
            vec![Topic::FlagSet, Topic::FlagSet, Topic::FlagCleared]
        );
    }

    #[test]
    fn test_empty_flag_name_is_ignored() {
        let mut flags = FlagManager::new();
        let mut store = StateStore::new();
        let mut bus = EventBus::new();
        flags.set("", &mut store, &mut bus);
        assert!(store.flags().regular.is_empty());
    }

    #[test]
    fn test_empty_expression_is_vacuously_true() {
        let flags = FlagManager::new();
        assert!(flags.check_requirements(&[]));
    }

    #[test]
    fn test_negated_term_true_iff_flag_absent_from_both_sets() {
        // Arrange
        let mut flags = FlagManager::new();
        let mut store = StateStore::new();
        let mut bus = EventBus::new();

        // Act + Assert
        assert!(flags.check_requirements(&reqs(&["!x"])));
        flags.set_key("x", &mut store, &mut bus);
        assert!(!flags.check_requirements(&reqs(&["!x"])));
    }

    #[test]
    fn test_requirements_use_the_union_of_both_sets() {
        // Arrange
        let mut flags = FlagManager::new();
        let mut store = StateStore::new();
        let mut bus = EventBus::new();
        flags.set("saw_door", &mut store, &mut bus);
        flags.set_key("has_key", &mut store, &mut bus);

        // Act + Assert
        assert!(flags.check_requirements(&reqs(&["saw_door", "has_key"])));
        assert!(!flags.check_requirements(&reqs(&["saw_door", "missing"])));
        assert!(!flags.check_requirements(&reqs(&["saw_door", "!has_key"])));
    }

    #[test]
    fn test_hydrate_restores_sets_from_store_arrays() {
        // Arrange
        let mut store = StateStore::new();
        let mut bus = EventBus::new();
        store.set_flag_arrays(
            vec!["met_hero".to_owned()],
            vec!["completed".to_owned()],
            &mut bus,
        );

        // Act
        let flags = FlagManager::hydrate(&store);

        // Assert
        assert!(flags.has("met_hero"));
        assert!(flags.has_key("completed"));
        assert!(!flags.has("completed"));
    }

    #[test]
    fn test_reset_keeps_key_flags_only_when_asked() {
        // Arrange
        let mut flags = FlagManager::new();
        let mut store = StateStore::new();
        let mut bus = EventBus::new();
        flags.set("met_hero", &mut store, &mut bus);
        flags.set_key("completed", &mut store, &mut bus);

        // Act
        flags.reset(true, &mut store, &mut bus);

        // Assert
        assert!(!flags.has("met_hero"));
        assert!(flags.has_key("completed"));

        // Act again: full reset.
        flags.reset(false, &mut store, &mut bus);
        assert!(!flags.has_key("completed"));
        assert!(store.flags().key.is_empty());
    }
}
