//! Save slots over a [`SaveMedium`].
//!
//! Slot 0 is the autosave; the rest are manual. The quiz answer ledger
//! lives under its own key so clearing progress can leave it alone or wipe
//! it together with the slots, depending on the caller.

use serde::Serialize;
use storyweave_core::bus::EventBus;
use storyweave_core::clock::Clock;
use storyweave_core::error::EngineError;
use storyweave_core::event::GameEvent;
use storyweave_core::types::SceneId;
use storyweave_quiz::SeenAnswerLedger;
use storyweave_state::store::{SaveBlob, StateStore};

use crate::medium::SaveMedium;

/// Number of save slots, autosave included.
pub const SLOT_COUNT: usize = 4;

const LEDGER_KEY: &str = "seen_answers";

/// What a slot holds, surfaced for save/load menus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotMetadata {
    pub slot: usize,
    pub scene_id: Option<SceneId>,
    /// Unix milliseconds at save time.
    pub timestamp: Option<i64>,
}

/// Owns the what-goes-where of durable storage.
pub struct SaveManager {
    medium: Box<dyn SaveMedium>,
}

impl SaveManager {
    #[must_use]
    pub fn new(medium: Box<dyn SaveMedium>) -> Self {
        Self { medium }
    }

    /// Snapshots the store into `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an out-of-range slot and
    /// [`EngineError::Storage`] when the medium fails.
    pub async fn save(
        &self,
        slot: usize,
        store: &StateStore,
        clock: &dyn Clock,
        bus: &mut EventBus,
    ) -> Result<(), EngineError> {
        let key = Self::slot_key(slot)?;
        let blob = store.serialize(clock);
        self.medium.write(&key, &blob).await?;
        tracing::info!(slot, "state saved");
        bus.publish(&GameEvent::StateSaved);
        Ok(())
    }

    /// Restores `slot` into the store. Returns `false` when the slot is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an out-of-range slot or an
    /// unreadable blob, [`EngineError::Storage`] when the medium fails.
    pub async fn load(
        &self,
        slot: usize,
        store: &mut StateStore,
        bus: &mut EventBus,
    ) -> Result<bool, EngineError> {
        let key = Self::slot_key(slot)?;
        let Some(blob) = self.medium.read(&key).await? else {
            return Ok(false);
        };
        store.deserialize(&blob)?;
        tracing::info!(slot, "state loaded");
        bus.publish(&GameEvent::StateLoaded);
        Ok(true)
    }

    /// Whether `slot` holds a save.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an out-of-range slot,
    /// [`EngineError::Storage`] when the medium fails.
    pub async fn has_save(&self, slot: usize) -> Result<bool, EngineError> {
        let key = Self::slot_key(slot)?;
        Ok(self.medium.read(&key).await?.is_some())
    }

    /// Empties `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an out-of-range slot,
    /// [`EngineError::Storage`] when the medium fails.
    pub async fn clear(&self, slot: usize) -> Result<(), EngineError> {
        let key = Self::slot_key(slot)?;
        self.medium.remove(&key).await
    }

    /// Metadata for every occupied slot, newest save first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] when the medium fails.
    pub async fn list_slots(&self) -> Result<Vec<SlotMetadata>, EngineError> {
        let mut slots = Vec::new();
        for slot in 0..SLOT_COUNT {
            let key = Self::slot_key(slot)?;
            let Some(raw) = self.medium.read(&key).await? else {
                continue;
            };
            // A corrupt blob still shows up in the menu, just without
            // metadata.
            let blob: Option<SaveBlob> = serde_json::from_str(&raw).ok();
            slots.push(SlotMetadata {
                slot,
                scene_id: blob
                    .as_ref()
                    .and_then(|b| b.scene.as_ref())
                    .and_then(|s| s.current_id.clone()),
                timestamp: blob.and_then(|b| b.meta).and_then(|m| m.timestamp),
            });
        }
        slots.sort_by_key(|meta| std::cmp::Reverse(meta.timestamp));
        Ok(slots)
    }

    /// Clears every slot and resets the live store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] when the medium fails.
    pub async fn reset_progress(
        &self,
        store: &mut StateStore,
        keep_settings: bool,
        keep_key_flags: bool,
        bus: &mut EventBus,
    ) -> Result<(), EngineError> {
        for slot in 0..SLOT_COUNT {
            self.clear(slot).await?;
        }
        store.reset(keep_settings, keep_key_flags, bus);
        tracing::info!(keep_settings, keep_key_flags, "progress reset");
        Ok(())
    }

    /// Persists the quiz answer ledger.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] when the medium fails.
    pub async fn save_ledger(&self, ledger: &SeenAnswerLedger) -> Result<(), EngineError> {
        let blob = serde_json::to_string(ledger)
            .map_err(|e| EngineError::Storage(format!("ledger serialize: {e}")))?;
        self.medium.write(LEDGER_KEY, &blob).await
    }

    /// Loads the quiz answer ledger. An absent or unreadable ledger comes
    /// back empty rather than failing the session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] when the medium fails.
    pub async fn load_ledger(&self) -> Result<SeenAnswerLedger, EngineError> {
        let Some(raw) = self.medium.read(LEDGER_KEY).await? else {
            return Ok(SeenAnswerLedger::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    }

    fn slot_key(slot: usize) -> Result<String, EngineError> {
        if slot >= SLOT_COUNT {
            return Err(EngineError::Validation(format!(
                "save slot {slot} out of range (0..{SLOT_COUNT})"
            )));
        }
        Ok(format!("slot_{slot}"))
    }
}

impl std::fmt::Debug for SaveManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use storyweave_core::event::Topic;
    use storyweave_test_support::{EventLog, FixedClock};

    use crate::medium::MemoryMedium;

    use super::*;

    fn manager() -> SaveManager {
        SaveManager::new(Box::new(MemoryMedium::new()))
    }

    fn store_at(scene: &str) -> StateStore {
        let mut store = StateStore::new();
        let mut bus = EventBus::new();
        store.set_scene_current_id(Some(SceneId::from(scene)), &mut bus);
        store
    }

    #[tokio::test]
    async fn test_save_then_load_restores_the_scene() {
        // Arrange
        let manager = manager();
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap());
        let mut bus = EventBus::new();
        let log = EventLog::default();
        log.attach(&mut bus, &[Topic::StateSaved, Topic::StateLoaded]);
        let store = store_at("chapel");

        // Act
        manager.save(1, &store, &clock, &mut bus).await.unwrap();
        let mut fresh = StateStore::new();
        let found = manager.load(1, &mut fresh, &mut bus).await.unwrap();

        // Assert
        assert!(found);
        assert_eq!(fresh.scene().current_id, Some(SceneId::from("chapel")));
        assert_eq!(log.topics(), vec![Topic::StateSaved, Topic::StateLoaded]);
    }

    #[tokio::test]
    async fn test_loading_an_empty_slot_is_not_an_error() {
        let manager = manager();
        let mut bus = EventBus::new();
        let mut store = StateStore::new();

        let found = manager.load(2, &mut store, &mut bus).await.unwrap();

        assert!(!found);
        assert!(!manager.has_save(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_slots_are_rejected() {
        let manager = manager();
        let mut bus = EventBus::new();
        let store = StateStore::new();
        let clock = FixedClock(Utc::now());

        let err = manager
            .save(SLOT_COUNT, &store, &clock, &mut bus)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_slots_list_newest_first() {
        // Arrange: slot 2 saved an hour after slot 0.
        let manager = manager();
        let mut bus = EventBus::new();
        let earlier = FixedClock(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap());
        let later = FixedClock(Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap());
        manager
            .save(0, &store_at("chapel"), &earlier, &mut bus)
            .await
            .unwrap();
        manager
            .save(2, &store_at("crypt"), &later, &mut bus)
            .await
            .unwrap();

        // Act
        let slots = manager.list_slots().await.unwrap();

        // Assert
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].slot, 2);
        assert_eq!(slots[0].scene_id, Some(SceneId::from("crypt")));
        assert_eq!(slots[1].slot, 0);
        assert!(slots[0].timestamp > slots[1].timestamp);
    }

    #[tokio::test]
    async fn test_reset_progress_clears_slots_and_store() {
        // Arrange
        let manager = manager();
        let mut bus = EventBus::new();
        let clock = FixedClock(Utc::now());
        let mut store = store_at("chapel");
        manager.save(0, &store, &clock, &mut bus).await.unwrap();

        // Act
        manager
            .reset_progress(&mut store, true, false, &mut bus)
            .await
            .unwrap();

        // Assert
        assert!(!manager.has_save(0).await.unwrap());
        assert_eq!(store.scene().current_id, None);
    }

    #[tokio::test]
    async fn test_ledger_round_trips_and_defaults_empty() {
        let manager = manager();
        assert!(manager.load_ledger().await.unwrap().is_empty());

        let mut ledger = SeenAnswerLedger::new();
        ledger.record("riddles", 0, 1);
        manager.save_ledger(&ledger).await.unwrap();

        assert_eq!(manager.load_ledger().await.unwrap(), ledger);
    }
}
