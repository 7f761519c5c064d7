//! The scene state machine.
//!
//! One engine instance owns the story table and walks it: `load_scene`
//! applies a scene's side effects and starts its first text block,
//! `advance` steps through blocks (skipping an in-flight reveal first), and
//! `select_choice` validates and follows a branch. Every transition is
//! published on the bus and mirrored into the state store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyweave_core::bus::EventBus;
use storyweave_core::error::EngineError;
use storyweave_core::event::GameEvent;
use storyweave_core::tuning::Tuning;
use storyweave_core::types::SceneId;
use storyweave_state::flags::FlagManager;
use storyweave_state::store::{StateStore, TextSpeed};
use storyweave_story::{Scene, StoryTable};

use crate::stage::Stage;
use crate::typewriter::Typewriter;

/// Where the engine is in the scene lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenePhase {
    /// No scene loaded yet.
    Idle,
    /// A text block is displayed (possibly still revealing).
    Text,
    /// The scene's choices are offered.
    Choices,
    /// An ending scene finished; there is nowhere left to go.
    Ended,
    /// The last load failed.
    Error,
}

/// A choice as offered to the player. Choices with unmet requirements are
/// listed but disabled, never hidden.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceView {
    pub index: usize,
    pub label: String,
    pub target: Option<SceneId>,
    pub enabled: bool,
}

/// Scene and dialogue engine.
pub struct SceneEngine {
    story: StoryTable,
    tuning: Tuning,
    typewriter: Typewriter,
    phase: ScenePhase,
    current: Option<SceneId>,
    block_index: usize,
    pending_save: bool,
}

impl SceneEngine {
    #[must_use]
    pub fn new(story: StoryTable, tuning: Tuning) -> Self {
        Self {
            story,
            tuning,
            typewriter: Typewriter::new(),
            phase: ScenePhase::Idle,
            current: None,
            block_index: 0,
            pending_save: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> ScenePhase {
        self.phase
    }

    #[must_use]
    pub fn current_scene_id(&self) -> Option<&SceneId> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn story(&self) -> &StoryTable {
        &self.story
    }

    /// The revealed portion of the current text block.
    #[must_use]
    pub fn visible_text(&self) -> String {
        self.typewriter.visible()
    }

    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.typewriter.is_typing()
    }

    /// Loads a scene: records it in the store, applies its flag and stage
    /// side effects, and starts its first text block. Reloading the scene
    /// already on top of the history does not grow the history.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SceneNotFound`] for an unknown id; the engine
    /// moves to [`ScenePhase::Error`] and publishes `scene:error`.
    pub fn load_scene(
        &mut self,
        id: &SceneId,
        store: &mut StateStore,
        flags: &mut FlagManager,
        stage: &mut dyn Stage,
        bus: &mut EventBus,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.load_scene_at(id, 0, store, flags, stage, bus, now)
    }

    /// Loads a scene starting from `start_block` instead of the first text
    /// block. This is how a restored save resumes mid-scene; a start block
    /// past the last text block goes straight to the choices.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SceneNotFound`] for an unknown id.
    #[allow(clippy::too_many_arguments)]
    pub fn load_scene_at(
        &mut self,
        id: &SceneId,
        start_block: usize,
        store: &mut StateStore,
        flags: &mut FlagManager,
        stage: &mut dyn Stage,
        bus: &mut EventBus,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        bus.publish(&GameEvent::SceneLoading {
            scene_id: id.clone(),
        });

        let Some(scene) = self.story.get(id).cloned() else {
            self.phase = ScenePhase::Error;
            let err = EngineError::SceneNotFound(id.clone());
            tracing::warn!(scene = %id, "scene load failed");
            bus.publish(&GameEvent::SceneError {
                scene_id: id.clone(),
                message: err.to_string(),
            });
            return Err(err);
        };

        store.set_scene_current_id(Some(id.clone()), bus);
        store.set_scene_block_index(start_block, bus);
        store.push_history(id, bus);

        // Flag side effects apply in authored order: set, set-key, clear.
        for flag in &scene.set_flags {
            flags.set(flag, store, bus);
        }
        for flag in &scene.set_key_flags {
            flags.set_key(flag, store, bus);
        }
        for flag in &scene.clear_flags {
            flags.clear(flag, store, bus);
        }

        stage.set_background(scene.bg.as_deref());
        stage.set_music(scene.music.as_deref());
        stage.set_sprites(&scene.chars);

        self.current = Some(id.clone());
        self.block_index = start_block;
        tracing::info!(scene = %id, blocks = scene.text_blocks.len(), "scene loaded");
        bus.publish(&GameEvent::SceneLoaded {
            scene_id: id.clone(),
        });

        if self.tuning.save.auto_save_on_scene_change {
            self.pending_save = true;
        }

        if start_block >= scene.text_blocks.len() {
            self.offer_choices(&scene, bus);
        } else {
            self.show_block(&scene, start_block, store, bus, now);
        }
        Ok(())
    }

    /// Advances the dialogue. While a block is still revealing this skips
    /// the reveal instead; otherwise the finished block is marked read and
    /// the next block starts, or the scene's choices are offered after the
    /// last one. A no-op outside the text phase.
    pub fn advance(&mut self, store: &mut StateStore, bus: &mut EventBus, now: DateTime<Utc>) {
        if self.phase != ScenePhase::Text {
            return;
        }
        if self.typewriter.is_typing() {
            self.typewriter.skip(bus);
            return;
        }

        let Some(scene) = self.current.as_ref().and_then(|id| self.story.get(id)).cloned()
        else {
            return;
        };
        store.mark_block_read(&scene.id, self.block_index, bus);

        let next = self.block_index + 1;
        if next < scene.text_blocks.len() {
            self.show_block(&scene, next, store, bus, now);
        } else {
            self.offer_choices(&scene, bus);
        }
    }

    /// The current scene's choices with their availability. Empty outside
    /// the choices phase.
    #[must_use]
    pub fn choices(&self, flags: &FlagManager) -> Vec<ChoiceView> {
        if self.phase != ScenePhase::Choices {
            return Vec::new();
        }
        let Some(scene) = self.current.as_ref().and_then(|id| self.story.get(id)) else {
            return Vec::new();
        };
        scene
            .choices
            .iter()
            .enumerate()
            .map(|(index, choice)| ChoiceView {
                index,
                label: choice.label.clone(),
                target: choice.target.clone(),
                enabled: flags.check_requirements(&choice.require_flags),
            })
            .collect()
    }

    /// Follows a choice: publishes `choice:selected`, then applies the
    /// choice's flags, then loads its target scene.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidChoice`] outside the choices phase,
    /// for an out-of-range index, or when the choice's requirements are not
    /// met. [`EngineError::SceneNotFound`] propagates from the target load.
    pub fn select_choice(
        &mut self,
        index: usize,
        store: &mut StateStore,
        flags: &mut FlagManager,
        stage: &mut dyn Stage,
        bus: &mut EventBus,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if self.phase != ScenePhase::Choices {
            return Err(EngineError::InvalidChoice {
                index,
                reason: "no choices are active".to_owned(),
            });
        }
        let Some(scene) = self.current.as_ref().and_then(|id| self.story.get(id)).cloned()
        else {
            return Err(EngineError::InvalidChoice {
                index,
                reason: "no scene loaded".to_owned(),
            });
        };
        let Some(choice) = scene.choices.get(index) else {
            return Err(EngineError::InvalidChoice {
                index,
                reason: format!("scene has {} choices", scene.choices.len()),
            });
        };
        if !flags.check_requirements(&choice.require_flags) {
            return Err(EngineError::InvalidChoice {
                index,
                reason: "requirements not met".to_owned(),
            });
        }

        // Selection is observable before any of its side effects land.
        bus.publish(&GameEvent::ChoiceSelected {
            index,
            label: choice.label.clone(),
            target: choice.target.clone(),
        });
        for flag in &choice.set_flags {
            flags.set(flag, store, bus);
        }
        match &choice.target {
            Some(target) => self.load_scene(&target.clone(), store, flags, stage, bus, now),
            None => Ok(()),
        }
    }

    /// Pumps the text reveal timers.
    pub fn tick(&mut self, now: DateTime<Utc>, bus: &mut EventBus) {
        self.typewriter.tick(now, bus);
    }

    /// Takes the autosave signal raised by the last scene load, clearing it.
    pub fn take_pending_save(&mut self) -> bool {
        std::mem::take(&mut self.pending_save)
    }

    fn show_block(
        &mut self,
        scene: &Scene,
        index: usize,
        store: &mut StateStore,
        bus: &mut EventBus,
        now: DateTime<Utc>,
    ) {
        self.block_index = index;
        self.phase = ScenePhase::Text;
        store.set_scene_block_index(index, bus);
        bus.publish(&GameEvent::TextStart {
            scene_id: scene.id.clone(),
            block_index: index,
        });
        let speed_ms = match store.settings().text_speed {
            TextSpeed::Normal => self.tuning.text.speed_normal_ms,
            TextSpeed::Fast => self.tuning.text.speed_fast_ms,
            TextSpeed::Instant => 0,
        };
        self.typewriter
            .start(&scene.text_blocks[index], index, speed_ms, now, bus);
    }

    fn offer_choices(&mut self, scene: &Scene, bus: &mut EventBus) {
        if scene.is_ending() {
            self.phase = ScenePhase::Ended;
            tracing::info!(scene = %scene.id, "ending reached");
            return;
        }
        self.phase = ScenePhase::Choices;
        bus.publish(&GameEvent::ChoiceShown {
            count: scene.choices.len(),
        });
    }
}

impl std::fmt::Debug for SceneEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneEngine")
            .field("phase", &self.phase)
            .field("current", &self.current)
            .field("block_index", &self.block_index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use storyweave_core::clock::Clock;
    use storyweave_core::event::Topic;
    use storyweave_core::types::Requirement;
    use storyweave_story::Choice;
    use storyweave_test_support::{EventLog, StepClock};

    use crate::stage::NullStage;

    use super::*;

    fn story() -> StoryTable {
        let mut intro = Scene::new("intro");
        intro.text_blocks = vec!["<p>One.</p>".to_owned(), "<p>Two.</p>".to_owned()];
        intro.set_flags = vec!["met_guide".to_owned()];
        intro.set_key_flags = vec!["act1".to_owned()];
        intro.clear_flags = vec!["met_guide".to_owned()];
        intro.choices = vec![
            Choice {
                label: "Go north".to_owned(),
                target: Some(SceneId::from("north")),
                require_flags: Vec::new(),
                set_flags: vec!["went_north".to_owned()],
            },
            Choice {
                label: "Use the key".to_owned(),
                target: Some(SceneId::from("vault")),
                require_flags: vec![Requirement::parse("has_key")],
                set_flags: Vec::new(),
            },
        ];

        let mut north = Scene::new("north");
        north.text_blocks = vec!["<p>North.</p>".to_owned()];

        let mut vault = Scene::new("vault");
        vault.text_blocks = vec!["<p>Vault.</p>".to_owned()];

        StoryTable::from_scenes(vec![intro, north, vault])
    }

    fn instant_store() -> StateStore {
        let mut store = StateStore::new();
        let mut bus = EventBus::new();
        let mut settings = store.settings().clone();
        settings.text_speed = TextSpeed::Instant;
        store.set_settings(settings, &mut bus);
        store
    }

    fn finish_text(
        engine: &mut SceneEngine,
        store: &mut StateStore,
        bus: &mut EventBus,
        now: DateTime<Utc>,
    ) {
        while engine.phase() == ScenePhase::Text {
            engine.advance(store, bus, now);
        }
    }

    #[test]
    fn test_load_scene_applies_flags_in_authored_order() {
        // Arrange
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let mut engine = SceneEngine::new(story(), Tuning::default());

        // Act
        engine
            .load_scene(
                &SceneId::from("intro"),
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();

        // Assert: set then cleared in the same scene ends cleared.
        assert!(!flags.has("met_guide"));
        assert!(flags.has_key("act1"));
        assert_eq!(store.scene().current_id, Some(SceneId::from("intro")));
        assert_eq!(store.scene().history, vec![SceneId::from("intro")]);
        assert_eq!(engine.phase(), ScenePhase::Text);
    }

    #[test]
    fn test_load_scene_publishes_loading_then_loaded() {
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let log = EventLog::default();
        log.attach(&mut bus, &[Topic::SceneLoading, Topic::SceneLoaded]);
        let mut engine = SceneEngine::new(story(), Tuning::default());

        engine
            .load_scene(
                &SceneId::from("intro"),
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();

        assert_eq!(log.topics(), vec![Topic::SceneLoading, Topic::SceneLoaded]);
    }

    #[test]
    fn test_unknown_scene_is_an_error_phase() {
        // Arrange
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let log = EventLog::default();
        log.attach(&mut bus, &[Topic::SceneError]);
        let mut engine = SceneEngine::new(story(), Tuning::default());

        // Act
        let result = engine.load_scene(
            &SceneId::from("missing"),
            &mut store,
            &mut flags,
            &mut NullStage,
            &mut bus,
            clock.now(),
        );

        // Assert
        assert!(matches!(result, Err(EngineError::SceneNotFound(_))));
        assert_eq!(engine.phase(), ScenePhase::Error);
        assert_eq!(log.topics(), vec![Topic::SceneError]);
    }

    #[test]
    fn test_reloading_the_current_scene_does_not_grow_history() {
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let mut engine = SceneEngine::new(story(), Tuning::default());
        let id = SceneId::from("intro");

        for _ in 0..3 {
            engine
                .load_scene(&id, &mut store, &mut flags, &mut NullStage, &mut bus, clock.now())
                .unwrap();
        }

        assert_eq!(store.scene().history.len(), 1);
    }

    #[test]
    fn test_load_scene_at_resumes_a_mid_scene_block() {
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let mut engine = SceneEngine::new(story(), Tuning::default());

        engine
            .load_scene_at(
                &SceneId::from("intro"),
                1,
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();

        assert_eq!(store.scene().current_block_index, 1);
        assert_eq!(engine.visible_text(), "<p>Two.</p>");
        assert_eq!(engine.phase(), ScenePhase::Text);

        // A start block past the last text block goes straight to choices.
        let mut engine = SceneEngine::new(story(), Tuning::default());
        engine
            .load_scene_at(
                &SceneId::from("intro"),
                2,
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();
        assert_eq!(engine.phase(), ScenePhase::Choices);
    }

    #[test]
    fn test_advance_skips_an_in_flight_reveal_first() {
        // Arrange: normal speed so the reveal is actually paced.
        let clock = StepClock::default();
        let mut store = StateStore::new();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let log = EventLog::default();
        log.attach(&mut bus, &[Topic::TextSkip]);
        let mut engine = SceneEngine::new(story(), Tuning::default());
        engine
            .load_scene(
                &SceneId::from("intro"),
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();
        assert!(engine.is_typing());

        // Act
        engine.advance(&mut store, &mut bus, clock.now());

        // Assert: still on block 0, fully revealed.
        assert!(!engine.is_typing());
        assert_eq!(engine.visible_text(), "<p>One.</p>");
        assert_eq!(log.topics(), vec![Topic::TextSkip]);
        assert_eq!(store.scene().current_block_index, 0);
    }

    #[test]
    fn test_advance_marks_blocks_read_and_reaches_choices() {
        // Arrange
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let log = EventLog::default();
        log.attach(&mut bus, &[Topic::ChoiceShown]);
        let mut engine = SceneEngine::new(story(), Tuning::default());
        engine
            .load_scene(
                &SceneId::from("intro"),
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();

        // Act
        finish_text(&mut engine, &mut store, &mut bus, clock.now());

        // Assert
        assert_eq!(engine.phase(), ScenePhase::Choices);
        assert_eq!(
            store.meta().read_blocks,
            vec!["intro:0".to_owned(), "intro:1".to_owned()]
        );
        assert!(matches!(
            log.events().as_slice(),
            [GameEvent::ChoiceShown { count: 2 }]
        ));
    }

    #[test]
    fn test_unmet_requirements_disable_but_do_not_hide() {
        // Arrange
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let mut engine = SceneEngine::new(story(), Tuning::default());
        engine
            .load_scene(
                &SceneId::from("intro"),
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();
        finish_text(&mut engine, &mut store, &mut bus, clock.now());

        // Act
        let views = engine.choices(&flags);

        // Assert
        assert_eq!(views.len(), 2);
        assert!(views[0].enabled);
        assert!(!views[1].enabled);

        let err = engine
            .select_choice(1, &mut store, &mut flags, &mut NullStage, &mut bus, clock.now())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidChoice { index: 1, .. }));
    }

    #[test]
    fn test_selection_is_published_before_its_side_effects() {
        // Arrange
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let mut engine = SceneEngine::new(story(), Tuning::default());
        engine
            .load_scene(
                &SceneId::from("intro"),
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();
        finish_text(&mut engine, &mut store, &mut bus, clock.now());
        let log = EventLog::default();
        log.attach(
            &mut bus,
            &[Topic::ChoiceSelected, Topic::FlagSet, Topic::SceneLoaded],
        );

        // Act
        engine
            .select_choice(0, &mut store, &mut flags, &mut NullStage, &mut bus, clock.now())
            .unwrap();

        // Assert
        assert_eq!(
            log.topics(),
            vec![Topic::ChoiceSelected, Topic::FlagSet, Topic::SceneLoaded]
        );
        assert!(flags.has("went_north"));
        assert_eq!(engine.current_scene_id(), Some(&SceneId::from("north")));
    }

    #[test]
    fn test_scene_without_choices_ends_the_story() {
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let mut engine = SceneEngine::new(story(), Tuning::default());
        engine
            .load_scene(
                &SceneId::from("north"),
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();

        finish_text(&mut engine, &mut store, &mut bus, clock.now());

        assert_eq!(engine.phase(), ScenePhase::Ended);
        assert!(engine.choices(&flags).is_empty());
    }

    #[test]
    fn test_scene_load_raises_the_autosave_signal() {
        let clock = StepClock::default();
        let mut store = instant_store();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let mut engine = SceneEngine::new(story(), Tuning::default());
        assert!(!engine.take_pending_save());

        engine
            .load_scene(
                &SceneId::from("intro"),
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();

        assert!(engine.take_pending_save());
        assert!(!engine.take_pending_save());
    }

    #[test]
    fn test_paced_reveal_completes_through_tick() {
        // Arrange: "<p>One.</p>" has four visible characters.
        let clock = StepClock::default();
        let mut store = StateStore::new();
        let mut flags = FlagManager::new();
        let mut bus = EventBus::new();
        let log = EventLog::default();
        log.attach(&mut bus, &[Topic::TextComplete]);
        let mut engine = SceneEngine::new(story(), Tuning::default());
        engine
            .load_scene(
                &SceneId::from("intro"),
                &mut store,
                &mut flags,
                &mut NullStage,
                &mut bus,
                clock.now(),
            )
            .unwrap();

        // Act
        clock.advance(Duration::milliseconds(18 * 4));
        engine.tick(clock.now(), &mut bus);

        // Assert
        assert!(!engine.is_typing());
        assert_eq!(engine.visible_text(), "<p>One.</p>");
        assert_eq!(log.topics(), vec![Topic::TextComplete]);
    }
}
