//! The playthrough behind the HTTP surface.
//!
//! `GameSession` wires the engines to one bus, one store, and one flag set,
//! and owns the routing between them: battle raises QTE requests, finished
//! QTEs feed back into battle, and battle or quiz outcomes load their
//! target scenes. [`tick_once`] is the async pump that moves all of it
//! forward between requests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use storyweave_battle::{BattleConfig, BattleEngine};
use storyweave_core::bus::{EventBus, Handler};
use storyweave_core::error::EngineError;
use storyweave_core::rng::RandomSource;
use storyweave_core::tuning::Tuning;
use storyweave_core::types::{QteKind, SceneId};
use storyweave_qte::QteEngine;
use storyweave_quiz::{QuizConfig, QuizEngine, SeenAnswerLedger};
use storyweave_scene::{ChoiceView, NullStage, SceneEngine};
use storyweave_state::flags::FlagManager;
use storyweave_state::store::{Settings, StateStore};
use storyweave_story::StoryTable;

use crate::state::AppState;

/// Autosaves land in slot 0; manual saves use the rest.
pub const AUTOSAVE_SLOT: usize = 0;

const EVENT_FEED_CAP: usize = 256;

/// Ring buffer of published events, drained over HTTP so clients can follow
/// the bus without a live connection.
#[derive(Debug, Clone, Default)]
pub struct EventFeed(Arc<Mutex<VecDeque<serde_json::Value>>>);

impl EventFeed {
    fn handler(&self) -> Handler {
        let buffer = Arc::clone(&self.0);
        Box::new(move |event| {
            let value = serde_json::to_value(event)?;
            let mut buffer = buffer.lock().map_err(|_| "event feed lock poisoned")?;
            if buffer.len() == EVENT_FEED_CAP {
                buffer.pop_front();
            }
            buffer.push_back(value);
            Ok(())
        })
    }

    /// Takes everything buffered since the last drain.
    #[must_use]
    pub fn drain(&self) -> Vec<serde_json::Value> {
        self.0.lock().map_or_else(|_| Vec::new(), |mut b| b.drain(..).collect())
    }
}

/// What a tick pass asks the async host to do.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickSignals {
    /// A scene change wants an autosave.
    pub autosave: bool,
    /// The quiz answer ledger changed and should be persisted.
    pub ledger_dirty: bool,
}

/// One playthrough: every engine, wired together.
pub struct GameSession {
    bus: EventBus,
    store: StateStore,
    flags: FlagManager,
    scene: SceneEngine,
    qte: QteEngine,
    battle: BattleEngine,
    quiz: QuizEngine,
    ledger: SeenAnswerLedger,
    stage: NullStage,
    rng: Box<dyn RandomSource>,
    feed: EventFeed,
    ledger_dirty: bool,
}

impl GameSession {
    #[must_use]
    pub fn new(story: StoryTable, tuning: Tuning, rng: Box<dyn RandomSource>) -> Self {
        let mut bus = EventBus::new();
        let feed = EventFeed::default();
        for topic in storyweave_core::event::Topic::ALL {
            bus.subscribe(topic, feed.handler());
        }
        Self {
            bus,
            store: StateStore::new(),
            flags: FlagManager::new(),
            scene: SceneEngine::new(story, tuning.clone()),
            qte: QteEngine::new(tuning.qte),
            battle: BattleEngine::new(tuning.battle),
            quiz: QuizEngine::new(tuning.quiz),
            ledger: SeenAnswerLedger::new(),
            stage: NullStage,
            rng,
            feed,
            ledger_dirty: false,
        }
    }

    #[must_use]
    pub fn feed(&self) -> EventFeed {
        self.feed.clone()
    }

    #[must_use]
    pub fn scene(&self) -> &SceneEngine {
        &self.scene
    }

    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    #[must_use]
    pub fn qte(&self) -> &QteEngine {
        &self.qte
    }

    #[must_use]
    pub fn battle(&self) -> &BattleEngine {
        &self.battle
    }

    #[must_use]
    pub fn quiz(&self) -> &QuizEngine {
        &self.quiz
    }

    #[must_use]
    pub fn ledger(&self) -> &SeenAnswerLedger {
        &self.ledger
    }

    pub fn set_ledger(&mut self, ledger: SeenAnswerLedger) {
        self.ledger = ledger;
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.store.set_settings(settings, &mut self.bus);
    }

    /// Split borrow for save operations.
    pub fn store_and_bus(&mut self) -> (&StateStore, &mut EventBus) {
        (&self.store, &mut self.bus)
    }

    /// Split borrow for load operations.
    pub fn store_and_bus_mut(&mut self) -> (&mut StateStore, &mut EventBus) {
        (&mut self.store, &mut self.bus)
    }

    /// Rebuilds the flag set from the store after a load.
    pub fn rehydrate_flags(&mut self) {
        self.flags = FlagManager::hydrate(&self.store);
    }

    /// Loads a scene by id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SceneNotFound`] for an unknown id.
    pub fn load_scene(&mut self, id: &SceneId, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.scene.load_scene(
            id,
            &mut self.store,
            &mut self.flags,
            &mut self.stage,
            &mut self.bus,
            now,
        )
    }

    /// Re-drives the scene engine at the position the store says the
    /// player was at, after a restored save replaced the store's contents.
    /// A blob with no scene leaves the engine idle.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SceneNotFound`] when the saved scene no
    /// longer exists in the story.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        let Some(id) = self.store.scene().current_id.clone() else {
            return Ok(());
        };
        let block = self.store.scene().current_block_index;
        self.scene.load_scene_at(
            &id,
            block,
            &mut self.store,
            &mut self.flags,
            &mut self.stage,
            &mut self.bus,
            now,
        )
    }

    /// Advances the dialogue (or skips the in-flight reveal).
    pub fn advance(&mut self, now: DateTime<Utc>) {
        self.scene.advance(&mut self.store, &mut self.bus, now);
    }

    /// The current scene's choices.
    #[must_use]
    pub fn choices(&self) -> Vec<ChoiceView> {
        self.scene.choices(&self.flags)
    }

    /// Follows a choice.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidChoice`] for an unavailable choice and
    /// [`EngineError::SceneNotFound`] for a broken target.
    pub fn select_choice(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.scene.select_choice(
            index,
            &mut self.store,
            &mut self.flags,
            &mut self.stage,
            &mut self.bus,
            now,
        )
    }

    /// Commits the running QTE at the marker's current position.
    pub fn qte_input(&mut self, now: DateTime<Utc>) -> bool {
        self.qte.handle_input(now)
    }

    /// Cancels the running QTE.
    pub fn qte_cancel(&mut self) -> bool {
        self.qte.cancel(&mut self.bus)
    }

    /// Starts a battle encounter.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyActive`] while one is in flight.
    pub fn battle_start(&mut self, config: BattleConfig) -> Result<uuid::Uuid, EngineError> {
        self.battle.start(config, &mut self.bus)
    }

    /// The player attacks; the skill QTE starts immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] outside the player's turn.
    pub fn battle_attack(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.battle.player_attack()?;
        self.service_battle_qte(now);
        Ok(())
    }

    /// The player defends this round.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] outside the player's turn.
    pub fn battle_defend(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.battle.player_defend(now, &mut self.bus)
    }

    /// Cancels the battle and any QTE it was waiting on.
    pub fn battle_cancel(&mut self) -> bool {
        let cancelled = self.battle.cancel(&mut self.bus);
        if cancelled {
            self.qte.cancel(&mut self.bus);
        }
        cancelled
    }

    /// Starts a quiz run.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyActive`] while one is in flight and
    /// [`EngineError::Validation`] for an empty quiz.
    pub fn quiz_start(
        &mut self,
        config: QuizConfig,
        now: DateTime<Utc>,
    ) -> Result<uuid::Uuid, EngineError> {
        self.quiz.start(config, now, &mut self.bus)
    }

    /// Answers the current quiz question.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when no quiz is active or the
    /// index is out of range.
    pub fn quiz_answer(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.quiz
            .submit_answer(index, &mut self.ledger, now, &mut self.bus)?;
        self.ledger_dirty = true;
        Ok(())
    }

    /// Cancels the quiz run.
    pub fn quiz_cancel(&mut self) -> bool {
        self.quiz.cancel(&mut self.bus)
    }

    /// One pass over every engine's timers, routing outcomes between them.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickSignals {
        self.scene.tick(now, &mut self.bus);

        if let Some(outcome) = self.qte.tick(now, &mut self.bus)
            && self.battle.is_active()
        {
            self.battle.apply_qte_outcome(&outcome, now, &mut self.bus);
        }

        if let Some(outcome) = self.battle.tick(now, &mut self.bus) {
            self.follow_target(outcome.target.as_ref(), now);
        }
        self.service_battle_qte(now);

        if let Some(outcome) = self.quiz.tick(now, &mut self.bus) {
            self.follow_target(outcome.target.as_ref(), now);
        }

        TickSignals {
            autosave: self.scene.take_pending_save(),
            ledger_dirty: std::mem::take(&mut self.ledger_dirty),
        }
    }

    fn service_battle_qte(&mut self, now: DateTime<Utc>) {
        let Some(kind) = self.battle.take_qte_request() else {
            return;
        };
        let result = match kind {
            QteKind::Skill => self.qte.start_skill(now, self.rng.as_mut(), &mut self.bus),
            QteKind::Defend => self.qte.start_defend(now, self.rng.as_mut(), &mut self.bus),
        };
        if let Err(e) = result {
            tracing::error!(error = %e, %kind, "battle qte could not start");
        }
    }

    fn follow_target(&mut self, target: Option<&SceneId>, now: DateTime<Utc>) {
        let Some(target) = target else {
            return;
        };
        if let Err(e) = self.load_scene(&target.clone(), now) {
            tracing::warn!(error = %e, scene = %target, "outcome target failed to load");
        }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("scene", &self.scene)
            .field("battle_active", &self.battle.is_active())
            .field("qte_active", &self.qte.is_active())
            .field("quiz_active", &self.quiz.is_active())
            .finish_non_exhaustive()
    }
}

/// One pump pass: advance the session and satisfy whatever it asked for.
pub async fn tick_once(state: &AppState) {
    let now = state.clock.now();
    let mut session = state.session.lock().await;
    let signals = session.tick(now);

    if signals.autosave {
        let clock = Arc::clone(&state.clock);
        let (store, bus) = session.store_and_bus();
        if let Err(e) = state.saves.save(AUTOSAVE_SLOT, store, clock.as_ref(), bus).await {
            tracing::warn!(error = %e, "autosave failed");
        }
    }
    if signals.ledger_dirty
        && let Err(e) = state.saves.save_ledger(session.ledger()).await
    {
        tracing::warn!(error = %e, "ledger save failed");
    }
}
