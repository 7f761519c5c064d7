//! Engine event taxonomy.
//!
//! Every observable state transition in the engine is published on the bus
//! as a [`GameEvent`]. Topics keep the original colon-delimited wire names
//! so a browser frontend can subscribe by the same strings.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::types::{Combatant, QteKind, QuizEndReason, SceneId, Zone};

/// Subscription key for the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    SceneLoading,
    SceneLoaded,
    SceneError,
    TextStart,
    TextComplete,
    TextSkip,
    ChoiceShown,
    ChoiceSelected,
    StateChanged,
    StateSaved,
    StateLoaded,
    StateReset,
    FlagSet,
    FlagCleared,
    BattleStart,
    BattlePlayerTurn,
    BattleEnemyTurn,
    BattleDamage,
    BattlePlayerDefend,
    BattleCounter,
    BattleEnd,
    BattleCancelled,
    QteStart,
    QteComplete,
    QteCancelled,
    QuizStart,
    QuizAnswer,
    QuizEnd,
    QuizCancelled,
}

impl Topic {
    /// Every topic, for sinks that observe the whole bus.
    pub const ALL: [Self; 29] = [
        Self::SceneLoading,
        Self::SceneLoaded,
        Self::SceneError,
        Self::TextStart,
        Self::TextComplete,
        Self::TextSkip,
        Self::ChoiceShown,
        Self::ChoiceSelected,
        Self::StateChanged,
        Self::StateSaved,
        Self::StateLoaded,
        Self::StateReset,
        Self::FlagSet,
        Self::FlagCleared,
        Self::BattleStart,
        Self::BattlePlayerTurn,
        Self::BattleEnemyTurn,
        Self::BattleDamage,
        Self::BattlePlayerDefend,
        Self::BattleCounter,
        Self::BattleEnd,
        Self::BattleCancelled,
        Self::QteStart,
        Self::QteComplete,
        Self::QteCancelled,
        Self::QuizStart,
        Self::QuizAnswer,
        Self::QuizEnd,
        Self::QuizCancelled,
    ];
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SceneLoading => "scene:loading",
            Self::SceneLoaded => "scene:loaded",
            Self::SceneError => "scene:error",
            Self::TextStart => "text:start",
            Self::TextComplete => "text:complete",
            Self::TextSkip => "text:skip",
            Self::ChoiceShown => "choice:shown",
            Self::ChoiceSelected => "choice:selected",
            Self::StateChanged => "state:changed",
            Self::StateSaved => "state:saved",
            Self::StateLoaded => "state:loaded",
            Self::StateReset => "state:reset",
            Self::FlagSet => "flag:set",
            Self::FlagCleared => "flag:cleared",
            Self::BattleStart => "battle:start",
            Self::BattlePlayerTurn => "battle:playerTurn",
            Self::BattleEnemyTurn => "battle:enemyTurn",
            Self::BattleDamage => "battle:damage",
            Self::BattlePlayerDefend => "battle:playerDefend",
            Self::BattleCounter => "battle:counter",
            Self::BattleEnd => "battle:end",
            Self::BattleCancelled => "battle:cancelled",
            Self::QteStart => "qte:start",
            Self::QteComplete => "qte:complete",
            Self::QteCancelled => "qte:cancelled",
            Self::QuizStart => "quiz:start",
            Self::QuizAnswer => "quiz:answer",
            Self::QuizEnd => "quiz:end",
            Self::QuizCancelled => "quiz:cancelled",
        };
        f.write_str(name)
    }
}

/// Payload published on the bus for each observable transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum GameEvent {
    SceneLoading {
        scene_id: SceneId,
    },
    SceneLoaded {
        scene_id: SceneId,
    },
    SceneError {
        scene_id: SceneId,
        message: String,
    },
    TextStart {
        scene_id: SceneId,
        block_index: usize,
    },
    TextComplete {
        block_index: usize,
    },
    TextSkip {
        block_index: usize,
    },
    ChoiceShown {
        count: usize,
    },
    ChoiceSelected {
        index: usize,
        label: String,
        target: Option<SceneId>,
    },
    StateChanged {
        path: String,
        value: serde_json::Value,
    },
    StateSaved,
    StateLoaded,
    StateReset {
        keep_settings: bool,
        keep_key_flags: bool,
    },
    FlagSet {
        flag: String,
        is_key: bool,
    },
    FlagCleared {
        flag: String,
        is_key: bool,
    },
    BattleStart {
        session_id: Uuid,
        enemy: String,
        player_hp: i32,
        enemy_hp: i32,
    },
    BattlePlayerTurn {
        player_hp: i32,
    },
    BattleEnemyTurn {
        enemy_hp: i32,
    },
    BattleDamage {
        target: Combatant,
        damage: i32,
        zone: Zone,
        defended: bool,
    },
    BattlePlayerDefend,
    BattleCounter {
        damage: i32,
    },
    BattleEnd {
        won: bool,
        target: Option<SceneId>,
    },
    BattleCancelled,
    QteStart {
        session_id: Uuid,
        kind: QteKind,
    },
    QteComplete {
        kind: QteKind,
        zone: Zone,
        position: f64,
    },
    QteCancelled,
    QuizStart {
        session_id: Uuid,
        question_count: usize,
    },
    QuizAnswer {
        question_index: usize,
        answer_index: usize,
        correct: bool,
    },
    QuizEnd {
        won: bool,
        reason: Option<QuizEndReason>,
        questions_answered: usize,
        total_questions: usize,
        target: Option<SceneId>,
    },
    QuizCancelled,
}

impl GameEvent {
    /// Returns the topic this event is published under.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::SceneLoading { .. } => Topic::SceneLoading,
            Self::SceneLoaded { .. } => Topic::SceneLoaded,
            Self::SceneError { .. } => Topic::SceneError,
            Self::TextStart { .. } => Topic::TextStart,
            Self::TextComplete { .. } => Topic::TextComplete,
            Self::TextSkip { .. } => Topic::TextSkip,
            Self::ChoiceShown { .. } => Topic::ChoiceShown,
            Self::ChoiceSelected { .. } => Topic::ChoiceSelected,
            Self::StateChanged { .. } => Topic::StateChanged,
            Self::StateSaved => Topic::StateSaved,
            Self::StateLoaded => Topic::StateLoaded,
            Self::StateReset { .. } => Topic::StateReset,
            Self::FlagSet { .. } => Topic::FlagSet,
            Self::FlagCleared { .. } => Topic::FlagCleared,
            Self::BattleStart { .. } => Topic::BattleStart,
            Self::BattlePlayerTurn { .. } => Topic::BattlePlayerTurn,
            Self::BattleEnemyTurn { .. } => Topic::BattleEnemyTurn,
            Self::BattleDamage { .. } => Topic::BattleDamage,
            Self::BattlePlayerDefend => Topic::BattlePlayerDefend,
            Self::BattleCounter { .. } => Topic::BattleCounter,
            Self::BattleEnd { .. } => Topic::BattleEnd,
            Self::BattleCancelled => Topic::BattleCancelled,
            Self::QteStart { .. } => Topic::QteStart,
            Self::QteComplete { .. } => Topic::QteComplete,
            Self::QteCancelled => Topic::QteCancelled,
            Self::QuizStart { .. } => Topic::QuizStart,
            Self::QuizAnswer { .. } => Topic::QuizAnswer,
            Self::QuizEnd { .. } => Topic::QuizEnd,
            Self::QuizCancelled => Topic::QuizCancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_wire_names_are_colon_delimited() {
        assert_eq!(Topic::SceneLoading.to_string(), "scene:loading");
        assert_eq!(Topic::BattlePlayerTurn.to_string(), "battle:playerTurn");
        assert_eq!(Topic::QteComplete.to_string(), "qte:complete");
        assert_eq!(Topic::StateReset.to_string(), "state:reset");
    }

    #[test]
    fn test_event_maps_to_its_topic() {
        let event = GameEvent::FlagSet {
            flag: "met_hero".to_owned(),
            is_key: false,
        };
        assert_eq!(event.topic(), Topic::FlagSet);
    }
}
