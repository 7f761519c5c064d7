//! Game-feel tuning constants.
//!
//! All timing, zone, and stat defaults live here. Every field has a default
//! so a tuning file only needs to name what it overrides.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Root tuning tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub text: TextTuning,
    pub save: SaveTuning,
    pub qte: QteTuning,
    pub battle: BattleTuning,
    pub quiz: QuizTuning,
}

impl Tuning {
    /// Parses a tuning tree from YAML, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the document is not valid
    /// YAML for this tree.
    pub fn from_yaml(source: &str) -> Result<Self, EngineError> {
        serde_yaml::from_str(source)
            .map_err(|e| EngineError::Validation(format!("tuning parse failed: {e}")))
    }
}

/// Text display pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextTuning {
    /// Milliseconds per character at normal speed.
    pub speed_normal_ms: i64,
    /// Milliseconds per character at fast speed.
    pub speed_fast_ms: i64,
    /// Delay before auto-advance in auto mode, in milliseconds.
    pub auto_advance_delay_ms: i64,
}

impl Default for TextTuning {
    fn default() -> Self {
        Self {
            speed_normal_ms: 18,
            speed_fast_ms: 10,
            auto_advance_delay_ms: 1500,
        }
    }
}

/// Persistence policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveTuning {
    /// Whether a scene load triggers an autosave.
    pub auto_save_on_scene_change: bool,
    /// Periodic autosave interval, in milliseconds.
    pub auto_save_interval_ms: i64,
}

impl Default for SaveTuning {
    fn default() -> Self {
        Self {
            auto_save_on_scene_change: true,
            auto_save_interval_ms: 30_000,
        }
    }
}

/// QTE bar, zone, and timing constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QteTuning {
    /// Total marker sweep duration, in milliseconds.
    pub bar_duration_ms: i64,
    /// Full back-and-forth sweeps across the duration.
    pub oscillations: u32,
    /// Perfect zone radius, in marker units.
    pub zone_perfect: f64,
    /// Good zone radius, in marker units.
    pub zone_good: f64,
    /// Normal zone radius, in marker units.
    pub zone_normal: f64,
    /// Zone scale multiplier for defend sessions (tighter than skill).
    pub defend_zone_scale: f64,
    /// Delay between start and the marker running, in milliseconds.
    pub start_delay_ms: i64,
    /// How long the committed result is displayed before completion fires.
    pub result_display_ms: i64,
    /// Countdown seconds before auto-commit.
    pub countdown_seconds: u32,
}

impl Default for QteTuning {
    fn default() -> Self {
        Self {
            bar_duration_ms: 2000,
            oscillations: 2,
            zone_perfect: 10.0,
            zone_good: 25.0,
            zone_normal: 40.0,
            defend_zone_scale: 0.7,
            start_delay_ms: 300,
            result_display_ms: 800,
            countdown_seconds: 5,
        }
    }
}

/// Battle stat defaults and turn pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleTuning {
    pub player_hp: i32,
    pub player_max_hp: i32,
    pub player_attack: i32,
    pub player_defense: i32,
    /// Delay before the enemy attacks, in milliseconds.
    pub enemy_delay_ms: i64,
    /// Delay between turns, in milliseconds.
    pub turn_delay_ms: i64,
    /// Delay after defending before the enemy turn, in milliseconds.
    pub defend_delay_ms: i64,
    /// Delay before the victory outcome fires, in milliseconds.
    pub victory_delay_ms: i64,
    /// Delay before the defeat outcome fires, in milliseconds.
    pub defeat_delay_ms: i64,
}

impl Default for BattleTuning {
    fn default() -> Self {
        Self {
            player_hp: 100,
            player_max_hp: 100,
            player_attack: 15,
            player_defense: 5,
            enemy_delay_ms: 1000,
            turn_delay_ms: 800,
            defend_delay_ms: 500,
            victory_delay_ms: 1000,
            defeat_delay_ms: 1000,
        }
    }
}

/// Quiz pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizTuning {
    /// Default seconds per question.
    pub time_per_question_secs: u32,
    /// Countdown tick interval, in milliseconds.
    pub tick_interval_ms: i64,
    /// Remaining seconds at which the countdown turns urgent.
    pub urgent_threshold: u32,
    /// Remaining seconds at which the countdown turns critical.
    pub critical_threshold: u32,
}

impl Default for QuizTuning {
    fn default() -> Self {
        Self {
            time_per_question_secs: 10,
            tick_interval_ms: 1000,
            urgent_threshold: 3,
            critical_threshold: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_game_feel() {
        let tuning = Tuning::default();
        assert_eq!(tuning.qte.bar_duration_ms, 2000);
        assert_eq!(tuning.qte.oscillations, 2);
        assert!((tuning.qte.defend_zone_scale - 0.7).abs() < f64::EPSILON);
        assert_eq!(tuning.battle.player_attack, 15);
        assert_eq!(tuning.quiz.time_per_question_secs, 10);
        assert!(tuning.save.auto_save_on_scene_change);
    }

    #[test]
    fn test_yaml_overrides_only_named_fields() {
        // Arrange
        let source = "qte:\n  countdown_seconds: 8\nbattle:\n  player_hp: 50\n";

        // Act
        let tuning = Tuning::from_yaml(source).unwrap();

        // Assert
        assert_eq!(tuning.qte.countdown_seconds, 8);
        assert_eq!(tuning.qte.bar_duration_ms, 2000);
        assert_eq!(tuning.battle.player_hp, 50);
        assert_eq!(tuning.battle.player_attack, 15);
    }

    #[test]
    fn test_invalid_yaml_is_a_validation_error() {
        let result = Tuning::from_yaml("qte: [not, a, map]");
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }
}
