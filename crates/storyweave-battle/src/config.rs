//! Per-encounter battle configuration.

use serde::{Deserialize, Serialize};
use storyweave_core::types::SceneId;

/// Stats for the enemy of one encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyConfig {
    pub name: String,
    pub hp: i32,
    /// Defaults to `hp` when omitted.
    #[serde(default)]
    pub max_hp: Option<i32>,
    pub attack: i32,
    pub defense: i32,
}

/// One battle encounter: who the enemy is and where each ending leads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleConfig {
    pub enemy: EnemyConfig,
    #[serde(default)]
    pub win_target: Option<SceneId>,
    #[serde(default)]
    pub lose_target: Option<SceneId>,
}
