//! Turn based battle engine.
//!
//! Battles alternate player and enemy turns. The player's attack is shaped
//! by a skill QTE; the enemy's attack is shaped by a defend QTE, but only
//! when the player chose to defend that round. The engine itself never runs
//! a QTE; it raises a request the host satisfies and feeds back through
//! [`BattleEngine::apply_qte_outcome`].

pub mod config;
pub mod engine;

pub use config::{BattleConfig, EnemyConfig};
pub use engine::{BattleEngine, BattleOutcome, BattlePhase};
