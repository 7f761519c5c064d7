//! Quick time event timing engine.
//!
//! A QTE is a marker sweeping across a bar toward a randomly placed target.
//! The player commits once; how close the marker lands decides the zone,
//! and the zone maps to combat modifiers. Skill QTEs shape the player's
//! attack, defend QTEs shape how much of the enemy's hit gets through.

pub mod engine;
pub mod outcome;

pub use engine::{QteEngine, QtePhase};
pub use outcome::{DefendAction, DefendModifiers, QteOutcome, SkillModifiers};
