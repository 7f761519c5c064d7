//! Route modules organized by engine.

pub mod battle;
pub mod events;
pub mod health;
pub mod qte;
pub mod quiz;
pub mod save;
pub mod scene;
pub mod settings;
