//! Storyweave — state store and flag system.
//!
//! The store is the single long-lived owner of persistent game state; the
//! flag manager owns the in-memory flag sets and mirrors every mutation into
//! the store.

pub mod flags;
pub mod store;
