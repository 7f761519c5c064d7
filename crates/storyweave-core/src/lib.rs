//! Storyweave Core — shared engine abstractions.
//!
//! This crate defines the vocabulary types, the publish/subscribe event bus,
//! the error taxonomy, and the determinism seams (clock, random source,
//! timer queue) that every other crate depends on. It contains no game
//! content and no I/O.

pub mod bus;
pub mod clock;
pub mod error;
pub mod event;
pub mod rng;
pub mod scheduler;
pub mod tuning;
pub mod types;
