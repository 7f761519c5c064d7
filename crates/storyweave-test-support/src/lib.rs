//! Shared test fakes and utilities for the Storyweave engine.

mod clock;
mod event_log;
mod rng;

pub use clock::{FixedClock, StepClock};
pub use event_log::EventLog;
pub use rng::{MockRandom, SequenceRandom};
