//! Save slots and durable storage.
//!
//! Persistence is split in two: a [`SaveMedium`] knows how to read and
//! write opaque strings under keys, and the [`SaveManager`] knows what the
//! game stores there: numbered save slots, and the quiz answer ledger.

pub mod manager;
pub mod medium;

pub use manager::{SLOT_COUNT, SaveManager, SlotMetadata};
pub use medium::{FileMedium, MemoryMedium, SaveMedium};
