//! Storyweave — authored scene model.
//!
//! Scenes form a directed graph (cycles permitted) and are read-only at
//! runtime. This crate defines the scene types, the story table supplied to
//! the engine before start, and the Markdown scene ingestion pipeline.

pub mod markdown;
pub mod table;
pub mod types;

pub use table::StoryTable;
pub use types::{Choice, Scene};
