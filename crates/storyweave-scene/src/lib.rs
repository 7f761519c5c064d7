//! Scene and dialogue engine.
//!
//! Drives the authored story graph: loading scenes, pacing text block
//! display through the typewriter, gating choices on flag requirements, and
//! applying scene side effects to the state store and the stage.

pub mod engine;
pub mod stage;
pub mod typewriter;

pub use engine::{ChoiceView, SceneEngine, ScenePhase};
pub use stage::{NullStage, Stage};
pub use typewriter::Typewriter;
