//! Engine error taxonomy.
//!
//! Every variant is recovered locally by its caller; none of these is
//! allowed to crash the engine.

use thiserror::Error;

use crate::types::{SceneId, SessionKind};

/// Top-level engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A scene identifier did not resolve in the story table.
    #[error("scene \"{0}\" not found")]
    SceneNotFound(SceneId),

    /// A choice selection was out of range or its requirements were unmet.
    #[error("invalid choice {index}: {reason}")]
    InvalidChoice {
        /// The selected choice index.
        index: usize,
        /// Why the selection was rejected.
        reason: String,
    },

    /// Corrupt or unparsable data (persisted blob, authored content).
    #[error("validation error: {0}")]
    Validation(String),

    /// A session of this kind is already running; the start was rejected.
    #[error("{0} session already active")]
    AlreadyActive(SessionKind),

    /// The persistence medium failed.
    #[error("storage error: {0}")]
    Storage(String),
}
