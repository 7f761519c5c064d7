//! Timed quiz engine.
//!
//! A quiz is a run of multiple-choice questions against a per-question
//! countdown. One wrong answer, or one expired countdown, ends the run.
//! Correct answers the player has already seen are remembered across runs
//! in the [`ledger::SeenAnswerLedger`].

pub mod engine;
pub mod ledger;

pub use engine::{CountdownUrgency, Question, QuizConfig, QuizEngine, QuizOutcome};
pub use ledger::SeenAnswerLedger;
