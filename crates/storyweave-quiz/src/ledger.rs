//! Memory of correct answers the player has already seen.
//!
//! Keyed `quizId:questionIndex`, valued with the correct answer index. The
//! ledger lives in durable storage alongside saves so replays can surface
//! which answers the player already knows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenAnswerLedger {
    entries: BTreeMap<String, usize>,
}

impl SeenAnswerLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the revealed correct answer for one question.
    pub fn record(&mut self, quiz_id: &str, question_index: usize, correct_index: usize) {
        self.entries
            .insert(Self::key(quiz_id, question_index), correct_index);
    }

    /// The correct answer index for a question the player has seen, if any.
    #[must_use]
    pub fn get(&self, quiz_id: &str, question_index: usize) -> Option<usize> {
        self.entries.get(&Self::key(quiz_id, question_index)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(quiz_id: &str, question_index: usize) -> String {
        format!("{quiz_id}:{question_index}")
    }
}
