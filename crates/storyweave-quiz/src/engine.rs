//! The quiz state machine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use storyweave_core::bus::EventBus;
use storyweave_core::error::EngineError;
use storyweave_core::event::GameEvent;
use storyweave_core::scheduler::TimerQueue;
use storyweave_core::tuning::QuizTuning;
use storyweave_core::types::{QuizEndReason, SceneId, SessionKind};
use uuid::Uuid;

use crate::ledger::SeenAnswerLedger;

/// One multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub prompt: String,
    pub answers: Vec<String>,
    /// Index into `answers`.
    pub correct: usize,
}

/// One quiz run: its questions and where each ending leads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    pub quiz_id: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub win_target: Option<SceneId>,
    #[serde(default)]
    pub lose_target: Option<SceneId>,
    /// Overrides the tuned seconds per question when set.
    #[serde(default)]
    pub time_per_question_secs: Option<u32>,
}

/// How a finished quiz resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub won: bool,
    /// Why the run ended short of a win, when it did.
    pub reason: Option<QuizEndReason>,
    pub questions_answered: usize,
    pub total_questions: usize,
    pub target: Option<SceneId>,
}

/// How loudly the countdown should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownUrgency {
    Calm,
    Urgent,
    Critical,
}

#[derive(Debug, Clone, Copy)]
struct CountdownTick;

/// Timed quiz engine. One run at a time.
#[derive(Debug)]
pub struct QuizEngine {
    tuning: QuizTuning,
    running: bool,
    session_id: Uuid,
    quiz_id: String,
    questions: Vec<Question>,
    question_index: usize,
    questions_answered: usize,
    remaining_secs: u32,
    win_target: Option<SceneId>,
    lose_target: Option<SceneId>,
    time_per_question_secs: u32,
    finished: Option<QuizOutcome>,
    timers: TimerQueue<CountdownTick>,
}

impl QuizEngine {
    #[must_use]
    pub fn new(tuning: QuizTuning) -> Self {
        Self {
            tuning,
            running: false,
            session_id: Uuid::nil(),
            quiz_id: String::new(),
            questions: Vec::new(),
            question_index: 0,
            questions_answered: 0,
            remaining_secs: 0,
            win_target: None,
            lose_target: None,
            time_per_question_secs: 0,
            finished: None,
            timers: TimerQueue::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.running
    }

    /// The question currently posed. `None` when idle.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.running.then(|| &self.questions[self.question_index])
    }

    /// Identifier of the running quiz. Empty when idle.
    #[must_use]
    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    #[must_use]
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Presentation urgency of the running countdown.
    #[must_use]
    pub fn urgency(&self) -> CountdownUrgency {
        if self.remaining_secs <= self.tuning.critical_threshold {
            CountdownUrgency::Critical
        } else if self.remaining_secs <= self.tuning.urgent_threshold {
            CountdownUrgency::Urgent
        } else {
            CountdownUrgency::Calm
        }
    }

    /// Starts a quiz run on its first question.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyActive`] while a run is in flight and
    /// [`EngineError::Validation`] for a quiz with no questions.
    pub fn start(
        &mut self,
        config: QuizConfig,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> Result<Uuid, EngineError> {
        if self.running {
            return Err(EngineError::AlreadyActive(SessionKind::Quiz));
        }
        if config.questions.is_empty() {
            return Err(EngineError::Validation(format!(
                "quiz \"{}\" has no questions",
                config.quiz_id
            )));
        }

        self.running = true;
        self.session_id = Uuid::new_v4();
        self.quiz_id = config.quiz_id;
        self.questions = config.questions;
        self.question_index = 0;
        self.questions_answered = 0;
        self.win_target = config.win_target;
        self.lose_target = config.lose_target;
        self.time_per_question_secs = config
            .time_per_question_secs
            .unwrap_or(self.tuning.time_per_question_secs);
        self.finished = None;

        tracing::info!(session = %self.session_id, quiz = %self.quiz_id,
            questions = self.questions.len(), "quiz started");
        bus.publish(&GameEvent::QuizStart {
            session_id: self.session_id,
            question_count: self.questions.len(),
        });
        self.pose_current_question(now, bus);
        Ok(self.session_id)
    }

    /// Submits an answer to the current question. A correct answer moves to
    /// the next question or wins the run; a wrong one ends it. Either way
    /// the revealed correct answer is recorded in the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when no run is active or the
    /// answer index does not name one of the question's answers.
    pub fn submit_answer(
        &mut self,
        answer_index: usize,
        ledger: &mut SeenAnswerLedger,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> Result<(), EngineError> {
        if !self.running {
            return Err(EngineError::Validation("no quiz is active".to_owned()));
        }
        let question = &self.questions[self.question_index];
        if answer_index >= question.answers.len() {
            return Err(EngineError::Validation(format!(
                "question has {} answers",
                question.answers.len()
            )));
        }

        let correct = answer_index == question.correct;
        ledger.record(&self.quiz_id, self.question_index, question.correct);
        bus.publish(&GameEvent::QuizAnswer {
            question_index: self.question_index,
            answer_index,
            correct,
        });

        if !correct {
            self.finish(false, Some(QuizEndReason::Wrong), bus);
            return Ok(());
        }

        self.questions_answered += 1;
        if self.question_index + 1 < self.questions.len() {
            self.question_index += 1;
            self.pose_current_question(now, bus);
        } else {
            self.finish(true, None, bus);
        }
        Ok(())
    }

    /// Pumps the countdown. Returns the outcome once, after the run ends.
    pub fn tick(&mut self, now: DateTime<Utc>, bus: &mut EventBus) -> Option<QuizOutcome> {
        while self.running && self.timers.pop_due(now).is_some() {
            self.remaining_secs = self.remaining_secs.saturating_sub(1);
            if self.remaining_secs == 0 {
                self.finish(false, Some(QuizEndReason::Timeout), bus);
            }
        }
        self.finished.take()
    }

    /// Cancels the run without an outcome. Returns `false` when nothing
    /// was active.
    pub fn cancel(&mut self, bus: &mut EventBus) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.finished = None;
        self.timers.clear();
        bus.publish(&GameEvent::QuizCancelled);
        true
    }

    fn pose_current_question(&mut self, now: DateTime<Utc>, bus: &mut EventBus) {
        let question = &self.questions[self.question_index];
        if question.correct >= question.answers.len() {
            tracing::error!(quiz = %self.quiz_id, question = self.question_index,
                "question's correct index is out of range");
            self.finish(false, Some(QuizEndReason::Error), bus);
            return;
        }
        self.remaining_secs = self.time_per_question_secs;
        self.timers.clear();
        self.timers.schedule_repeating(
            now,
            Duration::milliseconds(self.tuning.tick_interval_ms),
            CountdownTick,
        );
    }

    fn finish(&mut self, won: bool, reason: Option<QuizEndReason>, bus: &mut EventBus) {
        self.running = false;
        self.timers.clear();
        let target = if won {
            self.win_target.clone()
        } else {
            self.lose_target.clone()
        };
        let outcome = QuizOutcome {
            won,
            reason,
            questions_answered: self.questions_answered,
            total_questions: self.questions.len(),
            target: target.clone(),
        };
        tracing::info!(session = %self.session_id, won, ?reason, "quiz ended");
        bus.publish(&GameEvent::QuizEnd {
            won,
            reason,
            questions_answered: self.questions_answered,
            total_questions: self.questions.len(),
            target,
        });
        self.finished = Some(outcome);
    }
}
