//! The QTE state machine.
//!
//! Lifecycle: `start_*` arms the session and schedules the marker launch
//! after a short wind-up. Once running, the marker sweeps sinusoidally and
//! a countdown arms an auto-commit so an idle player still resolves. The
//! first input (or the countdown) freezes the marker, the result is held on
//! screen for a beat, then `tick` yields the outcome exactly once.

use chrono::{DateTime, Duration, Utc};
use storyweave_core::bus::EventBus;
use storyweave_core::error::EngineError;
use storyweave_core::event::GameEvent;
use storyweave_core::rng::RandomSource;
use storyweave_core::scheduler::TimerQueue;
use storyweave_core::tuning::QteTuning;
use storyweave_core::types::{QteKind, SessionKind, Zone};
use uuid::Uuid;

use crate::outcome::QteOutcome;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QtePhase {
    Idle,
    /// Armed, marker not yet running.
    Waiting,
    /// Marker sweeping, input accepted.
    Running,
    /// Committed, result held on screen.
    Resolving,
}

#[derive(Debug, Clone, Copy)]
enum QteTask {
    Begin,
    AutoCommit,
    Finish,
}

/// Quick time event engine. One session at a time.
#[derive(Debug)]
pub struct QteEngine {
    tuning: QteTuning,
    phase: QtePhase,
    kind: QteKind,
    session_id: Uuid,
    target: f64,
    begin_at: DateTime<Utc>,
    committed: Option<(f64, Zone)>,
    timers: TimerQueue<QteTask>,
}

impl QteEngine {
    #[must_use]
    pub fn new(tuning: QteTuning) -> Self {
        Self {
            tuning,
            phase: QtePhase::Idle,
            kind: QteKind::Skill,
            session_id: Uuid::nil(),
            target: 0.0,
            begin_at: DateTime::UNIX_EPOCH,
            committed: None,
            timers: TimerQueue::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> QtePhase {
        self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != QtePhase::Idle
    }

    #[must_use]
    pub fn kind(&self) -> QteKind {
        self.kind
    }

    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Starts a skill QTE for the player's attack.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyActive`] while a session is in flight.
    pub fn start_skill(
        &mut self,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
        bus: &mut EventBus,
    ) -> Result<Uuid, EngineError> {
        self.start(QteKind::Skill, now, rng, bus)
    }

    /// Starts a defend QTE against an incoming enemy attack. Defends wind
    /// up in half the time and use tighter zones.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyActive`] while a session is in flight.
    pub fn start_defend(
        &mut self,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
        bus: &mut EventBus,
    ) -> Result<Uuid, EngineError> {
        self.start(QteKind::Defend, now, rng, bus)
    }

    fn start(
        &mut self,
        kind: QteKind,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
        bus: &mut EventBus,
    ) -> Result<Uuid, EngineError> {
        if self.phase != QtePhase::Idle {
            return Err(EngineError::AlreadyActive(SessionKind::Qte));
        }

        self.kind = kind;
        self.session_id = Uuid::new_v4();
        self.target = 10.0 + rng.next_f64() * 80.0;
        self.committed = None;

        let mut delay = self.tuning.start_delay_ms;
        if kind == QteKind::Defend {
            delay /= 2;
        }
        self.begin_at = now + Duration::milliseconds(delay);
        self.timers.clear();
        self.timers.schedule_at(self.begin_at, QteTask::Begin);

        self.phase = QtePhase::Waiting;
        tracing::debug!(session = %self.session_id, %kind, target = self.target, "qte armed");
        bus.publish(&GameEvent::QteStart {
            session_id: self.session_id,
            kind,
        });
        Ok(self.session_id)
    }

    /// The marker position at `now`, or the frozen position after commit.
    /// `None` before the marker launches.
    #[must_use]
    pub fn marker_position(&self, now: DateTime<Utc>) -> Option<f64> {
        match self.phase {
            QtePhase::Idle | QtePhase::Waiting => None,
            QtePhase::Running => Some(self.position_at(now)),
            QtePhase::Resolving => self.committed.map(|(position, _)| position),
        }
    }

    /// Commits the marker at its current position. Returns `false` when the
    /// session is not accepting input (not started, still winding up, or
    /// already committed).
    pub fn handle_input(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != QtePhase::Running {
            return false;
        }
        self.commit(now);
        true
    }

    /// Pumps the session's timers. Returns the outcome once, when the
    /// result display window closes.
    pub fn tick(&mut self, now: DateTime<Utc>, bus: &mut EventBus) -> Option<QteOutcome> {
        while let Some(task) = self.timers.pop_due(now) {
            match task {
                QteTask::Begin => {
                    self.phase = QtePhase::Running;
                    let countdown = Duration::seconds(i64::from(self.tuning.countdown_seconds));
                    self.timers
                        .schedule_at(self.begin_at + countdown, QteTask::AutoCommit);
                }
                QteTask::AutoCommit => {
                    // Countdown expired with no input. The marker freezes
                    // wherever it is.
                    if self.phase == QtePhase::Running {
                        self.commit(now);
                    }
                }
                QteTask::Finish => {
                    self.phase = QtePhase::Idle;
                    let (position, zone) = self.committed.take()?;
                    let outcome = QteOutcome {
                        kind: self.kind,
                        zone,
                        position,
                        target: self.target,
                    };
                    tracing::debug!(session = %self.session_id, %zone, position, "qte resolved");
                    bus.publish(&GameEvent::QteComplete {
                        kind: self.kind,
                        zone,
                        position,
                    });
                    return Some(outcome);
                }
            }
        }
        None
    }

    /// Cancels the session without producing an outcome. Returns `false`
    /// when nothing was active.
    pub fn cancel(&mut self, bus: &mut EventBus) -> bool {
        if self.phase == QtePhase::Idle {
            return false;
        }
        self.phase = QtePhase::Idle;
        self.committed = None;
        self.timers.clear();
        bus.publish(&GameEvent::QteCancelled);
        true
    }

    fn commit(&mut self, now: DateTime<Utc>) {
        let position = self.position_at(now);
        let zone = self.classify(position);
        self.committed = Some((position, zone));
        self.phase = QtePhase::Resolving;
        self.timers.clear();
        self.timers.schedule_in(
            now,
            Duration::milliseconds(self.tuning.result_display_ms),
            QteTask::Finish,
        );
    }

    fn position_at(&self, now: DateTime<Utc>) -> f64 {
        let elapsed_ms = (now - self.begin_at).num_milliseconds() as f64;
        let period_ms = self.tuning.bar_duration_ms as f64 / f64::from(self.tuning.oscillations);
        let position = 50.0 + 50.0 * (std::f64::consts::PI * elapsed_ms / period_ms).sin();
        position.clamp(0.0, 100.0)
    }

    fn classify(&self, position: f64) -> Zone {
        let scale = match self.kind {
            QteKind::Skill => 1.0,
            QteKind::Defend => self.tuning.defend_zone_scale,
        };
        let distance = (position - self.target).abs();
        if distance <= self.tuning.zone_perfect * scale {
            Zone::Perfect
        } else if distance <= self.tuning.zone_good * scale {
            Zone::Good
        } else if distance <= self.tuning.zone_normal * scale {
            Zone::Normal
        } else {
            Zone::Bad
        }
    }
}
