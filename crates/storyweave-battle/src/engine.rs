//! The battle state machine.

use chrono::{DateTime, Duration, Utc};
use storyweave_core::bus::EventBus;
use storyweave_core::error::EngineError;
use storyweave_core::event::GameEvent;
use storyweave_core::scheduler::TimerQueue;
use storyweave_core::tuning::BattleTuning;
use storyweave_core::types::{Combatant, QteKind, SceneId, SessionKind, Zone};
use storyweave_qte::QteOutcome;
use uuid::Uuid;

use crate::config::BattleConfig;

/// Where the battle is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlePhase {
    Idle,
    /// The player picks attack or defend.
    PlayerTurn,
    /// A skill QTE decides the player's attack.
    AwaitingAttackQte,
    /// A defend QTE decides how much of the enemy's hit lands.
    AwaitingDefendQte,
    /// Between turns; a timer moves the battle forward.
    Waiting,
    /// Won or lost; the outcome fires after a beat.
    Ending,
}

/// How a finished battle resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleOutcome {
    pub won: bool,
    /// Scene to load next, when the encounter routes one.
    pub target: Option<SceneId>,
}

#[derive(Debug, Clone)]
enum BattleTask {
    EnemyTurn,
    PlayerTurn,
    End(BattleOutcome),
}

/// Turn based battle engine. One encounter at a time.
#[derive(Debug)]
pub struct BattleEngine {
    tuning: BattleTuning,
    phase: BattlePhase,
    session_id: Uuid,
    enemy_name: String,
    player_hp: i32,
    player_max_hp: i32,
    player_attack: i32,
    player_defense: i32,
    enemy_hp: i32,
    enemy_max_hp: i32,
    enemy_attack: i32,
    enemy_defense: i32,
    defending: bool,
    win_target: Option<SceneId>,
    lose_target: Option<SceneId>,
    pending_qte: Option<QteKind>,
    timers: TimerQueue<BattleTask>,
}

impl BattleEngine {
    #[must_use]
    pub fn new(tuning: BattleTuning) -> Self {
        Self {
            tuning,
            phase: BattlePhase::Idle,
            session_id: Uuid::nil(),
            enemy_name: String::new(),
            player_hp: 0,
            player_max_hp: 0,
            player_attack: 0,
            player_defense: 0,
            enemy_hp: 0,
            enemy_max_hp: 0,
            enemy_attack: 0,
            enemy_defense: 0,
            defending: false,
            win_target: None,
            lose_target: None,
            pending_qte: None,
            timers: TimerQueue::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> BattlePhase {
        self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != BattlePhase::Idle
    }

    #[must_use]
    pub fn player_hp(&self) -> i32 {
        self.player_hp
    }

    #[must_use]
    pub fn player_max_hp(&self) -> i32 {
        self.player_max_hp
    }

    #[must_use]
    pub fn enemy_hp(&self) -> i32 {
        self.enemy_hp
    }

    #[must_use]
    pub fn enemy_max_hp(&self) -> i32 {
        self.enemy_max_hp
    }

    #[must_use]
    pub fn enemy_name(&self) -> &str {
        &self.enemy_name
    }

    /// Starts an encounter. The player's stats come from tuning, the
    /// enemy's from the encounter config. Opens on the player's turn.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyActive`] while a battle is in flight.
    pub fn start(&mut self, config: BattleConfig, bus: &mut EventBus) -> Result<Uuid, EngineError> {
        if self.phase != BattlePhase::Idle {
            return Err(EngineError::AlreadyActive(SessionKind::Battle));
        }

        self.session_id = Uuid::new_v4();
        self.enemy_name = config.enemy.name;
        self.player_hp = self.tuning.player_hp;
        self.player_max_hp = self.tuning.player_max_hp;
        self.player_attack = self.tuning.player_attack;
        self.player_defense = self.tuning.player_defense;
        self.enemy_hp = config.enemy.hp;
        self.enemy_max_hp = config.enemy.max_hp.unwrap_or(config.enemy.hp);
        self.enemy_attack = config.enemy.attack;
        self.enemy_defense = config.enemy.defense;
        self.defending = false;
        self.win_target = config.win_target;
        self.lose_target = config.lose_target;
        self.pending_qte = None;
        self.timers.clear();

        tracing::info!(session = %self.session_id, enemy = %self.enemy_name, "battle started");
        bus.publish(&GameEvent::BattleStart {
            session_id: self.session_id,
            enemy: self.enemy_name.clone(),
            player_hp: self.player_hp,
            enemy_hp: self.enemy_hp,
        });
        self.begin_player_turn(bus);
        Ok(self.session_id)
    }

    /// The player commits to attacking. Raises a skill QTE request; the
    /// attack lands when its outcome comes back.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] outside the player's turn.
    pub fn player_attack(&mut self) -> Result<(), EngineError> {
        if self.phase != BattlePhase::PlayerTurn {
            return Err(EngineError::Validation("not the player's turn".to_owned()));
        }
        self.phase = BattlePhase::AwaitingAttackQte;
        self.pending_qte = Some(QteKind::Skill);
        Ok(())
    }

    /// The player braces for the enemy's attack. The coming enemy turn will
    /// raise a defend QTE instead of landing at full force.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] outside the player's turn.
    pub fn player_defend(
        &mut self,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> Result<(), EngineError> {
        if self.phase != BattlePhase::PlayerTurn {
            return Err(EngineError::Validation("not the player's turn".to_owned()));
        }
        self.defending = true;
        self.phase = BattlePhase::Waiting;
        bus.publish(&GameEvent::BattlePlayerDefend);
        self.timers.schedule_in(
            now,
            Duration::milliseconds(self.tuning.defend_delay_ms),
            BattleTask::EnemyTurn,
        );
        Ok(())
    }

    /// Takes the QTE the battle is waiting on, if any. The host starts it
    /// and routes the outcome back through [`Self::apply_qte_outcome`].
    pub fn take_qte_request(&mut self) -> Option<QteKind> {
        self.pending_qte.take()
    }

    /// Feeds a finished QTE back into the battle.
    pub fn apply_qte_outcome(
        &mut self,
        outcome: &QteOutcome,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) {
        match (outcome.kind, self.phase) {
            (QteKind::Skill, BattlePhase::AwaitingAttackQte) => {
                self.resolve_player_attack(outcome, now, bus);
            }
            (QteKind::Defend, BattlePhase::AwaitingDefendQte) => {
                let mods = outcome.defend_modifiers();
                self.resolve_enemy_hit(
                    outcome.zone,
                    mods.damage_reduction,
                    mods.counter,
                    true,
                    now,
                    bus,
                );
            }
            (kind, phase) => {
                tracing::warn!(%kind, ?phase, "stray qte outcome dropped");
            }
        }
    }

    /// Pumps the battle's timers. Returns the outcome once, when the end
    /// delay elapses.
    pub fn tick(&mut self, now: DateTime<Utc>, bus: &mut EventBus) -> Option<BattleOutcome> {
        while let Some(task) = self.timers.pop_due(now) {
            match task {
                BattleTask::EnemyTurn => {
                    bus.publish(&GameEvent::BattleEnemyTurn {
                        enemy_hp: self.enemy_hp,
                    });
                    if self.defending {
                        self.phase = BattlePhase::AwaitingDefendQte;
                        self.pending_qte = Some(QteKind::Defend);
                    } else {
                        // No guard up: the hit lands at full force.
                        self.resolve_enemy_hit(Zone::Bad, 0.0, false, false, now, bus);
                    }
                }
                BattleTask::PlayerTurn => self.begin_player_turn(bus),
                BattleTask::End(outcome) => {
                    self.phase = BattlePhase::Idle;
                    tracing::info!(session = %self.session_id, won = outcome.won, "battle ended");
                    bus.publish(&GameEvent::BattleEnd {
                        won: outcome.won,
                        target: outcome.target.clone(),
                    });
                    return Some(outcome);
                }
            }
        }
        None
    }

    /// Cancels the encounter without an outcome. Returns `false` when
    /// nothing was active.
    pub fn cancel(&mut self, bus: &mut EventBus) -> bool {
        if self.phase == BattlePhase::Idle {
            return false;
        }
        self.phase = BattlePhase::Idle;
        self.pending_qte = None;
        self.timers.clear();
        bus.publish(&GameEvent::BattleCancelled);
        true
    }

    fn begin_player_turn(&mut self, bus: &mut EventBus) {
        // The guard from last round drops when the new turn opens.
        self.defending = false;
        self.phase = BattlePhase::PlayerTurn;
        bus.publish(&GameEvent::BattlePlayerTurn {
            player_hp: self.player_hp,
        });
    }

    fn resolve_player_attack(
        &mut self,
        outcome: &QteOutcome,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) {
        let mods = outcome.skill_modifiers();
        let base = f64::from(self.player_attack - self.enemy_defense)
            * (1.0 + mods.attack_bonus);
        #[allow(clippy::cast_possible_truncation)]
        let mut damage = (base.floor() as i32).max(1);
        if mods.advantage {
            damage = scale_damage(damage, 1.2);
        } else if mods.disadvantage {
            damage = scale_damage(damage, 0.8);
        }

        self.enemy_hp = (self.enemy_hp - damage).max(0);
        bus.publish(&GameEvent::BattleDamage {
            target: Combatant::Enemy,
            damage,
            zone: outcome.zone,
            defended: false,
        });

        if self.enemy_hp == 0 {
            self.finish(true, now);
        } else {
            self.phase = BattlePhase::Waiting;
            self.timers.schedule_in(
                now,
                Duration::milliseconds(self.tuning.enemy_delay_ms),
                BattleTask::EnemyTurn,
            );
        }
    }

    fn resolve_enemy_hit(
        &mut self,
        zone: Zone,
        reduction: f64,
        counter: bool,
        defended: bool,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) {
        let raw = f64::from(self.enemy_attack - self.player_defense) * (1.0 - reduction);
        #[allow(clippy::cast_possible_truncation)]
        let damage = (raw.floor() as i32).max(0);
        self.player_hp = (self.player_hp - damage).max(0);
        bus.publish(&GameEvent::BattleDamage {
            target: Combatant::Player,
            damage,
            zone,
            defended,
        });

        if counter {
            let counter_damage = self.player_attack / 2;
            self.enemy_hp = (self.enemy_hp - counter_damage).max(0);
            bus.publish(&GameEvent::BattleCounter {
                damage: counter_damage,
            });
        }

        // A counter kill wins even on the round the player went down.
        if self.enemy_hp == 0 {
            self.finish(true, now);
        } else if self.player_hp == 0 {
            self.finish(false, now);
        } else {
            self.phase = BattlePhase::Waiting;
            self.timers.schedule_in(
                now,
                Duration::milliseconds(self.tuning.turn_delay_ms),
                BattleTask::PlayerTurn,
            );
        }
    }

    fn finish(&mut self, won: bool, now: DateTime<Utc>) {
        let (delay, target) = if won {
            (self.tuning.victory_delay_ms, self.win_target.clone())
        } else {
            (self.tuning.defeat_delay_ms, self.lose_target.clone())
        };
        self.phase = BattlePhase::Ending;
        self.timers.clear();
        self.timers.schedule_in(
            now,
            Duration::milliseconds(delay),
            BattleTask::End(BattleOutcome { won, target }),
        );
    }
}

fn scale_damage(damage: i32, factor: f64) -> i32 {
    #[allow(clippy::cast_possible_truncation)]
    let scaled = (f64::from(damage) * factor).floor() as i32;
    scaled
}
