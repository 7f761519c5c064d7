//! QTE results and the modifier tables they map to.

use serde::Serialize;
use storyweave_core::types::{QteKind, Zone};

/// The committed result of one QTE.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QteOutcome {
    pub kind: QteKind,
    pub zone: Zone,
    /// Marker position at commit, in bar units `[0, 100]`.
    pub position: f64,
    /// Target position the marker was aiming for.
    pub target: f64,
}

/// How a skill QTE shapes the following player attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillModifiers {
    pub advantage: bool,
    pub disadvantage: bool,
    /// Fractional damage bonus, e.g. `0.25` for +25%.
    pub attack_bonus: f64,
}

/// What the player does with an incoming enemy attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefendAction {
    Parry,
    Dodge,
    Block,
    Hit,
}

/// How a defend QTE shapes the incoming enemy attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefendModifiers {
    pub action: DefendAction,
    /// Fraction of the incoming damage negated, `[0, 1]`.
    pub damage_reduction: f64,
    /// Whether the defense opens a counterattack.
    pub counter: bool,
}

impl QteOutcome {
    /// Modifier table for skill QTEs.
    #[must_use]
    pub fn skill_modifiers(&self) -> SkillModifiers {
        match self.zone {
            Zone::Perfect => SkillModifiers {
                advantage: true,
                disadvantage: false,
                attack_bonus: 0.25,
            },
            Zone::Good => SkillModifiers {
                advantage: true,
                disadvantage: false,
                attack_bonus: 0.0,
            },
            Zone::Normal => SkillModifiers {
                advantage: false,
                disadvantage: false,
                attack_bonus: 0.0,
            },
            Zone::Bad => SkillModifiers {
                advantage: false,
                disadvantage: true,
                attack_bonus: -0.25,
            },
        }
    }

    /// Modifier table for defend QTEs.
    #[must_use]
    pub fn defend_modifiers(&self) -> DefendModifiers {
        match self.zone {
            Zone::Perfect => DefendModifiers {
                action: DefendAction::Parry,
                damage_reduction: 1.0,
                counter: true,
            },
            Zone::Good => DefendModifiers {
                action: DefendAction::Dodge,
                damage_reduction: 1.0,
                counter: false,
            },
            Zone::Normal => DefendModifiers {
                action: DefendAction::Block,
                damage_reduction: 0.5,
                counter: false,
            },
            Zone::Bad => DefendModifiers {
                action: DefendAction::Hit,
                damage_reduction: 0.0,
                counter: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(zone: Zone, kind: QteKind) -> QteOutcome {
        QteOutcome {
            kind,
            zone,
            position: 50.0,
            target: 50.0,
        }
    }

    #[test]
    fn test_skill_modifier_table() {
        let perfect = outcome(Zone::Perfect, QteKind::Skill).skill_modifiers();
        assert!(perfect.advantage);
        assert!((perfect.attack_bonus - 0.25).abs() < f64::EPSILON);

        let bad = outcome(Zone::Bad, QteKind::Skill).skill_modifiers();
        assert!(bad.disadvantage);
        assert!((bad.attack_bonus + 0.25).abs() < f64::EPSILON);

        let normal = outcome(Zone::Normal, QteKind::Skill).skill_modifiers();
        assert!(!normal.advantage && !normal.disadvantage);
        assert!(normal.attack_bonus.abs() < f64::EPSILON);
    }

    #[test]
    fn test_defend_modifier_table() {
        let perfect = outcome(Zone::Perfect, QteKind::Defend).defend_modifiers();
        assert_eq!(perfect.action, DefendAction::Parry);
        assert!((perfect.damage_reduction - 1.0).abs() < f64::EPSILON);
        assert!(perfect.counter);

        let good = outcome(Zone::Good, QteKind::Defend).defend_modifiers();
        assert_eq!(good.action, DefendAction::Dodge);
        assert!(!good.counter);

        let normal = outcome(Zone::Normal, QteKind::Defend).defend_modifiers();
        assert_eq!(normal.action, DefendAction::Block);
        assert!((normal.damage_reduction - 0.5).abs() < f64::EPSILON);

        let bad = outcome(Zone::Bad, QteKind::Defend).defend_modifiers();
        assert_eq!(bad.action, DefendAction::Hit);
        assert!(bad.damage_reduction.abs() < f64::EPSILON);
    }
}
