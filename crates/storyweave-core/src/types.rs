//! Vocabulary types shared across the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an authored scene.
///
/// Scene identifiers come from authored content (Markdown frontmatter), so
/// they are strings rather than generated UUIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Creates a scene identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SceneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One term of a flag requirement expression.
///
/// Authored as a flag name, optionally prefixed with `!` for "must not
/// have". An expression is satisfied only if every positive term is present
/// in the flag union and every negated term is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// The flag name, without the negation marker.
    pub flag: String,
    /// Whether the term demands the flag's absence.
    pub negated: bool,
}

impl Requirement {
    /// Parses a term from its authored form.
    #[must_use]
    pub fn parse(term: &str) -> Self {
        term.strip_prefix('!').map_or_else(
            || Self {
                flag: term.to_owned(),
                negated: false,
            },
            |name| Self {
                flag: name.to_owned(),
                negated: true,
            },
        )
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!{}", self.flag)
        } else {
            f.write_str(&self.flag)
        }
    }
}

impl Serialize for Requirement {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let term = String::deserialize(deserializer)?;
        Ok(Self::parse(&term))
    }
}

/// The four concentric QTE result tiers, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Marker landed inside the tightest radius.
    Perfect,
    /// Marker landed inside the middle radius.
    Good,
    /// Marker landed inside the widest radius.
    Normal,
    /// Marker landed outside every radius.
    Bad,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Perfect => "perfect",
            Self::Good => "good",
            Self::Normal => "normal",
            Self::Bad => "bad",
        };
        f.write_str(name)
    }
}

/// Kind of QTE session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QteKind {
    /// Offensive timing check; standard zone scale.
    Skill,
    /// Defensive timing check; tighter zone scale.
    Defend,
}

impl fmt::Display for QteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skill => "skill",
            Self::Defend => "defend",
        };
        f.write_str(name)
    }
}

/// Which side of a battle an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combatant {
    /// The player character.
    Player,
    /// The enemy.
    Enemy,
}

/// Why a quiz run ended in failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizEndReason {
    /// A wrong answer was submitted.
    Wrong,
    /// The per-question countdown reached zero.
    Timeout,
    /// The submission itself was malformed (answer index out of range).
    Error,
}

/// The exclusive session kinds guarded against re-entrant starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// A QTE timing session.
    Qte,
    /// A battle session.
    Battle,
    /// A quiz session.
    Quiz,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Qte => "QTE",
            Self::Battle => "battle",
            Self::Quiz => "quiz",
        };
        f.write_str(name)
    }
}
