//! Authored scene types.

use serde::{Deserialize, Serialize};
use storyweave_core::types::{Requirement, SceneId};

/// One selectable choice at the end of a scene's text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Choice {
    /// Button label shown to the player.
    pub label: String,
    /// Scene to load on selection, if any.
    pub target: Option<SceneId>,
    /// Requirement expression gating the choice. A failing choice is shown
    /// disabled, never hidden.
    pub require_flags: Vec<Requirement>,
    /// Regular flags set when the choice is selected.
    pub set_flags: Vec<String>,
}

/// One authored scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    /// Scene identifier; unique within a story.
    pub id: SceneId,
    /// Background asset reference.
    pub bg: Option<String>,
    /// Music track reference.
    pub music: Option<String>,
    /// Character sprite references.
    pub chars: Vec<String>,
    /// Regular flags set on scene entry.
    pub set_flags: Vec<String>,
    /// Key flags set on scene entry.
    pub set_key_flags: Vec<String>,
    /// Regular flags cleared on scene entry (after the set lists).
    pub clear_flags: Vec<String>,
    /// Ordered text blocks, already rendered to display HTML.
    pub text_blocks: Vec<String>,
    /// Terminal choice set. Empty means the scene is an ending.
    pub choices: Vec<Choice>,
}

impl Scene {
    /// Creates an empty scene with the given identifier.
    #[must_use]
    pub fn new(id: impl Into<SceneId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// `true` when the scene has no choices, i.e. it is an ending.
    #[must_use]
    pub fn is_ending(&self) -> bool {
        self.choices.is_empty()
    }
}
