//! Story table — the read-only scene graph supplied by the host.

use std::collections::HashMap;

use storyweave_core::types::SceneId;

use crate::types::Scene;

/// An authored-content problem reported by [`StoryTable::validate`].
///
/// Validation is a lint, not a gate: the engine runs unvalidated content and
/// degrades per its error policy. A misspelled flag name in a negated
/// requirement silently passes at runtime, which is exactly what this lint
/// exists to catch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A choice points at a scene id that does not exist.
    UnknownTarget {
        scene: SceneId,
        choice_index: usize,
        target: SceneId,
    },
    /// A scene has neither text blocks nor choices.
    EmptyScene { scene: SceneId },
    /// A flag name appears in a requirement but is never set anywhere.
    UnsetFlag { scene: SceneId, flag: String },
}

/// Read-only mapping from scene identifier to scene record.
#[derive(Debug, Clone, Default)]
pub struct StoryTable {
    scenes: HashMap<SceneId, Scene>,
}

impl StoryTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from scenes, keyed by their ids. A later scene with a
    /// duplicate id replaces the earlier one.
    #[must_use]
    pub fn from_scenes(scenes: impl IntoIterator<Item = Scene>) -> Self {
        let mut table = Self::new();
        for scene in scenes {
            table.insert(scene);
        }
        table
    }

    /// Inserts a scene, replacing any scene with the same id.
    pub fn insert(&mut self, scene: Scene) {
        self.scenes.insert(scene.id.clone(), scene);
    }

    /// Looks up a scene by id.
    #[must_use]
    pub fn get(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.get(id)
    }

    /// `true` when the table has a scene with this id.
    #[must_use]
    pub fn contains(&self, id: &SceneId) -> bool {
        self.scenes.contains_key(id)
    }

    /// Number of scenes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// `true` when no scenes are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// All scene ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<SceneId> {
        let mut ids: Vec<SceneId> = self.scenes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Lints the authored content. Returns issues sorted by scene id.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut settable: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for scene in self.scenes.values() {
            settable.extend(scene.set_flags.iter().map(String::as_str));
            settable.extend(scene.set_key_flags.iter().map(String::as_str));
            for choice in &scene.choices {
                settable.extend(choice.set_flags.iter().map(String::as_str));
            }
        }

        let mut issues = Vec::new();
        let mut ids: Vec<&SceneId> = self.scenes.keys().collect();
        ids.sort();
        for id in ids {
            let scene = &self.scenes[id];
            if scene.text_blocks.is_empty() && scene.choices.is_empty() {
                issues.push(ValidationIssue::EmptyScene { scene: id.clone() });
            }
            for (choice_index, choice) in scene.choices.iter().enumerate() {
                if let Some(target) = &choice.target {
                    if !self.scenes.contains_key(target) {
                        issues.push(ValidationIssue::UnknownTarget {
                            scene: id.clone(),
                            choice_index,
                            target: target.clone(),
                        });
                    }
                }
                for req in &choice.require_flags {
                    if !settable.contains(req.flag.as_str()) {
                        issues.push(ValidationIssue::UnsetFlag {
                            scene: id.clone(),
                            flag: req.flag.clone(),
                        });
                    }
                }
            }
        }
        issues
    }
}
