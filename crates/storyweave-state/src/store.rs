//! Central state store.
//!
//! One tree with four namespaces: `scene`, `flags`, `meta`, `settings`.
//! Every mutation synchronously notifies subscribers registered on the
//! namespace root, then publishes `state:changed` with the typed path and
//! the new leaf value. The save blob keeps the original camelCase field
//! names so existing saves round-trip.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use storyweave_core::bus::EventBus;
use storyweave_core::clock::Clock;
use storyweave_core::error::EngineError;
use storyweave_core::event::GameEvent;
use storyweave_core::types::SceneId;

/// Schema version written into every save blob.
pub const SAVE_VERSION: &str = "1.0.0";

/// Top-level namespaces of the state tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKey {
    Scene,
    Flags,
    Meta,
    Settings,
}

/// Typed rendition of the original dot-delimited store paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePath {
    SceneCurrentId,
    SceneCurrentBlockIndex,
    SceneHistory,
    FlagsRegular,
    FlagsKey,
    MetaReadBlocks,
    Settings,
}

impl StatePath {
    /// The namespace this path lives under.
    #[must_use]
    pub fn root(self) -> RootKey {
        match self {
            Self::SceneCurrentId | Self::SceneCurrentBlockIndex | Self::SceneHistory => {
                RootKey::Scene
            }
            Self::FlagsRegular | Self::FlagsKey => RootKey::Flags,
            Self::MetaReadBlocks => RootKey::Meta,
            Self::Settings => RootKey::Settings,
        }
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = match self {
            Self::SceneCurrentId => "scene.currentId",
            Self::SceneCurrentBlockIndex => "scene.currentBlockIndex",
            Self::SceneHistory => "scene.history",
            Self::FlagsRegular => "flags.regular",
            Self::FlagsKey => "flags.key",
            Self::MetaReadBlocks => "meta.readBlocks",
            Self::Settings => "settings",
        };
        f.write_str(path)
    }
}

/// Scene position namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneState {
    /// Current scene identifier, if any scene is loaded.
    pub current_id: Option<SceneId>,
    /// Zero-based cursor into the current scene's text blocks.
    pub current_block_index: usize,
    /// Append-only visited scene ids, without immediate duplicates.
    pub history: Vec<SceneId>,
}

/// Flag namespace. The authoritative sets live in the flag manager; these
/// arrays are its durable mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagState {
    /// Cleared on "play again".
    pub regular: Vec<String>,
    /// Survives "play again"; cleared only on full reset.
    pub key: Vec<String>,
}

/// Read-history namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaState {
    /// Composite `sceneId:blockIndex` keys of text already seen.
    pub read_blocks: Vec<String>,
    /// Save timestamp in Unix milliseconds; set at serialization time.
    pub timestamp: Option<i64>,
}

/// Text pacing preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSpeed {
    #[default]
    Normal,
    Fast,
    Instant,
}

/// User preference namespace; survives resets when requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub text_speed: TextSpeed,
    pub volume: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_speed: TextSpeed::Normal,
            volume: 0.16,
        }
    }
}

/// The full state tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub scene: SceneState,
    pub flags: FlagState,
    pub meta: MetaState,
    pub settings: Settings,
}

/// Versioned save snapshot. Namespaces are optional on the way in; present
/// ones replace the live namespace wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBlob {
    #[serde(default)]
    pub scene: Option<SceneState>,
    #[serde(default)]
    pub flags: Option<FlagState>,
    #[serde(default)]
    pub meta: Option<MetaState>,
    #[serde(default)]
    pub settings: Option<Settings>,
    pub version: String,
}

/// Handler notified with the updated tree whenever its root key changes.
pub type StateSubscriber = Box<dyn FnMut(&GameState, RootKey) + Send + Sync>;

/// Single mutable owner of the state tree.
#[derive(Default)]
pub struct StateStore {
    state: GameState,
    subscribers: HashMap<RootKey, Vec<StateSubscriber>>,
}

impl StateStore {
    /// Creates a store with default state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the whole tree.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Read access to the scene namespace.
    #[must_use]
    pub fn scene(&self) -> &SceneState {
        &self.state.scene
    }

    /// Read access to the flag namespace.
    #[must_use]
    pub fn flags(&self) -> &FlagState {
        &self.state.flags
    }

    /// Read access to the meta namespace.
    #[must_use]
    pub fn meta(&self) -> &MetaState {
        &self.state.meta
    }

    /// Read access to the settings namespace.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Subscribes a handler to changes under one root key.
    pub fn subscribe(&mut self, root: RootKey, subscriber: StateSubscriber) {
        self.subscribers.entry(root).or_default().push(subscriber);
    }

    fn notify(&mut self, root: RootKey) {
        let Some(mut subs) = self.subscribers.remove(&root) else {
            return;
        };
        for sub in &mut subs {
            sub(&self.state, root);
        }
        // Re-merge ahead of any subscriptions added meanwhile.
        match self.subscribers.remove(&root) {
            Some(added) => {
                subs.extend(added);
                self.subscribers.insert(root, subs);
            }
            None => {
                self.subscribers.insert(root, subs);
            }
        }
    }

    fn changed(&mut self, bus: &mut EventBus, path: StatePath, value: serde_json::Value) {
        self.notify(path.root());
        bus.publish(&GameEvent::StateChanged {
            path: path.to_string(),
            value,
        });
    }

    /// Sets the current scene identifier.
    pub fn set_scene_current_id(&mut self, id: Option<SceneId>, bus: &mut EventBus) {
        self.state.scene.current_id = id.clone();
        self.changed(bus, StatePath::SceneCurrentId, serde_json::json!(id));
    }

    /// Sets the text block cursor.
    pub fn set_scene_block_index(&mut self, index: usize, bus: &mut EventBus) {
        self.state.scene.current_block_index = index;
        self.changed(bus, StatePath::SceneCurrentBlockIndex, serde_json::json!(index));
    }

    /// Appends to history unless the last entry already is `id`.
    /// Returns `true` when an entry was appended.
    pub fn push_history(&mut self, id: &SceneId, bus: &mut EventBus) -> bool {
        if self.state.scene.history.last() == Some(id) {
            return false;
        }
        self.state.scene.history.push(id.clone());
        let value = serde_json::json!(self.state.scene.history);
        self.changed(bus, StatePath::SceneHistory, value);
        true
    }

    /// Replaces both flag mirror arrays (full replace, not incremental).
    pub fn set_flag_arrays(&mut self, regular: Vec<String>, key: Vec<String>, bus: &mut EventBus) {
        self.state.flags.regular = regular;
        let value = serde_json::json!(self.state.flags.regular);
        self.changed(bus, StatePath::FlagsRegular, value);

        self.state.flags.key = key;
        let value = serde_json::json!(self.state.flags.key);
        self.changed(bus, StatePath::FlagsKey, value);
    }

    /// Marks a `sceneId:blockIndex` pair as read. Idempotent: a key already
    /// present is not re-added. Returns `true` when the key was new.
    pub fn mark_block_read(&mut self, scene_id: &SceneId, index: usize, bus: &mut EventBus) -> bool {
        let key = format!("{scene_id}:{index}");
        if self.state.meta.read_blocks.contains(&key) {
            return false;
        }
        self.state.meta.read_blocks.push(key);
        let value = serde_json::json!(self.state.meta.read_blocks);
        self.changed(bus, StatePath::MetaReadBlocks, value);
        true
    }

    /// Replaces the settings namespace.
    pub fn set_settings(&mut self, settings: Settings, bus: &mut EventBus) {
        self.state.settings = settings;
        let value = serde_json::json!(self.state.settings);
        self.changed(bus, StatePath::Settings, value);
    }

    /// Produces the versioned save snapshot with a fresh timestamp.
    #[must_use]
    pub fn snapshot(&self, clock: &dyn Clock) -> SaveBlob {
        SaveBlob {
            scene: Some(self.state.scene.clone()),
            flags: Some(self.state.flags.clone()),
            meta: Some(MetaState {
                read_blocks: self.state.meta.read_blocks.clone(),
                timestamp: Some(clock.now().timestamp_millis()),
            }),
            settings: Some(self.state.settings.clone()),
            version: SAVE_VERSION.to_owned(),
        }
    }

    /// Serializes the snapshot to JSON.
    ///
    /// # Panics
    ///
    /// Serialization of the derived blob types is infallible.
    #[must_use]
    pub fn serialize(&self, clock: &dyn Clock) -> String {
        serde_json::to_string(&self.snapshot(clock)).expect("save blob serialization is infallible")
    }

    /// Restores state from a serialized snapshot.
    ///
    /// Fails soft: on malformed input the prior state is left untouched.
    /// On success, namespaces present in the blob replace the live ones
    /// wholesale and their subscribers are re-notified.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the blob does not parse.
    pub fn deserialize(&mut self, blob: &str) -> Result<(), EngineError> {
        let data: SaveBlob = serde_json::from_str(blob)
            .map_err(|e| EngineError::Validation(format!("save blob parse failed: {e}")))?;

        let mut touched = Vec::new();
        if let Some(scene) = data.scene {
            self.state.scene = scene;
            touched.push(RootKey::Scene);
        }
        if let Some(flags) = data.flags {
            self.state.flags = flags;
            touched.push(RootKey::Flags);
        }
        if let Some(meta) = data.meta {
            self.state.meta = meta;
            touched.push(RootKey::Meta);
        }
        if let Some(settings) = data.settings {
            self.state.settings = settings;
            touched.push(RootKey::Settings);
        }

        for root in touched {
            self.notify(root);
        }
        Ok(())
    }

    /// Resets state. Always clears `scene`, regular flags, and read history;
    /// conditionally preserves `settings` and key flags.
    pub fn reset(&mut self, keep_settings: bool, keep_key_flags: bool, bus: &mut EventBus) {
        let kept_key = if keep_key_flags {
            std::mem::take(&mut self.state.flags.key)
        } else {
            Vec::new()
        };

        self.state.scene = SceneState::default();
        self.state.flags = FlagState {
            regular: Vec::new(),
            key: kept_key,
        };
        self.state.meta = MetaState::default();
        if !keep_settings {
            self.state.settings = Settings::default();
        }

        bus.publish(&GameEvent::StateReset {
            keep_settings,
            keep_key_flags,
        });
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &self.state)
            .field("subscriber_roots", &self.subscribers.len())
            .finish()
    }
}
