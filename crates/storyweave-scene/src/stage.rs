//! Presentation seam.
//!
//! The engine never draws anything itself. Scene side effects that concern
//! the presentation layer (backdrop, music, character sprites, one-shot
//! sounds) go through this trait so hosts can plug in whatever renderer
//! they have, and tests can record the calls.

/// Receiver for scene presentation side effects.
pub trait Stage: Send {
    /// Swaps the backdrop. `None` clears it.
    fn set_background(&mut self, bg: Option<&str>);

    /// Changes the music track. `None` stops playback.
    fn set_music(&mut self, track: Option<&str>);

    /// Replaces the visible character sprites.
    fn set_sprites(&mut self, sprites: &[String]);

    /// Plays a one-shot sound effect.
    fn play_sfx(&mut self, sfx: &str);
}

/// Stage that discards everything. Useful for headless hosts and tests
/// that only care about state transitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStage;

impl Stage for NullStage {
    fn set_background(&mut self, _bg: Option<&str>) {}
    fn set_music(&mut self, _track: Option<&str>) {}
    fn set_sprites(&mut self, _sprites: &[String]) {}
    fn play_sfx(&mut self, _sfx: &str) {}
}
