//! Random source abstraction.
//!
//! The only randomness in the engine is the QTE target position. It sits
//! behind a trait so tests can pin the target to a known value.

use rand::Rng;

/// Abstraction over random number generation.
pub trait RandomSource: Send {
    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;

    /// Generate a random `u32` in `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;
}

/// Production source backed by the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn next_f64(&mut self) -> f64 {
        rand::rng().random()
    }

    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        rand::rng().random_range(min..=max)
    }
}
