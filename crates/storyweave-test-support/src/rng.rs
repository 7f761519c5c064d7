//! Deterministic `RandomSource` implementations for tests.

use storyweave_core::rng::RandomSource;

/// A no-op source: `0.0` for floats, `min` for ranges. Suitable for tests
/// that do not depend on specific random values.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockRandom;

impl RandomSource for MockRandom {
    fn next_f64(&mut self) -> f64 {
        0.0
    }

    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }
}

/// A source that returns floats from a predetermined sequence. Panics when
/// the sequence is exhausted. Used to pin QTE target positions.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    index: usize,
}

impl SequenceRandom {
    /// Creates a sequence source over `values`.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, index: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        let value = self.values[self.index];
        self.index += 1;
        value
    }

    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }
}
