//! Scripted `DeterministicRng` implementations.

use xiuxian_core::rng::DeterministicRng;

/// Always returns `min`. Use when the test does not care which
/// candidate is picked.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }
}

/// Returns the given values in order, clamped into the requested range.
///
/// # Panics
///
/// `next_u32_range` panics once the sequence is exhausted.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<u32>,
    index: usize,
}

impl SequenceRng {
    /// Scripts the values returned by successive calls.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, index: 0 }
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let value = self.values[self.index];
        self.index += 1;
        value.clamp(min, max.max(min))
    }
}
