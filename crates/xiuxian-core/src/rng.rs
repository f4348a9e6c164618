//! Random number generator abstraction for determinism.
//!
//! Production code picks among candidate illustrations with a real RNG.
//! Tests inject a seeded or scripted implementation so the pick is
//! reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;
}

/// `DeterministicRng` backed by `rand`'s standard generator.
#[derive(Debug, Clone)]
pub struct StdRandom(StdRng);

impl StdRandom {
    /// Creates a generator seeded from the operating system.
    #[must_use]
    pub fn from_os() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Creates a generator with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl DeterministicRng for StdRandom {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.0.random_range(min..=max)
    }
}

/// Picks an index in `0..len` uniformly, or `None` when `len` is zero.
pub fn pick_index(rng: &mut dyn DeterministicRng, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let upper = u32::try_from(len - 1).unwrap_or(u32::MAX);
    let picked = rng.next_u32_range(0, upper) as usize;
    Some(picked.min(len - 1))
}
