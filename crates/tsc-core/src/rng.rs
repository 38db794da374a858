//! Deterministic run-level RNG.
//!
//! One `SimRng` is seeded from `RunConfig::seed`.  Children derived with
//! [`SimRng::child`] get independent streams so demand generation and
//! emergency route choice never disturb each other's sequence.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seeded RNG for demand and emergency route choice.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child stream keyed by `offset`.
    ///
    /// Unlike drawing from `self`, this does not advance the parent, so the
    /// same `(seed, offset)` pair always yields the same child.
    pub fn child(seed: u64, offset: u64) -> SimRng {
        SimRng(SmallRng::seed_from_u64(seed ^ offset.wrapping_mul(MIXING_CONSTANT)))
    }

    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Choose a random element from a slice; `None` if it is empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}
