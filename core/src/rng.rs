//! Random number generation for climate events.
//!
//! RULE: Nothing in the engine may call a platform RNG directly.
//! All randomness flows through a RandomSource handed to the engine,
//! so tests can pin outcomes with a ScriptedRng and the runner can
//! reproduce a game from its seed.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::collections::VecDeque;

/// Stream index used for turn processing. Append new streams, never reorder.
pub const TURN_STREAM: u64 = 0;

/// The seam between the engine and whatever produces random draws.
pub trait RandomSource {
    /// Roll a float in [0.0, 1.0).
    fn next_f64(&mut self) -> f64;

    /// Roll an index in [0, n). `n` must be > 0.
    fn next_below(&mut self, n: usize) -> usize;

    /// Bernoulli trial: returns true with probability p.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// A named, seeded RNG stream.
pub struct GameRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl GameRng {
    /// Create a stream from the master seed and a stable stream index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, stream: u64) -> Self {
        let derived_seed = master_seed ^ (stream.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl RandomSource for GameRng {
    fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    fn next_below(&mut self, n: usize) -> usize {
        debug_assert!(n > 0, "n must be > 0");
        (self.inner.next_u64() % n.max(1) as u64) as usize
    }
}

/// Replays a fixed list of rolls, then a constant fallback.
///
/// A fallback of 1.0 makes every `chance(p)` with p <= 1 fail, which
/// silences all randomized rules once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    rolls:    VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRng {
    pub fn new(rolls: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fallback,
        }
    }

    /// Every roll is `value`.
    pub fn constant(value: f64) -> Self {
        Self::new([], value)
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RandomSource for ScriptedRng {
    fn next_f64(&mut self) -> f64 {
        self.rolls.pop_front().unwrap_or(self.fallback)
    }

    fn next_below(&mut self, n: usize) -> usize {
        let roll = self.next_f64().clamp(0.0, 1.0);
        ((roll * n as f64) as usize).min(n.saturating_sub(1))
    }
}
