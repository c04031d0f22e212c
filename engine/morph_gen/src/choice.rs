//! Weighted choice and depth control.
//!
//! [`choose`] is the single nondeterminism primitive of the engine: every
//! generator is phrased as nested `choose` calls over an injected
//! [`RandomSource`], which keeps a whole pipeline run a pure function of
//! (tree, donor, settings, seed) and makes generation scriptable in tests.
//!
//! [`go_deeper`] is the recursion budget: the probability of descending
//! shrinks linearly with depth and is hard-capped at `max_depth`, so every
//! recursive generator terminates.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::MorphError;

/// Injected randomness.
///
/// The engine never touches a global RNG; both implementations below and
/// any test double go through this trait.
pub trait RandomSource {
    /// Uniform draw in `[0, bound)`. `bound` must be non-zero.
    fn next_below(&mut self, bound: u32) -> u32;

    /// Biased coin flip.
    fn flip(&mut self, probability: f64) -> bool;
}

/// Default source: a seeded standard RNG.
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_seed(seed: u64) -> Self {
        StdRandom {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_below(&mut self, bound: u32) -> u32 {
        self.rng.gen_range(0..bound)
    }

    fn flip(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.gen_bool(probability)
    }
}

/// Scripted source for tests: draws and flips are served from queues.
///
/// An exhausted queue yields `0` / `false`, which always selects the first
/// weighted option and declines every optional action — keeping forced
/// test scenarios short.
#[derive(Default)]
pub struct ScriptedRandom {
    draws: std::collections::VecDeque<u32>,
    flips: std::collections::VecDeque<bool>,
}

impl ScriptedRandom {
    pub fn new(draws: Vec<u32>, flips: Vec<bool>) -> Self {
        ScriptedRandom {
            draws: draws.into(),
            flips: flips.into(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_below(&mut self, bound: u32) -> u32 {
        self.draws.pop_front().unwrap_or(0).min(bound.saturating_sub(1))
    }

    fn flip(&mut self, _probability: f64) -> bool {
        self.flips.pop_front().unwrap_or(false)
    }
}

/// Draw one option from a weighted list. Each option occupies `weight`
/// repeated slots and one slot is drawn uniformly; weight 0 excludes an
/// option entirely.
pub fn choose<'a, T>(
    rng: &mut dyn RandomSource,
    what: &'static str,
    options: &'a [(u32, T)],
) -> Result<&'a T, MorphError> {
    let total: u32 = options.iter().map(|(weight, _)| weight).sum();
    if total == 0 {
        return Err(MorphError::NoChoice(what));
    }
    let mut draw = rng.next_below(total);
    for (weight, option) in options {
        if draw < *weight {
            return Ok(option);
        }
        draw -= weight;
    }
    Err(MorphError::NoChoice(what))
}

/// Recursion budget: whether a generator may descend one level further.
pub fn go_deeper(rng: &mut dyn RandomSource, depth: u32, max_depth: u32) -> bool {
    if depth >= max_depth {
        return false;
    }
    let probability = f64::from(max_depth - depth) / f64::from(max_depth + 1);
    rng.flip(probability)
}
