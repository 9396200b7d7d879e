//! Pseudo-random source for the escalation policy.
//!
//! Only has to look unpredictable to a person sitting at the host. The
//! generator is always passed explicitly so tests can seed it.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Generator seeded from a persisted 16-bit seed.
pub fn seeded(seed: u16) -> StdRng {
    StdRng::seed_from_u64(seed as u64)
}

/// Next seed to persist: the generator's next 16-bit draw, redrawn while it
/// equals `current` so consecutive boots never share a seed.
pub fn next_seed<R: RngCore + ?Sized>(rng: &mut R, current: u16) -> u16 {
    loop {
        let candidate = (rng.next_u32() >> 16) as u16;
        if candidate != current {
            return candidate;
        }
    }
}

/// Uniform integer in `[0, n)`. An empty range yields 0.
pub fn random_below<R: Rng>(rng: &mut R, n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    rng.random_range(0..n)
}

/// Index drawn with probability proportional to its weight. `None` when the
/// weights sum to zero.
pub fn pick_weighted<R: Rng>(rng: &mut R, weights: &[u32]) -> Option<usize> {
    // Summed wide so no table of u32 weights can overflow.
    let total: u64 = weights.iter().map(|&w| w as u64).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.random_range(0..total);
    for (idx, &weight) in weights.iter().enumerate() {
        if roll < weight as u64 {
            return Some(idx);
        }
        roll -= weight as u64;
    }
    None
}
