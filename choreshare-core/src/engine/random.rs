/// Random source for the distribution shuffle
///
/// The engine never reaches for a global RNG. Callers hand it a
/// [`RandomSource`], which keeps distribution reproducible under a fixed
/// seed and lets tests script every draw.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Supplier of uniformly distributed indices
pub trait RandomSource: Send {
    /// Returns a value in `[0, bound)`. `bound` is always at least 1.
    fn next_below(&mut self, bound: usize) -> usize;
}

/// [`RandomSource`] backed by rand's `StdRng`
#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Seeds from the operating system
    pub fn from_entropy() -> Self {
        StdRandom {
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixed seed; the same seed yields the same sequence of draws
    pub fn seeded(seed: u64) -> Self {
        StdRandom {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_below(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }
}

/// Shuffles `items` in place with Fisher–Yates
///
/// Walks from the last index down to 1 and swaps position `i` with a draw
/// from `[0, i]`.
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.next_below(i + 1);
        items.swap(i, j);
    }
}
