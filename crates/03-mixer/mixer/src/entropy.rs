//! Injected random source for pool selection.
//!
//! Selection must be unpredictable to a traffic analyst, so the live source
//! is a CSPRNG seeded from the operating system, not a statistical PRNG.
//! Tests inject a fixed seed to make selection sequences reproducible.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Cryptographically strong random source handed to a strategy at
/// construction.
pub struct Entropy {
    rng: Box<dyn RngCore + Send>,
}

impl Entropy {
    /// OS-seeded CSPRNG for live deployments.
    pub fn strong() -> Self {
        Self {
            rng: Box::new(StdRng::from_entropy()),
        }
    }

    /// Fixed-seed source for deterministic tests and simulation runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Box::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Uniform index in `[0, n)`.
    ///
    /// # Panics
    ///
    /// Panics when `n` is zero; a draw over no candidates is a logic error.
    pub fn draw(&mut self, n: usize) -> usize {
        assert!(n > 0, "uniform draw over zero candidates");
        self.rng.gen_range(0..n)
    }

    /// Uniform delay in `[0, max]`, millisecond granularity.
    pub fn delay_within(&mut self, max: Duration) -> Duration {
        let ms = self.rng.gen_range(0..=max.as_millis() as u64);
        Duration::from_millis(ms)
    }
}
