//! Seeded RNG for retry jitter.
//!
//! Jitter only has to decorrelate concurrent retries, not be unpredictable,
//! so a `SmallRng` seeded from configuration is enough.  Seeding it makes
//! backoff schedules reproducible in tests.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Deterministic jitter source.
///
/// Sampling needs `&mut self`; callers sharing one across threads wrap it in a `Mutex`
/// and hold the lock only while sampling.
pub struct JitterRng(SmallRng);

impl JitterRng {
    pub fn new(seed: u64) -> Self {
        JitterRng(SmallRng::seed_from_u64(seed))
    }

    /// "Equal jitter": a duration uniformly drawn from `[d/2, d]`.
    pub fn equal_jitter(&mut self, d: Duration) -> Duration {
        let ms = d.as_millis() as u64;
        if ms < 2 {
            return d;
        }
        let half = ms / 2;
        Duration::from_millis(half + self.0.gen_range(0..=ms - half))
    }
}
