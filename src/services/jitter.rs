//! Injectable randomness for retry backoff.
//!
//! Failed deliveries are pushed forward by a randomized delay so a systemic
//! outage does not cause every failed message to retry in lockstep. The
//! source is a trait so tests can pin the delay.

use rand::Rng;

/// Source of backoff delays, in whole seconds.
pub trait Jitter: Send + Sync {
    fn delay_seconds(&self) -> i64;
}

/// Uniform random delay in `[min, max]` seconds.
#[derive(Debug, Clone)]
pub struct UniformJitter {
    min: i64,
    max: i64,
}

impl UniformJitter {
    pub fn new(min: i64, max: i64) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self { min, max }
    }
}

impl Default for UniformJitter {
    fn default() -> Self {
        Self::new(1, 60)
    }
}

impl Jitter for UniformJitter {
    fn delay_seconds(&self) -> i64 {
        let mut rng = rand::rng();
        rng.random_range(self.min..=self.max)
    }
}

/// Fixed delay, keeps backoff deterministic in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub i64);

impl Jitter for FixedJitter {
    fn delay_seconds(&self) -> i64 {
        self.0
    }
}
