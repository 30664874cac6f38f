//! White noise generator.

use crate::Signal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform white noise in `[-1, 1]`.
///
/// Every colored noise starts here: the pink and brown generators filter the
/// output of one of these.
pub struct WhiteNoise<R: Rng = StdRng> {
    rng: R,
}

impl WhiteNoise<StdRng> {
    /// Creates a generator seeded from OS entropy.
    ///
    /// # Examples
    ///
    /// ```
    /// use tonewheel::{Signal, WhiteNoise};
    ///
    /// let mut noise = WhiteNoise::new();
    /// let sample = noise.next_sample();
    /// assert!((-1.0..=1.0).contains(&sample));
    /// ```
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for WhiteNoise<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> WhiteNoise<R> {
    /// Creates a generator drawing from `rng`, e.g. a seeded one for reproducible output.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Signal for WhiteNoise<R> {
    fn next_sample(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_range() {
        let mut noise = WhiteNoise::new();
        for _ in 0..10000 {
            let sample = noise.next_sample();
            assert!((-1.0..=1.0).contains(&sample));
        }
    }

    #[test]
    fn test_randomness() {
        let mut noise = WhiteNoise::new();
        let samples: Vec<f64> = (0..100).map(|_| noise.next_sample()).collect();
        let first = samples[0];
        assert!(!samples.iter().all(|&s| s == first));
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = WhiteNoise::with_rng(StdRng::seed_from_u64(42));
        let mut b = WhiteNoise::with_rng(StdRng::seed_from_u64(42));
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        a.process(&mut left);
        b.process(&mut right);
        assert_eq!(left, right);
    }
}
