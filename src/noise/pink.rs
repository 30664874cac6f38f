//! Pink noise generator.

use super::WhiteNoise;
use crate::Signal;
use rand::rngs::StdRng;
use rand::Rng;

/// Seven-pole recursive filter turning white noise into pink (-3 dB/octave).
///
/// This is Paul Kellet's refined approximation. The filter is a pure
/// function of its state and the input sample, so the same input always
/// produces the same output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PinkFilter {
    b: [f64; 7],
}

impl PinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters one white sample.
    pub fn process(&mut self, white: f64) -> f64 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[3] = 0.86650 * b[3] + white * 0.3104856;
        b[4] = 0.55000 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.0168980;
        let out = (b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362) * 0.11;
        // The last pole only feeds the next sample.
        b[6] = white * 0.115926;
        out
    }
}

/// Pink noise: white noise run through a [`PinkFilter`].
pub struct PinkNoise<R: Rng = StdRng> {
    white: WhiteNoise<R>,
    filter: PinkFilter,
}

impl PinkNoise<StdRng> {
    pub fn new() -> Self {
        Self::from_white(WhiteNoise::new())
    }
}

impl Default for PinkNoise<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PinkNoise<R> {
    /// Creates a generator drawing from `rng`.
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use tonewheel::{PinkNoise, Signal};
    ///
    /// let rng = rand::rngs::StdRng::seed_from_u64(42);
    /// let mut noise = PinkNoise::with_rng(rng);
    /// let sample = noise.next_sample();
    /// assert!(sample.abs() < 1.0);
    /// ```
    pub fn with_rng(rng: R) -> Self {
        Self::from_white(WhiteNoise::with_rng(rng))
    }

    fn from_white(white: WhiteNoise<R>) -> Self {
        Self {
            white,
            filter: PinkFilter::new(),
        }
    }
}

impl<R: Rng> Signal for PinkNoise<R> {
    fn next_sample(&mut self) -> f64 {
        let white = self.white.next_sample();
        self.filter.process(white)
    }
}
