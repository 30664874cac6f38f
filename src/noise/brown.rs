//! Brown noise generator.

use super::WhiteNoise;
use crate::Signal;
use rand::rngs::StdRng;
use rand::Rng;

/// Leaky integrator turning white noise into brown (-6 dB/octave).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrownFilter {
    last: f64,
}

impl BrownFilter {
    /// Output gain bringing the integrator back to roughly unit range.
    pub const GAIN: f64 = 3.5;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, white: f64) -> f64 {
        self.last = (self.last + 0.02 * white) / 1.02;
        self.last * Self::GAIN
    }
}

/// Brown noise: white noise run through a [`BrownFilter`].
pub struct BrownNoise<R: Rng = StdRng> {
    white: WhiteNoise<R>,
    filter: BrownFilter,
}

impl BrownNoise<StdRng> {
    pub fn new() -> Self {
        Self::with_white(WhiteNoise::new())
    }
}

impl Default for BrownNoise<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> BrownNoise<R> {
    pub fn with_rng(rng: R) -> Self {
        Self::with_white(WhiteNoise::with_rng(rng))
    }

    fn with_white(white: WhiteNoise<R>) -> Self {
        Self {
            white,
            filter: BrownFilter::new(),
        }
    }
}

impl<R: Rng> Signal for BrownNoise<R> {
    fn next_sample(&mut self) -> f64 {
        let white = self.white.next_sample();
        self.filter.process(white)
    }
}
