//! Precomputed colored-noise buffers shared by every noise source of a context.

use super::{BrownNoise, PinkNoise, WhiteNoise};
use crate::Signal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// The three noise colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NoiseColor {
    /// Flat spectrum.
    #[default]
    White,
    /// -3 dB per octave.
    Pink,
    /// -6 dB per octave.
    Brown,
}

impl NoiseColor {
    pub const ALL: [NoiseColor; 3] = [NoiseColor::White, NoiseColor::Pink, NoiseColor::Brown];

    /// Looks a color up by name. Anything unrecognized is white.
    ///
    /// ```
    /// use tonewheel::NoiseColor;
    ///
    /// assert_eq!(NoiseColor::from_name("Pink"), NoiseColor::Pink);
    /// assert_eq!(NoiseColor::from_name("brownian"), NoiseColor::Brown);
    /// assert_eq!(NoiseColor::from_name("purple"), NoiseColor::White);
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "white" => NoiseColor::White,
            "pink" => NoiseColor::Pink,
            "brown" | "brownian" | "red" => NoiseColor::Brown,
            other => {
                log::warn!("unknown noise color {other:?}, using white");
                NoiseColor::White
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NoiseColor::White => "white",
            NoiseColor::Pink => "pink",
            NoiseColor::Brown => "brown",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for NoiseColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fills a fresh buffer of `len` samples of the given color.
///
/// Samples are not normalized: white stays in `[-1, 1]`, pink and brown
/// keep whatever range their filter gives them.
pub fn synthesize<R: Rng>(color: NoiseColor, len: usize, rng: &mut R) -> Vec<f64> {
    let mut buffer = vec![0.0; len];
    match color {
        NoiseColor::White => WhiteNoise::with_rng(rng).process(&mut buffer),
        NoiseColor::Pink => PinkNoise::with_rng(rng).process(&mut buffer),
        NoiseColor::Brown => BrownNoise::with_rng(rng).process(&mut buffer),
    }
    buffer
}

/// Lazily synthesized buffers, two seconds long, one per color.
pub(crate) struct NoiseBank {
    len: usize,
    seed: Option<u64>,
    buffers: [OnceLock<Arc<[f64]>>; 3],
}

impl NoiseBank {
    pub(crate) const SECONDS: f64 = 2.0;

    pub(crate) fn new(sample_rate: f64, seed: Option<u64>) -> Self {
        Self {
            len: (Self::SECONDS * sample_rate).round() as usize,
            seed,
            buffers: Default::default(),
        }
    }

    pub(crate) fn buffer(&self, color: NoiseColor) -> Arc<[f64]> {
        let slot = &self.buffers[color.index()];
        Arc::clone(slot.get_or_init(|| {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(color.index() as u64)),
                None => StdRng::from_entropy(),
            };
            log::debug!("synthesizing {} samples of {color} noise", self.len);
            synthesize(color, self.len, &mut rng).into()
        }))
    }
}
