//! Periodic waveform shapes.

use std::f64::consts::PI;
use std::fmt;

/// The four periodic shapes an oscillator can produce.
///
/// Every shape maps a normalized phase in `[0, 1)` to a sample in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Waveform {
    #[default]
    Sine,
    /// Rises linearly from -1 to 1 over the first half period, falls back over the second.
    Triangle,
    /// Rises linearly from -1 to 1 over the full period, then drops.
    Sawtooth,
    /// 50% duty cycle: 1 for the first half period, -1 for the second.
    Square,
}

impl Waveform {
    /// Evaluates the waveform at `phase`, which must lie in `[0, 1)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tonewheel::Waveform;
    ///
    /// assert_eq!(Waveform::Sawtooth.sample(0.0), -1.0);
    /// assert_eq!(Waveform::Triangle.sample(0.5), 1.0);
    /// assert_eq!(Waveform::Square.sample(0.75), -1.0);
    /// ```
    pub fn sample(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (phase * 2.0 * PI).sin(),
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// Looks a waveform up by its conventional name (`"sine"`, `"tri"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Some(Waveform::Sine),
            "triangle" | "tri" => Some(Waveform::Triangle),
            "sawtooth" | "saw" => Some(Waveform::Sawtooth),
            "square" | "sqr" => Some(Waveform::Square),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Square => "square",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
