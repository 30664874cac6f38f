//! Oscillators with the waveform picked by the type.

use super::{Oscillator, Waveform};
use crate::context::{AudioContext, Output, ParamRef};
use crate::sound::Sound;
use std::ops::{Deref, DerefMut};

macro_rules! typed_oscillator {
    ($(#[$meta:meta])* $name:ident => $waveform:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name(Oscillator);

        impl $name {
            pub const WAVEFORM: Waveform = $waveform;

            /// Creates a stopped oscillator connected to the master bus.
            pub fn new(ctx: &AudioContext, frequency: f64) -> Self {
                Self(Oscillator::new(ctx, Self::WAVEFORM, frequency))
            }

            pub fn into_inner(self) -> Oscillator {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Oscillator;

            fn deref(&self) -> &Oscillator {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Oscillator {
                &mut self.0
            }
        }

        impl Sound for $name {
            fn output(&self) -> Output {
                self.0.output()
            }

            fn amp_param(&self) -> ParamRef {
                self.0.amp_param()
            }
        }

        impl From<$name> for Oscillator {
            fn from(osc: $name) -> Self {
                osc.0
            }
        }
    };
}

typed_oscillator!(
    /// Sine oscillator.
    ///
    /// ```
    /// use tonewheel::{AudioContext, SinOsc, Waveform};
    ///
    /// let ctx = AudioContext::new(44100);
    /// let osc = SinOsc::new(&ctx, 440.0);
    /// assert_eq!(osc.waveform(), Waveform::Sine);
    /// ```
    SinOsc => Waveform::Sine
);

typed_oscillator!(
    /// Triangle oscillator.
    TriOsc => Waveform::Triangle
);

typed_oscillator!(
    /// Sawtooth oscillator.
    SawOsc => Waveform::Sawtooth
);

typed_oscillator!(
    /// Square oscillator with a 50% duty cycle. See [`Pulse`](super::Pulse) for other widths.
    SqrOsc => Waveform::Square
);
