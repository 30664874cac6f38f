//! Behaviour shared by every sound source.

use crate::context::{Output, ParamRef};

/// A sound that can be routed into other sounds.
///
/// Implemented by oscillators and noise sources so one can drive another:
/// `noise.amp_mod(&osc)` sums the noise into the oscillator's amplitude, and
/// `osc.freq(lfo.output())` sums an LFO into an oscillator's frequency.
pub trait Sound {
    /// The post-pan mono signal, as fed to the stereo bus.
    fn output(&self) -> Output;

    /// The output gain parameter that carries the amplitude envelope.
    fn amp_param(&self) -> ParamRef;
}
