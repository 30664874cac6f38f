//! Oscillators: the core restartable source, its typed variants and the pulse composite.

mod chain;
mod oscillator;
mod pulse;
mod variants;
mod waveform;

pub use chain::StageKind;
pub use oscillator::Oscillator;
pub use pulse::Pulse;
pub use variants::{SawOsc, SinOsc, SqrOsc, TriOsc};
pub use waveform::Waveform;
