//! Tonewheel - oscillators and colored noise with click-free, time-scheduled control
//!
//! Sounds are built against an [`AudioContext`], which owns the sample clock
//! and the audio graph. Every control change is scheduled on that clock as a
//! short hold-then-ramp, so amplitude, frequency and phase can be changed
//! while a sound plays without clicks.
//!
//! ```
//! use tonewheel::{AudioContext, Control, Noise, NoiseColor, SinOsc, Sound};
//!
//! let ctx = AudioContext::new(44100);
//!
//! let mut lfo = SinOsc::new(&ctx, 3.0);
//! lfo.amp(15.0)?;
//! lfo.disconnect()?;
//! lfo.start()?;
//!
//! let mut osc = SinOsc::new(&ctx, 220.0);
//! osc.freq(lfo.output())?;
//! osc.amp(Control::ramp(0.4, 0.05, 0.0))?;
//! osc.start()?;
//!
//! let mut hiss = Noise::new(&ctx, NoiseColor::Pink);
//! hiss.amp(0.05)?;
//! hiss.pan(0.8)?;
//! hiss.start()?;
//!
//! let mut out = vec![0.0; 2 * 4410];
//! ctx.render(&mut out);
//! assert!(out.iter().any(|&s| s != 0.0));
//! # Ok::<(), tonewheel::Error>(())
//! ```

pub mod context;
mod error;
pub mod noise;
pub mod oscillators;
mod schedule;
pub mod signals;
mod sound;

// Re-export commonly used types at the crate root
pub use context::{
    AudioContext, AudioParam, AutomationEvent, ContextOptions, MathOp, NodeId, Output, ParamRef,
    ParamSlot, Sink,
};
pub use error::{Error, Result};
pub use noise::{BrownNoise, Noise, NoiseColor, PinkNoise, WhiteNoise, synthesize};
pub use oscillators::{Oscillator, Pulse, SawOsc, SinOsc, SqrOsc, StageKind, TriOsc, Waveform};
pub use schedule::Control;
pub use signals::{ConstantSignal, Signal};
pub use sound::Sound;
