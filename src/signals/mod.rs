//! Signal source abstractions.
//!
//! This module provides the `Signal` trait implemented by every sample source
//! that can be wrapped into the audio graph, plus `ConstantSignal` for fixed
//! offsets.

mod signal;

pub use signal::{ConstantSignal, Signal};
