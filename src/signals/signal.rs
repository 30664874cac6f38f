//! Signal trait and constant sources.
//!
//! A `Signal` is anything that can hand out one sample at a time. The audio
//! graph wraps signals as source nodes, which is how custom modulators (LFOs,
//! DC offsets, noise generators) are fed into oscillator parameters.

/// Common interface for sample-by-sample signal sources.
///
/// The trait provides two operations:
/// - Single sample generation via `next_sample()`
/// - Batch processing via `process()`
///
/// # Examples
///
/// ```
/// use tonewheel::{AudioContext, Signal};
///
/// struct Ramp(f64);
///
/// impl Signal for Ramp {
///     fn next_sample(&mut self) -> f64 {
///         self.0 += 1.0;
///         self.0
///     }
/// }
///
/// let ctx = AudioContext::new(44100);
/// let lfo = ctx.signal(Ramp(0.0));
/// ```
pub trait Signal {
    /// Generates the next sample from the signal.
    fn next_sample(&mut self) -> f64;

    /// Generates multiple samples into a buffer.
    ///
    /// Default implementation calls `next_sample()` for each element.
    fn process(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

/// A bare `f64` is a constant signal.
///
/// ```
/// use tonewheel::Signal;
///
/// let mut constant = 0.5_f64;
/// assert_eq!(constant.next_sample(), 0.5);
/// ```
impl Signal for f64 {
    fn next_sample(&mut self) -> f64 {
        *self
    }

    fn process(&mut self, buffer: &mut [f64]) {
        buffer.fill(*self);
    }
}

impl<S: Signal + ?Sized> Signal for Box<S> {
    fn next_sample(&mut self) -> f64 {
        (**self).next_sample()
    }

    fn process(&mut self, buffer: &mut [f64]) {
        (**self).process(buffer)
    }
}

/// A constant signal that always returns the same value.
///
/// Connected into a parameter it acts as a DC offset on top of whatever the
/// parameter's own automation produces.
///
/// # Examples
///
/// ```
/// use tonewheel::{ConstantSignal, Signal};
///
/// let mut offset = ConstantSignal(0.25);
/// assert_eq!(offset.next_sample(), 0.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSignal(pub f64);

impl Signal for ConstantSignal {
    fn next_sample(&mut self) -> f64 {
        self.0
    }

    fn process(&mut self, buffer: &mut [f64]) {
        buffer.fill(self.0);
    }
}

impl From<f64> for ConstantSignal {
    fn from(value: f64) -> Self {
        ConstantSignal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_to_constant_signal() {
        let constant: ConstantSignal = 0.5.into();
        assert_eq!(constant.0, 0.5);
    }

    #[test]
    fn test_constant_process_fills_buffer() {
        let mut constant = ConstantSignal(-0.75);
        let mut buffer = [0.0; 8];
        constant.process(&mut buffer);
        assert!(buffer.iter().all(|&s| s == -0.75));
    }

    #[test]
    fn test_boxed_signal_forwards() {
        let mut boxed: Box<dyn Signal + Send> = Box::new(ConstantSignal(2.0));
        assert_eq!(boxed.next_sample(), 2.0);
        let mut buffer = [0.0; 3];
        boxed.process(&mut buffer);
        assert_eq!(buffer, [2.0, 2.0, 2.0]);
    }
}
