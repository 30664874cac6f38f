//! Context configuration.

/// Settings fixed for the lifetime of an [`AudioContext`](super::AudioContext).
///
/// # Examples
///
/// ```
/// use tonewheel::{AudioContext, ContextOptions};
///
/// let options = ContextOptions::new(48000)
///     .with_max_delay_time(2.0)
///     .with_noise_seed(7);
/// let ctx = AudioContext::with_options(options);
/// assert_eq!(ctx.sample_rate(), 48000.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextOptions {
    /// Frames per second rendered by the context.
    pub sample_rate: u32,
    /// Capacity of every delay line, in seconds. Longer delays are clamped.
    ///
    /// Values outside `[0, MAX_DELAY_TIME_LIMIT]` are clamped when the
    /// context is built; NaN becomes 0.
    pub max_delay_time: f64,
    /// Seed for the noise buffers; `None` draws from OS entropy.
    pub noise_seed: Option<u64>,
}

impl ContextOptions {
    pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
    pub const DEFAULT_MAX_DELAY_TIME: f64 = 1.0;
    /// Upper bound on `max_delay_time`, matching the Web Audio delay node.
    pub const MAX_DELAY_TIME_LIMIT: f64 = 180.0;

    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            ..Self::default()
        }
    }

    pub fn with_max_delay_time(mut self, seconds: f64) -> Self {
        self.max_delay_time = clamp_delay_time(seconds);
        self
    }

    /// Makes the noise buffers reproducible across runs.
    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }

    /// The options with every field forced into its valid range.
    pub(crate) fn sanitized(self) -> Self {
        Self {
            sample_rate: self.sample_rate.max(1),
            max_delay_time: clamp_delay_time(self.max_delay_time),
            noise_seed: self.noise_seed,
        }
    }
}

fn clamp_delay_time(seconds: f64) -> f64 {
    if seconds.is_nan() {
        log::warn!("NaN max delay time replaced by 0");
        return 0.0;
    }
    let clamped = seconds.clamp(0.0, ContextOptions::MAX_DELAY_TIME_LIMIT);
    if clamped != seconds {
        log::warn!("max delay time {seconds}s clamped to {clamped}s");
    }
    clamped
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
            max_delay_time: Self::DEFAULT_MAX_DELAY_TIME,
            noise_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ContextOptions::default();
        assert_eq!(options.sample_rate, 44100);
        assert_eq!(options.max_delay_time, 1.0);
        assert_eq!(options.noise_seed, None);
    }

    #[test]
    fn test_builder() {
        let options = ContextOptions::new(0)
            .with_max_delay_time(-3.0)
            .with_noise_seed(42);
        assert_eq!(options.sample_rate, 1);
        assert_eq!(options.max_delay_time, 0.0);
        assert_eq!(options.noise_seed, Some(42));
    }

    #[test]
    fn test_max_delay_time_is_capped() {
        let options = ContextOptions::new(1000).with_max_delay_time(f64::INFINITY);
        assert_eq!(options.max_delay_time, ContextOptions::MAX_DELAY_TIME_LIMIT);
        let options = ContextOptions::new(1000).with_max_delay_time(f64::NAN);
        assert_eq!(options.max_delay_time, 0.0);
    }

    #[test]
    fn test_sanitized_fixes_struct_literals() {
        let options = ContextOptions {
            sample_rate: 0,
            max_delay_time: 1e300,
            noise_seed: None,
        }
        .sanitized();
        assert_eq!(options.sample_rate, 1);
        assert_eq!(options.max_delay_time, ContextOptions::MAX_DELAY_TIME_LIMIT);
    }
}
