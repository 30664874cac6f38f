//! Node kinds that live in the audio graph.
//!
//! Each node consumes the sum of its inputs and produces one mono sample per
//! frame. Only the destination bus is stereo: it reads the pan position of
//! any panner feeding it.

use super::param::AudioParam;
use super::{ContextOptions, NodeId, ParamSlot, SoundId};
use crate::oscillators::Waveform;
use crate::signals::Signal;
use std::sync::Arc;

/// Start/stop times of a one-shot source.
///
/// A source produces sound from `start` (inclusive) to `stop` (exclusive).
/// Once stopped it can never be started again; owners create a fresh node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Schedule {
    pub(crate) start: Option<f64>,
    pub(crate) stop: Option<f64>,
}

impl Schedule {
    pub(crate) fn is_playing(&self, time: f64) -> bool {
        match self.start {
            Some(start) => time >= start && self.stop.is_none_or(|stop| time < stop),
            None => false,
        }
    }

    pub(crate) fn has_finished(&self, time: f64) -> bool {
        self.stop.is_some_and(|stop| time >= stop)
    }
}

/// Periodic waveform generator driven by a frequency parameter.
pub(crate) struct Generator {
    pub(crate) waveform: Waveform,
    pub(crate) frequency: AudioParam,
    pub(crate) schedule: Schedule,
    phase: f64,
}

impl Generator {
    /// Web Audio oscillators rest at 440 Hz until told otherwise.
    pub(crate) const DEFAULT_FREQUENCY: f64 = 440.0;

    pub(crate) fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            frequency: AudioParam::new(Self::DEFAULT_FREQUENCY),
            schedule: Schedule::default(),
            phase: 0.0,
        }
    }

    fn next_sample(&mut self, time: f64, frequency: f64, sample_rate: f64) -> f64 {
        if !self.schedule.is_playing(time) {
            return 0.0;
        }
        let sample = self.waveform.sample(self.phase);
        // rem_euclid keeps the phase in [0, 1) for negative frequencies too.
        self.phase = (self.phase + frequency / sample_rate).rem_euclid(1.0);
        sample
    }
}

/// Looping playback of a shared, read-only buffer.
pub(crate) struct Player {
    buffer: Arc<[f64]>,
    position: usize,
    pub(crate) schedule: Schedule,
}

impl Player {
    pub(crate) fn looping(buffer: Arc<[f64]>) -> Self {
        Self {
            buffer,
            position: 0,
            schedule: Schedule::default(),
        }
    }

    fn next_sample(&mut self, time: f64) -> f64 {
        if !self.schedule.is_playing(time) || self.buffer.is_empty() {
            return 0.0;
        }
        let sample = self.buffer[self.position];
        self.position = (self.position + 1) % self.buffer.len();
        sample
    }
}

/// Fixed-capacity delay line with a schedulable delay time in seconds.
pub(crate) struct DelayLine {
    pub(crate) delay_time: AudioParam,
    buffer: Vec<f64>,
    write_pos: usize,
}

impl DelayLine {
    pub(crate) fn new(max_delay_time: f64, sample_rate: f64) -> Self {
        let seconds = if max_delay_time.is_nan() { 0.0 } else { max_delay_time };
        let seconds = seconds.clamp(0.0, ContextOptions::MAX_DELAY_TIME_LIMIT);
        let buffer_size = ((seconds * sample_rate).ceil() as usize).saturating_add(1);
        Self {
            delay_time: AudioParam::new(0.0),
            buffer: vec![0.0; buffer_size],
            write_pos: 0,
        }
    }

    fn process(&mut self, input: f64, delay_time: f64, sample_rate: f64) -> f64 {
        let len = self.buffer.len();
        let delay_samples = (delay_time.max(0.0) * sample_rate).round() as usize;
        let delay_samples = delay_samples.min(len - 1);

        // Write first so a zero delay passes the input straight through.
        self.buffer[self.write_pos] = input;
        let read_pos = (self.write_pos + len - delay_samples) % len;
        let delayed = self.buffer[read_pos];

        self.write_pos = (self.write_pos + 1) % len;
        delayed
    }
}

/// Signal-math primitives used by the modulation chain.
///
/// Each stage is built with fixed parameters; changing them means building a
/// new stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MathOp {
    /// Adds a constant (DC offset).
    Add(f64),
    /// Multiplies by a constant.
    Multiply(f64),
    /// Linearly maps `[in_min, in_max]` onto `[out_min, out_max]`.
    Scale {
        in_min: f64,
        in_max: f64,
        out_min: f64,
        out_max: f64,
    },
}

impl MathOp {
    /// Applies the operation to one sample.
    ///
    /// ```
    /// use tonewheel::MathOp;
    ///
    /// let scale = MathOp::Scale { in_min: -1.0, in_max: 1.0, out_min: 100.0, out_max: 300.0 };
    /// assert_eq!(scale.apply(0.0), 200.0);
    /// assert_eq!(MathOp::Add(5.0).apply(1.0), 6.0);
    /// ```
    pub fn apply(self, input: f64) -> f64 {
        match self {
            MathOp::Add(value) => input + value,
            MathOp::Multiply(value) => input * value,
            MathOp::Scale {
                in_min,
                in_max,
                out_min,
                out_max,
            } => {
                let span = in_max - in_min;
                if span == 0.0 {
                    return out_min;
                }
                out_min + (input - in_min) / span * (out_max - out_min)
            }
        }
    }
}

pub(crate) enum NodeKind {
    /// The master bus.
    Destination,
    Gain(AudioParam),
    Delay(DelayLine),
    /// Mono pass-through; the destination applies the pan law.
    Panner { pan: f64 },
    Math(MathOp),
    Generator(Generator),
    Player(Player),
    Signal(Box<dyn Signal + Send>),
}

impl NodeKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            NodeKind::Destination => "destination",
            NodeKind::Gain(_) => "gain",
            NodeKind::Delay(_) => "delay",
            NodeKind::Panner { .. } => "panner",
            NodeKind::Math(_) => "math",
            NodeKind::Generator(_) => "generator",
            NodeKind::Player(_) => "player",
            NodeKind::Signal(_) => "signal",
        }
    }
}

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) owner: Option<SoundId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, owner: Option<SoundId>) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            owner,
        }
    }

    /// The node's schedulable parameter, if it has one. No node has more than one.
    pub(crate) fn param(&self) -> Option<(ParamSlot, &AudioParam)> {
        match &self.kind {
            NodeKind::Gain(gain) => Some((ParamSlot::Gain, gain)),
            NodeKind::Delay(delay) => Some((ParamSlot::DelayTime, &delay.delay_time)),
            NodeKind::Generator(generator) => Some((ParamSlot::Frequency, &generator.frequency)),
            _ => None,
        }
    }

    pub(crate) fn param_mut(&mut self) -> Option<(ParamSlot, &mut AudioParam)> {
        match &mut self.kind {
            NodeKind::Gain(gain) => Some((ParamSlot::Gain, gain)),
            NodeKind::Delay(delay) => Some((ParamSlot::DelayTime, &mut delay.delay_time)),
            NodeKind::Generator(generator) => {
                Some((ParamSlot::Frequency, &mut generator.frequency))
            }
            _ => None,
        }
    }

    pub(crate) fn schedule_mut(&mut self) -> Option<&mut Schedule> {
        match &mut self.kind {
            NodeKind::Generator(generator) => Some(&mut generator.schedule),
            NodeKind::Player(player) => Some(&mut player.schedule),
            _ => None,
        }
    }

    pub(crate) fn schedule(&self) -> Option<&Schedule> {
        match &self.kind {
            NodeKind::Generator(generator) => Some(&generator.schedule),
            NodeKind::Player(player) => Some(&player.schedule),
            _ => None,
        }
    }

    /// Renders one frame given the summed input and the summed parameter modulation.
    pub(crate) fn process(&mut self, input: f64, modulation: f64, time: f64, sample_rate: f64) -> f64 {
        match &mut self.kind {
            NodeKind::Destination | NodeKind::Panner { .. } => input,
            NodeKind::Gain(gain) => input * (gain.value_at(time) + modulation),
            NodeKind::Delay(delay) => {
                let delay_time = delay.delay_time.value_at(time) + modulation;
                delay.process(input, delay_time, sample_rate)
            }
            NodeKind::Math(op) => op.apply(input),
            NodeKind::Generator(generator) => {
                let frequency = generator.frequency.value_at(time) + modulation;
                generator.next_sample(time, frequency, sample_rate)
            }
            NodeKind::Player(player) => player.next_sample(time),
            NodeKind::Signal(signal) => signal.next_sample(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_window() {
        let schedule = Schedule {
            start: Some(1.0),
            stop: Some(2.0),
        };
        assert!(!schedule.is_playing(0.5));
        assert!(schedule.is_playing(1.0));
        assert!(schedule.is_playing(1.5));
        assert!(!schedule.is_playing(2.0));
        assert!(schedule.has_finished(2.0));
        assert!(!schedule.has_finished(1.9));
    }

    #[test]
    fn test_unstarted_schedule_is_silent() {
        let schedule = Schedule::default();
        assert!(!schedule.is_playing(0.0));
        assert!(!schedule.has_finished(100.0));
    }

    #[test]
    fn test_generator_is_silent_before_start() {
        let mut generator = Generator::new(Waveform::Square);
        assert_eq!(generator.next_sample(0.0, 440.0, 44100.0), 0.0);
        generator.schedule.start = Some(0.0);
        assert_eq!(generator.next_sample(0.0, 440.0, 44100.0), 1.0);
    }

    #[test]
    fn test_generator_negative_frequency_keeps_phase_in_range() {
        let mut generator = Generator::new(Waveform::Sawtooth);
        generator.schedule.start = Some(0.0);
        for i in 0..1000 {
            let sample = generator.next_sample(i as f64 / 44100.0, -440.0, 44100.0);
            assert!((-1.0..=1.0).contains(&sample));
        }
    }

    #[test]
    fn test_player_loops_buffer() {
        let buffer: Arc<[f64]> = Arc::from(vec![0.1, 0.2, 0.3]);
        let mut player = Player::looping(buffer);
        player.schedule.start = Some(0.0);
        let samples: Vec<f64> = (0..5).map(|_| player.next_sample(0.0)).collect();
        assert_eq!(samples, vec![0.1, 0.2, 0.3, 0.1, 0.2]);
    }

    #[test]
    fn test_delay_line_zero_delay_passes_through() {
        let mut delay = DelayLine::new(1.0, 100.0);
        assert_eq!(delay.process(0.5, 0.0, 100.0), 0.5);
        assert_eq!(delay.process(-0.25, 0.0, 100.0), -0.25);
    }

    #[test]
    fn test_delay_line_delays_by_whole_samples() {
        let mut delay = DelayLine::new(1.0, 100.0);
        let out: Vec<f64> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|&x| delay.process(x, 0.02, 100.0))
            .collect();
        assert_eq!(out, vec![0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_delay_line_capacity_is_bounded() {
        let delay = DelayLine::new(f64::INFINITY, 10.0);
        assert_eq!(delay.buffer.len(), 1801);
        let delay = DelayLine::new(f64::NAN, 10.0);
        assert_eq!(delay.buffer.len(), 1);
    }

    #[test]
    fn test_delay_line_clamps_to_capacity() {
        let mut delay = DelayLine::new(0.01, 100.0);
        // Capacity is two samples, so a 1s request acts like a 1-sample delay.
        let out: Vec<f64> = [1.0, 2.0, 3.0]
            .iter()
            .map(|&x| delay.process(x, 1.0, 100.0))
            .collect();
        assert_eq!(out, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_math_ops() {
        assert_eq!(MathOp::Add(5.0).apply(1.0), 6.0);
        assert_eq!(MathOp::Multiply(2.0).apply(-3.0), -6.0);
        let scale = MathOp::Scale {
            in_min: 0.0,
            in_max: 1.0,
            out_min: 10.0,
            out_max: 20.0,
        };
        assert_eq!(scale.apply(0.5), 15.0);
        let degenerate = MathOp::Scale {
            in_min: 1.0,
            in_max: 1.0,
            out_min: 3.0,
            out_max: 4.0,
        };
        assert_eq!(degenerate.apply(7.0), 3.0);
    }
}
