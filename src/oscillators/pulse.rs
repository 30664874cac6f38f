//! Pulse oscillator built from two sawtooth generators.
//!
//! A sawtooth minus a copy of itself delayed by `(1 - width) / frequency`
//! seconds is a rectangular wave that is high for `width` of each period,
//! with no DC offset. The second sawtooth is
//! inverted and delayed inside the graph and summed into the first one's
//! output gain, so amplitude, panning and the math chain treat the pair as a
//! single source.

use super::oscillator::{spawn_generator, tune};
use super::{Oscillator, Waveform};
use crate::context::{
    AudioContext, DelayLine, Graph, MathOp, NodeId, NodeKind, Output, ParamRef, ParamSlot, Sink,
    SoundId,
};
use crate::schedule::{self, Control, RampShape};
use crate::sound::Sound;
use crate::Result;
use std::ops::{Deref, DerefMut};

/// The inverted, delayed half of a pulse oscillator.
pub(crate) struct Companion {
    generator: Option<NodeId>,
    inverter: NodeId,
    delay: NodeId,
    width: f64,
}

impl Companion {
    /// Builds `inverter -> delay -> target`. The generator arrives on the first restart.
    pub(crate) fn new(graph: &mut Graph, owner: SoundId, target: NodeId, width: f64, frequency: f64) -> Result<Self> {
        let line = DelayLine::new(graph.options().max_delay_time, graph.sample_rate());
        let inverter = graph.add_node(NodeKind::Math(MathOp::Multiply(-1.0)), Some(owner));
        let delay = graph.add_node(NodeKind::Delay(line), Some(owner));
        graph.link(inverter, Sink::Node(delay));
        graph.link(delay, Sink::Node(target));

        let mut companion = Self {
            generator: None,
            inverter,
            delay,
            width: clamp_width(width),
        };
        companion.retime(graph, frequency, 0.0, 0.0)?;
        Ok(companion)
    }

    pub(crate) fn width(&self) -> f64 {
        self.width
    }

    pub(crate) fn restart(
        &mut self,
        graph: &mut Graph,
        owner: SoundId,
        frequency: f64,
        when: f64,
        mods: &[Output],
    ) -> Result<()> {
        let now = graph.now();
        let generator = spawn_generator(graph, owner, Waveform::Sawtooth, frequency, self.inverter, mods);
        tune(graph, generator, now, frequency)?;
        graph.start_source(generator, when);
        self.generator = Some(generator);
        self.retime(graph, frequency, 0.0, 0.0)
    }

    pub(crate) fn stop(&self, graph: &mut Graph, when: f64) {
        if let Some(generator) = self.generator {
            graph.stop_source(generator, when);
        }
    }

    /// Mirrors a frequency control applied to the main generator.
    pub(crate) fn follow(&mut self, graph: &mut Graph, control: Control, frequency: f64) -> Result<()> {
        let generator = self.generator.filter(|&id| graph.contains(id));
        match control {
            Control::Set {
                ramp_time, delay, ..
            } => {
                if let Some(id) = generator {
                    let handle = ParamRef::new(id, ParamSlot::Frequency);
                    schedule::apply(graph, handle, control, RampShape::Frequency)?;
                }
                self.retime(graph, frequency, ramp_time, delay)
            }
            Control::Modulate(output) => {
                if let Some(id) = generator {
                    graph.link(output.node(), Sink::Param(ParamRef::new(id, ParamSlot::Frequency)));
                }
                Ok(())
            }
            Control::Query => Ok(()),
        }
    }

    pub(crate) fn set_width(&mut self, graph: &mut Graph, width: f64, frequency: f64) -> Result<()> {
        self.width = clamp_width(width);
        self.retime(graph, frequency, 0.0, 0.0)
    }

    /// Ramps the delay to `1 - width` periods of `frequency`.
    fn retime(&self, graph: &mut Graph, frequency: f64, ramp_time: f64, delay: f64) -> Result<()> {
        let max_delay = graph.options().max_delay_time;
        let seconds = match frequency.abs() {
            f if f > 0.0 => ((1.0 - self.width) / f).min(max_delay),
            _ => 0.0,
        };
        let now = graph.now();
        let param = graph.param_mut(ParamRef::new(self.delay, ParamSlot::DelayTime))?;
        schedule::schedule_ramp(param, now, seconds, ramp_time, delay, RampShape::Linear)
    }
}

fn clamp_width(width: f64) -> f64 {
    if width.is_nan() { 0.5 } else { width.clamp(0.0, 1.0) }
}

/// Rectangular wave with an adjustable duty cycle.
///
/// Dereferences to [`Oscillator`], so every oscillator control is available
/// and drives both generators. At unit gain the output sits at
/// `2 * (1 - width)` for the high part of the period and at `-2 * width` for
/// the rest, so a width of 0.5 gives a square wave in `[-1, 1]`.
///
/// The waveform is fixed: [`set_type`](Oscillator::set_type) is ignored on a
/// pulse.
///
/// The delay line is capped by
/// [`ContextOptions::max_delay_time`](crate::ContextOptions::max_delay_time),
/// which limits how low a narrow pulse can go.
///
/// ```
/// use tonewheel::{AudioContext, Pulse};
///
/// let ctx = AudioContext::new(44100);
/// let mut pulse = Pulse::new(&ctx, 110.0, 0.25);
/// pulse.start()?;
/// pulse.amp(0.3)?;
/// pulse.width(0.1)?;
/// assert_eq!(pulse.pulse_width(), 0.1);
/// # Ok::<(), tonewheel::Error>(())
/// ```
pub struct Pulse {
    osc: Oscillator,
}

impl Pulse {
    pub const DEFAULT_WIDTH: f64 = 0.5;

    pub fn new(ctx: &AudioContext, frequency: f64, width: f64) -> Self {
        let mut osc = Oscillator::new(ctx, Waveform::Sawtooth, frequency);
        osc.attach_companion(width);
        Self { osc }
    }

    /// Sets the duty cycle, clamped to `[0, 1]`.
    pub fn width(&mut self, width: f64) -> Result<&mut Self> {
        self.osc.set_companion_width(width)?;
        Ok(self)
    }

    pub fn pulse_width(&self) -> f64 {
        self.osc.companion_width().unwrap_or(Self::DEFAULT_WIDTH)
    }
}

impl Deref for Pulse {
    type Target = Oscillator;

    fn deref(&self) -> &Oscillator {
        &self.osc
    }
}

impl DerefMut for Pulse {
    fn deref_mut(&mut self) -> &mut Oscillator {
        &mut self.osc
    }
}

impl Sound for Pulse {
    fn output(&self) -> Output {
        self.osc.output()
    }

    fn amp_param(&self) -> ParamRef {
        self.osc.amp_param()
    }
}

impl std::fmt::Debug for Pulse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pulse")
            .field("width", &self.pulse_width())
            .field("osc", &self.osc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn delay_time(pulse: &Pulse) -> f64 {
        let graph = pulse.context().graph();
        let delay = pulse.osc.companion.as_ref().map(|c| c.delay).unwrap();
        graph
            .param(ParamRef::new(delay, ParamSlot::DelayTime))
            .map(|p| p.value_at(graph.now()))
            .unwrap()
    }

    #[test]
    fn test_width_sets_delay() {
        let ctx = AudioContext::new(1000);
        let mut pulse = Pulse::new(&ctx, 100.0, 0.5);
        assert!((delay_time(&pulse) - 0.005).abs() < EPSILON);

        pulse.width(0.25).unwrap();
        assert!((delay_time(&pulse) - 0.0075).abs() < EPSILON);

        pulse.width(7.0).unwrap();
        assert_eq!(pulse.pulse_width(), 1.0);
    }

    #[test]
    fn test_set_type_keeps_sawtooth() {
        let ctx = AudioContext::new(1000);
        let mut pulse = Pulse::new(&ctx, 100.0, 0.5);
        pulse.set_type(Waveform::Sine).unwrap();
        assert_eq!(pulse.waveform(), Waveform::Sawtooth);

        pulse.start().unwrap();
        let generator = pulse.osc.generator().unwrap();
        let graph = ctx.graph();
        assert!(matches!(
            &graph.node(generator).unwrap().kind,
            NodeKind::Generator(g) if g.waveform == Waveform::Sawtooth
        ));
    }

    #[test]
    fn test_freq_retimes_delay() {
        let ctx = AudioContext::new(1000);
        let mut pulse = Pulse::new(&ctx, 100.0, 0.5);
        pulse.freq(50.0).unwrap();
        assert!((delay_time(&pulse) - 0.01).abs() < EPSILON);
    }

    #[test]
    fn test_start_and_stop_drive_both_generators() {
        let ctx = AudioContext::new(1000);
        let mut pulse = Pulse::new(&ctx, 100.0, 0.5);
        pulse.start().unwrap();
        let id = pulse.sound_id();
        assert_eq!(ctx.graph().live_sources(id), 2);

        pulse.start().unwrap();
        assert_eq!(ctx.graph().live_sources(id), 2);

        pulse.stop().unwrap();
        assert_eq!(ctx.graph().live_sources(id), 0);
    }

    #[test]
    fn test_output_is_rectangular() {
        let ctx = AudioContext::new(1000);
        let mut pulse = Pulse::new(&ctx, 10.0, 0.5);
        pulse.amp(1.0).unwrap();
        pulse.pan(-1.0).unwrap();
        pulse.start().unwrap();

        // Skip the first period while the delay line fills.
        let frames = ctx.render_frames(300);
        let settled: Vec<f64> = frames[100..].iter().map(|[left, _]| *left).collect();
        let high = settled.iter().filter(|&&s| s > 0.5).count();
        let low = settled.iter().filter(|&&s| s < -0.5).count();
        assert_eq!(high + low, settled.len());
        assert!(high > 90 && low > 90);
    }

    #[test]
    fn test_dispose_removes_companion_nodes() {
        let ctx = AudioContext::new(1000);
        let mut pulse = Pulse::new(&ctx, 100.0, 0.5);
        pulse.start().unwrap();
        let delay = pulse.osc.companion.as_ref().map(|c| c.delay).unwrap();
        pulse.dispose();
        assert!(!ctx.graph().contains(delay));
        pulse.dispose();
    }
}
