//! The oscillator core: a restartable periodic source with scheduled controls.

use super::chain::{MathChain, StageKind};
use super::pulse::Companion;
use super::Waveform;
use crate::context::{
    AudioContext, AudioParam, DelayLine, Generator, Graph, MathOp, NodeId, NodeKind, Output,
    ParamRef, ParamSlot, Sink, SoundId,
};
use crate::schedule::{self, seconds, Control, RampShape};
use crate::sound::Sound;
use crate::{Error, Result};

/// A periodic sound source whose controls can change while it plays.
///
/// The signal path is
/// `generator -> output gain -> [phase] -> [add] -> [mult] -> [scale] -> panner -> destination`,
/// with the input gain summed into the output gain alongside the generator.
/// Generators are one-shot: each [`start`](Self::start) builds a fresh one and
/// re-applies the oscillator's waveform, frequency and frequency modulators.
///
/// The output gain starts at 0, so nothing is heard until [`amp`](Self::amp)
/// is called.
///
/// # Examples
///
/// ```
/// use tonewheel::{AudioContext, Control, Oscillator, Waveform};
///
/// let ctx = AudioContext::new(44100);
/// let mut osc = Oscillator::new(&ctx, Waveform::Triangle, 220.0);
/// osc.start()?;
/// osc.amp(Control::ramp(0.5, 0.1, 0.0))?;
/// osc.freq(Control::ramp(440.0, 1.0, 0.5))?;
/// osc.pan(-0.5)?;
///
/// let frames = ctx.render_frames(4410);
/// assert!(frames.iter().any(|[left, _]| *left != 0.0));
/// # Ok::<(), tonewheel::Error>(())
/// ```
pub struct Oscillator {
    ctx: AudioContext,
    id: SoundId,
    waveform: Waveform,
    frequency: f64,
    started: bool,
    disposed: bool,
    generator: Option<NodeId>,
    input: NodeId,
    output: NodeId,
    panner: NodeId,
    pan: f64,
    chain: MathChain,
    freq_mods: Vec<Output>,
    destination: Option<Sink>,
    pub(super) companion: Option<Companion>,
}

impl Oscillator {
    /// Creates a stopped oscillator connected to the master bus.
    pub fn new(ctx: &AudioContext, waveform: Waveform, frequency: f64) -> Self {
        let ctx = ctx.clone();
        let frequency = if frequency.is_nan() {
            log::warn!("NaN frequency replaced by {}", Generator::DEFAULT_FREQUENCY);
            Generator::DEFAULT_FREQUENCY
        } else {
            frequency
        };

        let (id, input, output, panner, generator, master) = {
            let mut graph = ctx.graph();
            let id = graph.register_sound();
            let output = graph.add_node(NodeKind::Gain(AudioParam::new(0.0)), Some(id));
            let input = graph.add_node(NodeKind::Gain(AudioParam::new(1.0)), Some(id));
            let panner = graph.add_node(NodeKind::Panner { pan: 0.0 }, Some(id));
            let master = Sink::Node(graph.destination());

            graph.link(input, Sink::Node(output));
            graph.link(output, Sink::Node(panner));
            graph.link(panner, master);
            let generator = spawn_generator(&mut graph, id, waveform, frequency, output, &[]);
            (id, input, output, panner, generator, master)
        };
        log::debug!("created {waveform} oscillator at {frequency} Hz");

        Self {
            ctx,
            id,
            waveform,
            frequency,
            started: false,
            disposed: false,
            generator: Some(generator),
            input,
            output,
            panner,
            pan: 0.0,
            chain: MathChain::new(output, panner),
            freq_mods: Vec::new(),
            destination: Some(master),
            companion: None,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// The base frequency last set through [`freq`](Self::freq) or the constructor.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn pan_position(&self) -> f64 {
        self.pan
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stage kinds currently spliced between the output gain and the panner.
    pub fn stages(&self) -> Vec<StageKind> {
        self.chain.kinds()
    }

    /// Frequency signals remembered for re-attachment on every start.
    pub fn freq_mods(&self) -> &[Output] {
        &self.freq_mods
    }

    /// A sink summed into the output gain next to the generator.
    pub fn input(&self) -> Sink {
        Sink::Node(self.input)
    }

    pub fn context(&self) -> &AudioContext {
        &self.ctx
    }

    /// Starts playing now.
    pub fn start(&mut self) -> Result<()> {
        self.start_in(0.0, None)
    }

    /// Starts playing `delay` seconds from now, optionally at another frequency.
    ///
    /// A running oscillator is stopped first, so calling this twice leaves
    /// exactly one generator playing. The frequency override applies to this
    /// run only; [`frequency`](Self::frequency) keeps the base value.
    pub fn start_in(&mut self, delay: f64, frequency: impl Into<Option<f64>>) -> Result<()> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        let now = graph.now();
        if self.started {
            self.stop_at(&mut graph, now);
        }

        let frequency = frequency
            .into()
            .filter(|f| !f.is_nan())
            .unwrap_or(self.frequency);
        let when = now + seconds(delay);

        // A generator built by freq() before the first start can be used as is.
        let generator = match self.generator {
            Some(id) if graph.contains(id) && !graph.has_started(id) => {
                graph.set_waveform(id, self.waveform);
                id
            }
            _ => spawn_generator(
                &mut graph,
                self.id,
                self.waveform,
                frequency,
                self.output,
                &self.freq_mods,
            ),
        };
        tune(&mut graph, generator, now, frequency)?;
        graph.start_source(generator, when);
        self.generator = Some(generator);

        if let Some(companion) = &mut self.companion {
            companion.restart(&mut graph, self.id, frequency, when, &self.freq_mods)?;
        }

        self.started = true;
        log::debug!(
            "{} oscillator started at {when:.4}s, {} Hz, {} modulator(s)",
            self.waveform,
            frequency.abs(),
            self.freq_mods.len()
        );
        Ok(())
    }

    /// Stops playing now. Does nothing if already stopped.
    pub fn stop(&mut self) -> Result<()> {
        self.stop_in(0.0)
    }

    /// Stops playing `delay` seconds from now.
    ///
    /// The oscillator counts as stopped immediately, even though the
    /// generator keeps sounding until the scheduled time.
    pub fn stop_in(&mut self, delay: f64) -> Result<()> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;
        if self.started {
            let when = graph.now() + seconds(delay);
            self.stop_at(&mut graph, when);
        }
        Ok(())
    }

    fn stop_at(&mut self, graph: &mut Graph, when: f64) {
        if let Some(generator) = self.generator {
            graph.stop_source(generator, when);
        }
        if let Some(companion) = &self.companion {
            companion.stop(graph, when);
        }
        self.started = false;
        log::debug!("{} oscillator stopping at {when:.4}s", self.waveform);
    }

    /// Schedules, modulates or queries the output gain.
    ///
    /// Gain changes ramp linearly. The returned handle can be handed to
    /// [`AudioContext::with_param`] for custom automation.
    pub fn amp(&mut self, control: impl Into<Control>) -> Result<ParamRef> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        let handle = self.amp_param();
        schedule::apply(&mut graph, handle, control.into(), RampShape::Linear)?;
        Ok(handle)
    }

    /// Schedules, modulates or queries the generator frequency.
    ///
    /// Positive targets ramp exponentially, zero and negative ones linearly.
    /// Modulators are remembered and re-attached to every new generator. The
    /// returned handle belongs to the current generator and goes stale once
    /// that generator is replaced by a restart.
    ///
    /// [`Control::Query`] never touches the graph: once a stopped generator
    /// has been collected it reports [`Error::NodeNotFound`]. Any other
    /// control builds a fresh unstarted generator in that case.
    pub fn freq(&mut self, control: impl Into<Control>) -> Result<ParamRef> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        let control = control.into();
        let generator = match control {
            Control::Query => self.generator.ok_or(Error::Disposed)?,
            _ => self.ensure_generator(&mut graph),
        };
        let handle = ParamRef::new(generator, ParamSlot::Frequency);
        schedule::apply(&mut graph, handle, control, RampShape::Frequency)?;

        match control {
            Control::Set { value, .. } if !value.is_nan() => self.frequency = value,
            Control::Modulate(output) if !self.freq_mods.contains(&output) => {
                self.freq_mods.push(output);
            }
            _ => {}
        }
        if let Some(companion) = &mut self.companion {
            companion.follow(&mut graph, control, self.frequency)?;
        }
        Ok(handle)
    }

    /// Changes the waveform, including on the generator that is playing.
    ///
    /// Pulse oscillators are built from sawtooths and ignore this.
    pub fn set_type(&mut self, waveform: Waveform) -> Result<&mut Self> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        if self.companion.is_some() {
            log::warn!("pulse oscillator stays sawtooth-based, ignoring {waveform}");
            return Ok(self);
        }
        self.waveform = waveform;
        if let Some(generator) = self.generator {
            graph.set_waveform(generator, waveform);
        }
        Ok(self)
    }

    /// Sets the stereo position, from -1 (left) to 1 (right). Applies immediately.
    ///
    /// The pan law is applied by the master bus, so it only takes effect
    /// while the output is connected there. Routed into another sound's
    /// [`input`](Self::input) the signal arrives unpanned.
    pub fn pan(&mut self, pan: f64) -> Result<&mut Self> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        if pan.is_nan() {
            log::warn!("ignoring NaN pan");
            return Ok(self);
        }
        self.pan = pan.clamp(-1.0, 1.0);
        graph.set_pan(self.panner, self.pan);
        Ok(self)
    }

    /// Offsets the waveform by a fraction `phase` of one period.
    ///
    /// The first call splices a delay stage in right after the output gain.
    /// The delay is computed from the frequency at call time and is not
    /// updated by later frequency changes.
    pub fn phase(&mut self, phase: f64) -> Result<&mut Self> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        let phase = if phase.is_nan() { 0.0 } else { phase.clamp(0.0, 1.0) };
        let max_delay = graph.options().max_delay_time;
        let delay = match self.chain.get(StageKind::Phase) {
            Some(node) => node,
            None => {
                let line = DelayLine::new(max_delay, graph.sample_rate());
                let node = graph.add_node(NodeKind::Delay(line), Some(self.id));
                self.chain.splice(&mut graph, StageKind::Phase, node);
                node
            }
        };

        let mut delay_time = match self.frequency.abs() {
            f if f > 0.0 => phase / f,
            _ => 0.0,
        };
        if delay_time > max_delay {
            log::warn!("phase delay {delay_time}s clamped to {max_delay}s");
            delay_time = max_delay;
        }

        let now = graph.now();
        let param = graph.param_mut(ParamRef::new(delay, ParamSlot::DelayTime))?;
        schedule::schedule_ramp(param, now, delay_time, 0.0, 0.0, RampShape::Linear)?;
        Ok(self)
    }

    /// Adds a constant to the output.
    pub fn add(&mut self, value: f64) -> Result<&mut Self> {
        self.splice(StageKind::Add, MathOp::Add(value))
    }

    /// Multiplies the output by a constant.
    pub fn mult(&mut self, value: f64) -> Result<&mut Self> {
        self.splice(StageKind::Multiply, MathOp::Multiply(value))
    }

    /// Linearly maps the output from `[in_min, in_max]` onto `[out_min, out_max]`.
    ///
    /// Handy for turning an oscillator into a control signal:
    ///
    /// ```
    /// use tonewheel::{AudioContext, SinOsc, Sound};
    ///
    /// let ctx = AudioContext::new(44100);
    /// let mut lfo = SinOsc::new(&ctx, 5.0);
    /// lfo.amp(1.0)?;
    /// lfo.scale(-1.0, 1.0, -20.0, 20.0)?.disconnect()?;
    ///
    /// let mut carrier = SinOsc::new(&ctx, 440.0);
    /// carrier.freq(lfo.output())?;
    /// # Ok::<(), tonewheel::Error>(())
    /// ```
    pub fn scale(&mut self, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> Result<&mut Self> {
        self.splice(
            StageKind::Scale,
            MathOp::Scale {
                in_min,
                in_max,
                out_min,
                out_max,
            },
        )
    }

    fn splice(&mut self, kind: StageKind, op: MathOp) -> Result<&mut Self> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        let node = graph.add_node(NodeKind::Math(op), Some(self.id));
        if self.chain.splice(&mut graph, kind, node).is_some() {
            log::trace!("replaced {kind:?} stage with {op:?}");
        }
        Ok(self)
    }

    /// Routes the output to `sink`, or to the master bus for `None`.
    ///
    /// Replaces the previous destination.
    pub fn connect(&mut self, sink: impl Into<Option<Sink>>) -> Result<&mut Self> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        let sink = sink
            .into()
            .unwrap_or_else(|| Sink::Node(graph.destination()));
        graph.connect(self.panner, sink)?;
        match self.destination.replace(sink) {
            Some(previous) if previous != sink => graph.unlink(self.panner, previous),
            _ => {}
        }
        Ok(self)
    }

    /// Detaches the output from its destination.
    ///
    /// Modulation edges made through [`Sound::output`] are left alone.
    pub fn disconnect(&mut self) -> Result<&mut Self> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        if let Some(previous) = self.destination.take() {
            graph.unlink(self.panner, previous);
        }
        Ok(self)
    }

    /// Tears down every node this oscillator owns. Safe to call repeatedly.
    ///
    /// Every later operation returns [`Error::Disposed`].
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.started = false;

        let mut graph = self.ctx.graph();
        if graph.is_registered(self.id) {
            let removed = graph.release_sound(self.id);
            log::debug!("disposed {} oscillator, {removed} nodes removed", self.waveform);
        }
        drop(graph);

        self.generator = None;
        self.freq_mods.clear();
        self.destination = None;
        self.chain.clear();
        self.companion = None;
    }

    /// Adds the inverted, delayed sawtooth that turns this oscillator into a pulse.
    pub(super) fn attach_companion(&mut self, width: f64) {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        match Companion::new(&mut graph, self.id, self.output, width, self.frequency) {
            Ok(companion) => self.companion = Some(companion),
            Err(err) => log::warn!("pulse companion not attached: {err}"),
        }
    }

    pub(super) fn set_companion_width(&mut self, width: f64) -> Result<()> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;
        if let Some(companion) = &mut self.companion {
            companion.set_width(&mut graph, width, self.frequency)?;
        }
        Ok(())
    }

    pub(super) fn companion_width(&self) -> Option<f64> {
        self.companion.as_ref().map(Companion::width)
    }

    /// Fails once the oscillator, or its whole context, has been disposed.
    fn check(&self, graph: &Graph) -> Result<()> {
        if self.disposed || !graph.is_registered(self.id) {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    /// The current generator, or a fresh unstarted one if it has been collected.
    fn ensure_generator(&mut self, graph: &mut Graph) -> NodeId {
        match self.generator {
            Some(id) if graph.contains(id) => id,
            _ => {
                let id = spawn_generator(
                    graph,
                    self.id,
                    self.waveform,
                    self.frequency,
                    self.output,
                    &self.freq_mods,
                );
                self.generator = Some(id);
                id
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn generator(&self) -> Option<NodeId> {
        self.generator
    }

    #[cfg(test)]
    pub(crate) fn sound_id(&self) -> SoundId {
        self.id
    }
}

impl Sound for Oscillator {
    fn output(&self) -> Output {
        Output(self.panner)
    }

    fn amp_param(&self) -> ParamRef {
        ParamRef::new(self.output, ParamSlot::Gain)
    }
}

impl Drop for Oscillator {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Oscillator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oscillator")
            .field("waveform", &self.waveform)
            .field("frequency", &self.frequency)
            .field("started", &self.started)
            .field("disposed", &self.disposed)
            .field("pan", &self.pan)
            .field("stages", &self.chain.kinds())
            .finish_non_exhaustive()
    }
}

/// Adds an unstarted generator feeding `target`, with `mods` already attached.
pub(super) fn spawn_generator(
    graph: &mut Graph,
    owner: SoundId,
    waveform: Waveform,
    frequency: f64,
    target: NodeId,
    mods: &[Output],
) -> NodeId {
    let mut generator = Generator::new(waveform);
    generator.frequency = AudioParam::new(frequency.abs());
    let id = graph.add_node(NodeKind::Generator(generator), Some(owner));
    graph.link(id, Sink::Node(target));

    let frequency = Sink::Param(ParamRef::new(id, ParamSlot::Frequency));
    for output in mods {
        if !graph.link(output.node(), frequency) {
            log::trace!("frequency modulator {} is gone, not re-attached", output.node());
        }
    }
    id
}

/// Jumps a generator's frequency to `|frequency|` at `now`.
///
/// Exponential ramps cannot land on zero, so 0 Hz is set directly.
pub(super) fn tune(graph: &mut Graph, generator: NodeId, now: f64, frequency: f64) -> Result<()> {
    let target = frequency.abs();
    let param = graph.param_mut(ParamRef::new(generator, ParamSlot::Frequency))?;
    param.cancel_and_hold_at_time(now);
    if target > 0.0 {
        param.exponential_ramp_to_value_at_time(target, now)?;
    } else {
        param.set_value_at_time(target, now);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Control;
    use crate::signals::ConstantSignal;

    const EPSILON: f64 = 1e-9;

    fn ctx() -> AudioContext {
        AudioContext::new(1000)
    }

    fn live(osc: &Oscillator) -> usize {
        osc.context().graph().live_sources(osc.sound_id())
    }

    #[test]
    fn test_new_oscillator_is_stopped_and_silent() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Square, 100.0);
        assert!(!osc.is_started());
        osc.amp(1.0).unwrap();
        assert!(ctx.render_frames(10).iter().all(|frame| *frame == [0.0, 0.0]));
    }

    #[test]
    fn test_start_then_stop() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.start().unwrap();
        assert!(osc.is_started());
        assert_eq!(live(&osc), 1);

        ctx.advance(0.1);
        osc.stop().unwrap();
        assert!(!osc.is_started());
        assert_eq!(live(&osc), 0);

        let generator = osc.generator().unwrap();
        ctx.render_frames(1);
        assert!(!ctx.graph().contains(generator));
    }

    #[test]
    fn test_stop_when_stopped_is_a_noop() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.stop().unwrap();
        osc.stop_in(5.0).unwrap();
        assert!(!osc.is_started());
    }

    #[test]
    fn test_double_start_keeps_one_live_generator() {
        let ctx = ctx();
        let lfo = ctx.signal(ConstantSignal(3.0));
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.freq(lfo).unwrap();

        osc.start().unwrap();
        let first = osc.generator().unwrap();
        osc.start().unwrap();
        let second = osc.generator().unwrap();

        assert_ne!(first, second);
        assert_eq!(live(&osc), 1);
        let handle = ParamRef::new(second, ParamSlot::Frequency);
        let modulators = ctx.with_param(handle, |p| p.modulator_count()).unwrap();
        assert_eq!(modulators, 1);
    }

    #[test]
    fn test_freq_before_start_reaches_target() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.freq(440.0).unwrap();
        osc.start().unwrap();
        let handle = osc.freq(Control::Query).unwrap();
        assert_eq!(ctx.param_value(handle).unwrap(), 440.0);
        let exponential = ctx
            .with_param(handle, |p| {
                p.events()
                    .iter()
                    .any(|e| matches!(e, crate::AutomationEvent::ExponentialRamp { .. }))
            })
            .unwrap();
        assert!(exponential);
    }

    #[test]
    fn test_start_override_uses_absolute_frequency() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.start_in(0.0, -250.0).unwrap();
        let handle = osc.freq(Control::Query).unwrap();
        assert_eq!(ctx.param_value(handle).unwrap(), 250.0);
        assert_eq!(osc.frequency(), 100.0);
    }

    #[test]
    fn test_zero_frequency_start_is_set_directly() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 0.0);
        osc.start().unwrap();
        let handle = osc.freq(Control::Query).unwrap();
        assert_eq!(ctx.param_value(handle).unwrap(), 0.0);
    }

    #[test]
    fn test_amp_ramp_with_delay() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.amp(0.2).unwrap();
        let handle = osc.amp(Control::ramp(0.8, 2.0, 1.0)).unwrap();
        ctx.with_param(handle, |p| {
            assert!((p.value_at(0.5) - 0.2).abs() < EPSILON);
            assert!((p.value_at(1.0) - 0.2).abs() < EPSILON);
            assert!((p.value_at(2.0) - 0.5).abs() < EPSILON);
            assert!((p.value_at(3.0) - 0.8).abs() < EPSILON);
        })
        .unwrap();
    }

    #[test]
    fn test_negative_frequency_ramp_is_linear() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        let handle = osc.freq(Control::ramp(-100.0, 2.0, 0.0)).unwrap();
        assert_eq!(osc.frequency(), -100.0);
        let midway = ctx.with_param(handle, |p| p.value_at(1.0)).unwrap();
        assert!(midway.abs() < EPSILON);
    }

    #[test]
    fn test_add_then_mult_leaves_one_stage_on_panner() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.add(5.0).unwrap().mult(2.0).unwrap();
        assert_eq!(osc.stages(), vec![StageKind::Add, StageKind::Multiply]);

        let graph = ctx.graph();
        let panner = osc.output().node();
        let feeding = &graph.node(panner).unwrap().inputs;
        assert_eq!(feeding.len(), 1);
        assert!(matches!(
            graph.node(feeding[0]).unwrap().kind,
            NodeKind::Math(MathOp::Multiply(_))
        ));
    }

    #[test]
    fn test_math_stages_shape_the_output() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Square, 1.0);
        osc.amp(1.0).unwrap();
        osc.add(1.0).unwrap().mult(0.5).unwrap();
        osc.start().unwrap();
        // Square is 1 at phase 0: (1 + 1) * 0.5 = 1, centered pan.
        let [left, right] = ctx.render_frames(1)[0];
        assert!((left - std::f64::consts::FRAC_1_SQRT_2).abs() < EPSILON);
        assert!((left - right).abs() < EPSILON);
    }

    #[test]
    fn test_repeated_add_replaces_stage() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.add(1.0).unwrap();
        osc.add(2.0).unwrap();
        osc.add(3.0).unwrap();
        assert_eq!(osc.stages(), vec![StageKind::Add]);
    }

    #[test]
    fn test_phase_creates_delay_once() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.add(1.0).unwrap();
        osc.phase(0.5).unwrap();
        osc.phase(0.25).unwrap();
        assert_eq!(osc.stages(), vec![StageKind::Phase, StageKind::Add]);

        let delay = osc.chain.get(StageKind::Phase).unwrap();
        let handle = ParamRef::new(delay, ParamSlot::DelayTime);
        assert!((ctx.param_value(handle).unwrap() - 0.0025).abs() < EPSILON);
    }

    #[test]
    fn test_phase_at_zero_frequency_is_zero_delay() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 0.0);
        osc.phase(0.5).unwrap();
        let delay = osc.chain.get(StageKind::Phase).unwrap();
        let handle = ParamRef::new(delay, ParamSlot::DelayTime);
        assert_eq!(ctx.param_value(handle).unwrap(), 0.0);
    }

    #[test]
    fn test_unbounded_max_delay_time_is_capped() {
        let options = crate::ContextOptions::new(100).with_max_delay_time(f64::INFINITY);
        let ctx = AudioContext::with_options(options);
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 0.001);
        osc.phase(0.5).unwrap();

        let delay = osc.chain.get(StageKind::Phase).unwrap();
        let handle = ParamRef::new(delay, ParamSlot::DelayTime);
        let limit = crate::ContextOptions::MAX_DELAY_TIME_LIMIT;
        assert_eq!(ctx.param_value(handle).unwrap(), limit);

        let literal = crate::ContextOptions {
            sample_rate: 100,
            max_delay_time: f64::INFINITY,
            noise_seed: None,
        };
        let ctx = AudioContext::with_options(literal);
        assert_eq!(ctx.options().max_delay_time, limit);
        let mut pulse = crate::Pulse::new(&ctx, 100.0, 0.25);
        pulse.start().unwrap();
        assert_eq!(ctx.render_frames(4).len(), 4);
    }

    #[test]
    fn test_query_after_collection_leaves_graph_alone() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.start().unwrap();
        osc.stop().unwrap();
        ctx.render_frames(1);
        let collected = osc.generator().unwrap();
        assert!(!ctx.graph().contains(collected));

        assert_eq!(
            osc.freq(Control::Query),
            Err(Error::NodeNotFound(collected))
        );
        assert_eq!(osc.generator(), Some(collected));

        let handle = osc.freq(220.0).unwrap();
        assert_ne!(handle.node(), collected);
        assert_eq!(ctx.param_value(handle).unwrap(), 220.0);
    }

    #[test]
    fn test_pan_is_clamped() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.pan(3.0).unwrap();
        assert_eq!(osc.pan_position(), 1.0);
        osc.pan(f64::NAN).unwrap();
        assert_eq!(osc.pan_position(), 1.0);
    }

    #[test]
    fn test_set_type_updates_live_generator() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.start().unwrap();
        osc.set_type(Waveform::Square).unwrap();
        let generator = osc.generator().unwrap();
        let graph = ctx.graph();
        assert!(matches!(
            &graph.node(generator).unwrap().kind,
            NodeKind::Generator(g) if g.waveform == Waveform::Square
        ));
    }

    #[test]
    fn test_disconnect_and_reconnect() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Square, 1.0);
        osc.amp(1.0).unwrap();
        osc.start().unwrap();
        osc.disconnect().unwrap();
        osc.disconnect().unwrap();
        assert_eq!(ctx.render_frames(1)[0], [0.0, 0.0]);

        osc.connect(None).unwrap();
        assert!(ctx.render_frames(1)[0][0] > 0.0);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        osc.start().unwrap();
        osc.dispose();
        osc.dispose();
        assert!(osc.is_disposed());
        assert_eq!(osc.start(), Err(Error::Disposed));
        assert_eq!(osc.amp(0.5).err(), Some(Error::Disposed));
        assert_eq!(ctx.live_sounds(), 0);
    }

    #[test]
    fn test_context_dispose_all_invalidates_handles() {
        let ctx = ctx();
        let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
        ctx.dispose_all();
        assert!(osc.pan(0.0).is_err());
        osc.dispose();
    }

    #[test]
    fn test_drop_releases_nodes() {
        let ctx = ctx();
        {
            let mut osc = Oscillator::new(&ctx, Waveform::Sine, 100.0);
            osc.start().unwrap();
            assert_eq!(ctx.live_sounds(), 1);
        }
        assert_eq!(ctx.live_sounds(), 0);
    }
}
