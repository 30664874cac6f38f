//! A noise sound source looping one of the context's shared noise buffers.

use super::NoiseColor;
use crate::context::{
    AudioContext, AudioParam, Graph, NodeId, NodeKind, Output, ParamRef, ParamSlot, Player, Sink,
    SoundId,
};
use crate::schedule::{self, Control, RampShape};
use crate::sound::Sound;
use crate::{Error, Result};
use std::sync::Arc;

/// Noise with the same amplitude, pan and routing controls as an oscillator.
///
/// The signal path is `player -> output gain -> panner -> destination`. As
/// with oscillators the player is one-shot: every start builds a new one
/// over the current color's buffer.
///
/// # Examples
///
/// ```
/// use tonewheel::{AudioContext, Noise, NoiseColor};
///
/// let ctx = AudioContext::new(44100);
/// let mut noise = Noise::new(&ctx, NoiseColor::Pink);
/// noise.start()?;
/// noise.amp(0.2)?;
/// noise.set_type(NoiseColor::Brown)?;
/// assert_eq!(noise.color(), NoiseColor::Brown);
/// # Ok::<(), tonewheel::Error>(())
/// ```
pub struct Noise {
    ctx: AudioContext,
    id: SoundId,
    color: NoiseColor,
    buffer: Arc<[f64]>,
    player: Option<NodeId>,
    started: bool,
    disposed: bool,
    output: NodeId,
    panner: NodeId,
    pan: f64,
    destination: Option<Sink>,
}

impl Noise {
    /// Delay between stopping the old player and starting the new one on a color change.
    pub const RESTART_DELAY: f64 = 0.01;

    /// Creates stopped noise connected to the master bus.
    pub fn new(ctx: &AudioContext, color: NoiseColor) -> Self {
        let ctx = ctx.clone();
        let (id, buffer, output, panner, master) = {
            let mut graph = ctx.graph();
            let id = graph.register_sound();
            let buffer = graph.noise_buffer(color);
            let output = graph.add_node(NodeKind::Gain(AudioParam::new(0.0)), Some(id));
            let panner = graph.add_node(NodeKind::Panner { pan: 0.0 }, Some(id));
            let master = Sink::Node(graph.destination());
            graph.link(output, Sink::Node(panner));
            graph.link(panner, master);
            (id, buffer, output, panner, master)
        };
        log::debug!("created {color} noise");

        Self {
            ctx,
            id,
            color,
            buffer,
            player: None,
            started: false,
            disposed: false,
            output,
            panner,
            pan: 0.0,
            destination: Some(master),
        }
    }

    /// Creates noise from a color name; unknown names give white noise.
    pub fn from_name(ctx: &AudioContext, name: &str) -> Self {
        Self::new(ctx, NoiseColor::from_name(name))
    }

    pub fn color(&self) -> NoiseColor {
        self.color
    }

    /// The shared buffer this source loops.
    pub fn buffer(&self) -> &Arc<[f64]> {
        &self.buffer
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

    pub fn context(&self) -> &AudioContext {
        &self.ctx
    }

    /// Starts playing now, replacing any player already running.
    pub fn start(&mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;
        let now = graph.now();
        self.start_at(&mut graph, now);
        Ok(())
    }

    fn start_at(&mut self, graph: &mut Graph, when: f64) {
        if self.started {
            let now = graph.now();
            self.stop_at(graph, now);
        }
        let player = Player::looping(Arc::clone(&self.buffer));
        let id = graph.add_node(NodeKind::Player(player), Some(self.id));
        graph.link(id, Sink::Node(self.output));
        graph.start_source(id, when);
        self.player = Some(id);
        self.started = true;
        log::debug!("{} noise started at {when:.4}s", self.color);
    }

    /// Stops playing now. Does nothing if already stopped.
    pub fn stop(&mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;
        if self.started {
            let now = graph.now();
            self.stop_at(&mut graph, now);
        }
        Ok(())
    }

    fn stop_at(&mut self, graph: &mut Graph, when: f64) {
        if let Some(player) = self.player.take() {
            graph.stop_source(player, when);
        }
        self.started = false;
        log::debug!("{} noise stopping at {when:.4}s", self.color);
    }

    /// Switches to another color.
    ///
    /// A playing source is stopped now and restarted on the new buffer
    /// [`RESTART_DELAY`](Self::RESTART_DELAY) seconds later.
    pub fn set_type(&mut self, color: NoiseColor) -> Result<&mut Self> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        self.color = color;
        self.buffer = graph.noise_buffer(color);
        if self.started {
            let now = graph.now();
            self.stop_at(&mut graph, now);
            self.start_at(&mut graph, now + Self::RESTART_DELAY);
        }
        Ok(self)
    }

    /// Schedules, modulates or queries the output gain. Changes ramp linearly.
    pub fn amp(&mut self, control: impl Into<Control>) -> Result<ParamRef> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        let handle = self.amp_param();
        schedule::apply(&mut graph, handle, control.into(), RampShape::Linear)?;
        Ok(handle)
    }

    /// Uses this noise to modulate the amplitude of `target`.
    ///
    /// Pending ramps on the target's gain are cancelled first so the noise
    /// rides on a steady value.
    pub fn amp_mod(&mut self, target: &impl Sound) -> Result<&mut Self> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        let param = target.amp_param();
        let now = graph.now();
        graph.param_mut(param)?.cancel_scheduled_values(now);
        graph.connect(self.panner, Sink::Param(param))?;
        Ok(self)
    }

    /// Sets the stereo position, from -1 (left) to 1 (right). Applies immediately.
    ///
    /// Only the master bus applies the pan law; routed anywhere else the
    /// signal arrives unpanned.
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

    /// Routes the output to `sink`, or to the master bus for `None`.
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

    /// Detaches the output from its destination. Modulation edges stay.
    pub fn disconnect(&mut self) -> Result<&mut Self> {
        let ctx = self.ctx.clone();
        let mut graph = ctx.graph();
        self.check(&graph)?;

        if let Some(previous) = self.destination.take() {
            graph.unlink(self.panner, previous);
        }
        Ok(self)
    }

    /// Tears down every node this source owns. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.started = false;

        let mut graph = self.ctx.graph();
        if graph.is_registered(self.id) {
            let removed = graph.release_sound(self.id);
            log::debug!("disposed {} noise, {removed} nodes removed", self.color);
        }
        drop(graph);

        self.player = None;
        self.destination = None;
    }

    fn check(&self, graph: &Graph) -> Result<()> {
        if self.disposed || !graph.is_registered(self.id) {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    #[cfg(test)]
    fn players(&self) -> usize {
        self.ctx.graph().live_sources(self.id)
    }
}

impl Sound for Noise {
    fn output(&self) -> Output {
        Output(self.panner)
    }

    fn amp_param(&self) -> ParamRef {
        ParamRef::new(self.output, ParamSlot::Gain)
    }
}

impl Drop for Noise {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Noise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Noise")
            .field("color", &self.color)
            .field("started", &self.started)
            .field("disposed", &self.disposed)
            .field("pan", &self.pan)
            .finish_non_exhaustive()
    }
}
