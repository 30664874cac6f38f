//! The audio context: a sample clock, a node graph and a registry of live sounds.
//!
//! Sounds never own audio state directly. They hold node ids into the graph
//! behind an [`AudioContext`] and schedule changes against its clock, the way
//! Web Audio objects hold references into a shared `AudioContext`.

mod graph;
mod nodes;
mod options;
mod param;

pub(crate) use graph::Graph;
pub(crate) use nodes::{DelayLine, Generator, NodeKind, Player};
pub use nodes::MathOp;
pub use options::ContextOptions;
pub use param::{AudioParam, AutomationEvent};

use crate::noise::NoiseColor;
use crate::signals::Signal;
use crate::Result;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;

/// Identifies a node in the audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies a sound in the context's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct SoundId(pub(crate) u64);

/// Which parameter of a node a [`ParamRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSlot {
    Gain,
    Frequency,
    DelayTime,
}

/// Handle to a schedulable parameter inside the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub(crate) node: NodeId,
    pub(crate) slot: ParamSlot,
}

impl ParamRef {
    pub(crate) fn new(node: NodeId, slot: ParamSlot) -> Self {
        Self { node, slot }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn slot(&self) -> ParamSlot {
        self.slot
    }
}

/// The audio-rate output of a sound or signal, usable as a modulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Output(pub(crate) NodeId);

impl Output {
    pub fn node(&self) -> NodeId {
        self.0
    }
}

/// Anything an [`Output`] can be connected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sink {
    /// Summed into a node's audio input.
    Node(NodeId),
    /// Summed into a parameter on top of its scheduled value.
    Param(ParamRef),
}

impl From<ParamRef> for Sink {
    fn from(param: ParamRef) -> Self {
        Sink::Param(param)
    }
}

/// Shared handle to an audio graph and its sample clock.
///
/// Cloning is cheap; every clone drives the same graph. Time only moves
/// forward when frames are rendered, so scheduling is fully deterministic.
///
/// # Examples
///
/// ```
/// use tonewheel::{AudioContext, SinOsc};
///
/// let ctx = AudioContext::new(44100);
/// let mut osc = SinOsc::new(&ctx, 440.0);
/// osc.start()?;
/// osc.amp(0.5)?;
///
/// let frames = ctx.render_frames(441);
/// assert_eq!(frames.len(), 441);
/// assert!((ctx.now() - 0.01).abs() < 1e-12);
/// # Ok::<(), tonewheel::Error>(())
/// ```
#[derive(Clone)]
pub struct AudioContext {
    graph: Arc<Mutex<Graph>>,
}

impl AudioContext {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_options(ContextOptions::new(sample_rate))
    }

    pub fn with_options(options: ContextOptions) -> Self {
        log::debug!(
            "audio context at {} Hz, max delay {}s",
            options.sample_rate,
            options.max_delay_time
        );
        Self {
            graph: Arc::new(Mutex::new(Graph::new(options))),
        }
    }

    /// Current time in seconds: frames rendered so far over the sample rate.
    pub fn now(&self) -> f64 {
        self.graph().now()
    }

    pub fn sample_rate(&self) -> f64 {
        self.graph().sample_rate()
    }

    pub fn options(&self) -> ContextOptions {
        *self.graph().options()
    }

    /// The stereo master bus every sound connects to by default.
    pub fn master(&self) -> Sink {
        Sink::Node(self.graph().destination())
    }

    /// Fills `out` with interleaved stereo frames, advancing the clock.
    ///
    /// A trailing odd sample receives the left channel of one last frame.
    pub fn render(&self, out: &mut [f64]) {
        let mut graph = self.graph();
        for frame in out.chunks_mut(2) {
            let [left, right] = graph.render_frame();
            frame[0] = left;
            if let Some(slot) = frame.get_mut(1) {
                *slot = right;
            }
        }
    }

    /// Renders `frames` stereo frames.
    pub fn render_frames(&self, frames: usize) -> Vec<[f64; 2]> {
        let mut graph = self.graph();
        (0..frames).map(|_| graph.render_frame()).collect()
    }

    /// Renders and discards enough frames to move the clock forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        let mut graph = self.graph();
        let frames = (seconds.max(0.0) * graph.sample_rate()).round() as u64;
        for _ in 0..frames {
            graph.render_frame();
        }
    }

    /// Adds a custom signal to the graph. It is not connected anywhere yet.
    ///
    /// The returned [`Output`] can drive parameters (`osc.freq(output)`) or be
    /// routed with [`connect`](Self::connect).
    pub fn signal(&self, signal: impl Signal + Send + 'static) -> Output {
        Output(self.graph().add_node(NodeKind::Signal(Box::new(signal)), None))
    }

    pub fn connect(&self, output: Output, sink: Sink) -> Result<()> {
        self.graph().connect(output.0, sink)
    }

    /// Removes every outgoing edge of `output`.
    pub fn disconnect(&self, output: Output) {
        self.graph().disconnect_all(output.0);
    }

    /// Removes a signal added with [`signal`](Self::signal) from the graph.
    pub fn remove(&self, output: Output) -> bool {
        self.graph().remove_node(output.0)
    }

    /// Runs `f` against a parameter's timeline.
    ///
    /// The graph stays locked while `f` runs and the lock is not reentrant:
    /// calling back into this context, or into any sound built on it, from
    /// inside `f` deadlocks.
    ///
    /// ```
    /// use tonewheel::{AudioContext, SinOsc};
    ///
    /// let ctx = AudioContext::new(1000);
    /// let mut osc = SinOsc::new(&ctx, 220.0);
    /// let gain = osc.amp(0.25)?;
    /// let held = ctx.with_param(gain, |param| param.value_at(0.0))?;
    /// assert_eq!(held, 0.25);
    /// # Ok::<(), tonewheel::Error>(())
    /// ```
    pub fn with_param<R>(&self, param: ParamRef, f: impl FnOnce(&mut AudioParam) -> R) -> Result<R> {
        let mut graph = self.graph();
        graph.param_mut(param).map(f)
    }

    /// A parameter's scheduled value at the current time, excluding modulators.
    pub fn param_value(&self, param: ParamRef) -> Result<f64> {
        let graph = self.graph();
        let now = graph.now();
        graph.param(param).map(|p| p.value_at(now))
    }

    /// The shared looping buffer for a noise color, synthesized on first use.
    pub fn noise_buffer(&self, color: NoiseColor) -> Arc<[f64]> {
        self.graph().noise_buffer(color)
    }

    /// Number of sounds created on this context and not yet disposed.
    pub fn live_sounds(&self) -> usize {
        self.graph().sound_count()
    }

    /// Disposes every sound created on this context.
    ///
    /// Handles to those sounds stay valid as values but every further
    /// operation on them reports [`Error::Disposed`](crate::Error::Disposed).
    pub fn dispose_all(&self) {
        let removed = self.graph().release_all();
        log::debug!("disposed all sounds, {removed} nodes removed");
    }

    pub(crate) fn graph(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock()
    }
}

impl Default for AudioContext {
    fn default() -> Self {
        Self::with_options(ContextOptions::default())
    }
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.graph();
        f.debug_struct("AudioContext")
            .field("sample_rate", &graph.sample_rate())
            .field("now", &graph.now())
            .field("sounds", &graph.sound_count())
            .finish()
    }
}
