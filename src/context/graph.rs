//! The audio graph behind an [`AudioContext`](super::AudioContext).
//!
//! Nodes are stored by id; edges are stored on the receiving side, either in
//! a node's input list or in the input list of its parameter. Rendering pulls
//! from the destination bus one frame at a time, caching each node's output
//! for the frame so a node feeding several places is only advanced once.

use super::nodes::{Node, NodeKind};
use super::param::AudioParam;
use super::{ContextOptions, NodeId, ParamRef, Sink, SoundId};
use crate::noise::{NoiseBank, NoiseColor};
use crate::oscillators::Waveform;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

pub(crate) struct Graph {
    options: ContextOptions,
    sample_rate: f64,
    frame: u64,
    next_node: u64,
    next_sound: u64,
    nodes: HashMap<NodeId, Node>,
    destination: NodeId,
    sounds: BTreeSet<SoundId>,
    noise: NoiseBank,
    scratch: HashMap<NodeId, f64>,
}

impl Graph {
    pub(crate) fn new(options: ContextOptions) -> Self {
        let options = options.sanitized();
        let sample_rate = f64::from(options.sample_rate);
        let mut graph = Self {
            options,
            sample_rate,
            frame: 0,
            next_node: 0,
            next_sound: 0,
            nodes: HashMap::new(),
            destination: NodeId(0),
            sounds: BTreeSet::new(),
            noise: NoiseBank::new(sample_rate, options.noise_seed),
            scratch: HashMap::new(),
        };
        graph.destination = graph.add_node(NodeKind::Destination, None);
        graph
    }

    pub(crate) fn now(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    pub(crate) fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub(crate) fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub(crate) fn destination(&self) -> NodeId {
        self.destination
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[cfg(test)]
    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn add_node(&mut self, kind: NodeKind, owner: Option<SoundId>) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        log::trace!("created {} node {id}", kind.name());
        self.nodes.insert(id, Node::new(kind, owner));
        id
    }

    /// Removes a node and every edge touching it. Returns false if it was already gone.
    pub(crate) fn remove_node(&mut self, id: NodeId) -> bool {
        if id == self.destination || self.nodes.remove(&id).is_none() {
            return false;
        }
        self.disconnect_all(id);
        true
    }

    /// Adds an edge if both ends exist. Duplicate edges are ignored.
    pub(crate) fn link(&mut self, from: NodeId, to: Sink) -> bool {
        if !self.nodes.contains_key(&from) {
            return false;
        }
        match self.inputs_mut(to) {
            Some(inputs) => {
                if !inputs.contains(&from) {
                    inputs.push(from);
                }
                true
            }
            None => false,
        }
    }

    /// Like [`link`](Self::link) but reports which end is missing.
    pub(crate) fn connect(&mut self, from: NodeId, to: Sink) -> Result<()> {
        if !self.contains(from) {
            return Err(Error::NodeNotFound(from));
        }
        match to {
            Sink::Node(id) if !self.contains(id) => return Err(Error::NodeNotFound(id)),
            Sink::Node(_) => {}
            Sink::Param(param) => {
                self.param_mut(param)?;
            }
        }
        self.link(from, to);
        Ok(())
    }

    /// Removes a single edge if present.
    pub(crate) fn unlink(&mut self, from: NodeId, to: Sink) {
        if let Some(inputs) = self.inputs_mut(to) {
            inputs.retain(|&input| input != from);
        }
    }

    /// Removes every outgoing edge of `from`, into nodes and parameters alike.
    pub(crate) fn disconnect_all(&mut self, from: NodeId) {
        for node in self.nodes.values_mut() {
            node.inputs.retain(|&input| input != from);
            if let Some((_, param)) = node.param_mut() {
                param.inputs.retain(|&input| input != from);
            }
        }
    }

    fn inputs_mut(&mut self, to: Sink) -> Option<&mut Vec<NodeId>> {
        match to {
            Sink::Node(id) => self.nodes.get_mut(&id).map(|node| &mut node.inputs),
            Sink::Param(param) => self
                .nodes
                .get_mut(&param.node)
                .and_then(|node| node.param_mut())
                .filter(|(slot, _)| *slot == param.slot)
                .map(|(_, param)| &mut param.inputs),
        }
    }

    pub(crate) fn param(&self, param: ParamRef) -> Result<&AudioParam> {
        let node = self
            .nodes
            .get(&param.node)
            .ok_or(Error::NodeNotFound(param.node))?;
        match node.param() {
            Some((slot, value)) if slot == param.slot => Ok(value),
            _ => Err(Error::NoSuchParam {
                node: param.node,
                slot: param.slot,
            }),
        }
    }

    pub(crate) fn param_mut(&mut self, param: ParamRef) -> Result<&mut AudioParam> {
        let node = self
            .nodes
            .get_mut(&param.node)
            .ok_or(Error::NodeNotFound(param.node))?;
        match node.param_mut() {
            Some((slot, value)) if slot == param.slot => Ok(value),
            _ => Err(Error::NoSuchParam {
                node: param.node,
                slot: param.slot,
            }),
        }
    }

    /// Schedules a one-shot source to start. A source can only be started once.
    pub(crate) fn start_source(&mut self, id: NodeId, when: f64) -> bool {
        match self.nodes.get_mut(&id).and_then(|node| node.schedule_mut()) {
            Some(schedule) if schedule.start.is_none() => {
                schedule.start = Some(when);
                true
            }
            _ => false,
        }
    }

    /// Schedules a started source to stop. A later call replaces an earlier one.
    pub(crate) fn stop_source(&mut self, id: NodeId, when: f64) -> bool {
        match self.nodes.get_mut(&id).and_then(|node| node.schedule_mut()) {
            Some(schedule) if schedule.start.is_some() => {
                schedule.stop = Some(when);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn has_started(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .and_then(|node| node.schedule())
            .is_some_and(|schedule| schedule.start.is_some())
    }

    pub(crate) fn set_pan(&mut self, id: NodeId, value: f64) {
        if let Some(Node {
            kind: NodeKind::Panner { pan },
            ..
        }) = self.nodes.get_mut(&id)
        {
            *pan = value;
        }
    }

    pub(crate) fn set_waveform(&mut self, id: NodeId, waveform: Waveform) {
        if let Some(Node {
            kind: NodeKind::Generator(generator),
            ..
        }) = self.nodes.get_mut(&id)
        {
            generator.waveform = waveform;
        }
    }

    pub(crate) fn noise_buffer(&self, color: NoiseColor) -> Arc<[f64]> {
        self.noise.buffer(color)
    }

    pub(crate) fn register_sound(&mut self) -> SoundId {
        let id = SoundId(self.next_sound);
        self.next_sound += 1;
        self.sounds.insert(id);
        id
    }

    pub(crate) fn is_registered(&self, id: SoundId) -> bool {
        self.sounds.contains(&id)
    }

    /// Tears down every node owned by `owner` and forgets the sound.
    pub(crate) fn release_sound(&mut self, owner: SoundId) -> usize {
        let owned: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.owner == Some(owner))
            .map(|(&id, _)| id)
            .collect();
        for &id in &owned {
            self.remove_node(id);
        }
        self.sounds.remove(&owner);
        owned.len()
    }

    pub(crate) fn release_all(&mut self) -> usize {
        let sounds: Vec<SoundId> = self.sounds.iter().copied().collect();
        sounds.into_iter().map(|id| self.release_sound(id)).sum()
    }

    pub(crate) fn sound_count(&self) -> usize {
        self.sounds.len()
    }

    /// Renders one stereo frame and advances the clock by one sample.
    pub(crate) fn render_frame(&mut self) -> [f64; 2] {
        let time = self.now();
        let mut cache = std::mem::take(&mut self.scratch);
        cache.clear();

        let sources = self
            .nodes
            .get(&self.destination)
            .map(|node| node.inputs.clone())
            .unwrap_or_default();

        let mut frame = [0.0; 2];
        for id in sources {
            let sample = self.pull(id, time, &mut cache);
            let (left, right) = match self.nodes.get(&id).map(|node| &node.kind) {
                Some(NodeKind::Panner { pan }) => equal_power(*pan),
                _ => (1.0, 1.0),
            };
            frame[0] += sample * left;
            frame[1] += sample * right;
        }

        self.scratch = cache;
        self.frame += 1;
        self.collect_finished();
        frame
    }

    fn pull(&mut self, id: NodeId, time: f64, cache: &mut HashMap<NodeId, f64>) -> f64 {
        if let Some(&sample) = cache.get(&id) {
            return sample;
        }
        // Missing means removed, or already on the stack in a feedback loop:
        // either way the edge reads silence.
        let Some(mut node) = self.nodes.remove(&id) else {
            return 0.0;
        };

        let mut input = 0.0;
        for &source in &node.inputs {
            input += self.pull(source, time, cache);
        }
        let mut modulation = 0.0;
        if let Some((_, param)) = node.param() {
            for &source in &param.inputs {
                modulation += self.pull(source, time, cache);
            }
        }

        let sample = node.process(input, modulation, time, self.sample_rate);
        self.nodes.insert(id, node);
        cache.insert(id, sample);
        sample
    }

    fn collect_finished(&mut self) {
        let time = self.now();
        let finished: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.schedule().is_some_and(|s| s.has_finished(time)))
            .map(|(&id, _)| id)
            .collect();
        for id in finished {
            log::trace!("source {id} finished at {time:.4}s");
            self.remove_node(id);
        }
    }

    /// Started sources owned by `owner` that have no stop scheduled.
    #[cfg(test)]
    pub(crate) fn live_sources(&self, owner: SoundId) -> usize {
        self.nodes
            .values()
            .filter(|node| node.owner == Some(owner))
            .filter_map(|node| node.schedule())
            .filter(|schedule| schedule.start.is_some() && schedule.stop.is_none())
            .count()
    }
}

/// Equal-power gains for a pan position in [-1, 1].
fn equal_power(pan: f64) -> (f64, f64) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * 0.5 * FRAC_PI_2;
    (angle.cos(), angle.sin())
}
