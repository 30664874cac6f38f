//! Ordered transform stages between an oscillator's output gain and its panner.

use crate::context::{Graph, NodeId, Sink};

/// The kinds of stage a chain can hold. At most one of each is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Delay line used for phase offsets. Always the first stage.
    Phase,
    Add,
    Multiply,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stage {
    kind: StageKind,
    node: NodeId,
}

/// A singly linked run of graph nodes from `base` to `sink`.
///
/// The chain owns the edges between its stages; the nodes themselves belong
/// to the sound that created them.
#[derive(Debug, Clone)]
pub(crate) struct MathChain {
    base: NodeId,
    sink: NodeId,
    stages: Vec<Stage>,
}

impl MathChain {
    pub(crate) fn new(base: NodeId, sink: NodeId) -> Self {
        Self {
            base,
            sink,
            stages: Vec::new(),
        }
    }

    pub(crate) fn get(&self, kind: StageKind) -> Option<NodeId> {
        self.stages
            .iter()
            .find(|stage| stage.kind == kind)
            .map(|stage| stage.node)
    }

    /// Stage kinds in signal order.
    pub(crate) fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|stage| stage.kind).collect()
    }

    /// The node currently feeding the sink.
    #[cfg(test)]
    pub(crate) fn tail(&self) -> NodeId {
        self.stages.last().map_or(self.base, |stage| stage.node)
    }

    pub(crate) fn clear(&mut self) {
        self.stages.clear();
    }

    /// Splices `node` into the chain as a stage of `kind`.
    ///
    /// An existing stage of the same kind is swapped out in place and removed
    /// from the graph. Otherwise phase stages go to the front and everything
    /// else to the tail. Returns the displaced node, if any.
    pub(crate) fn splice(&mut self, graph: &mut Graph, kind: StageKind, node: NodeId) -> Option<NodeId> {
        if let Some(index) = self.stages.iter().position(|stage| stage.kind == kind) {
            let upstream = self.upstream(index);
            let downstream = self.downstream(index + 1);
            let old = self.stages[index].node;

            graph.remove_node(old);
            graph.link(upstream, Sink::Node(node));
            graph.link(node, Sink::Node(downstream));
            self.stages[index].node = node;
            return Some(old);
        }

        let index = match kind {
            StageKind::Phase => 0,
            _ => self.stages.len(),
        };
        let upstream = self.upstream(index);
        let downstream = self.downstream(index);

        graph.unlink(upstream, Sink::Node(downstream));
        graph.link(upstream, Sink::Node(node));
        graph.link(node, Sink::Node(downstream));
        self.stages.insert(index, Stage { kind, node });
        None
    }

    /// The node feeding position `index`.
    fn upstream(&self, index: usize) -> NodeId {
        match index {
            0 => self.base,
            _ => self.stages[index - 1].node,
        }
    }

    /// The node at position `index`, or the sink past the end.
    fn downstream(&self, index: usize) -> NodeId {
        self.stages.get(index).map_or(self.sink, |stage| stage.node)
    }
}
