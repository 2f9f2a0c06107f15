//! Effect graph
//!
//! The live signal path is `Source -> MasterGain -> e1 -> ... -> en`, fanning
//! out to both the live output and the recording tap. Topology changes go
//! through one entry point, [`EffectGraph::reconfigure`], which computes the
//! complete new wiring and hands it to the backend in a single call. If the
//! backend rejects it the previous wiring stays in place.

use std::fmt;

use crate::dsp::{EffectBank, EffectKind, EffectNode, EffectParam, Gain};
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};

// ============================================================================
// Wiring
// ============================================================================

/// A vertex of the audio graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// Microphone input
    Source,
    /// Master volume stage
    MasterGain,
    /// One of the effects
    Effect(EffectKind),
    /// Speakers
    LiveOutput,
    /// Recording capture point
    RecordTap,
}

impl NodeId {
    pub fn is_sink(&self) -> bool {
        matches!(self, NodeId::LiveOutput | NodeId::RecordTap)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Source => write!(f, "source"),
            NodeId::MasterGain => write!(f, "master"),
            NodeId::Effect(kind) => write!(f, "{}", kind),
            NodeId::LiveOutput => write!(f, "live"),
            NodeId::RecordTap => write!(f, "tap"),
        }
    }
}

/// Explicit edge list of the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wiring {
    edges: Vec<(NodeId, NodeId)>,
}

impl Wiring {
    /// Series wiring through `chain`, fanning out to both sinks
    pub fn series(chain: &[EffectKind]) -> Self {
        let mut edges = vec![(NodeId::Source, NodeId::MasterGain)];
        let mut last = NodeId::MasterGain;
        for &kind in chain {
            edges.push((last, NodeId::Effect(kind)));
            last = NodeId::Effect(kind);
        }
        edges.push((last, NodeId::LiveOutput));
        edges.push((last, NodeId::RecordTap));
        Self { edges }
    }

    pub fn from_edges(edges: Vec<(NodeId, NodeId)>) -> Self {
        Self { edges }
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    /// The node sequence from the source to `sink`
    ///
    /// Returns `None` if the sink is unreachable, the path branches between
    /// processing nodes, or it loops.
    pub fn path_to(&self, sink: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![NodeId::Source];
        let mut current = NodeId::Source;
        while current != sink {
            if path.len() > self.edges.len() + 1 {
                return None;
            }
            let outgoing: Vec<NodeId> = self
                .edges
                .iter()
                .filter(|(from, _)| *from == current)
                .map(|&(_, to)| to)
                .collect();
            current = if outgoing.contains(&sink) {
                sink
            } else {
                let mut inner = outgoing.into_iter().filter(|n| !n.is_sink());
                match (inner.next(), inner.next()) {
                    (Some(next), None) => next,
                    _ => return None,
                }
            };
            path.push(current);
        }
        Some(path)
    }

    /// Effects on the path to `sink`, in order
    pub fn effects_to(&self, sink: NodeId) -> Option<Vec<EffectKind>> {
        self.path_to(sink).map(|path| {
            path.into_iter()
                .filter_map(|n| match n {
                    NodeId::Effect(kind) => Some(kind),
                    _ => None,
                })
                .collect()
        })
    }

    /// Check that both sinks are reached through the same effects
    pub fn validate(&self) -> Result<Vec<EffectKind>> {
        let live = self.effects_to(NodeId::LiveOutput).ok_or_else(|| FxError::GraphWiring {
            reason: "live output is not connected to the source".to_string(),
        })?;
        let tap = self.effects_to(NodeId::RecordTap).ok_or_else(|| FxError::GraphWiring {
            reason: "recording tap is not connected to the source".to_string(),
        })?;
        if live != tap {
            return Err(FxError::GraphWiring {
                reason: "live output and recording tap hear different chains".to_string(),
            });
        }
        let path = self.path_to(NodeId::LiveOutput).unwrap_or_default();
        if path.get(1) != Some(&NodeId::MasterGain) {
            return Err(FxError::GraphWiring {
                reason: "master gain must follow the source".to_string(),
            });
        }
        Ok(live)
    }
}

impl fmt::Display for Wiring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .edges
            .iter()
            .map(|(a, b)| format!("{}->{}", a, b))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Whatever actually connects the nodes
///
/// `rewire` replaces the whole topology in one step: disconnect everything,
/// then connect `wiring`.
pub trait GraphBackend: Send {
    fn rewire(&mut self, wiring: &Wiring) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Backend for the in-process processing loop
///
/// Accepts any wiring that passes [`Wiring::validate`].
#[derive(Debug, Default)]
pub struct InProcessBackend {
    connected: Option<Wiring>,
}

impl InProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(&self) -> Option<&Wiring> {
        self.connected.as_ref()
    }
}

impl GraphBackend for InProcessBackend {
    fn rewire(&mut self, wiring: &Wiring) -> Result<()> {
        wiring.validate()?;
        self.connected = Some(wiring.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}

// ============================================================================
// Effect Graph
// ============================================================================

/// Owned audio graph: master gain, the five effect nodes and the active chain
pub struct EffectGraph {
    master: Gain,
    bank: EffectBank,
    chain: Vec<EffectKind>,
    wiring: Wiring,
    backend: Box<dyn GraphBackend>,
    sample_rate: Option<u32>,
}

impl EffectGraph {
    /// Create a graph with the in-process backend and a direct path
    pub fn new() -> Self {
        Self::with_backend(Box::new(InProcessBackend::new()))
    }

    /// Create a graph with a custom backend
    ///
    /// The backend is not called until the first [`EffectGraph::reconfigure`].
    pub fn with_backend(backend: Box<dyn GraphBackend>) -> Self {
        Self {
            master: Gain::default(),
            bank: EffectBank::new(),
            chain: Vec::new(),
            wiring: Wiring::series(&[]),
            backend,
            sample_rate: None,
        }
    }

    /// Prepare every node for processing at `sample_rate`
    pub fn prepare(&mut self, sample_rate: u32, max_block_size: usize) {
        self.bank.prepare(sample_rate, max_block_size);
        self.master.reset();
        self.sample_rate = Some(sample_rate);
        log::info!(
            "Audio graph prepared at {} Hz ({} backend)",
            sample_rate,
            self.backend.name()
        );
    }

    pub fn is_prepared(&self) -> bool {
        self.sample_rate.is_some()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// Replace the active chain
    ///
    /// Duplicates are dropped, keeping first occurrence order. The complete
    /// new wiring is handed to the backend in one call; on failure the
    /// previous wiring is restored and the chain is unchanged.
    ///
    /// # Errors
    /// * `GraphWiring` - If the backend rejected the new wiring
    pub fn reconfigure(&mut self, chain: &[EffectKind]) -> Result<()> {
        let mut deduped: Vec<EffectKind> = Vec::with_capacity(chain.len());
        for &kind in chain {
            if !deduped.contains(&kind) {
                deduped.push(kind);
            }
        }

        let wiring = Wiring::series(&deduped);
        if let Err(err) = self.backend.rewire(&wiring) {
            log::warn!("Rewire to [{}] rejected: {}", wiring, err);
            if let Err(restore) = self.backend.rewire(&self.wiring) {
                log::warn!("Restoring previous wiring failed: {}", restore);
            }
            return Err(match err {
                FxError::GraphWiring { .. } => err,
                other => FxError::GraphWiring {
                    reason: other.to_string(),
                },
            });
        }

        // Newly inserted effects start without stale tails
        for kind in &deduped {
            if !self.chain.contains(kind) {
                self.bank.get_mut(*kind).reset();
            }
        }

        log::info!(
            "Effect chain: [{}]",
            deduped.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(" -> ")
        );
        self.chain = deduped;
        self.wiring = wiring;
        Ok(())
    }

    /// Active effects in processing order
    pub fn chain(&self) -> &[EffectKind] {
        &self.chain
    }

    /// Committed wiring
    pub fn wiring(&self) -> &Wiring {
        &self.wiring
    }

    pub fn node(&self, kind: EffectKind) -> &EffectNode {
        self.bank.get(kind)
    }

    pub fn node_mut(&mut self, kind: EffectKind) -> &mut EffectNode {
        self.bank.get_mut(kind)
    }

    /// Apply one parameter update to one effect
    pub fn apply(&mut self, kind: EffectKind, param: EffectParam) -> Result<()> {
        self.bank.get_mut(kind).apply(param)
    }

    pub fn master(&self) -> &Gain {
        &self.master
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master.set_gain(volume);
    }

    /// Run one block through the committed wiring, in place
    ///
    /// The result is what both the live output and the recording tap hear.
    pub fn process(&mut self, block: &mut AudioBuffer) {
        if !self.is_prepared() {
            return;
        }
        let Some(path) = self.wiring.path_to(NodeId::LiveOutput) else {
            return;
        };
        for node in path {
            match node {
                NodeId::MasterGain => self.master.process(block),
                NodeId::Effect(kind) => self.bank.get_mut(kind).process(block),
                NodeId::Source | NodeId::LiveOutput | NodeId::RecordTap => {}
            }
        }
    }

    /// Clear all effect tails
    pub fn reset(&mut self) {
        self.bank.reset();
        self.master.reset();
    }
}

impl Default for EffectGraph {
    fn default() -> Self {
        Self::new()
    }
}
