//! Effect nodes
//!
//! [`EffectNode`] is a closed tagged variant over the five concrete effects.
//! The graph stores one node per kind in an [`EffectBank`].

use serde::Serialize;

use crate::dsp::chorus::Chorus;
use crate::dsp::delay::Delay;
use crate::dsp::distortion::Distortion;
use crate::dsp::effect::{Effect, EffectKind, EffectParam};
use crate::dsp::filter::LowpassFilter;
use crate::dsp::reverb::Reverb;
use crate::engine::AudioBuffer;
use crate::error::Result;

/// One of the five effects
#[derive(Debug, Clone)]
pub enum EffectNode {
    Distortion(Distortion),
    Chorus(Chorus),
    Delay(Delay),
    Filter(LowpassFilter),
    Reverb(Reverb),
}

/// Parameter snapshot of a node, for the control surface and tests
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeParams {
    Distortion { wet: f32, amount: f32 },
    Chorus { wet: f32, depth: f32, rate_hz: f32 },
    Delay { wet: f32, delay_time: f32, feedback: f32 },
    Filter { wet: f32, cutoff_hz: f32, q: f32 },
    Reverb { wet: f32, decay_secs: f32 },
}

impl EffectNode {
    /// Create a node with default parameters
    pub fn new(kind: EffectKind) -> Self {
        match kind {
            EffectKind::Distortion => EffectNode::Distortion(Distortion::default()),
            EffectKind::Chorus => EffectNode::Chorus(Chorus::default()),
            EffectKind::Delay => EffectNode::Delay(Delay::default()),
            EffectKind::Filter => EffectNode::Filter(LowpassFilter::default()),
            EffectKind::Reverb => EffectNode::Reverb(Reverb::default()),
        }
    }

    /// Borrow the node as its effect
    pub fn effect(&self) -> &dyn Effect {
        match self {
            EffectNode::Distortion(e) => e,
            EffectNode::Chorus(e) => e,
            EffectNode::Delay(e) => e,
            EffectNode::Filter(e) => e,
            EffectNode::Reverb(e) => e,
        }
    }

    /// Mutably borrow the node as its effect
    pub fn effect_mut(&mut self) -> &mut dyn Effect {
        match self {
            EffectNode::Distortion(e) => e,
            EffectNode::Chorus(e) => e,
            EffectNode::Delay(e) => e,
            EffectNode::Filter(e) => e,
            EffectNode::Reverb(e) => e,
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.effect().kind()
    }

    pub fn is_prepared(&self) -> bool {
        self.effect().is_prepared()
    }

    pub fn prepare(&mut self, sample_rate: u32, max_block_size: usize) {
        self.effect_mut().prepare(sample_rate, max_block_size);
    }

    pub fn reset(&mut self) {
        self.effect_mut().reset();
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        self.effect_mut().process(buffer);
    }

    /// Apply a typed parameter update
    pub fn apply(&mut self, param: EffectParam) -> Result<()> {
        self.effect_mut().apply(param)
    }

    /// Apply several updates, stopping at the first failure
    pub fn apply_all(&mut self, params: &[EffectParam]) -> Result<()> {
        params.iter().try_for_each(|&p| self.apply(p))
    }

    /// Current parameter values
    pub fn params(&self) -> NodeParams {
        match self {
            EffectNode::Distortion(e) => NodeParams::Distortion {
                wet: e.wet(),
                amount: e.amount(),
            },
            EffectNode::Chorus(e) => NodeParams::Chorus {
                wet: e.wet(),
                depth: e.depth(),
                rate_hz: e.rate_hz(),
            },
            EffectNode::Delay(e) => NodeParams::Delay {
                wet: e.wet(),
                delay_time: e.delay_time(),
                feedback: e.feedback(),
            },
            EffectNode::Filter(e) => NodeParams::Filter {
                wet: e.wet(),
                cutoff_hz: e.cutoff_hz(),
                q: e.q(),
            },
            EffectNode::Reverb(e) => NodeParams::Reverb {
                wet: e.wet(),
                decay_secs: e.decay_secs(),
            },
        }
    }
}

/// One node per effect kind, indexed by [`EffectKind::index`]
#[derive(Debug, Clone)]
pub struct EffectBank {
    nodes: Vec<EffectNode>,
}

impl EffectBank {
    pub fn new() -> Self {
        Self {
            nodes: EffectKind::ALL.iter().map(|&k| EffectNode::new(k)).collect(),
        }
    }

    pub fn get(&self, kind: EffectKind) -> &EffectNode {
        &self.nodes[kind.index()]
    }

    pub fn get_mut(&mut self, kind: EffectKind) -> &mut EffectNode {
        &mut self.nodes[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectNode> {
        self.nodes.iter()
    }

    /// Prepare every node for the given sample rate
    pub fn prepare(&mut self, sample_rate: u32, max_block_size: usize) {
        for node in &mut self.nodes {
            node.prepare(sample_rate, max_block_size);
        }
    }

    /// Whether every node has been prepared
    pub fn is_prepared(&self) -> bool {
        self.nodes.iter().all(EffectNode::is_prepared)
    }

    pub fn reset(&mut self) {
        self.nodes.iter_mut().for_each(EffectNode::reset);
    }
}

impl Default for EffectBank {
    fn default() -> Self {
        Self::new()
    }
}
