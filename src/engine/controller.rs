//! Effect graph controller
//!
//! Translates hand input into graph changes. In continuous mode all five
//! effects stay wired in series and finger extension drives their
//! parameters. In toggle mode a recognized gesture swaps the active chain
//! for a single fully-wet effect, and a fist clears it.

use serde::{Deserialize, Serialize};

use crate::config::EffectSettings;
use crate::dsp::{EffectKind, EffectParam};
use crate::engine::graph::EffectGraph;
use crate::error::{FxError, Result};
use crate::tracking::{FingerState, GestureLabel};

// ============================================================================
// Constants
// ============================================================================

/// Series order of the continuous chain
pub const CONTINUOUS_CHAIN: [EffectKind; 5] = [
    EffectKind::Distortion,
    EffectKind::Chorus,
    EffectKind::Delay,
    EffectKind::Filter,
    EffectKind::Reverb,
];

/// Pinky sweeps the low-pass cutoff across this range
pub const FILTER_MIN_HZ: f32 = 200.0;
pub const FILTER_MAX_HZ: f32 = 8000.0;

/// Feedback at full index extension
pub const DELAY_FEEDBACK_SCALE: f32 = 0.7;

/// Drive at full middle-finger extension
pub const DRIVE_SCALE: f32 = 0.8;

/// Fixed parameters of the continuous chain
const CONTINUOUS_DELAY_SECS: f32 = 0.25;
const CONTINUOUS_REVERB_DECAY_SECS: f32 = 1.5;
const CONTINUOUS_CHORUS_RATE_HZ: f32 = 4.0;
const CONTINUOUS_FILTER_HZ: f32 = 2000.0;

/// How hand input drives the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Finger extension sets parameters of a fixed chain
    #[default]
    Continuous,
    /// Gestures switch between single effects
    Toggle,
}

/// Effect selected by a gesture in toggle mode
///
/// `Some(None)` means "clear the chain"; `None` means the gesture selects nothing.
pub fn gesture_effect(label: GestureLabel) -> Option<Option<EffectKind>> {
    match label {
        GestureLabel::OneFinger => Some(Some(EffectKind::Chorus)),
        GestureLabel::TwoFingers => Some(Some(EffectKind::Distortion)),
        GestureLabel::ThreeFingers => Some(Some(EffectKind::Reverb)),
        GestureLabel::FourFingers => Some(Some(EffectKind::Delay)),
        GestureLabel::Fist => Some(None),
        GestureLabel::None => None,
    }
}

/// Parameter targets for one finger state, per effect
pub fn continuous_targets(state: &FingerState) -> [(EffectKind, Vec<EffectParam>); 5] {
    [
        (EffectKind::Reverb, vec![EffectParam::Wet(state.thumb)]),
        (
            EffectKind::Delay,
            vec![
                EffectParam::Wet(state.index),
                EffectParam::Feedback(state.index * DELAY_FEEDBACK_SCALE),
            ],
        ),
        (
            EffectKind::Distortion,
            vec![
                EffectParam::Wet(state.middle),
                EffectParam::Drive(state.middle * DRIVE_SCALE),
            ],
        ),
        (
            EffectKind::Chorus,
            vec![EffectParam::Wet(state.ring), EffectParam::Depth(state.ring)],
        ),
        (
            EffectKind::Filter,
            vec![EffectParam::Cutoff(
                FILTER_MIN_HZ + state.pinky * (FILTER_MAX_HZ - FILTER_MIN_HZ),
            )],
        ),
    ]
}

/// Outcome of a batch of parameter updates
///
/// A failing effect never stops the others from being updated.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: usize,
    pub failures: Vec<(EffectKind, FxError)>,
}

impl ApplyReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, kind: EffectKind, result: Result<()>) {
        match result {
            Ok(()) => self.applied += 1,
            Err(err) => {
                log::warn!("Failed to update {}: {}", kind, err);
                self.failures.push((kind, err));
            }
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Owns the effect graph and maps hand input onto it
pub struct EffectController {
    mode: ControlMode,
    graph: EffectGraph,
    knobs: EffectSettings,
}

impl EffectController {
    /// Create a controller and wire the graph for `mode`
    ///
    /// # Errors
    /// * `GraphWiring` - If the backend rejects the initial wiring
    pub fn new(mode: ControlMode, graph: EffectGraph, knobs: EffectSettings) -> Result<Self> {
        let mut controller = Self { mode, graph, knobs };
        controller.rewire_for_mode()?;
        Ok(controller)
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn graph(&self) -> &EffectGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut EffectGraph {
        &mut self.graph
    }

    pub fn knobs(&self) -> &EffectSettings {
        &self.knobs
    }

    /// Prepare the graph and load the parameters for the current mode
    pub fn prepare(&mut self, sample_rate: u32, max_block_size: usize) -> ApplyReport {
        self.graph.prepare(sample_rate, max_block_size);
        self.load_mode_parameters()
    }

    /// Switch modes, resetting the chain
    pub fn set_mode(&mut self, mode: ControlMode) -> Result<ApplyReport> {
        if mode == self.mode {
            return Ok(ApplyReport::default());
        }
        log::info!("Control mode: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.rewire_for_mode()?;
        Ok(self.load_mode_parameters())
    }

    /// Replace the toggle-mode knobs and push them to the effects
    pub fn update_knobs(&mut self, knobs: EffectSettings) -> ApplyReport {
        self.knobs = knobs;
        self.load_mode_parameters()
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.graph.set_master_volume(volume);
    }

    /// Drive the continuous chain from finger extension
    ///
    /// Does nothing in toggle mode.
    pub fn apply_finger_state(&mut self, state: &FingerState) -> ApplyReport {
        let mut report = ApplyReport::default();
        if self.mode != ControlMode::Continuous {
            return report;
        }
        for (kind, params) in continuous_targets(state) {
            let result = self.graph.node_mut(kind).apply_all(&params);
            report.record(kind, result);
        }
        log::debug!(
            "Finger state applied: {} ok, {} failed",
            report.applied,
            report.failures.len()
        );
        report
    }

    /// Switch the toggle chain for an accepted gesture
    ///
    /// Returns whether the chain changed. Ignored in continuous mode, for
    /// `None`, and when the gesture selects the effect already active.
    pub fn apply_gesture(&mut self, label: GestureLabel) -> Result<bool> {
        if self.mode != ControlMode::Toggle {
            return Ok(false);
        }
        let Some(selection) = gesture_effect(label) else {
            return Ok(false);
        };
        let chain: Vec<EffectKind> = selection.into_iter().collect();
        if self.graph.chain() == chain.as_slice() {
            return Ok(false);
        }
        self.graph.reconfigure(&chain)?;
        log::info!("Gesture {} -> {}", label, self.indicator_text());
        Ok(true)
    }

    /// Effects currently wired, in order
    pub fn active_effects(&self) -> &[EffectKind] {
        self.graph.chain()
    }

    /// "No Filter" or the active effects joined with " + "
    pub fn indicator_text(&self) -> String {
        indicator_text(self.graph.chain())
    }

    fn rewire_for_mode(&mut self) -> Result<()> {
        match self.mode {
            ControlMode::Continuous => self.graph.reconfigure(&CONTINUOUS_CHAIN),
            ControlMode::Toggle => self.graph.reconfigure(&[]),
        }
    }

    /// Set the non-hand-controlled parameters of every effect
    fn load_mode_parameters(&mut self) -> ApplyReport {
        let targets: Vec<(EffectKind, Vec<EffectParam>)> = match self.mode {
            ControlMode::Continuous => vec![
                (
                    EffectKind::Distortion,
                    vec![EffectParam::Wet(0.0), EffectParam::Drive(0.0)],
                ),
                (
                    EffectKind::Chorus,
                    vec![
                        EffectParam::Wet(0.0),
                        EffectParam::Depth(0.0),
                        EffectParam::Rate(CONTINUOUS_CHORUS_RATE_HZ),
                    ],
                ),
                (
                    EffectKind::Delay,
                    vec![
                        EffectParam::Wet(0.0),
                        EffectParam::Feedback(0.0),
                        EffectParam::DelayTime(CONTINUOUS_DELAY_SECS),
                    ],
                ),
                (
                    EffectKind::Filter,
                    vec![
                        EffectParam::Wet(1.0),
                        EffectParam::Cutoff(CONTINUOUS_FILTER_HZ),
                        EffectParam::Q(1.0),
                    ],
                ),
                (
                    EffectKind::Reverb,
                    vec![
                        EffectParam::Wet(0.0),
                        EffectParam::Decay(CONTINUOUS_REVERB_DECAY_SECS),
                    ],
                ),
            ],
            ControlMode::Toggle => {
                let k = &self.knobs;
                vec![
                    (
                        EffectKind::Distortion,
                        vec![EffectParam::Wet(1.0), EffectParam::Amount(k.distortion_amount)],
                    ),
                    (
                        EffectKind::Chorus,
                        vec![
                            EffectParam::Wet(1.0),
                            EffectParam::Depth(k.chorus_depth),
                            EffectParam::Rate(k.chorus_rate),
                        ],
                    ),
                    (
                        EffectKind::Delay,
                        vec![
                            EffectParam::Wet(1.0),
                            EffectParam::Feedback(k.echo_feedback),
                            EffectParam::DelayTime(k.echo_delay),
                        ],
                    ),
                    (
                        EffectKind::Reverb,
                        vec![EffectParam::Wet(1.0), EffectParam::Decay(k.reverb_decay_secs())],
                    ),
                ]
            }
        };

        let mut report = ApplyReport::default();
        for (kind, params) in targets {
            let result = self.graph.node_mut(kind).apply_all(&params);
            report.record(kind, result);
        }
        report
    }
}

/// Indicator text for a chain
pub fn indicator_text(chain: &[EffectKind]) -> String {
    if chain.is_empty() {
        "No Filter".to_string()
    } else {
        chain
            .iter()
            .map(|k| k.display_name())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}
