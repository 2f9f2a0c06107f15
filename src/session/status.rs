//! Control surface state
//!
//! A serializable snapshot of everything the user-facing panel shows.

use serde::Serialize;

use crate::capture::RecordingSummary;
use crate::dsp::EffectKind;
use crate::engine::ControlMode;
use crate::tracking::{FingerState, GestureLabel};

/// Readiness of one subsystem, with its last persistent error
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubsystemStatus {
    pub ready: bool,
    pub error: Option<String>,
}

impl SubsystemStatus {
    pub fn fail(&mut self, message: String) {
        self.ready = false;
        self.error = Some(message);
    }

    pub fn up(&mut self) {
        self.ready = true;
    }
}

/// Frame loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames_received: u64,
    pub frames_processed: u64,
    /// Superseded by a newer pending frame
    pub frames_dropped: u64,
    pub detection_failures: u64,
    /// Arrived after the camera reported a device error
    pub frames_rejected: u64,
    pub audio_blocks: u64,
    /// Arrived while audio was suspended
    pub audio_blocks_discarded: u64,
}

/// What the control surface displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSnapshot {
    pub mode: ControlMode,
    pub fingers: FingerState,
    /// Last accepted gesture, the one driving the effects
    pub gesture: GestureLabel,
    pub gesture_text: String,
    /// Label of the latest frame, possibly still in cooldown
    pub detected_gesture: GestureLabel,
    pub active_effects: Vec<EffectKind>,
    pub indicator: String,
    pub camera: SubsystemStatus,
    pub tracking: SubsystemStatus,
    pub audio: SubsystemStatus,
    pub recording: bool,
    /// `m:ss`
    pub elapsed: String,
    pub recordings: Vec<RecordingSummary>,
    pub audio_level_db: f32,
    pub audio_peak_db: f32,
    /// Meter fill in [0, 1]
    pub meter: f32,
    pub notice: Option<String>,
    pub stats: SessionStats,
}

impl ControlSnapshot {
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
