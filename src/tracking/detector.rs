//! Hand landmark detector interface
//!
//! The pose-estimation model itself lives outside this crate. Anything that
//! can turn a camera frame into a [`LandmarkFrame`] plugs in through
//! [`LandmarkDetector`]; [`ScriptedDetector`] replays a recorded track.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FxError, Result};
use crate::render::VideoFrame;
use crate::tracking::landmark::LandmarkFrame;

/// Detector tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum confidence for a new detection (0-1)
    pub min_detection_confidence: f32,
    /// Minimum confidence to keep tracking a hand (0-1)
    pub min_tracking_confidence: f32,
    /// Hands to track; only one is supported
    pub max_num_hands: u32,
    /// Model size: 0 lite, 1 full
    pub model_complexity: u8,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            max_num_hands: 1,
            model_complexity: 1,
        }
    }
}

impl DetectorConfig {
    /// Clamp every field into range
    pub fn validated(mut self) -> Self {
        let unit = |v: f32, default: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { default };
        self.min_detection_confidence = unit(self.min_detection_confidence, 0.5);
        self.min_tracking_confidence = unit(self.min_tracking_confidence, 0.5);
        self.max_num_hands = 1;
        self.model_complexity = self.model_complexity.min(1);
        self
    }
}

/// Source of hand landmarks for camera frames
#[allow(async_fn_in_trait)]
pub trait LandmarkDetector {
    /// Load the model
    ///
    /// # Errors
    /// * `DetectorInit` - If the model cannot be loaded; tracking stays unavailable
    async fn initialize(&mut self) -> Result<()>;

    /// Detect a hand in one frame; `Ok(None)` when no hand is visible
    ///
    /// # Errors
    /// * `FrameDetection` - A transient failure for this frame only
    async fn detect(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkFrame>>;

    fn config(&self) -> &DetectorConfig;
}

/// Replays a prerecorded landmark track, one entry per camera frame
///
/// Each entry is either a hand or `null` for "no hand". Past the end of the
/// track every frame reads as no hand.
#[derive(Debug, Clone)]
pub struct ScriptedDetector {
    config: DetectorConfig,
    track: Vec<Option<LandmarkFrame>>,
    position: usize,
    initialized: bool,
    fail_init: bool,
}

impl ScriptedDetector {
    pub fn new(track: Vec<Option<LandmarkFrame>>) -> Self {
        Self {
            config: DetectorConfig::default(),
            track,
            position: 0,
            initialized: false,
            fail_init: false,
        }
    }

    pub fn with_config(mut self, config: DetectorConfig) -> Self {
        self.config = config.validated();
        self
    }

    /// Make [`LandmarkDetector::initialize`] fail, for exercising the init error path
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Parse a JSON track: an array of landmark frames or nulls
    pub fn from_json(json: &str) -> Result<Self> {
        let track: Vec<Option<LandmarkFrame>> = serde_json::from_str(json)?;
        Ok(Self::new(track))
    }

    /// Load a JSON track from disk
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }

    /// The recorded hands, one entry per frame
    pub fn track(&self) -> &[Option<LandmarkFrame>] {
        &self.track
    }

    /// Frames consumed so far
    pub fn position(&self) -> usize {
        self.position
    }
}

impl LandmarkDetector for ScriptedDetector {
    async fn initialize(&mut self) -> Result<()> {
        if self.fail_init {
            return Err(FxError::DetectorInit {
                reason: "scripted initialization failure".to_string(),
            });
        }
        self.initialized = true;
        Ok(())
    }

    async fn detect(&mut self, _frame: &VideoFrame) -> Result<Option<LandmarkFrame>> {
        if !self.initialized {
            return Err(FxError::FrameDetection {
                frame: self.position as u64,
                reason: "detector not initialized".to_string(),
            });
        }
        let result = self.track.get(self.position).cloned().flatten();
        self.position += 1;
        Ok(result)
    }

    fn config(&self) -> &DetectorConfig {
        &self.config
    }
}
