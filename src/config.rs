//! Settings
//!
//! Every tunable knob of a session, loadable from and savable to JSON.
//! Missing fields take their defaults, and [`Settings::validate`] pulls
//! every value back into range.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capture::CaptureMode;
use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
use crate::engine::controller::ControlMode;
use crate::error::{FxError, Result};
use crate::tracking::DetectorConfig;

/// Audio context settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    /// 1 (mono) or 2 (stereo)
    pub channels: u16,
    /// Samples per processing block
    pub block_size: usize,
    /// Linear master volume (0-1)
    pub master_volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
            block_size: 1470,
            master_volume: 0.5,
        }
    }
}

/// Effect knobs used in toggle mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    /// Chorus modulation depth (0-1)
    pub chorus_depth: f32,
    /// Chorus LFO rate in Hz (0.1-10)
    pub chorus_rate: f32,
    /// Distortion curve amount (0-1000)
    pub distortion_amount: f32,
    /// Reverb impulse length in seconds (0.1-5)
    pub reverb_duration: f32,
    /// Reverb envelope decay as a fraction of the duration (0.01-1)
    pub reverb_decay: f32,
    /// Echo delay in seconds (0.001-1)
    pub echo_delay: f32,
    /// Echo feedback (0-0.95)
    pub echo_feedback: f32,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            chorus_depth: 0.5,
            chorus_rate: 1.5,
            distortion_amount: 400.0,
            reverb_duration: 0.5,
            reverb_decay: 0.1,
            echo_delay: 0.3,
            echo_feedback: 0.3,
        }
    }
}

impl EffectSettings {
    /// Reverb decay time in seconds
    ///
    /// The envelope `exp(-t / (duration * decay))` falls 60 dB after
    /// `duration * decay * ln(1000)` seconds.
    pub fn reverb_decay_secs(&self) -> f32 {
        self.reverb_duration * self.reverb_decay * 1000.0_f32.ln()
    }
}

/// Hand tracking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    pub detector: DetectorConfig,
    /// Frames between accepted gestures
    pub gesture_cooldown_frames: u32,
    /// Distance-to-extension multiplier
    pub extension_gain: f32,
    /// Process only the newest pending camera frame
    pub drop_stale_frames: bool,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            gesture_cooldown_frames: 30,
            extension_gain: 5.0,
            drop_stale_frames: true,
        }
    }
}

/// Recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub mode: CaptureMode,
    /// Container types to try, most preferred first
    pub preferred_mime_types: Vec<String>,
    /// Chunk length of the media recorder
    pub timeslice_ms: u64,
    /// How long audio keeps flowing into the tap after stop
    pub audio_grace_ms: u64,
    pub frame_rate: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            mode: CaptureMode::Separate,
            preferred_mime_types: vec![
                "video/webm;codecs=vp9".to_string(),
                "video/webm;codecs=vp8".to_string(),
                "video/webm".to_string(),
            ],
            timeslice_ms: 1000,
            audio_grace_ms: 500,
            frame_rate: 30,
        }
    }
}

/// Canvas settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub mirror_video: bool,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mirror_video: true,
            canvas_width: 640,
            canvas_height: 480,
        }
    }
}

/// All session settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: ControlMode,
    pub audio: AudioSettings,
    pub effects: EffectSettings,
    pub tracking: TrackingSettings,
    pub capture: CaptureSettings,
    pub render: RenderSettings,
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// # Errors
    /// * `Io` - If the file cannot be read
    /// * `Serialization` - If the JSON is malformed
    /// * `InvalidSettings` - If a structural value is unusable
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Restore every default
    pub fn reset(&mut self) {
        *self = Settings::default();
    }

    /// Clamp every knob into range
    ///
    /// # Errors
    /// * `InvalidSettings` - For values that cannot be clamped meaningfully
    ///   (zero sample rate or block size, more than two channels, empty canvas)
    pub fn validate(&mut self) -> Result<()> {
        let audio = &mut self.audio;
        if audio.sample_rate == 0 {
            return Err(FxError::InvalidSettings {
                reason: "sample_rate must be positive".to_string(),
            });
        }
        if audio.block_size == 0 {
            return Err(FxError::InvalidSettings {
                reason: "block_size must be positive".to_string(),
            });
        }
        if !(1..=2).contains(&audio.channels) {
            return Err(FxError::InvalidSettings {
                reason: format!("{} channels (only mono/stereo supported)", audio.channels),
            });
        }
        audio.master_volume = clamp_or(audio.master_volume, 0.0, 1.0, 0.5);

        let fx = &mut self.effects;
        fx.chorus_depth = clamp_or(fx.chorus_depth, 0.0, 1.0, 0.5);
        fx.chorus_rate = clamp_or(fx.chorus_rate, 0.1, 10.0, 1.5);
        fx.distortion_amount = clamp_or(fx.distortion_amount, 0.0, 1000.0, 400.0);
        fx.reverb_duration = clamp_or(fx.reverb_duration, 0.1, 5.0, 0.5);
        fx.reverb_decay = clamp_or(fx.reverb_decay, 0.01, 1.0, 0.1);
        fx.echo_delay = clamp_or(fx.echo_delay, 0.001, 1.0, 0.3);
        fx.echo_feedback = clamp_or(fx.echo_feedback, 0.0, 0.95, 0.3);

        let tracking = &mut self.tracking;
        tracking.detector = tracking.detector.validated();
        tracking.extension_gain = clamp_or(tracking.extension_gain, 0.1, 100.0, 5.0);

        let capture = &mut self.capture;
        capture.timeslice_ms = capture.timeslice_ms.clamp(100, 10_000);
        capture.audio_grace_ms = capture.audio_grace_ms.min(5_000);
        capture.frame_rate = capture.frame_rate.clamp(1, 120);

        if self.render.canvas_width == 0 || self.render.canvas_height == 0 {
            return Err(FxError::InvalidSettings {
                reason: "canvas size must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.mode, ControlMode::Continuous);
        assert_eq!(settings.audio.master_volume, 0.5);
        assert_eq!(settings.effects.distortion_amount, 400.0);
        assert_eq!(settings.tracking.gesture_cooldown_frames, 30);
        assert_eq!(settings.capture.audio_grace_ms, 500);
        assert_eq!(settings.capture.mode, CaptureMode::Separate);
        assert!(settings.render.mirror_video);
    }

    #[test]
    fn test_reverb_decay_derivation() {
        let fx = EffectSettings::default();
        assert!((fx.reverb_decay_secs() - 0.5 * 0.1 * 6.907_755).abs() < 1e-4);
    }

    #[test]
    fn test_validate_clamps_knobs() {
        let mut settings = Settings::default();
        settings.audio.master_volume = 3.0;
        settings.effects.echo_feedback = 2.0;
        settings.effects.chorus_rate = f32::NAN;
        settings.validate().unwrap();
        assert_eq!(settings.audio.master_volume, 1.0);
        assert_eq!(settings.effects.echo_feedback, 0.95);
        assert_eq!(settings.effects.chorus_rate, 1.5);
    }

    #[test]
    fn test_validate_rejects_structural_errors() {
        let mut settings = Settings::default();
        settings.audio.channels = 6;
        assert!(matches!(
            settings.validate(),
            Err(FxError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"mode": "toggle", "effects": {"echo_delay": 0.5}}"#).unwrap();
        assert_eq!(settings.mode, ControlMode::Toggle);
        assert_eq!(settings.effects.echo_delay, 0.5);
        assert_eq!(settings.effects.echo_feedback, 0.3);
        assert_eq!(settings.audio, AudioSettings::default());
    }

    #[test]
    fn test_save_load_and_reset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.capture.mode = CaptureMode::Muxed;
        settings.save(&path).unwrap();

        let mut loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);

        loaded.reset();
        assert_eq!(loaded, Settings::default());
    }
}
