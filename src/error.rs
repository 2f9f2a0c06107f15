//! Error handling for fingerfx
//!
//! Every error belongs to one category of the failure taxonomy. Failures at
//! capture and initialization boundaries are shown to the user; failures in
//! the middle of the per-frame pipeline are logged and absorbed.

use std::fmt;

use thiserror::Error;

use crate::dsp::EffectKind;

/// Result type alias for fingerfx operations
pub type Result<T> = std::result::Result<T, FxError>;

/// Capture device that can fail to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Camera,
    Microphone,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Camera => write!(f, "camera"),
            Device::Microphone => write!(f, "microphone"),
        }
    }
}

/// Failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Camera or microphone unavailable; persistent, never retried automatically
    Device,
    /// Pose detector failed to load; tracking unavailable until restart
    Initialization,
    /// A single frame failed; logged and skipped
    Transient,
    /// One effect failed to update; other effects unaffected
    AudioGraph,
    /// Missing or empty capture payload
    Recording,
    /// Invalid settings
    Configuration,
    /// File system and encoding
    Io,
}

/// Main error type for fingerfx operations
#[derive(Error, Debug)]
pub enum FxError {
    // Device Errors
    #[error("{device} unavailable: {reason}")]
    DeviceUnavailable { device: Device, reason: String },

    // Initialization Errors
    #[error("Hand detector failed to start: {reason}")]
    DetectorInit { reason: String },

    // Transient Errors
    #[error("Landmark detection failed on frame {frame}: {reason}")]
    FrameDetection { frame: u64, reason: String },

    #[error("Invalid video frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("Session event loop has shut down")]
    SessionClosed,

    // Audio Graph Errors
    #[error("Effect '{effect}' is not initialized")]
    NodeNotInitialized { effect: EffectKind },

    #[error("Invalid value for {effect} {param}: {value}")]
    InvalidParameter {
        effect: EffectKind,
        param: &'static str,
        value: f32,
    },

    #[error("Effect '{effect}' has no parameter '{param}'")]
    UnsupportedParameter {
        effect: EffectKind,
        param: &'static str,
    },

    #[error("Graph wiring rejected: {reason}")]
    GraphWiring { reason: String },

    // Recording Errors
    #[error("Cannot record: {subsystem} is not ready")]
    NotReady { subsystem: &'static str },

    #[error("A recording is already in progress")]
    RecordingInProgress,

    #[error("Recording failed: {reason}")]
    RecordingFailed { reason: String },

    #[error("Recording not found: {id}")]
    RecordingNotFound { id: String },

    // Audio Format Errors
    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid audio: {reason}")]
    InvalidAudio { reason: String },

    // Configuration Errors
    #[error("Invalid settings: {reason}")]
    InvalidSettings { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Frame encoding error: {0}")]
    Image(#[from] image::ImageError),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::DeviceUnavailable { .. } => "DEVICE_UNAVAILABLE",
            FxError::DetectorInit { .. } => "DETECTOR_INIT",
            FxError::FrameDetection { .. } => "FRAME_DETECTION",
            FxError::InvalidFrame { .. } => "INVALID_FRAME",
            FxError::SessionClosed => "SESSION_CLOSED",
            FxError::NodeNotInitialized { .. } => "NODE_NOT_INITIALIZED",
            FxError::InvalidParameter { .. } => "INVALID_PARAMETER",
            FxError::UnsupportedParameter { .. } => "UNSUPPORTED_PARAMETER",
            FxError::GraphWiring { .. } => "GRAPH_WIRING",
            FxError::NotReady { .. } => "NOT_READY",
            FxError::RecordingInProgress => "RECORDING_IN_PROGRESS",
            FxError::RecordingFailed { .. } => "RECORDING_FAILED",
            FxError::RecordingNotFound { .. } => "RECORDING_NOT_FOUND",
            FxError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            FxError::InvalidAudio { .. } => "INVALID_AUDIO",
            FxError::InvalidSettings { .. } => "INVALID_SETTINGS",
            FxError::Io(_) => "IO_ERROR",
            FxError::Wav(_) => "WAV_ERROR",
            FxError::Image(_) => "IMAGE_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Which part of the failure taxonomy this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            FxError::DeviceUnavailable { .. } => ErrorCategory::Device,
            FxError::DetectorInit { .. } | FxError::SessionClosed => ErrorCategory::Initialization,
            FxError::FrameDetection { .. } | FxError::InvalidFrame { .. } => {
                ErrorCategory::Transient
            }
            FxError::NodeNotInitialized { .. }
            | FxError::InvalidParameter { .. }
            | FxError::UnsupportedParameter { .. }
            | FxError::GraphWiring { .. } => ErrorCategory::AudioGraph,
            FxError::NotReady { .. }
            | FxError::RecordingInProgress
            | FxError::RecordingFailed { .. }
            | FxError::RecordingNotFound { .. } => ErrorCategory::Recording,
            FxError::InvalidSettings { .. } => ErrorCategory::Configuration,
            FxError::UnsupportedFormat { .. }
            | FxError::InvalidAudio { .. }
            | FxError::Io(_)
            | FxError::Wav(_)
            | FxError::Image(_)
            | FxError::Serialization(_) => ErrorCategory::Io,
        }
    }

    /// Check if the session can keep running after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Device | ErrorCategory::Initialization
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FxError::DeviceUnavailable { .. } => vec![
                "Allow camera and microphone permissions",
                "Check that no other application is using the device",
            ],
            FxError::DetectorInit { .. } => vec![
                "Restart the application to retry hand detection",
                "Check that the detector model files are available",
            ],
            FxError::NotReady { .. } => vec![
                "Make sure camera and audio are ready before recording",
                "Start the audio system first",
            ],
            FxError::RecordingFailed { .. } => vec![
                "Record for at least a second",
                "Check that the microphone is producing audio",
            ],
            FxError::InvalidSettings { .. } => vec!["Reset the settings to their defaults"],
            _ => vec![],
        }
    }

    /// Actionable text for the control surface
    pub fn user_message(&self) -> String {
        match self {
            FxError::DeviceUnavailable { device, .. } => format!(
                "Could not access the {}. Please check permissions.",
                device
            ),
            FxError::DetectorInit { .. } => {
                "Error initializing hand detection. Please restart.".to_string()
            }
            FxError::NotReady { .. } => {
                "Please make sure camera and audio are ready before recording!".to_string()
            }
            FxError::RecordingFailed { reason } => {
                format!("Error processing recording: {}", reason)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FxError::NotReady { subsystem: "audio" };
        assert_eq!(err.error_code(), "NOT_READY");
        assert_eq!(err.category(), ErrorCategory::Recording);
    }

    #[test]
    fn test_device_errors_are_persistent() {
        let err = FxError::DeviceUnavailable {
            device: Device::Camera,
            reason: "permission denied".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.user_message().contains("camera"));
    }

    #[test]
    fn test_effect_errors_are_recoverable() {
        let err = FxError::NodeNotInitialized {
            effect: EffectKind::Chorus,
        };
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::AudioGraph);
        assert_eq!(err.to_string(), "Effect 'chorus' is not initialized");
    }
}
