//! Recording
//!
//! Two independently clocked captures run side by side: processed audio from
//! the graph's recording tap and rendered canvas frames through a media
//! recorder. The coordinator starts and stops them together and only emits a
//! finished [`Recording`] once both payloads have arrived.

pub mod coordinator;
pub mod library;
pub mod media;
pub mod recorder;

use serde::{Deserialize, Serialize};

pub use coordinator::{CaptureCoordinator, CaptureEvent, CaptureState, Readiness};
pub use library::{format_elapsed, Recording, RecordingLibrary, RecordingPayload, RecordingSummary};
pub use media::{
    inspect_container, mime_extension, negotiate_mime_type, ChunkedRecorder,
    ChunkedRecorderFactory, ContainerSummary, MediaPayload, MediaRecorder, MediaRecorderFactory,
    CONTAINER_MIME_TYPE,
};
pub use recorder::TapRecorder;

/// Where the processed audio is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Audio from the graph tap as WAV, video from the media recorder
    #[default]
    Separate,
    /// Audio and video both go through the media recorder
    Muxed,
}
