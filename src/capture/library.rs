//! Finished recordings
//!
//! Recordings live in memory for the session. Export writes them to disk on
//! request as `{name}-video.{ext}` plus `{name}-audio.wav`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::capture::media::MediaPayload;
use crate::engine::wav::WAV_HEADER_LEN;
use crate::error::{FxError, Result};

/// Format a duration as `m:ss`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Captured media of one recording
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingPayload {
    /// Video container and a 16-bit PCM WAV of the processed audio
    Separate { video: MediaPayload, audio_wav: Vec<u8> },
    /// One container holding both
    Muxed(MediaPayload),
}

impl RecordingPayload {
    /// Length of the captured content
    pub fn content_duration(&self) -> Duration {
        match self {
            RecordingPayload::Separate { video, audio_wav } => {
                video.duration.max(wav_duration(audio_wav))
            }
            RecordingPayload::Muxed(media) => media.duration,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            RecordingPayload::Separate { video, audio_wav } => video.bytes.len() + audio_wav.len(),
            RecordingPayload::Muxed(media) => media.bytes.len(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RecordingPayload::Separate { .. } => "separate",
            RecordingPayload::Muxed(_) => "muxed",
        }
    }
}

/// Duration of a canonical PCM16 WAV, read from its header
fn wav_duration(wav: &[u8]) -> Duration {
    if wav.len() < WAV_HEADER_LEN {
        return Duration::ZERO;
    }
    let channels = u16::from_le_bytes([wav[22], wav[23]]) as u64;
    let rate = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]) as u64;
    if channels == 0 || rate == 0 {
        return Duration::ZERO;
    }
    let frames = (wav.len() - WAV_HEADER_LEN) as u64 / (2 * channels);
    Duration::from_secs_f64(frames as f64 / rate as f64)
}

/// A finished recording
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub duration: Duration,
    pub payload: RecordingPayload,
}

impl Recording {
    pub fn new(payload: RecordingPayload, duration: Duration, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: created_at.format("recording-%Y-%m-%dT%H-%M-%S").to_string(),
            created_at,
            duration,
            payload,
        }
    }

    pub fn duration_text(&self) -> String {
        format_elapsed(self.duration)
    }

    pub fn summary(&self) -> RecordingSummary {
        RecordingSummary {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
            duration_secs: self.duration.as_secs_f64(),
            duration_text: self.duration_text(),
            kind: self.payload.kind(),
            size_bytes: self.payload.size_bytes(),
        }
    }

    /// Write the payload files into `dir`
    ///
    /// # Returns
    /// The paths written, video first
    pub fn export(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        match &self.payload {
            RecordingPayload::Separate { video, audio_wav } => {
                let video_path = dir.join(format!("{}-video.{}", self.name, video.extension()));
                fs::write(&video_path, &video.bytes)?;
                written.push(video_path);

                let audio_path = dir.join(format!("{}-audio.wav", self.name));
                fs::write(&audio_path, audio_wav)?;
                written.push(audio_path);
            }
            RecordingPayload::Muxed(media) => {
                let path = dir.join(format!("{}.{}", self.name, media.extension()));
                fs::write(&path, &media.bytes)?;
                written.push(path);
            }
        }
        log::info!("Exported {} to {}", self.name, dir.display());
        Ok(written)
    }
}

/// Listing entry for the control surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSummary {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub duration_text: String,
    pub kind: &'static str,
    pub size_bytes: usize,
}

/// In-memory recordings, oldest first
#[derive(Debug, Clone, Default)]
pub struct RecordingLibrary {
    recordings: Vec<Recording>,
}

impl RecordingLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, recording: Recording) {
        self.recordings.push(recording);
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recording> {
        self.recordings.iter()
    }

    pub fn list(&self) -> Vec<RecordingSummary> {
        self.recordings.iter().map(Recording::summary).collect()
    }

    /// # Errors
    /// * `RecordingNotFound` - If no recording has this id
    pub fn get(&self, id: Uuid) -> Result<&Recording> {
        self.recordings
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| FxError::RecordingNotFound { id: id.to_string() })
    }

    /// Remove a recording, releasing its payload
    pub fn delete(&mut self, id: Uuid) -> Result<Recording> {
        let index = self
            .recordings
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| FxError::RecordingNotFound { id: id.to_string() })?;
        let removed = self.recordings.remove(index);
        log::info!("Deleted {}", removed.name);
        Ok(removed)
    }

    pub fn export(&self, id: Uuid, dir: &Path) -> Result<Vec<PathBuf>> {
        self.get(id)?.export(dir)
    }

    /// Export every recording into `dir`
    pub fn export_all(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for recording in &self.recordings {
            written.extend(recording.export(dir)?);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::media::CONTAINER_MIME_TYPE;
    use crate::engine::wav::encode_wav;
    use crate::engine::AudioBuffer;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use test_case::test_case;

    fn video() -> MediaPayload {
        MediaPayload {
            mime_type: "video/webm;codecs=vp9".to_string(),
            bytes: vec![1, 2, 3],
            frame_count: 3,
            audio_samples: 0,
            duration: Duration::from_millis(100),
        }
    }

    fn recording() -> Recording {
        let audio = AudioBuffer::mono(vec![0.0; 44100 * 2], 44100);
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let payload = RecordingPayload::Separate {
            video: video(),
            audio_wav: encode_wav(&audio).unwrap(),
        };
        let duration = payload.content_duration();
        Recording::new(payload, duration, created)
    }

    #[test_case(0, "0:00" ; "zero")]
    #[test_case(9, "0:09" ; "seconds")]
    #[test_case(75, "1:15" ; "minutes")]
    #[test_case(3600, "60:00" ; "hour")]
    fn test_format_elapsed(secs: u64, expected: &str) {
        assert_eq!(format_elapsed(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn test_name_and_duration() {
        let r = recording();
        assert_eq!(r.name, "recording-2024-03-09T14-05-07");
        assert_eq!(r.duration, Duration::from_secs(2));
        assert_eq!(r.duration_text(), "0:02");
    }

    #[test]
    fn test_library_get_delete() {
        let mut library = RecordingLibrary::new();
        let r = recording();
        let id = r.id;
        library.add(r);
        assert_eq!(library.len(), 1);
        assert_eq!(library.list()[0].kind, "separate");
        assert!(library.get(id).is_ok());

        library.delete(id).unwrap();
        assert!(library.is_empty());
        assert!(matches!(
            library.get(id),
            Err(FxError::RecordingNotFound { .. })
        ));
        assert!(library.delete(id).is_err());
    }

    #[test]
    fn test_export_separate_writes_two_files() {
        let dir = tempdir().unwrap();
        let r = recording();
        let written = r.export(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("recording-2024-03-09T14-05-07-video.webm"));
        assert!(written[1].ends_with("recording-2024-03-09T14-05-07-audio.wav"));
        assert_eq!(fs::read(&written[0]).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            fs::metadata(&written[1]).unwrap().len() as usize,
            WAV_HEADER_LEN + 2 * 44100 * 2
        );
    }

    #[test]
    fn test_export_muxed_writes_one_file() {
        let dir = tempdir().unwrap();
        let media = MediaPayload {
            mime_type: CONTAINER_MIME_TYPE.to_string(),
            ..video()
        };
        let r = Recording::new(RecordingPayload::Muxed(media), Duration::ZERO, Utc::now());
        let written = r.export(dir.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].extension().unwrap(), "fxav");
    }
}
