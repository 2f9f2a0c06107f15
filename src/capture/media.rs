//! Media recorder
//!
//! The video side of a recording. A recorder is created for a negotiated
//! container type, fed rendered frames (and audio blocks in muxed mode), and
//! finalized asynchronously.
//!
//! The built-in [`ChunkedRecorder`] encodes on a background task and writes
//! a simple chunked container:
//!
//! ```text
//! "FXAV" version:u8 mime_len:u16 mime
//! ( "CHNK" start_ms:u64 len:u32 record* )*
//! record = 'V' timestamp_ms:u64 width:u32 height:u32 len:u32 jpeg
//!        | 'A' sample_rate:u32 channels:u16 frames:u32 pcm16le*
//! ```

use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::wav::float_to_pcm16;
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use crate::render::VideoFrame;

// ============================================================================
// Constants
// ============================================================================

/// Container type written by [`ChunkedRecorder`]
pub const CONTAINER_MIME_TYPE: &str = "video/x-fxav";

const MAGIC: &[u8; 4] = b"FXAV";
const CHUNK_TAG: &[u8; 4] = b"CHNK";
const CONTAINER_VERSION: u8 = 1;
const VIDEO_RECORD: u8 = b'V';
const AUDIO_RECORD: u8 = b'A';

/// Default JPEG quality for encoded frames
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// File extension for a container type
pub fn mime_extension(mime_type: &str) -> &'static str {
    let base = mime_type.split(';').next().unwrap_or("").trim();
    match base {
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        CONTAINER_MIME_TYPE => "fxav",
        _ => "bin",
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Finalized output of a media recorder
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub frame_count: usize,
    /// Audio samples per channel (muxed mode only)
    pub audio_samples: usize,
    pub duration: Duration,
}

impl MediaPayload {
    pub fn extension(&self) -> &'static str {
        mime_extension(&self.mime_type)
    }

    pub fn has_video(&self) -> bool {
        self.frame_count > 0 && !self.bytes.is_empty()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_samples > 0
    }
}

/// One running capture of the rendered canvas
pub trait MediaRecorder: Send + 'static {
    fn mime_type(&self) -> &str;

    fn push_frame(&mut self, frame: &VideoFrame) -> Result<()>;

    fn push_audio(&mut self, block: &AudioBuffer) -> Result<()>;

    /// Stop and wait for the finished payload
    fn finish(self) -> impl Future<Output = Result<MediaPayload>> + Send;
}

/// Creates media recorders for supported container types
pub trait MediaRecorderFactory {
    type Recorder: MediaRecorder;

    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Type used when none of the preferred types is supported
    fn default_mime_type(&self) -> &str;

    /// # Errors
    /// * `UnsupportedFormat` - If `mime_type` cannot be recorded
    fn create(&self, mime_type: &str, timeslice: Duration) -> Result<Self::Recorder>;
}

/// First supported type from `preferences`, else the factory default
pub fn negotiate_mime_type<F: MediaRecorderFactory>(factory: &F, preferences: &[String]) -> String {
    match preferences.iter().find(|m| factory.is_type_supported(m)) {
        Some(mime) => mime.clone(),
        None => {
            let fallback = factory.default_mime_type().to_string();
            log::info!(
                "None of [{}] supported, recording as {}",
                preferences.join(", "),
                fallback
            );
            fallback
        }
    }
}

// ============================================================================
// Chunked Recorder
// ============================================================================

enum Record {
    Frame(VideoFrame),
    Audio(AudioBuffer),
}

/// Factory for the built-in chunked container
#[derive(Debug, Clone)]
pub struct ChunkedRecorderFactory {
    jpeg_quality: u8,
}

impl ChunkedRecorderFactory {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

impl Default for ChunkedRecorderFactory {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl MediaRecorderFactory for ChunkedRecorderFactory {
    type Recorder = ChunkedRecorder;

    fn is_type_supported(&self, mime_type: &str) -> bool {
        mime_type == CONTAINER_MIME_TYPE
    }

    fn default_mime_type(&self) -> &str {
        CONTAINER_MIME_TYPE
    }

    fn create(&self, mime_type: &str, timeslice: Duration) -> Result<ChunkedRecorder> {
        if !self.is_type_supported(mime_type) {
            return Err(FxError::UnsupportedFormat {
                format: mime_type.to_string(),
            });
        }
        Ok(ChunkedRecorder::spawn(timeslice, self.jpeg_quality))
    }
}

/// Recorder that encodes frames on a background task
///
/// Must be created inside a tokio runtime.
pub struct ChunkedRecorder {
    sender: mpsc::UnboundedSender<Record>,
    writer: JoinHandle<Result<MediaPayload>>,
}

impl ChunkedRecorder {
    fn spawn(timeslice: Duration, jpeg_quality: u8) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(receiver, timeslice, jpeg_quality));
        Self { sender, writer }
    }

    fn send(&self, record: Record) -> Result<()> {
        self.sender.send(record).map_err(|_| FxError::RecordingFailed {
            reason: "media writer stopped".to_string(),
        })
    }
}

impl MediaRecorder for ChunkedRecorder {
    fn mime_type(&self) -> &str {
        CONTAINER_MIME_TYPE
    }

    fn push_frame(&mut self, frame: &VideoFrame) -> Result<()> {
        self.send(Record::Frame(frame.clone()))
    }

    fn push_audio(&mut self, block: &AudioBuffer) -> Result<()> {
        self.send(Record::Audio(block.clone()))
    }

    fn finish(self) -> impl Future<Output = Result<MediaPayload>> + Send {
        let Self { sender, writer } = self;
        drop(sender);
        async move {
            writer.await.map_err(|e| FxError::RecordingFailed {
                reason: format!("media writer task failed: {}", e),
            })?
        }
    }
}

/// Chunk under construction
struct Chunk {
    start_ms: u64,
    body: Vec<u8>,
}

impl Chunk {
    fn new(start_ms: u64) -> Self {
        Self {
            start_ms,
            body: Vec::new(),
        }
    }

    fn write_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(CHUNK_TAG);
        out.extend_from_slice(&self.start_ms.to_le_bytes());
        out.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.body);
    }
}

async fn run_writer(
    mut receiver: mpsc::UnboundedReceiver<Record>,
    timeslice: Duration,
    jpeg_quality: u8,
) -> Result<MediaPayload> {
    let timeslice_ms = (timeslice.as_millis() as u64).max(1);
    let mut out = container_header(CONTAINER_MIME_TYPE);
    let mut chunk = Chunk::new(0);
    let mut first_frame: Option<Duration> = None;
    let mut last_frame = Duration::ZERO;
    let mut frame_count = 0usize;
    let mut audio_samples = 0usize;
    let mut audio_secs = 0.0f64;

    while let Some(record) = receiver.recv().await {
        match record {
            Record::Frame(frame) => {
                let origin = *first_frame.get_or_insert(frame.timestamp);
                let ts_ms = frame.timestamp.saturating_sub(origin).as_millis() as u64;
                if ts_ms >= chunk.start_ms + timeslice_ms {
                    if !chunk.body.is_empty() {
                        chunk.write_into(&mut out);
                    }
                    chunk = Chunk::new(ts_ms - ts_ms % timeslice_ms);
                }

                let jpeg = encode_jpeg(&frame, jpeg_quality)?;
                chunk.body.push(VIDEO_RECORD);
                chunk.body.extend_from_slice(&ts_ms.to_le_bytes());
                chunk.body.extend_from_slice(&frame.width.to_le_bytes());
                chunk.body.extend_from_slice(&frame.height.to_le_bytes());
                chunk.body.extend_from_slice(&(jpeg.len() as u32).to_le_bytes());
                chunk.body.extend_from_slice(&jpeg);

                last_frame = frame.timestamp;
                frame_count += 1;
            }
            Record::Audio(block) => {
                let frames = block.num_samples();
                chunk.body.push(AUDIO_RECORD);
                chunk.body.extend_from_slice(&block.sample_rate.to_le_bytes());
                chunk.body.extend_from_slice(&(block.num_channels() as u16).to_le_bytes());
                chunk.body.extend_from_slice(&(frames as u32).to_le_bytes());
                for sample in block.to_interleaved() {
                    chunk.body.extend_from_slice(&float_to_pcm16(sample).to_le_bytes());
                }
                audio_samples += frames;
                audio_secs += block.duration_secs();
            }
        }
    }
    if !chunk.body.is_empty() {
        chunk.write_into(&mut out);
    }

    let video_span = first_frame
        .map(|first| last_frame.saturating_sub(first))
        .unwrap_or_default();
    let duration = video_span.max(Duration::from_secs_f64(audio_secs));
    log::debug!(
        "Media writer finished: {} frames, {} audio samples, {} bytes",
        frame_count,
        audio_samples,
        out.len()
    );

    Ok(MediaPayload {
        mime_type: CONTAINER_MIME_TYPE.to_string(),
        bytes: if frame_count == 0 && audio_samples == 0 {
            Vec::new()
        } else {
            out
        },
        frame_count,
        audio_samples,
        duration,
    })
}

fn container_header(mime_type: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(MAGIC);
    out.push(CONTAINER_VERSION);
    out.extend_from_slice(&(mime_type.len() as u16).to_le_bytes());
    out.extend_from_slice(mime_type.as_bytes());
    out
}

fn encode_jpeg(frame: &VideoFrame, quality: u8) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
        encoder.encode(&frame.to_rgb(), frame.width, frame.height, ColorType::Rgb8)?;
    }
    Ok(cursor.into_inner())
}

// ============================================================================
// Container Inspection
// ============================================================================

/// Counts read back from a chunked container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub mime_type: String,
    pub chunks: usize,
    pub frames: usize,
    pub audio_samples: usize,
    /// Start of each chunk in milliseconds
    pub chunk_starts_ms: Vec<u64>,
}

fn truncated() -> FxError {
    FxError::UnsupportedFormat {
        format: "truncated media container".to_string(),
    }
}

fn take<'a>(bytes: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if bytes.len() < n {
        return Err(truncated());
    }
    let (head, tail) = bytes.split_at(n);
    *bytes = tail;
    Ok(head)
}

fn read_u16(bytes: &mut &[u8]) -> Result<u16> {
    let b = take(bytes, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &mut &[u8]) -> Result<u32> {
    let b = take(bytes, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64(bytes: &mut &[u8]) -> Result<u64> {
    let b = take(bytes, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    Ok(u64::from_le_bytes(buf))
}

/// Walk a chunked container and count its records
///
/// # Errors
/// * `UnsupportedFormat` - If the bytes are not a well-formed container
pub fn inspect_container(bytes: &[u8]) -> Result<ContainerSummary> {
    let mut rest = bytes;
    if take(&mut rest, 4)? != MAGIC {
        return Err(FxError::UnsupportedFormat {
            format: "not an FXAV container".to_string(),
        });
    }
    let version = take(&mut rest, 1)?[0];
    if version != CONTAINER_VERSION {
        return Err(FxError::UnsupportedFormat {
            format: format!("FXAV version {}", version),
        });
    }
    let mime_len = read_u16(&mut rest)? as usize;
    let mime_type = String::from_utf8_lossy(take(&mut rest, mime_len)?).into_owned();

    let mut summary = ContainerSummary {
        mime_type,
        chunks: 0,
        frames: 0,
        audio_samples: 0,
        chunk_starts_ms: Vec::new(),
    };

    while !rest.is_empty() {
        if take(&mut rest, 4)? != CHUNK_TAG {
            return Err(truncated());
        }
        summary.chunk_starts_ms.push(read_u64(&mut rest)?);
        let len = read_u32(&mut rest)? as usize;
        let mut body = take(&mut rest, len)?;
        summary.chunks += 1;

        while !body.is_empty() {
            match take(&mut body, 1)?[0] {
                VIDEO_RECORD => {
                    read_u64(&mut body)?;
                    read_u32(&mut body)?;
                    read_u32(&mut body)?;
                    let jpeg_len = read_u32(&mut body)? as usize;
                    take(&mut body, jpeg_len)?;
                    summary.frames += 1;
                }
                AUDIO_RECORD => {
                    read_u32(&mut body)?;
                    let channels = read_u16(&mut body)? as usize;
                    let frames = read_u32(&mut body)? as usize;
                    take(&mut body, frames * channels * 2)?;
                    summary.audio_samples += frames;
                }
                other => {
                    return Err(FxError::UnsupportedFormat {
                        format: format!("unknown record tag {:#04x}", other),
                    })
                }
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct WebmOnly;

    impl MediaRecorderFactory for WebmOnly {
        type Recorder = ChunkedRecorder;

        fn is_type_supported(&self, mime_type: &str) -> bool {
            mime_type == "video/webm"
        }

        fn default_mime_type(&self) -> &str {
            "video/webm"
        }

        fn create(&self, _mime_type: &str, timeslice: Duration) -> Result<ChunkedRecorder> {
            Ok(ChunkedRecorder::spawn(timeslice, 50))
        }
    }

    fn prefs() -> Vec<String> {
        vec![
            "video/webm;codecs=vp9".to_string(),
            "video/webm;codecs=vp8".to_string(),
            "video/webm".to_string(),
        ]
    }

    fn frame_at(ms: u64) -> VideoFrame {
        VideoFrame::solid(8, 8, [40, 80, 120], Duration::from_millis(ms))
    }

    #[test]
    fn test_negotiation_prefers_first_supported() {
        assert_eq!(negotiate_mime_type(&WebmOnly, &prefs()), "video/webm");
    }

    #[test]
    fn test_negotiation_falls_back_to_default() {
        let factory = ChunkedRecorderFactory::default();
        assert_eq!(negotiate_mime_type(&factory, &prefs()), CONTAINER_MIME_TYPE);
        assert!(factory.create("video/webm", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_mime_extension() {
        assert_eq!(mime_extension("video/webm;codecs=vp9"), "webm");
        assert_eq!(mime_extension(CONTAINER_MIME_TYPE), "fxav");
        assert_eq!(mime_extension("application/octet-stream"), "bin");
    }

    #[tokio::test]
    async fn test_frames_are_chunked_by_timeslice() {
        let factory = ChunkedRecorderFactory::default();
        let mut recorder = factory
            .create(CONTAINER_MIME_TYPE, Duration::from_millis(1000))
            .unwrap();
        for ms in [0, 400, 900, 1000, 1500, 2100] {
            recorder.push_frame(&frame_at(ms)).unwrap();
        }
        let payload = recorder.finish().await.unwrap();
        assert_eq!(payload.frame_count, 6);
        assert_eq!(payload.duration, Duration::from_millis(2100));
        assert!(payload.has_video());
        assert!(!payload.has_audio());

        let summary = inspect_container(&payload.bytes).unwrap();
        assert_eq!(summary.mime_type, CONTAINER_MIME_TYPE);
        assert_eq!(summary.frames, 6);
        assert_eq!(summary.chunk_starts_ms, vec![0, 1000, 2000]);
    }

    #[tokio::test]
    async fn test_muxed_audio_records() {
        let mut recorder = ChunkedRecorderFactory::default()
            .create(CONTAINER_MIME_TYPE, Duration::from_secs(1))
            .unwrap();
        recorder.push_frame(&frame_at(0)).unwrap();
        recorder
            .push_audio(&AudioBuffer::mono(vec![0.25; 441], 44100))
            .unwrap();
        recorder
            .push_audio(&AudioBuffer::mono(vec![-0.25; 441], 44100))
            .unwrap();

        let payload = recorder.finish().await.unwrap();
        assert_eq!(payload.audio_samples, 882);
        let summary = inspect_container(&payload.bytes).unwrap();
        assert_eq!(summary.audio_samples, 882);
        assert_eq!(summary.frames, 1);
    }

    #[tokio::test]
    async fn test_empty_recording_has_no_bytes() {
        let recorder = ChunkedRecorderFactory::default()
            .create(CONTAINER_MIME_TYPE, Duration::from_secs(1))
            .unwrap();
        let payload = recorder.finish().await.unwrap();
        assert!(payload.bytes.is_empty());
        assert!(!payload.has_video());
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        assert!(inspect_container(b"RIFF....").is_err());
        let mut header = container_header(CONTAINER_MIME_TYPE);
        header.extend_from_slice(b"CHNK\x00");
        assert!(inspect_container(&header).is_err());
    }
}
