//! Capture coordinator
//!
//! Starts and stops the audio tap and the media recorder as one recording.
//! Stopping is two-phase: the media recorder finalizes on its own task and
//! reports back with [`CaptureEvent::VideoFinalized`], while the tap keeps
//! collecting processed audio until [`CaptureEvent::AudioGraceElapsed`].
//! The recording is assembled only when both have arrived.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::capture::library::{Recording, RecordingPayload};
use crate::capture::media::{negotiate_mime_type, MediaPayload, MediaRecorder, MediaRecorderFactory};
use crate::capture::recorder::TapRecorder;
use crate::capture::CaptureMode;
use crate::config::CaptureSettings;
use crate::engine::wav::encode_wav;
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use crate::render::VideoFrame;

/// Recording lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    /// Waiting for the media payload and the audio grace period
    Stopping,
}

/// What must be up before a recording may start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub tracking: bool,
    pub audio: bool,
}

impl Readiness {
    pub fn all() -> Self {
        Self {
            tracking: true,
            audio: true,
        }
    }
}

/// Completion notices sent back to the event loop
///
/// `take` identifies the recording the notice belongs to; notices for an
/// abandoned take are ignored.
#[derive(Debug)]
pub enum CaptureEvent {
    VideoFinalized {
        take: u64,
        result: Result<MediaPayload>,
    },
    AudioGraceElapsed {
        take: u64,
    },
}

/// Coordinates one recording at a time
pub struct CaptureCoordinator<F: MediaRecorderFactory, E> {
    factory: F,
    settings: CaptureSettings,
    notify: mpsc::WeakUnboundedSender<E>,
    state: CaptureState,
    take: u64,
    started_at: Option<Instant>,
    stopped_after: Option<Duration>,
    tap: TapRecorder,
    media: Option<F::Recorder>,
    pending_video: Option<MediaPayload>,
    audio_closed: bool,
}

impl<F, E> CaptureCoordinator<F, E>
where
    F: MediaRecorderFactory,
    E: From<CaptureEvent> + Send + 'static,
{
    /// # Arguments
    /// * `notify` - Channel the completion notices are sent on. Only a weak
    ///   handle is kept, so the coordinator never holds the channel open.
    pub fn new(
        factory: F,
        settings: CaptureSettings,
        channels: usize,
        sample_rate: u32,
        notify: mpsc::WeakUnboundedSender<E>,
    ) -> Self {
        Self {
            factory,
            settings,
            notify,
            state: CaptureState::Idle,
            take: 0,
            started_at: None,
            stopped_after: None,
            tap: TapRecorder::new(channels, sample_rate),
            media: None,
            pending_video: None,
            audio_closed: false,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn mode(&self) -> CaptureMode {
        self.settings.mode
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    /// Time since the recording started, frozen once stopped
    pub fn elapsed(&self) -> Duration {
        match (self.state, self.started_at) {
            (CaptureState::Recording, Some(start)) => start.elapsed(),
            (CaptureState::Stopping, _) => self.stopped_after.unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }

    /// Start a new recording
    ///
    /// # Errors
    /// * `NotReady` - If hand tracking or audio is not running; nothing changes
    /// * `RecordingInProgress` - If a recording is running or still finalizing
    /// * `UnsupportedFormat` - If the media recorder cannot be created
    pub fn start_recording(&mut self, readiness: Readiness) -> Result<()> {
        if !readiness.tracking {
            return Err(FxError::NotReady {
                subsystem: "hand tracking",
            });
        }
        if !readiness.audio {
            return Err(FxError::NotReady { subsystem: "audio" });
        }
        if self.state != CaptureState::Idle {
            return Err(FxError::RecordingInProgress);
        }

        let mime_type = negotiate_mime_type(&self.factory, &self.settings.preferred_mime_types);
        let timeslice = Duration::from_millis(self.settings.timeslice_ms);
        let media = self.factory.create(&mime_type, timeslice)?;

        self.take += 1;
        self.media = Some(media);
        self.pending_video = None;
        self.stopped_after = None;
        match self.settings.mode {
            CaptureMode::Separate => {
                self.tap.start();
                self.audio_closed = false;
            }
            CaptureMode::Muxed => {
                self.tap.discard();
                self.audio_closed = true;
            }
        }
        self.started_at = Some(Instant::now());
        self.state = CaptureState::Recording;
        log::info!(
            "Recording {} started ({:?}, {})",
            self.take,
            self.settings.mode,
            mime_type
        );
        Ok(())
    }

    /// Feed one processed audio block
    ///
    /// The tap keeps accepting blocks through the grace period after stop.
    pub fn push_audio(&mut self, block: &AudioBuffer) {
        match self.settings.mode {
            CaptureMode::Separate => {
                if let Err(err) = self.tap.push(block) {
                    log::warn!("Dropping audio block from recording: {}", err);
                }
            }
            CaptureMode::Muxed => {
                if self.state != CaptureState::Recording {
                    return;
                }
                if let Some(media) = self.media.as_mut() {
                    if let Err(err) = media.push_audio(block) {
                        log::warn!("Media recorder rejected audio: {}", err);
                    }
                }
            }
        }
    }

    /// Feed one rendered frame
    pub fn push_frame(&mut self, frame: &VideoFrame) {
        if self.state != CaptureState::Recording {
            return;
        }
        if let Some(media) = self.media.as_mut() {
            if let Err(err) = media.push_frame(frame) {
                log::warn!("Media recorder rejected frame: {}", err);
            }
        }
    }

    /// Stop the running recording
    ///
    /// Returns `Ok(false)` when nothing was recording. The media recorder is
    /// finalized in the background and the audio grace timer is armed; both
    /// report back through the notify channel.
    pub fn stop_recording(&mut self) -> Result<bool> {
        if self.state != CaptureState::Recording {
            return Ok(false);
        }
        let take = self.take;
        let Some(notify) = self.notify.upgrade() else {
            log::warn!("Event loop is gone, dropping recording {}", take);
            self.abandon();
            return Ok(true);
        };
        self.stopped_after = self.started_at.map(|s| s.elapsed());
        self.state = CaptureState::Stopping;

        if let Some(media) = self.media.take() {
            let notify = notify.clone();
            tokio::spawn(async move {
                let result = media.finish().await;
                let _ = notify.send(CaptureEvent::VideoFinalized { take, result }.into());
            });
        }

        if self.settings.mode == CaptureMode::Separate {
            let grace = Duration::from_millis(self.settings.audio_grace_ms);
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                let _ = notify.send(CaptureEvent::AudioGraceElapsed { take }.into());
            });
        }

        log::info!("Recording {} stopping", take);
        Ok(true)
    }

    /// Absorb a completion notice
    ///
    /// Returns the finished recording (or its failure) once both payloads
    /// have arrived; `None` while still waiting.
    pub fn handle_event(&mut self, event: CaptureEvent) -> Option<Result<Recording>> {
        match event {
            CaptureEvent::VideoFinalized { take, result } => {
                if take != self.take || self.state != CaptureState::Stopping {
                    log::debug!("Ignoring media payload for take {}", take);
                    return None;
                }
                match result {
                    Ok(payload) => self.pending_video = Some(payload),
                    Err(err) => {
                        self.abandon();
                        return Some(Err(FxError::RecordingFailed {
                            reason: err.to_string(),
                        }));
                    }
                }
            }
            CaptureEvent::AudioGraceElapsed { take } => {
                if take != self.take || self.state != CaptureState::Stopping {
                    return None;
                }
                self.tap.close();
                self.audio_closed = true;
            }
        }

        if self.pending_video.is_some() && self.audio_closed {
            Some(self.finalize())
        } else {
            None
        }
    }

    /// Drop the running recording and everything captured so far
    pub fn abandon(&mut self) {
        if self.state != CaptureState::Idle {
            log::info!("Recording {} abandoned", self.take);
        }
        self.tap.discard();
        self.media = None;
        self.pending_video = None;
        self.started_at = None;
        self.stopped_after = None;
        self.state = CaptureState::Idle;
    }

    fn finalize(&mut self) -> Result<Recording> {
        let video = self.pending_video.take();
        let audio = self.tap.finish();
        let elapsed = self.stopped_after.unwrap_or_default();
        self.abandon();

        let video = video
            .filter(|v| v.has_video())
            .ok_or_else(|| FxError::RecordingFailed {
                reason: "no video was captured".to_string(),
            })?;

        let payload = match self.settings.mode {
            CaptureMode::Separate => {
                let audio = audio.ok_or_else(|| FxError::RecordingFailed {
                    reason: "no audio was captured".to_string(),
                })?;
                RecordingPayload::Separate {
                    audio_wav: encode_wav(&audio)?,
                    video,
                }
            }
            CaptureMode::Muxed => {
                if !video.has_audio() {
                    return Err(FxError::RecordingFailed {
                        reason: "no audio was captured".to_string(),
                    });
                }
                RecordingPayload::Muxed(video)
            }
        };

        let duration = payload.content_duration().max(elapsed);
        let recording = Recording::new(payload, duration, Utc::now());
        log::info!(
            "Recording {} finished: {} ({})",
            self.take,
            recording.name,
            recording.duration_text()
        );
        Ok(recording)
    }
}
