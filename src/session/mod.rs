//! Frame loop
//!
//! One task owns everything: the detector, the controller and its graph,
//! the renderer and the capture coordinator. Camera frames, microphone
//! blocks, user commands and capture completion notices all arrive as
//! [`SessionEvent`]s on a single channel and are handled in order.
//!
//! Per camera frame: detect, interpret (and classify in toggle mode), update
//! the controller, render the overlay, feed the media recorder. Per audio
//! block: run the graph, write the live output, feed the recording tap.

pub mod sink;
pub mod status;

use std::collections::VecDeque;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::capture::{
    format_elapsed, CaptureCoordinator, CaptureEvent, CaptureState, MediaRecorderFactory,
    Readiness, RecordingLibrary,
};
use crate::config::{EffectSettings, Settings};
use crate::engine::buffer::{calculate_peak, calculate_rms, meter_fill, METER_FLOOR_DB};
use crate::engine::{AudioBuffer, ControlMode, EffectController, EffectGraph};
use crate::error::{Device, FxError, Result};
use crate::render::{OverlayRenderer, VideoFrame};
use crate::tracking::{
    FingerState, GestureClassifier, GestureLabel, LandmarkDetector, LandmarkInterpreter,
};

pub use sink::{AudioSink, BufferSink, NullSink, WavFileSink};
pub use status::{ControlSnapshot, SessionStats, SubsystemStatus};

/// Everything the frame loop reacts to
#[derive(Debug)]
pub enum SessionEvent {
    CameraFrame(VideoFrame),
    AudioBlock(AudioBuffer),
    /// User gesture that allows audio to start
    ResumeAudio,
    DeviceError { device: Device, reason: String },
    StartRecording,
    StopRecording,
    DeleteRecording(Uuid),
    SetMode(ControlMode),
    SetMasterVolume(f32),
    UpdateEffects(EffectSettings),
    Capture(CaptureEvent),
    Snapshot(oneshot::Sender<ControlSnapshot>),
    Shutdown,
}

impl From<CaptureEvent> for SessionEvent {
    fn from(event: CaptureEvent) -> Self {
        SessionEvent::Capture(event)
    }
}

/// Sending side of a session
///
/// Dropping every handle ends the loop once pending recordings finish.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// # Errors
    /// * `SessionClosed` - If the loop has exited
    pub fn send(&self, event: SessionEvent) -> Result<()> {
        self.sender.send(event).map_err(|_| FxError::SessionClosed)
    }

    pub fn camera_frame(&self, frame: VideoFrame) -> Result<()> {
        self.send(SessionEvent::CameraFrame(frame))
    }

    pub fn audio_block(&self, block: AudioBuffer) -> Result<()> {
        self.send(SessionEvent::AudioBlock(block))
    }

    pub fn resume_audio(&self) -> Result<()> {
        self.send(SessionEvent::ResumeAudio)
    }

    pub fn start_recording(&self) -> Result<()> {
        self.send(SessionEvent::StartRecording)
    }

    pub fn stop_recording(&self) -> Result<()> {
        self.send(SessionEvent::StopRecording)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionEvent::Shutdown)
    }

    /// Ask the loop for its current state
    pub async fn snapshot(&self) -> Result<ControlSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionEvent::Snapshot(tx))?;
        rx.await.map_err(|_| FxError::SessionClosed)
    }
}

/// What a finished session leaves behind
pub struct SessionOutcome<S> {
    pub recordings: RecordingLibrary,
    pub snapshot: ControlSnapshot,
    pub sink: S,
}

/// The frame loop
pub struct Session<D, F: MediaRecorderFactory, S> {
    settings: Settings,
    detector: D,
    interpreter: LandmarkInterpreter,
    classifier: GestureClassifier,
    controller: EffectController,
    renderer: OverlayRenderer,
    capture: CaptureCoordinator<F, SessionEvent>,
    library: RecordingLibrary,
    sink: S,
    receiver: mpsc::UnboundedReceiver<SessionEvent>,
    pending: VecDeque<SessionEvent>,
    camera: SubsystemStatus,
    tracking: SubsystemStatus,
    audio: SubsystemStatus,
    fingers: FingerState,
    gesture: GestureLabel,
    detected: GestureLabel,
    level_db: f32,
    peak_db: f32,
    notice: Option<String>,
    stats: SessionStats,
}

impl<D, F, S> Session<D, F, S>
where
    D: LandmarkDetector,
    F: MediaRecorderFactory,
    S: AudioSink,
{
    /// Build a session and the handle that feeds it
    ///
    /// # Errors
    /// * `InvalidSettings` - If the settings cannot be used
    /// * `GraphWiring` - If the initial graph cannot be wired
    pub fn new(
        mut settings: Settings,
        detector: D,
        factory: F,
        sink: S,
    ) -> Result<(Self, SessionHandle)> {
        settings.validate()?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let controller =
            EffectController::new(settings.mode, EffectGraph::new(), settings.effects.clone())?;
        let capture = CaptureCoordinator::new(
            factory,
            settings.capture.clone(),
            settings.audio.channels as usize,
            settings.audio.sample_rate,
            sender.downgrade(),
        );
        let renderer = OverlayRenderer::new(
            settings.render.canvas_width,
            settings.render.canvas_height,
            settings.render.mirror_video,
        );

        let session = Self {
            interpreter: LandmarkInterpreter::new(settings.tracking.extension_gain),
            classifier: GestureClassifier::new(settings.tracking.gesture_cooldown_frames),
            settings,
            detector,
            controller,
            renderer,
            capture,
            library: RecordingLibrary::new(),
            sink,
            receiver,
            pending: VecDeque::new(),
            camera: SubsystemStatus::default(),
            tracking: SubsystemStatus::default(),
            audio: SubsystemStatus::default(),
            fingers: FingerState::zero(),
            gesture: GestureLabel::None,
            detected: GestureLabel::None,
            level_db: METER_FLOOR_DB,
            peak_db: METER_FLOOR_DB,
            notice: None,
            stats: SessionStats::default(),
        };
        Ok((session, SessionHandle { sender }))
    }

    /// Run until shutdown or until every handle is dropped
    ///
    /// A recording still running at that point is stopped and finalized
    /// before returning.
    pub async fn run(mut self) -> SessionOutcome<S> {
        self.initialize().await;

        while let Some(event) = self.next_event().await {
            if matches!(event, SessionEvent::Shutdown) {
                log::info!("Session shutting down");
                break;
            }
            self.handle(event).await;
        }

        self.wind_down().await;
        SessionOutcome {
            snapshot: self.snapshot(),
            recordings: self.library,
            sink: self.sink,
        }
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            mode: self.controller.mode(),
            fingers: self.fingers,
            gesture: self.gesture,
            gesture_text: self.gesture.description().to_string(),
            detected_gesture: self.detected,
            active_effects: self.controller.active_effects().to_vec(),
            indicator: self.controller.indicator_text(),
            camera: self.camera.clone(),
            tracking: self.tracking.clone(),
            audio: self.audio.clone(),
            recording: self.capture.is_recording(),
            elapsed: format_elapsed(self.capture.elapsed()),
            recordings: self.library.list(),
            audio_level_db: self.level_db,
            audio_peak_db: self.peak_db,
            meter: meter_fill(self.level_db),
            notice: self.notice.clone(),
            stats: self.stats,
        }
    }

    async fn initialize(&mut self) {
        match self.detector.initialize().await {
            Ok(()) => {
                self.tracking.up();
                log::info!("Hand tracking ready");
            }
            Err(err) => {
                log::error!("Hand tracking unavailable: {}", err);
                self.tracking.fail(err.user_message());
            }
        }
    }

    async fn next_event(&mut self) -> Option<SessionEvent> {
        match self.pending.pop_front() {
            Some(event) => Some(event),
            None => self.receiver.recv().await,
        }
    }

    /// Pull everything already queued and check for a newer camera frame
    ///
    /// Frames queued behind a shutdown are never processed, so they do not
    /// count.
    fn newer_frame_pending(&mut self) -> bool {
        while let Ok(event) = self.receiver.try_recv() {
            self.pending.push_back(event);
        }
        self.pending
            .iter()
            .take_while(|e| !matches!(e, SessionEvent::Shutdown))
            .any(|e| matches!(e, SessionEvent::CameraFrame(_)))
    }

    async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::CameraFrame(frame) => {
                self.stats.frames_received += 1;
                if self.settings.tracking.drop_stale_frames && self.newer_frame_pending() {
                    self.stats.frames_dropped += 1;
                    log::debug!("Dropping stale frame at {:?}", frame.timestamp);
                    return;
                }
                self.process_frame(frame).await;
            }
            SessionEvent::AudioBlock(block) => self.process_audio(block),
            SessionEvent::ResumeAudio => self.resume_audio(),
            SessionEvent::DeviceError { device, reason } => self.device_failed(device, reason),
            SessionEvent::StartRecording => {
                let readiness = Readiness {
                    tracking: self.camera.ready && self.tracking.ready,
                    audio: self.audio.ready,
                };
                match self.capture.start_recording(readiness) {
                    Ok(()) => self.notice = None,
                    Err(err) => {
                        log::warn!("Cannot start recording: {}", err);
                        self.notice = Some(err.user_message());
                    }
                }
            }
            SessionEvent::StopRecording => match self.capture.stop_recording() {
                Ok(true) => {}
                Ok(false) => log::debug!("Stop requested with no recording running"),
                Err(err) => log::warn!("Cannot stop recording: {}", err),
            },
            SessionEvent::DeleteRecording(id) => {
                if let Err(err) = self.library.delete(id) {
                    log::warn!("{}", err);
                    self.notice = Some(err.user_message());
                }
            }
            SessionEvent::SetMode(mode) => match self.controller.set_mode(mode) {
                Ok(_) => {
                    self.settings.mode = mode;
                    self.classifier.reset();
                    self.gesture = GestureLabel::None;
                    self.detected = GestureLabel::None;
                }
                Err(err) => log::warn!("Mode change to {:?} failed: {}", mode, err),
            },
            SessionEvent::SetMasterVolume(volume) => {
                let volume = if volume.is_finite() {
                    volume.clamp(0.0, 1.0)
                } else {
                    self.settings.audio.master_volume
                };
                self.settings.audio.master_volume = volume;
                self.controller.set_master_volume(volume);
            }
            SessionEvent::UpdateEffects(knobs) => {
                let mut candidate = self.settings.clone();
                candidate.effects = knobs;
                match candidate.validate() {
                    Ok(()) => {
                        self.controller.update_knobs(candidate.effects.clone());
                        self.settings = candidate;
                    }
                    Err(err) => log::warn!("Ignoring effect settings: {}", err),
                }
            }
            SessionEvent::Capture(event) => self.capture_event(event),
            SessionEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            SessionEvent::Shutdown => {}
        }
    }

    async fn process_frame(&mut self, frame: VideoFrame) {
        // Device errors are persistent until a new session
        if self.camera.error.is_some() {
            self.stats.frames_rejected += 1;
            log::debug!("Ignoring frame from failed camera at {:?}", frame.timestamp);
            return;
        }
        self.camera.up();

        let landmarks = if self.tracking.ready {
            match self.detector.detect(&frame).await {
                Ok(landmarks) => landmarks,
                Err(err) => {
                    self.stats.detection_failures += 1;
                    log::warn!("Skipping frame: {}", err);
                    return;
                }
            }
        } else {
            None
        };

        self.fingers = self.interpreter.interpret(landmarks.as_ref());
        match self.controller.mode() {
            ControlMode::Continuous => {
                if self.audio.ready {
                    self.controller.apply_finger_state(&self.fingers);
                }
            }
            ControlMode::Toggle => {
                if let Some(label) = self.classifier.observe(landmarks.as_ref()) {
                    if let Err(err) = self.controller.apply_gesture(label) {
                        log::warn!("Gesture {} not applied: {}", label, err);
                    }
                }
                self.gesture = self.classifier.last_accepted().unwrap_or(GestureLabel::None);
                self.detected = self.classifier.last_seen();
            }
        }

        match self.renderer.render(&frame, landmarks.as_ref()) {
            Ok(rendered) => self.capture.push_frame(&rendered),
            Err(err) => log::warn!("Overlay render failed: {}", err),
        }
        self.stats.frames_processed += 1;
    }

    fn process_audio(&mut self, mut block: AudioBuffer) {
        if !self.audio.ready {
            self.stats.audio_blocks_discarded += 1;
            return;
        }
        self.stats.audio_blocks += 1;

        self.controller.graph_mut().process(&mut block);
        if let Err(err) = self.sink.write(&block) {
            log::warn!("Live output rejected block: {}", err);
        }
        self.capture.push_audio(&block);
        self.level_db = calculate_rms(&block);
        self.peak_db = calculate_peak(&block);
    }

    fn resume_audio(&mut self) {
        if self.audio.ready {
            return;
        }
        if let Some(error) = &self.audio.error {
            log::warn!("Audio stays off: {}", error);
            return;
        }
        let report = self
            .controller
            .prepare(self.settings.audio.sample_rate, self.settings.audio.block_size);
        if !report.is_ok() {
            log::warn!("{} effects failed to load settings", report.failures.len());
        }
        self.controller
            .set_master_volume(self.settings.audio.master_volume);
        self.audio.up();
        log::info!("Audio running at {} Hz", self.settings.audio.sample_rate);
    }

    fn device_failed(&mut self, device: Device, reason: String) {
        let err = FxError::DeviceUnavailable { device, reason };
        log::error!("{}", err);
        let message = err.user_message();
        match device {
            Device::Camera => self.camera.fail(message.clone()),
            Device::Microphone => self.audio.fail(message.clone()),
        }
        self.notice = Some(message);
        if self.capture.is_recording() {
            if let Err(err) = self.capture.stop_recording() {
                log::warn!("Cannot stop recording: {}", err);
            }
        }
    }

    fn capture_event(&mut self, event: CaptureEvent) {
        match self.capture.handle_event(event) {
            Some(Ok(recording)) => {
                self.notice = Some(format!(
                    "Saved {} ({})",
                    recording.name,
                    recording.duration_text()
                ));
                self.library.add(recording);
            }
            Some(Err(err)) => {
                log::warn!("{}", err);
                self.notice = Some(err.user_message());
            }
            None => {}
        }
    }

    /// Let a running recording finish, then close the live output
    async fn wind_down(&mut self) {
        if self.capture.is_recording() {
            if let Err(err) = self.capture.stop_recording() {
                log::warn!("Cannot stop recording: {}", err);
            }
        }
        while self.capture.state() != CaptureState::Idle {
            match self.next_event().await {
                Some(SessionEvent::Capture(event)) => self.capture_event(event),
                Some(SessionEvent::AudioBlock(block)) => self.process_audio(block),
                Some(_) => {}
                None => {
                    self.capture.abandon();
                    break;
                }
            }
        }
        if let Err(err) = self.sink.finish() {
            log::warn!("Closing live output failed: {}", err);
        }
    }
}
