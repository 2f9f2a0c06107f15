//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};

use crate::capture::ChunkedRecorderFactory;
use crate::config::Settings;
use crate::engine::wav::{generate_test_tone, import_wav};
use crate::engine::ControlMode;
use crate::error::Result;
use crate::render::VideoFrame;
use crate::session::{Session, WavFileSink};
use crate::tracking::{GestureClassifier, LandmarkInterpreter, ScriptedDetector};

/// Frequency of the tone used when no input WAV is given
const TEST_TONE_HZ: f32 = 440.0;

/// Gray camera frame behind the overlay
const BACKDROP: [u8; 3] = [32, 32, 32];

/// Load settings from `path`, or the defaults
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => {
            info!("Loading settings: {}", path.display());
            Settings::load(path)
        }
        None => Ok(Settings::default()),
    }
}

/// Replay a landmark track with audio through a full session.
///
/// Audio blocks are interleaved with camera frames by stream time. The
/// whole replay is recorded unless `record` is false; recordings are
/// exported next to `live-mix.wav` in `output`.
pub async fn process(
    settings: Settings,
    track: &Path,
    input: Option<&Path>,
    output: &Path,
    mode: Option<ControlMode>,
    record: bool,
) -> Result<()> {
    let mut settings = settings;
    if let Some(mode) = mode {
        settings.mode = mode;
    }
    // Offline replay must see every frame
    settings.tracking.drop_stale_frames = false;

    let detector = ScriptedDetector::load(track)?.with_config(settings.tracking.detector);
    let frame_count = detector.len();
    let frame_period = Duration::from_secs_f64(1.0 / settings.capture.frame_rate as f64);
    info!(
        "Replaying {} frames at {} fps in {:?} mode",
        frame_count, settings.capture.frame_rate, settings.mode
    );

    let audio = match input {
        Some(path) => import_wav(path)?,
        None => {
            let secs = (frame_count as f32 * frame_period.as_secs_f32()).max(0.1);
            generate_test_tone(TEST_TONE_HZ, secs, settings.audio.sample_rate)
        }
    };
    settings.audio.sample_rate = audio.sample_rate;
    settings.audio.channels = audio.num_channels() as u16;

    fs::create_dir_all(output)?;
    let mix_path = output.join("live-mix.wav");
    let sink = WavFileSink::create(&mix_path, settings.audio.channels, audio.sample_rate)?;

    let (width, height) = (settings.render.canvas_width, settings.render.canvas_height);
    let block_size = settings.audio.block_size;
    let (session, handle) =
        Session::new(settings, detector, ChunkedRecorderFactory::default(), sink)?;

    handle.resume_audio()?;
    let mut blocks = audio.blocks(block_size).into_iter();
    let mut audio_secs = 0.0f64;
    for i in 0..frame_count {
        let timestamp = frame_period * i as u32;
        handle.camera_frame(VideoFrame::solid(width, height, BACKDROP, timestamp))?;
        if i == 0 && record {
            handle.start_recording()?;
        }
        let frame_end = (timestamp + frame_period).as_secs_f64();
        while audio_secs < frame_end {
            let Some(block) = blocks.next() else { break };
            audio_secs += block.duration_secs();
            handle.audio_block(block)?;
        }
    }
    for block in blocks {
        handle.audio_block(block)?;
    }
    if record {
        handle.stop_recording()?;
    }
    handle.shutdown()?;

    let outcome = session.run().await;
    let snapshot = &outcome.snapshot;

    println!("Frames processed: {}", snapshot.stats.frames_processed);
    println!("Detection failures: {}", snapshot.stats.detection_failures);
    println!("Audio blocks: {}", snapshot.stats.audio_blocks);
    println!("Final effects: {}", snapshot.indicator);
    println!("Live mix: {}", mix_path.display());
    if let Some(notice) = &snapshot.notice {
        println!("{}", notice);
    }

    for path in outcome.recordings.export_all(output)? {
        println!("Exported: {}", path.display());
    }
    if record && outcome.recordings.is_empty() {
        warn!("No recording was produced");
    }

    Ok(())
}

/// Print finger states and gesture decisions for each frame of a track.
pub fn classify(settings: &Settings, track: &Path, json: bool) -> Result<()> {
    let detector = ScriptedDetector::load(track)?;
    let interpreter = LandmarkInterpreter::new(settings.tracking.extension_gain);
    let mut classifier = GestureClassifier::new(settings.tracking.gesture_cooldown_frames);

    for (index, hand) in detector.track().iter().enumerate() {
        let fingers = interpreter.interpret(hand.as_ref());
        let accepted = classifier.observe(hand.as_ref());
        let label = classifier.last_seen();

        if json {
            let line = serde_json::json!({
                "frame": index,
                "hand": hand.is_some(),
                "label": label,
                "accepted": accepted.is_some(),
                "fingers": fingers,
            });
            println!("{}", line);
        } else {
            println!(
                "{:>5} {} {:<13} thumb={:.2} index={:.2} middle={:.2} ring={:.2} pinky={:.2}",
                index,
                if accepted.is_some() { "*" } else { " " },
                label.as_str(),
                fingers.thumb,
                fingers.index,
                fingers.middle,
                fingers.ring,
                fingers.pinky
            );
        }
    }

    Ok(())
}

/// Print the effective settings, or write them to `output`.
pub fn settings(settings: &Settings, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            settings.save(path)?;
            println!("Settings written: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(settings)?),
    }
    Ok(())
}
