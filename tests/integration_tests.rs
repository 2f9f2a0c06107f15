//! Integration Tests
//!
//! End-to-end tests for the hand-to-effects pipeline.

use std::time::Duration;

use fingerfx::capture::{ChunkedRecorderFactory, RecordingPayload};
use fingerfx::config::{EffectSettings, Settings};
use fingerfx::dsp::{EffectKind, NodeParams};
use fingerfx::engine::graph::NodeId;
use fingerfx::engine::wav::{decode_wav, encode_wav, float_to_pcm16, pcm16_to_float, WAV_HEADER_LEN};
use fingerfx::engine::{AudioBuffer, ControlMode, EffectController, EffectGraph};
use fingerfx::render::VideoFrame;
use fingerfx::session::{BufferSink, Session};
use fingerfx::tracking::landmark::synthetic_hand;
use fingerfx::tracking::{
    GestureClassifier, GestureLabel, Landmark, LandmarkFrame, LandmarkInterpreter,
    ScriptedDetector,
};
use test_case::test_case;

/// A hand with every point at the center except the index tip
fn index_reaching(distance: f32) -> LandmarkFrame {
    let mut points = vec![Landmark::new(0.5, 0.5, 0.0); 21];
    points[8] = Landmark::new(0.5, 0.5 - distance, 0.0);
    LandmarkFrame::new(points)
}

fn prepared(mode: ControlMode) -> EffectController {
    let mut controller =
        EffectController::new(mode, EffectGraph::new(), EffectSettings::default()).unwrap();
    controller.prepare(44100, 1470);
    controller
}

fn sink_chains(controller: &EffectController) -> (Vec<EffectKind>, Vec<EffectKind>) {
    let wiring = controller.graph().wiring();
    (
        wiring.effects_to(NodeId::LiveOutput).unwrap(),
        wiring.effects_to(NodeId::RecordTap).unwrap(),
    )
}

// === Hand To Parameters ===

#[test]
fn test_index_extension_drives_delay() {
    let fingers = LandmarkInterpreter::default().interpret(Some(&index_reaching(0.3)));
    assert_eq!(fingers.index, 1.0);
    assert_eq!(fingers.thumb, 0.0);

    let mut controller = prepared(ControlMode::Continuous);
    assert!(controller.apply_finger_state(&fingers).is_ok());

    match controller.graph().node(EffectKind::Delay).params() {
        NodeParams::Delay { wet, feedback, .. } => {
            assert_eq!(wet, 1.0);
            assert!((feedback - 0.7).abs() < 1e-6);
        }
        other => panic!("unexpected params {:?}", other),
    }
}

#[test]
fn test_absent_hand_zeroes_every_finger() {
    let fingers = LandmarkInterpreter::default().interpret(None);
    assert!(fingers.iter().all(|(_, v)| v == 0.0));

    let malformed = LandmarkFrame::new(vec![Landmark::new(0.1, 0.1, 0.0); 6]);
    let fingers = LandmarkInterpreter::default().interpret(Some(&malformed));
    assert!(fingers.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
    assert_eq!(fingers.pinky, 0.0);
}

// === Toggle Sequences ===

#[test_case(&[GestureLabel::OneFinger], &[EffectKind::Chorus] ; "one finger")]
#[test_case(&[GestureLabel::OneFinger, GestureLabel::TwoFingers], &[EffectKind::Distortion] ; "replace")]
#[test_case(&[GestureLabel::FourFingers, GestureLabel::None], &[EffectKind::Delay] ; "none ignored")]
#[test_case(&[GestureLabel::ThreeFingers, GestureLabel::Fist], &[] ; "fist clears")]
#[test_case(&[GestureLabel::Fist, GestureLabel::ThreeFingers, GestureLabel::ThreeFingers], &[EffectKind::Reverb] ; "repeat is noop")]
fn test_toggle_sequence(gestures: &[GestureLabel], expected: &[EffectKind]) {
    let mut controller = prepared(ControlMode::Toggle);
    for &gesture in gestures {
        controller.apply_gesture(gesture).unwrap();
    }
    let (live, tap) = sink_chains(&controller);
    assert_eq!(live, expected);
    assert_eq!(tap, expected);
}

#[test]
fn test_cleared_chain_is_direct_path() {
    let mut controller = prepared(ControlMode::Toggle);
    controller.apply_gesture(GestureLabel::TwoFingers).unwrap();
    controller.apply_gesture(GestureLabel::Fist).unwrap();
    controller.set_master_volume(1.0);

    let mut block = AudioBuffer::mono(vec![0.3; 256], 44100);
    controller.graph_mut().process(&mut block);
    assert!(block.channel(0).iter().all(|&s| (s - 0.3).abs() < 1e-6));
    assert_eq!(controller.indicator_text(), "No Filter");
}

#[test]
fn test_accepted_switches_are_spaced_by_cooldown() {
    let mut classifier = GestureClassifier::new(30);
    let hands = [
        synthetic_hand([false, true, false, false, false]),
        synthetic_hand([false, true, true, false, false]),
    ];
    let mut accepted_at = Vec::new();
    for frame in 0..200 {
        // Alternate every 7 frames to push against the cooldown
        let hand = &hands[(frame / 7) % 2];
        if classifier.observe(Some(hand)).is_some() {
            accepted_at.push(frame);
        }
    }
    assert!(accepted_at.len() > 1);
    for pair in accepted_at.windows(2) {
        assert!(pair[1] - pair[0] >= 30, "switches at {:?}", pair);
    }
}

// === WAV Encoding ===

#[test]
fn test_wav_size_and_header() {
    let samples: Vec<f32> = (0..1000).map(|i| ((i as f32) * 0.01).sin() * 0.8).collect();
    let buffer = AudioBuffer::mono(samples.clone(), 48000);
    let wav = encode_wav(&buffer).unwrap();

    assert_eq!(wav.len(), WAV_HEADER_LEN + 2 * 1000);
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1);
    assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 48000);
    assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);

    let decoded = decode_wav(&wav).unwrap();
    for (a, b) in decoded.channel(0).iter().zip(&samples) {
        assert_eq!(*a, pcm16_to_float(float_to_pcm16(*b)));
    }
}

// === Full Session ===

#[tokio::test]
async fn test_recording_matches_live_output() {
    let mut settings = Settings::default();
    settings.mode = ControlMode::Toggle;
    settings.tracking.drop_stale_frames = false;
    settings.tracking.gesture_cooldown_frames = 3;
    settings.render.canvas_width = 32;
    settings.render.canvas_height = 24;
    settings.capture.audio_grace_ms = 20;

    let track = vec![Some(synthetic_hand([false, true, true, true, false])); 10];
    let (session, handle) = Session::new(
        settings,
        ScriptedDetector::new(track),
        ChunkedRecorderFactory::default(),
        BufferSink::new(),
    )
    .unwrap();

    handle.resume_audio().unwrap();
    handle
        .camera_frame(VideoFrame::solid(16, 12, [0, 0, 0], Duration::ZERO))
        .unwrap();
    handle.start_recording().unwrap();
    for i in 1..10u64 {
        let samples: Vec<f32> = (0..1470).map(|n| ((n as f32) * 0.05).sin() * 0.5).collect();
        handle.audio_block(AudioBuffer::mono(samples, 44100)).unwrap();
        handle
            .camera_frame(VideoFrame::solid(16, 12, [0, 0, 0], Duration::from_millis(i * 33)))
            .unwrap();
    }
    handle.stop_recording().unwrap();
    handle.shutdown().unwrap();

    let outcome = session.run().await;
    assert_eq!(outcome.snapshot.active_effects, vec![EffectKind::Reverb]);
    assert_eq!(outcome.recordings.len(), 1);

    let recording = outcome.recordings.iter().next().unwrap();
    let live = outcome.sink.buffer().unwrap();
    match &recording.payload {
        RecordingPayload::Separate { video, audio_wav } => {
            assert_eq!(video.frame_count, 9);
            let recorded = decode_wav(audio_wav).unwrap();
            assert_eq!(recorded.num_samples(), live.num_samples());
            for (r, l) in recorded.channel(0).iter().zip(live.channel(0)) {
                assert_eq!(*r, pcm16_to_float(float_to_pcm16(*l)));
            }
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_stop_without_recording_changes_nothing() {
    let (session, handle) = Session::new(
        Settings::default(),
        ScriptedDetector::new(vec![]),
        ChunkedRecorderFactory::default(),
        BufferSink::new(),
    )
    .unwrap();
    handle.stop_recording().unwrap();
    handle.stop_recording().unwrap();
    handle.shutdown().unwrap();

    let outcome = session.run().await;
    assert!(outcome.recordings.is_empty());
    assert!(!outcome.snapshot.recording);
    assert_eq!(outcome.snapshot.notice, None);
}
