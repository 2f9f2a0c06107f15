//! Audio Engine Module
//!
//! Core audio processing engine including:
//! - Audio buffer management and WAV encoding
//! - The effect graph and its wiring
//! - The controller mapping hand input onto the graph

pub mod buffer;
pub mod controller;
pub mod graph;
pub mod wav;

pub use buffer::AudioBuffer;
pub use controller::{indicator_text, ApplyReport, ControlMode, EffectController};
pub use graph::{EffectGraph, GraphBackend, InProcessBackend, NodeId, Wiring};
pub use wav::{decode_wav, encode_wav, generate_test_tone, import_wav, write_wav};
