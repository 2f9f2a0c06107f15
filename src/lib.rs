//! fingerfx - Hand-Gesture Controlled Audio Effects
//!
//! fingerfx turns a tracked hand into live audio effect control:
//! 1. Continuous mode - each finger's extension drives one effect parameter
//! 2. Toggle mode - finger-count gestures switch between single effects
//!
//! # Architecture
//!
//! A single event loop ([`session::Session`]) owns the pipeline:
//! - Tracking: landmarks to finger extension and gesture labels
//! - Engine: the effect graph `source -> master -> effects -> {live, tap}`
//! - Render: camera frame plus hand skeleton overlay
//! - Capture: tap audio and rendered frames combined into recordings

pub mod capture;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod render;
pub mod session;
pub mod tracking;

pub use config::Settings;
pub use engine::{ControlMode, EffectController, EffectGraph};
pub use error::{FxError, Result};
pub use session::{Session, SessionEvent, SessionHandle};
