//! DSP Effects Module
//!
//! The five hand-controlled effects plus the master gain stage:
//! - Distortion (waveshaper)
//! - Chorus (modulated delay)
//! - Delay (feedback echo)
//! - Filter (resonant low-pass)
//! - Reverb (comb/allpass)

pub mod chorus;
pub mod delay;
pub mod distortion;
pub mod effect;
pub mod filter;
pub mod gain;
pub mod node;
pub mod reverb;

pub use chorus::Chorus;
pub use delay::Delay;
pub use distortion::Distortion;
pub use effect::{Effect, EffectKind, EffectParam};
pub use filter::LowpassFilter;
pub use gain::Gain;
pub use node::{EffectBank, EffectNode, NodeParams};
pub use reverb::Reverb;
