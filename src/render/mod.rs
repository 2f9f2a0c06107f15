//! Canvas rendering
//!
//! Video frames and the hand-landmark overlay drawn on top of them.

pub mod frame;
pub mod overlay;

pub use frame::{RenderedFrame, VideoFrame};
pub use overlay::{OverlayRenderer, OverlayStyle};
