//! Hand tracking
//!
//! Landmark data model, finger extension, gesture classification and the
//! detector interface.

pub mod classifier;
pub mod detector;
pub mod interpreter;
pub mod landmark;

pub use classifier::{classify, GestureClassifier, GestureLabel};
pub use detector::{DetectorConfig, LandmarkDetector, ScriptedDetector};
pub use interpreter::LandmarkInterpreter;
pub use landmark::{Finger, FingerState, Handedness, Landmark, LandmarkFrame};
