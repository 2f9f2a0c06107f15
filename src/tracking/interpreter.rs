//! Landmark interpreter
//!
//! Turns a landmark frame into per-finger extension values. Extension is
//! the 3D distance from fingertip to finger base scaled by a gain and
//! clamped, so a fingertip 0.2 away from its base already reads as fully
//! extended at the default gain of 5.

use crate::tracking::landmark::{normalize_extension, Finger, FingerState, LandmarkFrame};

/// Default distance-to-extension gain
pub const DEFAULT_EXTENSION_GAIN: f32 = 5.0;

/// Maps landmark frames to [`FingerState`]
#[derive(Debug, Clone, Copy)]
pub struct LandmarkInterpreter {
    gain: f32,
}

impl LandmarkInterpreter {
    /// Create an interpreter
    ///
    /// # Arguments
    /// * `gain` - Distance multiplier; non-finite or negative values fall back to the default
    pub fn new(gain: f32) -> Self {
        let gain = if gain.is_finite() && gain > 0.0 {
            gain
        } else {
            DEFAULT_EXTENSION_GAIN
        };
        Self { gain }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Extension of one finger given explicit tip and base indices
    ///
    /// Missing landmarks or non-finite coordinates read as 0.
    pub fn finger_extension(&self, frame: &LandmarkFrame, tip: usize, base: usize) -> f32 {
        match (frame.get(tip), frame.get(base)) {
            (Some(t), Some(b)) if t.is_finite() && b.is_finite() => {
                normalize_extension(t.distance(b) * self.gain)
            }
            _ => 0.0,
        }
    }

    /// Extension of all five fingers; an absent frame reads as all zeros
    pub fn interpret(&self, frame: Option<&LandmarkFrame>) -> FingerState {
        let Some(frame) = frame else {
            return FingerState::zero();
        };
        let mut state = FingerState::zero();
        for finger in Finger::ALL {
            state.set(finger, self.finger_extension(frame, finger.tip(), finger.base()));
        }
        state
    }
}

impl Default for LandmarkInterpreter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION_GAIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::landmark::{synthetic_hand, Landmark, NUM_LANDMARKS};
    use approx::assert_relative_eq;

    fn flat_hand() -> LandmarkFrame {
        LandmarkFrame::new(vec![Landmark::new(0.5, 0.5, 0.0); NUM_LANDMARKS])
    }

    #[test]
    fn test_absent_frame_is_zero() {
        let interpreter = LandmarkInterpreter::default();
        assert_eq!(interpreter.interpret(None), FingerState::zero());
    }

    #[test]
    fn test_distance_scaled_and_clamped() {
        let interpreter = LandmarkInterpreter::default();
        let mut frame = flat_hand();
        frame.landmarks[8] = Landmark::new(0.5, 0.2, 0.0); // index tip 0.3 above its base
        frame.landmarks[12] = Landmark::new(0.5, 0.46, 0.0); // middle tip 0.04 away

        let state = interpreter.interpret(Some(&frame));
        assert_eq!(state.index, 1.0);
        assert_relative_eq!(state.middle, 0.2, epsilon = 1e-5);
        assert_eq!(state.thumb, 0.0);
    }

    #[test]
    fn test_depth_counts() {
        let interpreter = LandmarkInterpreter::default();
        let mut frame = flat_hand();
        frame.landmarks[20] = Landmark::new(0.5, 0.5, 0.1);
        assert_relative_eq!(interpreter.interpret(Some(&frame)).pinky, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_truncated_frame_zeroes_missing_fingers() {
        let interpreter = LandmarkInterpreter::default();
        let mut frame = synthetic_hand([true; 5]);
        frame.landmarks.truncate(13);

        let state = interpreter.interpret(Some(&frame));
        assert!(state.index > 0.0);
        assert_eq!(state.ring, 0.0);
        assert_eq!(state.pinky, 0.0);
    }

    #[test]
    fn test_non_finite_coordinates() {
        let interpreter = LandmarkInterpreter::default();
        let mut frame = synthetic_hand([true; 5]);
        frame.landmarks[4].x = f32::NAN;
        frame.landmarks[8].y = f32::INFINITY;

        let state = interpreter.interpret(Some(&frame));
        assert_eq!(state.thumb, 0.0);
        assert_eq!(state.index, 0.0);
        assert!(state.middle > 0.0);
    }

    #[test]
    fn test_values_always_in_unit_range() {
        let interpreter = LandmarkInterpreter::new(100.0);
        for mask in 0..32u8 {
            let extended = [0, 1, 2, 3, 4].map(|bit| mask & (1 << bit) != 0);
            let state = interpreter.interpret(Some(&synthetic_hand(extended)));
            assert!(state.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
        }
    }
}
