//! Gesture classifier
//!
//! Counts extended fingers to pick a discrete gesture, and debounces the
//! result with a frame-count cooldown so one hand pose cannot trigger a
//! burst of effect switches.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tracking::landmark::{Finger, LandmarkFrame, WRIST};

/// Default cooldown between accepted gestures, in frames
pub const DEFAULT_COOLDOWN_FRAMES: u32 = 30;

/// Discrete hand gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureLabel {
    Fist,
    OneFinger,
    TwoFingers,
    ThreeFingers,
    FourFingers,
    None,
}

impl GestureLabel {
    /// Label for a count of extended fingers
    ///
    /// Five extended fingers is an open palm, which selects nothing.
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => GestureLabel::Fist,
            1 => GestureLabel::OneFinger,
            2 => GestureLabel::TwoFingers,
            3 => GestureLabel::ThreeFingers,
            4 => GestureLabel::FourFingers,
            _ => GestureLabel::None,
        }
    }

    /// Stable identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureLabel::Fist => "fist",
            GestureLabel::OneFinger => "one_finger",
            GestureLabel::TwoFingers => "two_fingers",
            GestureLabel::ThreeFingers => "three_fingers",
            GestureLabel::FourFingers => "four_fingers",
            GestureLabel::None => "none",
        }
    }

    /// Human-readable text for the gesture indicator
    pub fn description(&self) -> &'static str {
        match self {
            GestureLabel::Fist => "Fist - Clear All",
            GestureLabel::OneFinger => "1 Finger - Chorus",
            GestureLabel::TwoFingers => "2 Fingers - Distortion",
            GestureLabel::ThreeFingers => "3 Fingers - Reverb",
            GestureLabel::FourFingers => "4 Fingers - Echo",
            GestureLabel::None => "No Gesture Detected",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, GestureLabel::None)
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Horizontal palm center: mean x of the wrist and the four finger MCPs
fn palm_center_x(frame: &LandmarkFrame) -> Option<f32> {
    let indices = [WRIST, 5, 9, 13, 17];
    let mut sum = 0.0;
    for &i in &indices {
        sum += frame.get(i)?.x;
    }
    Some(sum / indices.len() as f32)
}

/// Whether a finger is extended
///
/// The thumb is extended when its tip is horizontally further from the palm
/// center than its IP joint, which works for either hand. Other fingers are
/// extended when the tip is above the PIP joint in image space.
pub fn is_extended(frame: &LandmarkFrame, finger: Finger) -> Option<bool> {
    let tip = frame.get(finger.tip())?;
    let joint = frame.get(finger.middle_joint())?;
    match finger {
        Finger::Thumb => {
            let center = palm_center_x(frame)?;
            Some((tip.x - center).abs() > (joint.x - center).abs())
        }
        _ => Some(tip.y < joint.y),
    }
}

/// Classify a single frame, without any cooldown
///
/// Incomplete or non-finite frames classify as [`GestureLabel::None`].
pub fn classify(frame: Option<&LandmarkFrame>) -> GestureLabel {
    let Some(frame) = frame else {
        return GestureLabel::None;
    };
    if !frame.is_complete() || !frame.landmarks.iter().all(|l| l.is_finite()) {
        return GestureLabel::None;
    }
    let mut count = 0;
    for finger in Finger::ALL {
        match is_extended(frame, finger) {
            Some(true) => count += 1,
            Some(false) => {}
            None => return GestureLabel::None,
        }
    }
    GestureLabel::from_count(count)
}

/// Debounced classifier
///
/// After a label is accepted, no other label is accepted for
/// `cooldown_frames` observed frames. Frames without a hand still count.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    cooldown_frames: u32,
    remaining: u32,
    last_accepted: Option<GestureLabel>,
    last_seen: GestureLabel,
}

impl GestureClassifier {
    pub fn new(cooldown_frames: u32) -> Self {
        Self {
            cooldown_frames,
            remaining: 0,
            last_accepted: None,
            last_seen: GestureLabel::None,
        }
    }

    /// Observe one frame
    ///
    /// Returns the label if it was accepted on this frame: the cooldown has
    /// elapsed, the label is not `None`, and it differs from the last
    /// accepted label.
    pub fn observe(&mut self, frame: Option<&LandmarkFrame>) -> Option<GestureLabel> {
        let label = classify(frame);
        self.last_seen = label;

        let accepted = if self.remaining == 0
            && !label.is_none()
            && self.last_accepted != Some(label)
        {
            self.last_accepted = Some(label);
            self.remaining = self.cooldown_frames;
            Some(label)
        } else {
            self.remaining = self.remaining.saturating_sub(1);
            None
        };

        if let Some(label) = accepted {
            log::debug!("Gesture accepted: {}", label);
        }
        accepted
    }

    /// Most recently accepted label
    pub fn last_accepted(&self) -> Option<GestureLabel> {
        self.last_accepted
    }

    /// Label of the most recent frame, accepted or not
    pub fn last_seen(&self) -> GestureLabel {
        self.last_seen
    }

    /// Frames left before another label can be accepted
    pub fn remaining_cooldown(&self) -> u32 {
        self.remaining
    }

    pub fn reset(&mut self) {
        self.remaining = 0;
        self.last_accepted = None;
        self.last_seen = GestureLabel::None;
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::landmark::synthetic_hand;
    use test_case::test_case;

    #[test_case([false, false, false, false, false], GestureLabel::Fist ; "fist")]
    #[test_case([false, true, false, false, false], GestureLabel::OneFinger ; "index only")]
    #[test_case([true, false, false, false, false], GestureLabel::OneFinger ; "thumb only")]
    #[test_case([false, true, true, false, false], GestureLabel::TwoFingers ; "peace sign")]
    #[test_case([false, true, true, true, false], GestureLabel::ThreeFingers ; "three")]
    #[test_case([false, true, true, true, true], GestureLabel::FourFingers ; "four")]
    #[test_case([true, true, true, true, true], GestureLabel::None ; "open palm")]
    fn test_classify(extended: [bool; 5], expected: GestureLabel) {
        assert_eq!(classify(Some(&synthetic_hand(extended))), expected);
    }

    #[test]
    fn test_thumb_test_is_mirror_symmetric() {
        let mut frame = synthetic_hand([true, false, false, false, false]);
        for l in &mut frame.landmarks {
            l.x = 1.0 - l.x;
        }
        assert_eq!(classify(Some(&frame)), GestureLabel::OneFinger);
    }

    #[test]
    fn test_absent_and_malformed() {
        assert_eq!(classify(None), GestureLabel::None);
        let mut short = synthetic_hand([false; 5]);
        short.landmarks.truncate(10);
        assert_eq!(classify(Some(&short)), GestureLabel::None);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let frame = synthetic_hand([false, true, true, false, false]);
        let first = classify(Some(&frame));
        assert!((0..100).all(|_| classify(Some(&frame)) == first));
    }

    #[test]
    fn test_cooldown_spacing() {
        let mut classifier = GestureClassifier::new(30);
        let one = synthetic_hand([false, true, false, false, false]);
        let two = synthetic_hand([false, true, true, false, false]);

        assert_eq!(classifier.observe(Some(&one)), Some(GestureLabel::OneFinger));
        for _ in 0..30 {
            assert_eq!(classifier.observe(Some(&two)), None);
        }
        assert_eq!(classifier.observe(Some(&two)), Some(GestureLabel::TwoFingers));
    }

    #[test]
    fn test_cooldown_counts_frames_without_hand() {
        let mut classifier = GestureClassifier::new(5);
        let fist = synthetic_hand([false; 5]);
        let one = synthetic_hand([false, true, false, false, false]);

        assert_eq!(classifier.observe(Some(&fist)), Some(GestureLabel::Fist));
        for _ in 0..5 {
            assert_eq!(classifier.observe(None), None);
        }
        assert_eq!(classifier.observe(Some(&one)), Some(GestureLabel::OneFinger));
    }

    #[test]
    fn test_repeated_label_is_not_reaccepted() {
        let mut classifier = GestureClassifier::new(2);
        let one = synthetic_hand([false, true, false, false, false]);

        assert!(classifier.observe(Some(&one)).is_some());
        for _ in 0..10 {
            assert_eq!(classifier.observe(Some(&one)), None);
        }
        assert_eq!(classifier.last_accepted(), Some(GestureLabel::OneFinger));
        assert_eq!(classifier.last_seen(), GestureLabel::OneFinger);
    }

    #[test]
    fn test_accepted_switches_are_spaced() {
        let mut classifier = GestureClassifier::default();
        let poses = [
            [false, true, false, false, false],
            [false, true, true, false, false],
            [false; 5],
            [false, true, true, true, false],
        ];
        let mut accepted_at = Vec::new();
        for frame_no in 0..400 {
            let pose = poses[(frame_no / 7) % poses.len()];
            if classifier.observe(Some(&synthetic_hand(pose))).is_some() {
                accepted_at.push(frame_no);
            }
        }
        assert!(accepted_at.len() > 2);
        assert!(accepted_at.windows(2).all(|w| w[1] - w[0] >= 30));
    }
}
