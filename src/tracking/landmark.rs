//! Hand landmark data model
//!
//! A detected hand is 21 points in normalized image space (x and y in 0-1,
//! y growing downward; z is relative depth). Index layout:
//!
//! ```text
//! 0 wrist
//! 1-4   thumb  (CMC, MCP, IP, tip)
//! 5-8   index  (MCP, PIP, DIP, tip)
//! 9-12  middle
//! 13-16 ring
//! 17-20 pinky
//! ```

use serde::{Deserialize, Serialize};

/// Number of landmarks in a complete hand
pub const NUM_LANDMARKS: usize = 21;

/// Wrist index
pub const WRIST: usize = 0;

/// Skeleton edges drawn by the overlay: finger segments plus the palm
pub const HAND_CONNECTIONS: [(usize, usize); 23] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

/// A single 3D landmark
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// 3D Euclidean distance
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Which hand the detector thinks it saw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

/// Landmarks for one detected hand
///
/// A frame may carry fewer than 21 points if the detector output was
/// malformed; consumers treat missing points as "no reading".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub landmarks: Vec<Landmark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handedness: Option<Handedness>,
}

impl LandmarkFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self {
            landmarks,
            handedness: None,
        }
    }

    /// Landmark at `index`, if present
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    /// Whether all 21 landmarks are present
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= NUM_LANDMARKS
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

// ============================================================================
// Fingers
// ============================================================================

/// The five fingers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Fingertip landmark
    pub fn tip(&self) -> usize {
        match self {
            Finger::Thumb => 4,
            Finger::Index => 8,
            Finger::Middle => 12,
            Finger::Ring => 16,
            Finger::Pinky => 20,
        }
    }

    /// Base landmark used for extension measurement
    pub fn base(&self) -> usize {
        match self {
            Finger::Thumb => 2,
            Finger::Index => 5,
            Finger::Middle => 9,
            Finger::Ring => 13,
            Finger::Pinky => 17,
        }
    }

    /// Middle joint used for the extended/folded test (IP for the thumb)
    pub fn middle_joint(&self) -> usize {
        match self {
            Finger::Thumb => 3,
            Finger::Index => 6,
            Finger::Middle => 10,
            Finger::Ring => 14,
            Finger::Pinky => 18,
        }
    }
}

// ============================================================================
// Finger State
// ============================================================================

/// Normalized extension per finger, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FingerState {
    pub thumb: f32,
    pub index: f32,
    pub middle: f32,
    pub ring: f32,
    pub pinky: f32,
}

/// Clamp to [0, 1], mapping NaN to 0
#[inline]
pub fn normalize_extension(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl FingerState {
    /// All fingers folded
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build from raw values; every value is clamped
    pub fn new(thumb: f32, index: f32, middle: f32, ring: f32, pinky: f32) -> Self {
        Self {
            thumb: normalize_extension(thumb),
            index: normalize_extension(index),
            middle: normalize_extension(middle),
            ring: normalize_extension(ring),
            pinky: normalize_extension(pinky),
        }
    }

    pub fn get(&self, finger: Finger) -> f32 {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Pinky => self.pinky,
        }
    }

    /// Set one finger; the value is clamped
    pub fn set(&mut self, finger: Finger, value: f32) {
        let value = normalize_extension(value);
        match finger {
            Finger::Thumb => self.thumb = value,
            Finger::Index => self.index = value,
            Finger::Middle => self.middle = value,
            Finger::Ring => self.ring = value,
            Finger::Pinky => self.pinky = value,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Finger, f32)> + '_ {
        Finger::ALL.iter().map(move |&f| (f, self.get(f)))
    }
}

/// Build a synthetic hand for tests and demos
///
/// The palm sits at the center of the image with fingers pointing up; each
/// entry of `extended` straightens the matching finger.
pub fn synthetic_hand(extended: [bool; 5]) -> LandmarkFrame {
    let mut points = vec![Landmark::new(0.5, 0.8, 0.0); NUM_LANDMARKS];

    // Thumb reaches sideways away from the palm when extended
    points[1] = Landmark::new(0.42, 0.72, 0.0);
    points[2] = Landmark::new(0.38, 0.66, 0.0);
    points[3] = Landmark::new(0.36, 0.62, 0.0);
    points[4] = if extended[0] {
        Landmark::new(0.24, 0.60, 0.0)
    } else {
        Landmark::new(0.44, 0.62, 0.0)
    };

    let columns = [0.42, 0.48, 0.54, 0.60];
    for (i, finger) in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky]
        .iter()
        .enumerate()
    {
        let x = columns[i];
        let mcp = finger.base();
        points[mcp] = Landmark::new(x, 0.60, 0.0);
        points[mcp + 1] = Landmark::new(x, 0.50, 0.0);
        if extended[i + 1] {
            points[mcp + 2] = Landmark::new(x, 0.42, 0.0);
            points[mcp + 3] = Landmark::new(x, 0.35, 0.0);
        } else {
            points[mcp + 2] = Landmark::new(x, 0.56, 0.0);
            points[mcp + 3] = Landmark::new(x, 0.58, 0.0);
        }
    }

    LandmarkFrame::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finger_state_clamps() {
        let state = FingerState::new(-1.0, 2.0, f32::NAN, 0.5, f32::INFINITY);
        assert_eq!(state.thumb, 0.0);
        assert_eq!(state.index, 1.0);
        assert_eq!(state.middle, 0.0);
        assert_eq!(state.ring, 0.5);
        assert_eq!(state.pinky, 1.0);
    }

    #[test]
    fn test_finger_indices() {
        let tips: Vec<usize> = Finger::ALL.iter().map(Finger::tip).collect();
        let bases: Vec<usize> = Finger::ALL.iter().map(Finger::base).collect();
        assert_eq!(tips, vec![4, 8, 12, 16, 20]);
        assert_eq!(bases, vec![2, 5, 9, 13, 17]);
    }

    #[test]
    fn test_connections_stay_in_range() {
        assert!(HAND_CONNECTIONS
            .iter()
            .all(|&(a, b)| a < NUM_LANDMARKS && b < NUM_LANDMARKS));
    }

    #[test]
    fn test_frame_json_shape() {
        let json = r#"{"landmarks": [{"x": 0.1, "y": 0.2}], "handedness": "left"}"#;
        let frame: LandmarkFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.landmarks[0], Landmark::new(0.1, 0.2, 0.0));
        assert_eq!(frame.handedness, Some(Handedness::Left));
        assert!(!frame.is_complete());
    }

    #[test]
    fn test_distance_is_three_dimensional() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(0.0, 0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
    }
}
