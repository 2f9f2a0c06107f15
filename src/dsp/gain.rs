//! Master Gain
//!
//! Volume stage between the microphone source and the effect chain.
//! Gain changes ramp linearly across one block to avoid zipper noise.

use serde::{Deserialize, Serialize};

use crate::engine::buffer::linear_to_db;
use crate::engine::AudioBuffer;

/// Linear master volume (0-1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gain {
    gain: f32,
    /// Gain applied at the end of the previous block
    #[serde(skip)]
    previous: Option<f32>,
}

impl Gain {
    /// Create a gain stage
    ///
    /// # Arguments
    /// * `gain` - Linear gain (clamped to 0-1; non-finite becomes 0)
    pub fn new(gain: f32) -> Self {
        Self {
            gain: Self::sanitize(gain),
            previous: None,
        }
    }

    fn sanitize(gain: f32) -> f32 {
        if gain.is_finite() {
            gain.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Set linear gain
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = Self::sanitize(gain);
    }

    /// Get linear gain
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Get gain in dB
    pub fn gain_db(&self) -> f32 {
        linear_to_db(self.gain)
    }

    /// Apply gain in-place
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        let target = self.gain;
        let start = self.previous.unwrap_or(target);
        let n = buffer.num_samples();

        if (start - target).abs() < 1e-6 || n == 0 {
            buffer.apply_gain(target);
        } else {
            let step = (target - start) / n as f32;
            for channel in buffer.samples.iter_mut() {
                for (i, sample) in channel.iter_mut().enumerate() {
                    *sample *= start + step * (i + 1) as f32;
                }
            }
        }
        self.previous = Some(target);
    }

    /// Forget the ramp position
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_clamp() {
        let mut gain = Gain::new(2.0);
        assert_eq!(gain.gain(), 1.0);
        gain.set_gain(-1.0);
        assert_eq!(gain.gain(), 0.0);
        gain.set_gain(f32::NAN);
        assert_eq!(gain.gain(), 0.0);
    }

    #[test]
    fn test_constant_gain() {
        let mut gain = Gain::default();
        let mut buffer = AudioBuffer::mono(vec![1.0; 8], 44100);
        gain.process(&mut buffer);
        assert!(buffer.channel(0).iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_ramp_reaches_target() {
        let mut gain = Gain::new(1.0);
        let mut first = AudioBuffer::mono(vec![1.0; 4], 44100);
        gain.process(&mut first);

        gain.set_gain(0.0);
        let mut second = AudioBuffer::mono(vec![1.0; 4], 44100);
        gain.process(&mut second);
        let out = second.channel(0);
        assert!((out[0] - 0.75).abs() < 1e-6);
        assert!(out[3].abs() < 1e-6);
    }
}
