//! Audio Buffer Management
//!
//! Provides the block buffer type that flows through the effect graph and
//! the level helpers used by the control surface meter.

use crate::error::{FxError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default sample rate for the live graph (44.1kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Floor of the level meter in dB
pub const METER_FLOOR_DB: f32 = -60.0;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Calculate the RMS (Root Mean Square) level of an audio buffer in dB
///
/// Returns -f32::INFINITY for empty or silent buffers.
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total_samples = buffer.num_channels() * buffer.num_samples();
    if total_samples == 0 {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    let rms = (sum_squares / total_samples as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Calculate the peak level of an audio buffer in dB
pub fn calculate_peak(buffer: &AudioBuffer) -> f32 {
    let peak = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max);

    linear_to_db(peak)
}

/// Map a level in dB to a 0-1 meter fill, with a -60dB floor
pub fn meter_fill(level_db: f32) -> f32 {
    if !level_db.is_finite() {
        return 0.0;
    }
    ((level_db - METER_FLOOR_DB) / -METER_FLOOR_DB).clamp(0.0, 1.0)
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Block of non-interleaved 32-bit float audio
///
/// Each channel is a separate `Vec<f32>`.
///
/// # Example
/// ```
/// use fingerfx::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::mono(vec![0.0; 1470], 44100);
/// assert_eq!(buffer.channels(), 1);
/// assert_eq!(buffer.len(), 1470);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create an empty buffer (no samples) with the given channel count
    pub fn empty(channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![Vec::new(); channels],
            sample_rate,
        }
    }

    /// Wrap a single channel of samples
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: vec![samples],
            sample_rate,
        }
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// Fails if the data length doesn't match the channel count.
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(FxError::InvalidAudio {
                reason: "channel count must be at least 1".to_string(),
            });
        }

        if interleaved.len() % channels != 0 {
            return Err(FxError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    channels
                ),
            });
        }

        let num_samples = interleaved.len() / channels;
        let mut samples = vec![Vec::with_capacity(num_samples); channels];

        for frame in interleaved.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format (L, R, L, R, ... for stereo)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Alias for channels() - returns the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alias for len() - returns the number of samples per channel
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.len()
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Multiply every sample by a linear gain
    pub fn apply_gain(&mut self, gain: f32) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Append another block to the end of this one
    ///
    /// The blocks must agree on channel count and sample rate.
    pub fn append(&mut self, other: &AudioBuffer) -> Result<()> {
        if other.channels() != self.channels() || other.sample_rate != self.sample_rate {
            return Err(FxError::InvalidAudio {
                reason: format!(
                    "cannot append {}ch@{}Hz block to {}ch@{}Hz buffer",
                    other.channels(),
                    other.sample_rate,
                    self.channels(),
                    self.sample_rate
                ),
            });
        }
        for (dst, src) in self.samples.iter_mut().zip(&other.samples) {
            dst.extend_from_slice(src);
        }
        Ok(())
    }

    /// Split the buffer into consecutive blocks of at most `block_size` samples
    pub fn blocks(&self, block_size: usize) -> Vec<AudioBuffer> {
        let block_size = block_size.max(1);
        let mut blocks = Vec::new();
        let mut start = 0;
        while start < self.len() {
            let end = (start + block_size).min(self.len());
            blocks.push(AudioBuffer {
                samples: self.samples.iter().map(|ch| ch[start..end].to_vec()).collect(),
                sample_rate: self.sample_rate,
            });
            start = end;
        }
        blocks
    }

    /// True if every sample is finite
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .all(|s| s.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_db_conversion() {
        assert_relative_eq!(linear_to_db(1.0), 0.0);
        assert_relative_eq!(linear_to_db(0.5), -6.0206, epsilon = 1e-3);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }

    #[test]
    fn test_rms_of_constant_signal() {
        let buffer = AudioBuffer::mono(vec![0.5; 100], DEFAULT_SAMPLE_RATE);
        assert_relative_eq!(calculate_rms(&buffer), linear_to_db(0.5), epsilon = 1e-4);
        assert_relative_eq!(calculate_peak(&buffer), linear_to_db(0.5), epsilon = 1e-4);
    }

    #[test]
    fn test_meter_fill() {
        assert_eq!(meter_fill(f32::NEG_INFINITY), 0.0);
        assert_eq!(meter_fill(-90.0), 0.0);
        assert_relative_eq!(meter_fill(-30.0), 0.5);
        assert_eq!(meter_fill(6.0), 1.0);
    }

    #[test]
    fn test_interleave_roundtrip() {
        let interleaved = vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, 48000).unwrap();
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.channel(1), &[-0.1, -0.2, -0.3]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_from_interleaved_rejects_ragged_data() {
        assert!(AudioBuffer::from_interleaved(&[0.0; 5], 2, 48000).is_err());
        assert!(AudioBuffer::from_interleaved(&[0.0; 4], 0, 48000).is_err());
    }

    #[test]
    fn test_append_and_blocks() {
        let mut buffer = AudioBuffer::empty(1, DEFAULT_SAMPLE_RATE);
        buffer.append(&AudioBuffer::mono(vec![1.0; 3], DEFAULT_SAMPLE_RATE)).unwrap();
        buffer.append(&AudioBuffer::mono(vec![2.0; 4], DEFAULT_SAMPLE_RATE)).unwrap();
        assert_eq!(buffer.len(), 7);

        let blocks = buffer.blocks(3);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2].len(), 1);
        assert_eq!(blocks[2].channel(0), &[2.0]);
    }

    #[test]
    fn test_append_rejects_mismatched_rate() {
        let mut buffer = AudioBuffer::empty(1, 44100);
        let result = buffer.append(&AudioBuffer::mono(vec![0.0; 3], 48000));
        assert!(result.is_err());
        assert!(buffer.is_empty());
    }
}
