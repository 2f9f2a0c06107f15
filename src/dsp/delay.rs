//! Delay Effect
//!
//! Feedback echo with a crossfaded dry/wet mix. The delay line is sized for
//! the maximum delay time so changing the time never reallocates mid-stream.

use crate::dsp::effect::{checked_value, crossfade, unsupported, Effect, EffectKind, EffectParam};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;

// ============================================================================
// Constants
// ============================================================================

/// Delay time range in seconds
pub const MIN_DELAY_SECS: f32 = 0.001;
pub const MAX_DELAY_SECS: f32 = 1.0;

/// Feedback ceiling (NOT 1.0 to prevent infinite feedback)
pub const MAX_FEEDBACK: f32 = 0.95;

// ============================================================================
// Delay Effect
// ============================================================================

/// Feedback delay
#[derive(Debug, Clone)]
pub struct Delay {
    /// Delay time in seconds (0.001-1.0)
    delay_time: f32,
    /// Feedback amount (0-0.95)
    feedback: f32,
    /// Dry/wet crossfade (0-1)
    wet: f32,
    prepared: bool,
    sample_rate: f32,
    /// Circular buffer per channel
    lines: Vec<Vec<f32>>,
    /// Current write position in circular buffer
    write_pos: usize,
}

impl Delay {
    /// Create a new delay effect
    ///
    /// # Arguments
    /// * `delay_time` - Delay time in seconds (clamped to 0.001-1.0)
    /// * `feedback` - Feedback amount (clamped to 0-0.95)
    pub fn new(delay_time: f32, feedback: f32) -> Self {
        Self {
            delay_time: delay_time.clamp(MIN_DELAY_SECS, MAX_DELAY_SECS),
            feedback: feedback.clamp(0.0, MAX_FEEDBACK),
            wet: 0.0,
            prepared: false,
            sample_rate: 44100.0,
            lines: Vec::new(),
            write_pos: 0,
        }
    }

    /// Get delay time in seconds
    pub fn delay_time(&self) -> f32 {
        self.delay_time
    }

    /// Get feedback amount
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Calculate delay in samples
    fn delay_samples(&self) -> usize {
        ((self.delay_time * self.sample_rate).round() as usize).max(1)
    }

    /// Buffer size for the longest delay plus one sample
    fn line_len(&self) -> usize {
        (MAX_DELAY_SECS * self.sample_rate) as usize + 1
    }

    fn ensure_channels(&mut self, channels: usize) {
        let len = self.line_len();
        while self.lines.len() < channels {
            self.lines.push(vec![0.0; len]);
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new(0.3, 0.3)
    }
}

impl Effect for Delay {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.prepared || buffer.is_empty() {
            return;
        }
        self.ensure_channels(buffer.channels());

        let delay = self.delay_samples();
        let feedback = self.feedback;
        let wet = self.wet;
        let len = self.lines[0].len();
        let start = self.write_pos;

        for (channel, line) in buffer.samples.iter_mut().zip(self.lines.iter_mut()) {
            let mut pos = start;
            for sample in channel.iter_mut() {
                let input = *sample;
                let read_pos = (pos + len - delay) % len;
                let delayed = line[read_pos];
                line[pos] = input + delayed * feedback;
                *sample = crossfade(input, delayed, wet);
                pos = (pos + 1) % len;
            }
        }

        self.write_pos = (start + buffer.num_samples()) % len;
    }

    fn prepare(&mut self, sample_rate: u32, _max_block_size: usize) {
        self.sample_rate = sample_rate.max(1) as f32;
        self.lines.clear();
        self.write_pos = 0;
        self.prepared = true;
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write_pos = 0;
    }

    fn apply(&mut self, param: EffectParam) -> Result<()> {
        let value = checked_value(self.kind(), self.prepared, &param)?;
        match param {
            EffectParam::Wet(_) => self.wet = value.clamp(0.0, 1.0),
            EffectParam::Feedback(_) => self.feedback = value.clamp(0.0, MAX_FEEDBACK),
            EffectParam::DelayTime(_) => {
                self.delay_time = value.clamp(MIN_DELAY_SECS, MAX_DELAY_SECS)
            }
            other => return Err(unsupported(self.kind(), &other)),
        }
        Ok(())
    }

    impl_effect_common!(EffectKind::Delay);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(delay_time: f32, feedback: f32) -> Delay {
        let mut delay = Delay::new(delay_time, feedback);
        delay.prepare(1000, 256);
        delay
    }

    #[test]
    fn test_delay_new() {
        let delay = Delay::default();
        assert_eq!(delay.delay_time(), 0.3);
        assert_eq!(delay.feedback(), 0.3);
        assert_eq!(delay.wet(), 0.0);
        assert!(!delay.is_prepared());
    }

    #[test]
    fn test_feedback_clamp() {
        let mut delay = prepared(0.1, 0.0);

        delay.apply(EffectParam::Feedback(1.5)).unwrap();
        assert_eq!(delay.feedback(), 0.95); // Clamped to max

        delay.apply(EffectParam::Feedback(-0.5)).unwrap();
        assert_eq!(delay.feedback(), 0.0); // Clamped to min
    }

    #[test]
    fn test_delay_time_clamp() {
        let mut delay = prepared(0.1, 0.0);
        delay.apply(EffectParam::DelayTime(5.0)).unwrap();
        assert_eq!(delay.delay_time(), MAX_DELAY_SECS);
        delay.apply(EffectParam::DelayTime(0.0)).unwrap();
        assert_eq!(delay.delay_time(), MIN_DELAY_SECS);
    }

    #[test]
    fn test_impulse_echoes_with_feedback() {
        // 1 kHz sample rate keeps the arithmetic readable: 0.01 s = 10 samples
        let mut delay = prepared(0.01, 0.5);
        delay.apply(EffectParam::Wet(1.0)).unwrap();

        let mut samples = vec![0.0; 40];
        samples[0] = 1.0;
        let mut buffer = AudioBuffer::mono(samples, 1000);
        delay.process(&mut buffer);

        let out = buffer.channel(0);
        assert_eq!(out[0], 0.0);
        assert!((out[10] - 1.0).abs() < 1e-6);
        assert!((out[20] - 0.5).abs() < 1e-6);
        assert!((out[30] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_state_carries_across_blocks() {
        let mut delay = prepared(0.01, 0.0);
        delay.apply(EffectParam::Wet(1.0)).unwrap();

        let mut first = AudioBuffer::mono(vec![1.0, 0.0, 0.0, 0.0, 0.0], 1000);
        let mut second = AudioBuffer::mono(vec![0.0; 10], 1000);
        delay.process(&mut first);
        delay.process(&mut second);

        assert!((second.channel(0)[5] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_clears_tail() {
        let mut delay = prepared(0.1, 0.9);
        delay.apply(EffectParam::Wet(1.0)).unwrap();
        let mut buffer = AudioBuffer::mono(vec![1.0; 20], 1000);
        delay.process(&mut buffer);
        delay.reset();

        let mut silence = AudioBuffer::mono(vec![0.0; 30], 1000);
        delay.process(&mut silence);
        assert!(silence.channel(0).iter().all(|&s| s == 0.0));
    }
}
