//! Chorus Effect
//!
//! Modulated short delay line. The delay sweeps between the base delay and
//! `base * (1 + depth)` driven by a sine LFO; the second channel runs the
//! LFO a quarter cycle ahead for stereo width.

use std::f32::consts::PI;

use crate::dsp::effect::{checked_value, crossfade, unsupported, Effect, EffectKind, EffectParam};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;

// ============================================================================
// Constants
// ============================================================================

/// Base delay in milliseconds
pub const BASE_DELAY_MS: f32 = 2.5;

/// Modulation rate range in Hz
pub const MIN_RATE_HZ: f32 = 0.1;
pub const MAX_RATE_HZ: f32 = 10.0;

const STEREO_PHASE_OFFSET: f32 = 0.25;

// ============================================================================
// Chorus Effect
// ============================================================================

/// Chorus with depth, rate and dry/wet mix
#[derive(Debug, Clone)]
pub struct Chorus {
    depth: f32,
    rate_hz: f32,
    wet: f32,
    prepared: bool,
    sample_rate: f32,
    /// Per-channel circular delay lines
    lines: Vec<Vec<f32>>,
    write_pos: usize,
    /// LFO phase in cycles (0-1)
    phase: f32,
}

impl Chorus {
    /// Create a chorus
    ///
    /// # Arguments
    /// * `depth` - Modulation depth (clamped to 0-1)
    /// * `rate_hz` - LFO rate (clamped to 0.1-10 Hz)
    pub fn new(depth: f32, rate_hz: f32) -> Self {
        Self {
            depth: depth.clamp(0.0, 1.0),
            rate_hz: rate_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ),
            wet: 0.0,
            prepared: false,
            sample_rate: 44100.0,
            lines: Vec::new(),
            write_pos: 0,
            phase: 0.0,
        }
    }

    /// Get modulation depth
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Get LFO rate in Hz
    pub fn rate_hz(&self) -> f32 {
        self.rate_hz
    }

    fn line_len(&self) -> usize {
        // base * 2 at full depth, plus interpolation headroom
        ((BASE_DELAY_MS * 2.0 * self.sample_rate / 1000.0) as usize) + 4
    }

    fn ensure_channels(&mut self, channels: usize) {
        let len = self.line_len();
        while self.lines.len() < channels {
            self.lines.push(vec![0.0; len]);
        }
    }

    #[inline]
    fn read_interpolated(line: &[f32], write_pos: usize, delay_samples: f32) -> f32 {
        let len = line.len();
        let read = write_pos as f32 + len as f32 - delay_samples;
        let index = read.floor();
        let frac = read - index;
        let i0 = (index as usize) % len;
        let i1 = (i0 + 1) % len;
        line[i0] * (1.0 - frac) + line[i1] * frac
    }
}

impl Default for Chorus {
    fn default() -> Self {
        Self::new(0.5, 1.5)
    }
}

impl Effect for Chorus {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.prepared || buffer.is_empty() {
            return;
        }
        self.ensure_channels(buffer.channels());

        let base = BASE_DELAY_MS * self.sample_rate / 1000.0;
        let phase_inc = self.rate_hz / self.sample_rate;
        let num_samples = buffer.num_samples();
        let len = self.lines[0].len();

        for i in 0..num_samples {
            for (ch, channel) in buffer.samples.iter_mut().enumerate() {
                let offset = if ch % 2 == 1 { STEREO_PHASE_OFFSET } else { 0.0 };
                let lfo = (2.0 * PI * (self.phase + offset)).sin();
                let delay = base * (1.0 + self.depth * (0.5 + 0.5 * lfo));

                let line = &mut self.lines[ch];
                let input = channel[i];
                line[self.write_pos] = input;
                let delayed = Self::read_interpolated(line, self.write_pos, delay);
                channel[i] = crossfade(input, delayed, self.wet);
            }
            self.write_pos = (self.write_pos + 1) % len;
            self.phase = (self.phase + phase_inc).fract();
        }
    }

    fn prepare(&mut self, sample_rate: u32, _max_block_size: usize) {
        self.sample_rate = sample_rate.max(1) as f32;
        self.lines.clear();
        self.write_pos = 0;
        self.phase = 0.0;
        self.prepared = true;
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write_pos = 0;
        self.phase = 0.0;
    }

    fn apply(&mut self, param: EffectParam) -> Result<()> {
        let value = checked_value(self.kind(), self.prepared, &param)?;
        match param {
            EffectParam::Wet(_) => self.wet = value.clamp(0.0, 1.0),
            EffectParam::Depth(_) => self.depth = value.clamp(0.0, 1.0),
            EffectParam::Rate(_) => self.rate_hz = value.clamp(MIN_RATE_HZ, MAX_RATE_HZ),
            other => return Err(unsupported(self.kind(), &other)),
        }
        Ok(())
    }

    impl_effect_common!(EffectKind::Chorus);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared() -> Chorus {
        let mut c = Chorus::default();
        c.prepare(44100, 1024);
        c
    }

    #[test]
    fn test_parameter_clamping() {
        let mut c = prepared();
        c.apply(EffectParam::Depth(3.0)).unwrap();
        assert_eq!(c.depth(), 1.0);
        c.apply(EffectParam::Rate(0.0)).unwrap();
        assert_eq!(c.rate_hz(), MIN_RATE_HZ);
        c.apply(EffectParam::Wet(-1.0)).unwrap();
        assert_eq!(c.wet(), 0.0);
    }

    #[test]
    fn test_dry_passthrough() {
        let mut c = prepared();
        let mut buffer = AudioBuffer::mono((0..256).map(|i| (i as f32 * 0.1).sin()).collect(), 44100);
        let original = buffer.clone();
        c.process(&mut buffer);
        for (a, b) in buffer.channel(0).iter().zip(original.channel(0)) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_wet_signal_is_delayed() {
        let mut c = prepared();
        c.apply(EffectParam::Wet(1.0)).unwrap();
        c.apply(EffectParam::Depth(0.0)).unwrap();

        let mut samples = vec![0.0; 512];
        samples[0] = 1.0;
        let mut buffer = AudioBuffer::mono(samples, 44100);
        c.process(&mut buffer);

        // 2.5 ms at 44.1 kHz is 110.25 samples
        let peak = buffer
            .channel(0)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!((110..=111).contains(&peak), "peak at {}", peak);
        assert!(buffer.is_finite());
    }
}
