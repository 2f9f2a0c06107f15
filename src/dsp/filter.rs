//! Low-pass Filter Effect
//!
//! Second-order low-pass biquad (Audio EQ Cookbook), Direct Form I with
//! f64 state. Coefficients are recalculated whenever the cutoff, Q or
//! sample rate changes.

use std::f64::consts::PI;

use crate::dsp::effect::{checked_value, crossfade, unsupported, Effect, EffectKind, EffectParam};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;

// ============================================================================
// Constants
// ============================================================================

/// Cutoff range in Hz
pub const MIN_CUTOFF_HZ: f32 = 20.0;
pub const MAX_CUTOFF_HZ: f32 = 20000.0;

/// Resonance range
pub const MIN_Q: f32 = 0.1;
pub const MAX_Q: f32 = 10.0;

// ============================================================================
// Biquad
// ============================================================================

/// Normalized biquad coefficients (a0 = 1)
#[derive(Debug, Clone, Copy, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Low-pass coefficients
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    fn lowpass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        // Clamp frequency to valid range (below Nyquist)
        let freq = frequency.clamp(MIN_CUTOFF_HZ as f64, sample_rate / 2.0 - 1.0);
        let q = q.clamp(MIN_Q as f64, MAX_Q as f64);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos_w0) / 2.0 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: (1.0 - cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Direct Form I history for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, c: &BiquadCoeffs, input: f64) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

// ============================================================================
// Filter Effect
// ============================================================================

/// Resonant low-pass filter
///
/// Unlike the other effects it defaults to fully wet, since its audible
/// control is the cutoff.
#[derive(Debug, Clone)]
pub struct LowpassFilter {
    cutoff_hz: f32,
    q: f32,
    wet: f32,
    prepared: bool,
    sample_rate: f64,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl LowpassFilter {
    /// Create a low-pass filter
    ///
    /// # Arguments
    /// * `cutoff_hz` - Cutoff frequency (clamped to 20-20000 Hz)
    pub fn new(cutoff_hz: f32) -> Self {
        let cutoff_hz = cutoff_hz.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
        let sample_rate = 44100.0;
        Self {
            cutoff_hz,
            q: 1.0,
            wet: 1.0,
            prepared: false,
            sample_rate,
            coeffs: BiquadCoeffs::lowpass(sample_rate, cutoff_hz as f64, 1.0),
            states: Vec::new(),
        }
    }

    /// Get cutoff frequency in Hz
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Get resonance
    pub fn q(&self) -> f32 {
        self.q
    }

    fn update_coefficients(&mut self) {
        self.coeffs = BiquadCoeffs::lowpass(self.sample_rate, self.cutoff_hz as f64, self.q as f64);
    }
}

impl Default for LowpassFilter {
    fn default() -> Self {
        Self::new(2000.0)
    }
}

impl Effect for LowpassFilter {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.prepared {
            return;
        }
        if self.states.len() < buffer.channels() {
            self.states.resize(buffer.channels(), BiquadState::default());
        }
        let coeffs = self.coeffs;
        let wet = self.wet;
        for (channel, state) in buffer.samples.iter_mut().zip(self.states.iter_mut()) {
            for sample in channel.iter_mut() {
                let filtered = state.process(&coeffs, *sample as f64) as f32;
                *sample = crossfade(*sample, filtered, wet);
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32, _max_block_size: usize) {
        self.sample_rate = sample_rate.max(1) as f64;
        self.states.clear();
        self.update_coefficients();
        self.prepared = true;
    }

    fn reset(&mut self) {
        self.states.iter_mut().for_each(|s| *s = BiquadState::default());
    }

    fn apply(&mut self, param: EffectParam) -> Result<()> {
        let value = checked_value(self.kind(), self.prepared, &param)?;
        match param {
            EffectParam::Wet(_) => self.wet = value.clamp(0.0, 1.0),
            EffectParam::Cutoff(_) => {
                self.cutoff_hz = value.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
                self.update_coefficients();
            }
            EffectParam::Q(_) => {
                self.q = value.clamp(MIN_Q, MAX_Q);
                self.update_coefficients();
            }
            other => return Err(unsupported(self.kind(), &other)),
        }
        Ok(())
    }

    impl_effect_common!(EffectKind::Filter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::calculate_rms;
    use crate::engine::wav::generate_test_tone;

    fn prepared(cutoff: f32) -> LowpassFilter {
        let mut f = LowpassFilter::new(cutoff);
        f.prepare(44100, 1024);
        f
    }

    #[test]
    fn test_cutoff_clamp() {
        let mut f = prepared(1000.0);
        f.apply(EffectParam::Cutoff(5.0)).unwrap();
        assert_eq!(f.cutoff_hz(), MIN_CUTOFF_HZ);
        f.apply(EffectParam::Cutoff(50000.0)).unwrap();
        assert_eq!(f.cutoff_hz(), MAX_CUTOFF_HZ);
    }

    #[test]
    fn test_dc_gain_is_unity() {
        let c = BiquadCoeffs::lowpass(44100.0, 1000.0, 1.0);
        let dc = (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2);
        assert!((dc - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_attenuates_above_cutoff() {
        let mut f = prepared(200.0);
        let mut high = generate_test_tone(8000.0, 0.1, 44100);
        let before = calculate_rms(&high);
        f.process(&mut high);
        // Levels are in dB
        assert!(before - calculate_rms(&high) > 26.0);
    }

    #[test]
    fn test_passes_below_cutoff() {
        let mut f = prepared(8000.0);
        let mut low = generate_test_tone(100.0, 0.2, 44100);
        let before = calculate_rms(&low);
        f.process(&mut low);
        assert!((calculate_rms(&low) - before).abs() < 0.5);
    }

    #[test]
    fn test_unsupported_parameter() {
        let mut f = prepared(1000.0);
        assert!(f.apply(EffectParam::Feedback(0.5)).is_err());
    }
}
