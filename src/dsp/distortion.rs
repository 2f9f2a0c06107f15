//! Distortion Effect
//!
//! Waveshaping distortion using the classic soft-knee curve
//! `f(x) = (3 + k) * x * 20deg / (pi + k * |x|)`, where `k` is the curve
//! amount. Input is clamped to [-1, 1] before shaping.

use std::f32::consts::PI;

use crate::dsp::effect::{checked_value, crossfade, unsupported, Effect, EffectKind, EffectParam};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;

// ============================================================================
// Constants
// ============================================================================

/// Maximum curve amount
pub const MAX_AMOUNT: f32 = 1000.0;

/// Curve amount per unit of normalized drive
pub const DRIVE_SCALE: f32 = 100.0;

const DEG: f32 = PI / 180.0;

/// Evaluate the waveshaping curve
#[inline]
pub fn shape(x: f32, amount: f32) -> f32 {
    let x = x.clamp(-1.0, 1.0);
    (3.0 + amount) * x * 20.0 * DEG / (PI + amount * x.abs())
}

// ============================================================================
// Distortion Effect
// ============================================================================

/// Waveshaper distortion with dry/wet mix
///
/// # Parameters
/// - `amount`: curve amount (0-1000); normalized drive maps to `drive * 100`
/// - `wet`: dry/wet crossfade (0-1)
#[derive(Debug, Clone)]
pub struct Distortion {
    amount: f32,
    wet: f32,
    prepared: bool,
}

impl Distortion {
    /// Create a distortion with the given curve amount
    ///
    /// # Arguments
    /// * `amount` - Curve amount (clamped to 0-1000)
    pub fn new(amount: f32) -> Self {
        Self {
            amount: amount.clamp(0.0, MAX_AMOUNT),
            wet: 0.0,
            prepared: false,
        }
    }

    /// Get curve amount
    pub fn amount(&self) -> f32 {
        self.amount
    }

    /// Normalized drive, the inverse of the drive mapping
    pub fn drive(&self) -> f32 {
        self.amount / DRIVE_SCALE
    }

    fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, MAX_AMOUNT);
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Effect for Distortion {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.prepared || self.wet <= 0.0 {
            return;
        }
        let (amount, wet) = (self.amount, self.wet);
        for channel in buffer.samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = crossfade(*sample, shape(*sample, amount), wet);
            }
        }
    }

    fn prepare(&mut self, _sample_rate: u32, _max_block_size: usize) {
        self.prepared = true;
    }

    fn reset(&mut self) {}

    fn apply(&mut self, param: EffectParam) -> Result<()> {
        let value = checked_value(self.kind(), self.prepared, &param)?;
        match param {
            EffectParam::Wet(_) => self.wet = value.clamp(0.0, 1.0),
            EffectParam::Drive(_) => self.set_amount(value.clamp(0.0, 1.0) * DRIVE_SCALE),
            EffectParam::Amount(_) => self.set_amount(value),
            other => return Err(unsupported(self.kind(), &other)),
        }
        Ok(())
    }

    impl_effect_common!(EffectKind::Distortion);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use approx::assert_relative_eq;

    fn prepared() -> Distortion {
        let mut d = Distortion::new(400.0);
        d.prepare(44100, 512);
        d
    }

    #[test]
    fn test_curve_is_odd_and_bounded() {
        for &k in &[0.0, 50.0, 400.0, 1000.0] {
            for i in 0..=20 {
                let x = i as f32 / 10.0 - 1.0;
                assert_relative_eq!(shape(x, k), -shape(-x, k), epsilon = 1e-6);
                assert!(shape(x, k).abs() <= 1.0 + 1e-3);
            }
        }
        assert_eq!(shape(0.0, 400.0), 0.0);
    }

    #[test]
    fn test_drive_maps_to_amount() {
        let mut d = prepared();
        d.apply(EffectParam::Drive(0.8)).unwrap();
        assert_relative_eq!(d.amount(), 80.0, epsilon = 1e-4);
        assert_relative_eq!(d.drive(), 0.8, epsilon = 1e-6);

        d.apply(EffectParam::Amount(5000.0)).unwrap();
        assert_eq!(d.amount(), MAX_AMOUNT);
    }

    #[test]
    fn test_dry_when_wet_is_zero() {
        let mut d = prepared();
        let mut buffer = AudioBuffer::mono(vec![0.3, -0.7, 0.9], 44100);
        let original = buffer.clone();
        d.process(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_fully_wet_shapes_signal() {
        let mut d = prepared();
        d.apply(EffectParam::Wet(1.0)).unwrap();
        let mut buffer = AudioBuffer::mono(vec![0.5], 44100);
        d.process(&mut buffer);
        assert_relative_eq!(buffer.samples[0][0], shape(0.5, 400.0), epsilon = 1e-6);
    }

    #[test]
    fn test_rejects_foreign_parameter() {
        let mut d = prepared();
        assert!(matches!(
            d.apply(EffectParam::Cutoff(1000.0)),
            Err(FxError::UnsupportedParameter { .. })
        ));
    }

    #[test]
    fn test_unprepared_rejects_updates() {
        let mut d = Distortion::default();
        assert!(matches!(
            d.apply(EffectParam::Wet(0.5)),
            Err(FxError::NodeNotInitialized { .. })
        ));
    }
}
