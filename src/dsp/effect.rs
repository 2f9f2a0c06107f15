//! Effect trait definition
//!
//! Base trait for the gesture-controlled effects, the closed set of effect
//! kinds, and the typed parameter updates each kind accepts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};

// ============================================================================
// Effect Kinds
// ============================================================================

/// The five effects a hand can control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Distortion,
    Chorus,
    Delay,
    Filter,
    Reverb,
}

impl EffectKind {
    /// All kinds, in the fixed series order used by continuous mode
    pub const ALL: [EffectKind; 5] = [
        EffectKind::Distortion,
        EffectKind::Chorus,
        EffectKind::Delay,
        EffectKind::Filter,
        EffectKind::Reverb,
    ];

    /// Stable lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Distortion => "distortion",
            EffectKind::Chorus => "chorus",
            EffectKind::Delay => "delay",
            EffectKind::Filter => "filter",
            EffectKind::Reverb => "reverb",
        }
    }

    /// Name shown in the active-effect indicator
    pub fn display_name(&self) -> &'static str {
        match self {
            EffectKind::Distortion => "Distortion",
            EffectKind::Chorus => "Chorus",
            EffectKind::Delay => "Echo",
            EffectKind::Filter => "Filter",
            EffectKind::Reverb => "Reverb",
        }
    }

    /// Position in [`EffectKind::ALL`]
    pub fn index(&self) -> usize {
        match self {
            EffectKind::Distortion => 0,
            EffectKind::Chorus => 1,
            EffectKind::Delay => 2,
            EffectKind::Filter => 3,
            EffectKind::Reverb => 4,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Parameter Updates
// ============================================================================

/// A single typed parameter update
///
/// Each effect kind accepts a fixed subset; anything else is rejected with
/// [`FxError::UnsupportedParameter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "param", content = "value", rename_all = "snake_case")]
pub enum EffectParam {
    /// Dry/wet crossfade (0-1), all effects
    Wet(f32),
    /// Normalized drive (0-1), distortion
    Drive(f32),
    /// Raw waveshaper curve amount (0-1000), distortion
    Amount(f32),
    /// Modulation depth (0-1), chorus
    Depth(f32),
    /// Modulation rate in Hz, chorus
    Rate(f32),
    /// Feedback (0-0.95), delay
    Feedback(f32),
    /// Delay time in seconds, delay
    DelayTime(f32),
    /// Cutoff frequency in Hz, filter
    Cutoff(f32),
    /// Resonance, filter
    Q(f32),
    /// Decay time in seconds, reverb
    Decay(f32),
}

impl EffectParam {
    /// Parameter name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            EffectParam::Wet(_) => "wet",
            EffectParam::Drive(_) => "drive",
            EffectParam::Amount(_) => "amount",
            EffectParam::Depth(_) => "depth",
            EffectParam::Rate(_) => "rate",
            EffectParam::Feedback(_) => "feedback",
            EffectParam::DelayTime(_) => "delay_time",
            EffectParam::Cutoff(_) => "cutoff",
            EffectParam::Q(_) => "q",
            EffectParam::Decay(_) => "decay",
        }
    }

    /// Raw value carried by the update
    pub fn value(&self) -> f32 {
        match *self {
            EffectParam::Wet(v)
            | EffectParam::Drive(v)
            | EffectParam::Amount(v)
            | EffectParam::Depth(v)
            | EffectParam::Rate(v)
            | EffectParam::Feedback(v)
            | EffectParam::DelayTime(v)
            | EffectParam::Cutoff(v)
            | EffectParam::Q(v)
            | EffectParam::Decay(v) => v,
        }
    }
}

// ============================================================================
// Effect Trait
// ============================================================================

/// Base trait for all effects
///
/// Effects process audio buffers in-place. An effect that has not been
/// prepared passes audio through untouched and refuses parameter updates.
pub trait Effect: Send {
    /// Process audio buffer in-place
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Prepare the effect for processing
    ///
    /// Called when the audio context starts or the sample rate changes.
    fn prepare(&mut self, sample_rate: u32, max_block_size: usize);

    /// Reset effect state
    ///
    /// Clears any internal buffers/state (e.g., filter history, delay lines).
    fn reset(&mut self);

    /// Which of the five effects this is
    fn kind(&self) -> EffectKind;

    /// Whether [`Effect::prepare`] has been called
    fn is_prepared(&self) -> bool;

    /// Apply one typed parameter update
    ///
    /// Values are clamped into the effect's valid range.
    ///
    /// # Errors
    /// * `NodeNotInitialized` - If the effect has not been prepared
    /// * `InvalidParameter` - If the value is not finite
    /// * `UnsupportedParameter` - If this effect has no such parameter
    fn apply(&mut self, param: EffectParam) -> Result<()>;

    /// Current dry/wet mix
    fn wet(&self) -> f32;
}

/// Helper macro to implement common Effect trait methods
#[macro_export]
macro_rules! impl_effect_common {
    ($kind:expr) => {
        fn kind(&self) -> $crate::dsp::EffectKind {
            $kind
        }

        fn is_prepared(&self) -> bool {
            self.prepared
        }

        fn wet(&self) -> f32 {
            self.wet
        }
    };
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Equal-sum crossfade between the dry input and the processed signal
#[inline]
pub fn crossfade(dry: f32, processed: f32, wet: f32) -> f32 {
    dry * (1.0 - wet) + processed * wet
}

/// Reject updates on unprepared effects and non-finite values
///
/// Returns the raw value on success so callers can clamp it.
pub fn checked_value(kind: EffectKind, prepared: bool, param: &EffectParam) -> Result<f32> {
    if !prepared {
        return Err(FxError::NodeNotInitialized { effect: kind });
    }
    let value = param.value();
    if !value.is_finite() {
        return Err(FxError::InvalidParameter {
            effect: kind,
            param: param.name(),
            value,
        });
    }
    Ok(value)
}

/// Error for a parameter the effect does not have
pub fn unsupported(kind: EffectKind, param: &EffectParam) -> FxError {
    FxError::UnsupportedParameter {
        effect: kind,
        param: param.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(EffectKind::Chorus.to_string(), "chorus");
        assert_eq!(EffectKind::Delay.display_name(), "Echo");
        for (i, kind) in EffectKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_kind_serde() {
        let json = serde_json::to_string(&EffectKind::Reverb).unwrap();
        assert_eq!(json, "\"reverb\"");
        let back: EffectKind = serde_json::from_str("\"distortion\"").unwrap();
        assert_eq!(back, EffectKind::Distortion);
    }

    #[test]
    fn test_crossfade_endpoints() {
        assert_eq!(crossfade(0.4, -0.2, 0.0), 0.4);
        assert_eq!(crossfade(0.4, -0.2, 1.0), -0.2);
        assert!((crossfade(1.0, 0.0, 0.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_checked_value() {
        let param = EffectParam::Wet(0.5);
        assert!(matches!(
            checked_value(EffectKind::Chorus, false, &param),
            Err(FxError::NodeNotInitialized { .. })
        ));
        assert_eq!(checked_value(EffectKind::Chorus, true, &param).unwrap(), 0.5);

        let nan = EffectParam::Depth(f32::NAN);
        assert!(matches!(
            checked_value(EffectKind::Chorus, true, &nan),
            Err(FxError::InvalidParameter { param: "depth", .. })
        ));
    }
}
