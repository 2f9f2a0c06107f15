//! Reverb Effect
//!
//! Schroeder reverb: four damped comb filters in parallel followed by two
//! allpass diffusers per channel. Comb feedback is derived from the decay
//! time so the tail falls 60 dB in `decay` seconds.

use crate::dsp::effect::{checked_value, crossfade, unsupported, Effect, EffectKind, EffectParam};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;

// ============================================================================
// Constants
// ============================================================================

/// Reference sample rate for delay times
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

/// Comb filter delay times in samples at 44.1kHz
const COMB_DELAYS: [usize; 4] = [1116, 1188, 1277, 1356];

/// Allpass filter delay times in samples at 44.1kHz
const ALLPASS_DELAYS: [usize; 2] = [556, 441];

/// Extra delay for the right channel
const STEREO_SPREAD: usize = 23;

/// Allpass filter feedback coefficient
const ALLPASS_GAIN: f32 = 0.5;

/// High-frequency damping in the comb feedback path
const DAMPING: f32 = 0.2;

/// Decay range in seconds
pub const MIN_DECAY_SECS: f32 = 0.05;
pub const MAX_DECAY_SECS: f32 = 10.0;

// ============================================================================
// Filter Components
// ============================================================================

/// Low-pass comb filter
#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    filter_state: f32,
    feedback: f32,
}

impl CombFilter {
    fn new(delay: usize) -> Self {
        Self {
            buffer: vec![0.0; delay.max(1)],
            write_pos: 0,
            filter_state: 0.0,
            feedback: 0.5,
        }
    }

    /// Feedback giving a 60 dB fall over `decay_secs`
    fn set_decay(&mut self, decay_secs: f32, sample_rate: f32) {
        let delay_secs = self.buffer.len() as f32 / sample_rate;
        self.feedback = 10.0_f32.powf(-3.0 * delay_secs / decay_secs).min(0.98);
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];

        // Apply damping (one-pole low-pass in feedback path)
        self.filter_state = output * (1.0 - DAMPING) + self.filter_state * DAMPING;

        // Write input plus filtered feedback to delay line
        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

/// Allpass diffuser
#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl AllpassFilter {
    fn new(delay: usize) -> Self {
        Self {
            buffer: vec![0.0; delay.max(1)],
            write_pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        let output = delayed - ALLPASS_GAIN * input;
        self.buffer[self.write_pos] = input + ALLPASS_GAIN * output;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Comb bank and diffusers for one channel
#[derive(Debug, Clone)]
struct ReverbChannel {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl ReverbChannel {
    fn new(sample_rate: f32, spread: usize, decay_secs: f32) -> Self {
        let scale = sample_rate as f64 / REFERENCE_SAMPLE_RATE;
        let scaled = |d: usize| (((d + spread) as f64) * scale).round() as usize;
        let mut combs: Vec<CombFilter> = COMB_DELAYS.iter().map(|&d| CombFilter::new(scaled(d))).collect();
        for comb in &mut combs {
            comb.set_decay(decay_secs, sample_rate);
        }
        Self {
            combs,
            allpasses: ALLPASS_DELAYS.iter().map(|&d| AllpassFilter::new(scaled(d))).collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut out = self.combs.iter_mut().map(|c| c.process(input)).sum::<f32>();
        out /= COMB_DELAYS.len() as f32;
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }
}

// ============================================================================
// Reverb Effect
// ============================================================================

/// Algorithmic reverb with decay time and dry/wet mix
#[derive(Debug, Clone)]
pub struct Reverb {
    decay_secs: f32,
    wet: f32,
    prepared: bool,
    sample_rate: f32,
    channels: Vec<ReverbChannel>,
}

impl Reverb {
    /// Create a reverb
    ///
    /// # Arguments
    /// * `decay_secs` - Time for the tail to fall by 60 dB (clamped to 0.05-10 s)
    pub fn new(decay_secs: f32) -> Self {
        Self {
            decay_secs: decay_secs.clamp(MIN_DECAY_SECS, MAX_DECAY_SECS),
            wet: 0.0,
            prepared: false,
            sample_rate: 44100.0,
            channels: Vec::new(),
        }
    }

    /// Get decay time in seconds
    pub fn decay_secs(&self) -> f32 {
        self.decay_secs
    }

    fn set_decay(&mut self, decay_secs: f32) {
        self.decay_secs = decay_secs.clamp(MIN_DECAY_SECS, MAX_DECAY_SECS);
        let (decay, rate) = (self.decay_secs, self.sample_rate);
        for channel in &mut self.channels {
            for comb in &mut channel.combs {
                comb.set_decay(decay, rate);
            }
        }
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new(1.5)
    }
}

impl Effect for Reverb {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.prepared {
            return;
        }
        while self.channels.len() < buffer.channels() {
            let spread = if self.channels.len() % 2 == 1 { STEREO_SPREAD } else { 0 };
            self.channels
                .push(ReverbChannel::new(self.sample_rate, spread, self.decay_secs));
        }
        let wet = self.wet;
        for (samples, channel) in buffer.samples.iter_mut().zip(self.channels.iter_mut()) {
            for sample in samples.iter_mut() {
                let tail = channel.process(*sample);
                *sample = crossfade(*sample, tail, wet);
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32, _max_block_size: usize) {
        self.sample_rate = sample_rate.max(1) as f32;
        self.channels.clear();
        self.prepared = true;
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.combs.iter_mut().for_each(CombFilter::clear);
            channel.allpasses.iter_mut().for_each(AllpassFilter::clear);
        }
    }

    fn apply(&mut self, param: EffectParam) -> Result<()> {
        let value = checked_value(self.kind(), self.prepared, &param)?;
        match param {
            EffectParam::Wet(_) => self.wet = value.clamp(0.0, 1.0),
            EffectParam::Decay(_) => self.set_decay(value),
            other => return Err(unsupported(self.kind(), &other)),
        }
        Ok(())
    }

    impl_effect_common!(EffectKind::Reverb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_tail(decay: f32) -> Vec<f32> {
        let mut reverb = Reverb::new(decay);
        reverb.prepare(44100, 4096);
        reverb.apply(EffectParam::Wet(1.0)).unwrap();
        let mut samples = vec![0.0; 44100];
        samples[0] = 1.0;
        let mut buffer = AudioBuffer::mono(samples, 44100);
        reverb.process(&mut buffer);
        buffer.samples.remove(0)
    }

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s * s).sum()
    }

    #[test]
    fn test_decay_clamp() {
        let mut reverb = Reverb::default();
        reverb.prepare(44100, 512);
        reverb.apply(EffectParam::Decay(0.0)).unwrap();
        assert_eq!(reverb.decay_secs(), MIN_DECAY_SECS);
        reverb.apply(EffectParam::Decay(100.0)).unwrap();
        assert_eq!(reverb.decay_secs(), MAX_DECAY_SECS);
    }

    #[test]
    fn test_produces_tail() {
        let tail = impulse_tail(1.0);
        assert!(energy(&tail[2000..]) > 0.0);
        assert!(tail.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_longer_decay_rings_longer() {
        let short = impulse_tail(0.2);
        let long = impulse_tail(2.0);
        assert!(energy(&long[22050..]) > energy(&short[22050..]) * 10.0);
    }

    #[test]
    fn test_dry_when_wet_is_zero() {
        let mut reverb = Reverb::default();
        reverb.prepare(44100, 512);
        let mut buffer = AudioBuffer::mono(vec![0.5; 64], 44100);
        reverb.process(&mut buffer);
        assert!(buffer.channel(0).iter().all(|&s| s == 0.5));
    }
}
