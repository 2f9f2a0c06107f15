//! Recording tap
//!
//! Collects processed audio blocks exactly as the live output hears them.

use crate::engine::AudioBuffer;
use crate::error::Result;

/// Accumulates processed audio between `start` and `stop`
#[derive(Debug, Clone)]
pub struct TapRecorder {
    buffer: AudioBuffer,
    active: bool,
}

impl TapRecorder {
    pub fn new(channels: usize, sample_rate: u32) -> Self {
        Self {
            buffer: AudioBuffer::empty(channels, sample_rate),
            active: false,
        }
    }

    /// Begin a fresh capture, discarding anything left over
    pub fn start(&mut self) {
        self.buffer = AudioBuffer::empty(self.buffer.num_channels(), self.buffer.sample_rate);
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Append one block; ignored while inactive
    ///
    /// # Errors
    /// * `InvalidAudio` - If the block's layout does not match the tap
    pub fn push(&mut self, block: &AudioBuffer) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.buffer.append(block)
    }

    /// Stop accepting blocks but keep what was collected
    pub fn close(&mut self) {
        self.active = false;
    }

    /// Samples per channel captured so far
    pub fn captured_samples(&self) -> usize {
        self.buffer.num_samples()
    }

    /// Stop capturing and hand over the audio, or `None` if nothing arrived
    pub fn finish(&mut self) -> Option<AudioBuffer> {
        self.active = false;
        let channels = self.buffer.num_channels();
        let rate = self.buffer.sample_rate;
        let captured = std::mem::replace(&mut self.buffer, AudioBuffer::empty(channels, rate));
        if captured.is_empty() {
            None
        } else {
            Some(captured)
        }
    }

    /// Stop capturing and drop whatever was collected
    pub fn discard(&mut self) {
        let _ = self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_blocks_while_inactive() {
        let mut tap = TapRecorder::new(1, 44100);
        tap.push(&AudioBuffer::mono(vec![0.5; 32], 44100)).unwrap();
        assert_eq!(tap.captured_samples(), 0);
        assert!(tap.finish().is_none());
    }

    #[test]
    fn test_collects_blocks_in_order() {
        let mut tap = TapRecorder::new(1, 44100);
        tap.start();
        tap.push(&AudioBuffer::mono(vec![0.1; 4], 44100)).unwrap();
        tap.push(&AudioBuffer::mono(vec![0.2; 4], 44100)).unwrap();

        let audio = tap.finish().unwrap();
        assert_eq!(audio.num_samples(), 8);
        assert_eq!(audio.channel(0)[3], 0.1);
        assert_eq!(audio.channel(0)[4], 0.2);
        assert!(!tap.is_active());
    }

    #[test]
    fn test_restart_discards_previous_capture() {
        let mut tap = TapRecorder::new(1, 44100);
        tap.start();
        tap.push(&AudioBuffer::mono(vec![0.1; 4], 44100)).unwrap();
        tap.start();
        assert_eq!(tap.captured_samples(), 0);
    }

    #[test]
    fn test_close_keeps_audio() {
        let mut tap = TapRecorder::new(1, 44100);
        tap.start();
        tap.push(&AudioBuffer::mono(vec![0.1; 4], 44100)).unwrap();
        tap.close();
        tap.push(&AudioBuffer::mono(vec![0.1; 4], 44100)).unwrap();
        assert_eq!(tap.finish().unwrap().num_samples(), 4);
    }

    #[test]
    fn test_rejects_mismatched_layout() {
        let mut tap = TapRecorder::new(2, 44100);
        tap.start();
        assert!(tap.push(&AudioBuffer::mono(vec![0.1; 4], 44100)).is_err());
    }
}
