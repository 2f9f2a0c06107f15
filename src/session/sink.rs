//! Live output
//!
//! Where processed audio goes when it is not being recorded: speakers in a
//! live setup, a WAV file for offline replay, or nowhere.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::engine::wav::float_to_pcm16;
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};

/// Destination for processed audio blocks
pub trait AudioSink {
    fn write(&mut self, block: &AudioBuffer) -> Result<()>;

    /// Flush and close; further writes are errors
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards audio, counting what it was given
#[derive(Debug, Default)]
pub struct NullSink {
    samples: usize,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples per channel received so far
    pub fn samples(&self) -> usize {
        self.samples
    }
}

impl AudioSink for NullSink {
    fn write(&mut self, block: &AudioBuffer) -> Result<()> {
        self.samples += block.num_samples();
        Ok(())
    }
}

/// Keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    buffer: Option<AudioBuffer>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.buffer.as_ref()
    }
}

impl AudioSink for BufferSink {
    fn write(&mut self, block: &AudioBuffer) -> Result<()> {
        match self.buffer.as_mut() {
            Some(buffer) => buffer.append(block),
            None => {
                self.buffer = Some(block.clone());
                Ok(())
            }
        }
    }
}

/// Streams the live mix to a 16-bit PCM WAV file
pub struct WavFileSink {
    path: PathBuf,
    channels: u16,
    sample_rate: u32,
    writer: Option<WavWriter<BufWriter<File>>>,
}

impl WavFileSink {
    /// Create the file; the header is finalized by [`AudioSink::finish`]
    pub fn create(path: &Path, channels: u16, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec)?;
        Ok(Self {
            path: path.to_path_buf(),
            channels,
            sample_rate,
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSink for WavFileSink {
    fn write(&mut self, block: &AudioBuffer) -> Result<()> {
        if block.num_channels() != self.channels as usize || block.sample_rate != self.sample_rate {
            return Err(FxError::InvalidAudio {
                reason: format!(
                    "{}ch@{}Hz block for {}ch@{}Hz output",
                    block.num_channels(),
                    block.sample_rate,
                    self.channels,
                    self.sample_rate
                ),
            });
        }
        let writer = self.writer.as_mut().ok_or_else(|| FxError::InvalidAudio {
            reason: format!("{} is already closed", self.path.display()),
        })?;
        for sample in block.to_interleaved() {
            writer.write_sample(float_to_pcm16(sample))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            log::info!("Live mix written to {}", self.path.display());
        }
        Ok(())
    }
}
