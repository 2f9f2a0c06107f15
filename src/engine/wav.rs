//! WAV encoding for recordings and audio file import
//!
//! Recordings are exported as canonical 16-bit PCM WAV: a 44-byte header
//! ("RIFF" size "WAVE", a 16-byte "fmt " chunk, "data" size) followed by
//! interleaved little-endian samples. Mono and stereo only, so the writer
//! never switches to the extensible format.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::AudioBuffer;
use crate::error::{FxError, Result};

/// Size of the canonical PCM header in bytes
pub const WAV_HEADER_LEN: usize = 44;

/// Bit depth of exported audio
pub const EXPORT_BIT_DEPTH: u16 = 16;

/// Convert a float sample to 16-bit PCM
///
/// The sample is clamped to [-1, 1] first; negative values scale by 32768
/// and positive values by 32767 so both extremes are representable.
#[inline]
pub fn float_to_pcm16(sample: f32) -> i16 {
    if !sample.is_finite() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Convert 16-bit PCM back to a float sample
#[inline]
pub fn pcm16_to_float(sample: i16) -> f32 {
    if sample < 0 {
        sample as f32 / 32768.0
    } else {
        sample as f32 / 32767.0
    }
}

fn export_spec(buffer: &AudioBuffer) -> Result<WavSpec> {
    let channels = buffer.num_channels();
    if !(1..=2).contains(&channels) {
        return Err(FxError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        });
    }
    if buffer.sample_rate == 0 {
        return Err(FxError::InvalidAudio {
            reason: "sample rate is zero".to_string(),
        });
    }
    Ok(WavSpec {
        channels: channels as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: EXPORT_BIT_DEPTH,
        sample_format: SampleFormat::Int,
    })
}

/// Encode a buffer as an in-memory 16-bit PCM WAV file
///
/// The result is exactly `44 + frames * channels * 2` bytes long.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let spec = export_spec(buffer)?;
    let frames = buffer.num_samples();
    let mut cursor = Cursor::new(Vec::with_capacity(
        WAV_HEADER_LEN + frames * buffer.num_channels() * 2,
    ));

    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for sample in buffer.to_interleaved() {
            writer.write_sample(float_to_pcm16(sample))?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Write a buffer to a 16-bit PCM WAV file
pub fn write_wav(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    let bytes = encode_wav(buffer)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Decode an in-memory WAV file
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    read_buffer(reader)
}

/// Import a WAV file at its native sample rate
///
/// # Errors
/// * `Io` - If the file does not exist or cannot be read
/// * `UnsupportedFormat` - If the audio has more than 2 channels or an odd bit depth
/// * `InvalidAudio` - If the file contains no samples
pub fn import_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)?;
    let buffer = read_buffer(reader)?;
    if buffer.is_empty() {
        return Err(FxError::InvalidAudio {
            reason: format!("{} contains no samples", path.display()),
        });
    }
    Ok(buffer)
}

fn read_buffer<R: std::io::Read>(reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if !(1..=2).contains(&channels) {
        return Err(FxError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        });
    }

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    AudioBuffer::from_interleaved(&interleaved, channels, spec.sample_rate)
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let samples: Vec<f32> = match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(pcm16_to_float))
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
            _ => {
                return Err(FxError::UnsupportedFormat {
                    format: format!("{}-bit integer audio", bits_per_sample),
                })
            }
        },
    };
    Ok(samples)
}

/// Generate a mono sine test tone
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    let samples = (0..num_samples)
        .map(|i| 0.5 * (angular_freq * i as f32).sin())
        .collect();
    AudioBuffer::mono(samples, sample_rate)
}
