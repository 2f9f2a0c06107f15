//! Video frames
//!
//! Camera frames and rendered canvas frames share one representation:
//! tightly packed RGBA8 rows plus a capture timestamp.

use std::time::Duration;

use crate::error::{FxError, Result};

/// An RGBA8 image with its capture time
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, `width * height * 4` bytes
    pub rgba: Vec<u8>,
    /// Time since the stream started
    pub timestamp: Duration,
}

/// A frame produced by the overlay renderer
pub type RenderedFrame = VideoFrame;

impl VideoFrame {
    /// Wrap raw pixels, checking the buffer length
    pub fn new(width: u32, height: u32, rgba: Vec<u8>, timestamp: Duration) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(FxError::InvalidFrame {
                reason: format!(
                    "{}x{} frame needs {} bytes, got {}",
                    width,
                    height,
                    expected,
                    rgba.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
            timestamp,
        })
    }

    /// A frame filled with one opaque color
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], timestamp: Duration) -> Self {
        let pixels = width as usize * height as usize;
        let mut rgba = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self {
            width,
            height,
            rgba,
            timestamp,
        }
    }

    /// RGBA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }

    /// Drop the alpha channel
    pub fn to_rgb(&self) -> Vec<u8> {
        self.rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    }
}
