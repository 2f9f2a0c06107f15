//! Landmark overlay
//!
//! Draws the camera frame scaled to the canvas, then the hand skeleton on
//! top: green connection lines and red landmark markers.

use tiny_skia::{
    Color, FillRule, FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};

use crate::error::{FxError, Result};
use crate::render::frame::{RenderedFrame, VideoFrame};
use crate::tracking::landmark::{LandmarkFrame, HAND_CONNECTIONS};

/// Connection line width in pixels
pub const LINE_WIDTH: f32 = 2.0;

/// Landmark marker radius in pixels
pub const MARKER_RADIUS: f32 = 3.0;

/// Overlay drawing options
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub line_color: [u8; 3],
    pub marker_color: [u8; 3],
    pub line_width: f32,
    pub marker_radius: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_color: [0x00, 0xFF, 0x00],
            marker_color: [0xFF, 0x00, 0x00],
            line_width: LINE_WIDTH,
            marker_radius: MARKER_RADIUS,
        }
    }
}

/// Renders video plus hand overlay onto a fixed-size canvas
#[derive(Debug)]
pub struct OverlayRenderer {
    width: u32,
    height: u32,
    mirror: bool,
    style: OverlayStyle,
}

impl OverlayRenderer {
    /// Create a renderer for a `width` x `height` canvas
    pub fn new(width: u32, height: u32, mirror: bool) -> Self {
        Self {
            width,
            height,
            mirror,
            style: OverlayStyle::default(),
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn set_mirror(&mut self, mirror: bool) {
        self.mirror = mirror;
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Canvas position of a normalized landmark coordinate
    pub fn to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
        let w = self.width as f32;
        let px = if self.mirror { w - x * w } else { x * w };
        (px, y * self.height as f32)
    }

    /// Draw one canvas frame
    ///
    /// # Errors
    /// * `InvalidFrame` - If the canvas size is zero or the video frame is malformed
    pub fn render(
        &self,
        video: &VideoFrame,
        landmarks: Option<&LandmarkFrame>,
    ) -> Result<RenderedFrame> {
        let mut canvas = Pixmap::new(self.width, self.height).ok_or_else(|| FxError::InvalidFrame {
            reason: format!("cannot allocate {}x{} canvas", self.width, self.height),
        })?;
        canvas.fill(Color::BLACK);

        self.draw_video(&mut canvas, video)?;
        if let Some(frame) = landmarks {
            self.draw_connections(&mut canvas, frame);
            self.draw_markers(&mut canvas, frame);
        }

        Ok(VideoFrame {
            width: self.width,
            height: self.height,
            rgba: canvas.take(),
            timestamp: video.timestamp,
        })
    }

    fn draw_video(&self, canvas: &mut Pixmap, video: &VideoFrame) -> Result<()> {
        let size = IntSize::from_wh(video.width, video.height).ok_or_else(|| FxError::InvalidFrame {
            reason: format!("{}x{} video frame", video.width, video.height),
        })?;
        let source = Pixmap::from_vec(video.rgba.clone(), size).ok_or_else(|| FxError::InvalidFrame {
            reason: format!(
                "{}x{} video frame with {} bytes",
                video.width,
                video.height,
                video.rgba.len()
            ),
        })?;

        let sx = self.width as f32 / video.width as f32;
        let sy = self.height as f32 / video.height as f32;
        let transform = if self.mirror {
            Transform::from_row(-sx, 0.0, 0.0, sy, self.width as f32, 0.0)
        } else {
            Transform::from_scale(sx, sy)
        };
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        canvas.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
        Ok(())
    }

    fn draw_connections(&self, canvas: &mut Pixmap, frame: &LandmarkFrame) {
        let mut pb = PathBuilder::new();
        for &(a, b) in HAND_CONNECTIONS.iter() {
            let (Some(start), Some(end)) = (frame.get(a), frame.get(b)) else {
                continue;
            };
            if !start.is_finite() || !end.is_finite() {
                continue;
            }
            let (x0, y0) = self.to_canvas(start.x, start.y);
            let (x1, y1) = self.to_canvas(end.x, end.y);
            pb.move_to(x0, y0);
            pb.line_to(x1, y1);
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let mut paint = Paint::default();
        let [r, g, b] = self.style.line_color;
        paint.set_color_rgba8(r, g, b, 255);
        paint.anti_alias = true;
        let stroke = Stroke {
            width: self.style.line_width,
            ..Stroke::default()
        };
        canvas.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn draw_markers(&self, canvas: &mut Pixmap, frame: &LandmarkFrame) {
        let mut paint = Paint::default();
        let [r, g, b] = self.style.marker_color;
        paint.set_color_rgba8(r, g, b, 255);
        paint.anti_alias = true;

        for landmark in frame.landmarks.iter().filter(|l| l.is_finite()) {
            let (x, y) = self.to_canvas(landmark.x, landmark.y);
            if let Some(circle) = PathBuilder::from_circle(x, y, self.style.marker_radius) {
                canvas.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::landmark::{synthetic_hand, Landmark};
    use std::time::Duration;

    fn grey(w: u32, h: u32) -> VideoFrame {
        VideoFrame::solid(w, h, [128, 128, 128], Duration::from_millis(40))
    }

    #[test]
    fn test_video_is_scaled_to_canvas() {
        let renderer = OverlayRenderer::new(64, 48, false);
        let out = renderer.render(&grey(16, 12), None).unwrap();
        assert_eq!((out.width, out.height), (64, 48));
        assert_eq!(out.pixel(32, 24), Some([128, 128, 128, 255]));
        assert_eq!(out.timestamp, Duration::from_millis(40));
    }

    #[test]
    fn test_markers_are_red() {
        let renderer = OverlayRenderer::new(100, 100, false);
        let frame = LandmarkFrame::new(vec![Landmark::new(0.2, 0.2, 0.0)]);
        let out = renderer.render(&grey(10, 10), Some(&frame)).unwrap();
        assert_eq!(out.pixel(20, 20), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_connections_are_green() {
        let renderer = OverlayRenderer::new(200, 200, false);
        let mut hand = synthetic_hand([false, true, false, false, false]);
        // Long vertical index finger segment between PIP and DIP
        hand.landmarks[6] = Landmark::new(0.5, 0.3, 0.0);
        hand.landmarks[7] = Landmark::new(0.5, 0.7, 0.0);
        let out = renderer.render(&grey(10, 10), Some(&hand)).unwrap();
        let [r, g, b, _] = out.pixel(100, 100).unwrap();
        assert!(g > 200 && r < 100 && b < 100, "got {:?}", (r, g, b));
    }

    #[test]
    fn test_mirroring_flips_landmarks() {
        let renderer = OverlayRenderer::new(100, 100, true);
        assert_eq!(renderer.to_canvas(0.2, 0.5), (80.0, 50.0));

        let frame = LandmarkFrame::new(vec![Landmark::new(0.2, 0.2, 0.0)]);
        let out = renderer.render(&grey(10, 10), Some(&frame)).unwrap();
        assert_eq!(out.pixel(80, 20), Some([255, 0, 0, 255]));
        assert_eq!(out.pixel(20, 20), Some([128, 128, 128, 255]));
    }

    #[test]
    fn test_malformed_video_frame() {
        let renderer = OverlayRenderer::new(10, 10, false);
        let bad = VideoFrame {
            width: 4,
            height: 4,
            rgba: vec![0; 10],
            timestamp: Duration::ZERO,
        };
        assert!(renderer.render(&bad, None).is_err());
    }
}
