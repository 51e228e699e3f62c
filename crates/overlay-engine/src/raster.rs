//! Pixel-buffer drawing surface backed by imageproc

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as PixelRect;
use serde::Serialize;

use crate::render::{Color, DrawSurface, Font, Rect, Stroke};

/// Text drawn onto a raster surface.
///
/// Glyphs are not rasterized; label text is kept alongside the image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size_px: f32,
    pub bold: bool,
}

/// RGBA overlay image, transparent where nothing is drawn
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbaImage,
    text: Vec<TextRun>,
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            text: Vec::new(),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn text_runs(&self) -> &[TextRun] {
        &self.text
    }

    /// Write the overlay as PNG
    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.image.save(path)
    }

    /// Integer rectangle clipped to non-empty size, `None` when degenerate
    fn pixel_rect(rect: Rect) -> Option<PixelRect> {
        let width = rect.width.round();
        let height = rect.height.round();
        if !(width >= 1.0 && height >= 1.0) {
            return None;
        }
        Some(PixelRect::at(rect.x.round() as i32, rect.y.round() as i32).of_size(width as u32, height as u32))
    }

    fn dashed_line(&mut self, from: (f32, f32), to: (f32, f32), dash: (f32, f32), color: Rgba<u8>) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt();
        let period = dash.0 + dash.1;
        if length <= 0.0 || period <= 0.0 {
            return;
        }
        let (ux, uy) = (dx / length, dy / length);

        let mut t = 0.0;
        while t < length {
            let end = (t + dash.0).min(length);
            draw_line_segment_mut(
                &mut self.image,
                (from.0 + ux * t, from.1 + uy * t),
                (from.0 + ux * end, from.1 + uy * end),
                color,
            );
            t += period;
        }
    }
}

fn rgba(color: Color) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, color.a])
}

impl DrawSurface for RasterSurface {
    fn resize(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    fn clear(&mut self) {
        self.image.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
        self.text.clear();
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke) {
        let color = rgba(stroke.color);
        let passes = stroke.width.round().max(1.0) as i32;

        // Stroke grows inward from the outline, one pixel per pass
        for inset in 0..passes {
            let inner = Rect {
                x: rect.x + inset as f32,
                y: rect.y + inset as f32,
                width: rect.width - 2.0 * inset as f32,
                height: rect.height - 2.0 * inset as f32,
            };
            let Some(outline) = Self::pixel_rect(inner) else {
                break;
            };

            match stroke.dash {
                None => draw_hollow_rect_mut(&mut self.image, outline, color),
                Some(dash) => {
                    let (l, t) = (inner.x, inner.y);
                    let (r, b) = (inner.x + inner.width - 1.0, inner.y + inner.height - 1.0);
                    self.dashed_line((l, t), (r, t), dash, color);
                    self.dashed_line((r, t), (r, b), dash, color);
                    self.dashed_line((r, b), (l, b), dash, color);
                    self.dashed_line((l, b), (l, t), dash, color);
                }
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if let Some(r) = Self::pixel_rect(rect) {
            draw_filled_rect_mut(&mut self.image, r, rgba(color));
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, _color: Color) {
        self.text.push(TextRun {
            text: text.to_string(),
            x,
            y,
            size_px: font.size_px,
            bold: font.bold,
        });
    }
}
