//! Video frame types and still-image encoding

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Wrap a decoded image buffer
    pub fn from_rgb_image(img: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, timestamp_ns, sequence)
    }

    /// Decode an image file into a frame
    pub fn open(path: &Path, sequence: u32) -> Result<Self, CameraError> {
        let img = image::open(path)
            .map_err(|e| CameraError::Open(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_rgb_image(img.to_rgb8(), 0, sequence))
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data
            .get(idx..idx + 3)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Resize frame (nearest neighbour)
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        let mut resized = Vec::with_capacity((new_width * new_height * 3) as usize);

        let x_ratio = self.width as f32 / new_width as f32;
        let y_ratio = self.height as f32 / new_height as f32;

        for y in 0..new_height {
            for x in 0..new_width {
                let x0 = (x as f32 * x_ratio).floor() as u32;
                let y0 = (y as f32 * y_ratio).floor() as u32;

                let pixel = self
                    .get_pixel(
                        x0.min(self.width.saturating_sub(1)),
                        y0.min(self.height.saturating_sub(1)),
                    )
                    .unwrap_or([0, 0, 0]);
                resized.extend_from_slice(&pixel);
            }
        }

        VideoFrame {
            data: resized,
            width: new_width,
            height: new_height,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        }
    }

    fn to_rgb_image(&self) -> Result<RgbImage, CameraError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            CameraError::Format(format!(
                "{} bytes do not cover {}x{} RGB",
                self.data.len(),
                self.width,
                self.height
            ))
        })
    }
}

/// An encoded still image, as submitted to the vision service
#[derive(Debug, Clone)]
pub struct StillImage {
    /// Encoded bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime: &'static str,
    /// Pixel width of the encoded image
    pub width: u32,
    /// Pixel height of the encoded image
    pub height: u32,
}

impl StillImage {
    /// JPEG-encode a frame
    pub fn encode(frame: &VideoFrame, quality: u8) -> Result<Self, CameraError> {
        let img = frame.to_rgb_image()?;
        let mut bytes = Vec::new();
        img.write_with_encoder(JpegEncoder::new_with_quality(
            &mut bytes,
            quality.clamp(1, 100),
        ))?;

        Ok(Self {
            bytes,
            mime: "image/jpeg",
            width: frame.width,
            height: frame.height,
        })
    }

    /// Load an uploaded image file without re-encoding it
    pub fn from_file(path: &Path) -> Result<Self, CameraError> {
        let bytes = std::fs::read(path)
            .map_err(|e| CameraError::Open(format!("{}: {}", path.display(), e)))?;
        let format = image::guess_format(&bytes)?;
        let decoded = image::load_from_memory_with_format(&bytes, format)?;

        Ok(Self {
            mime: mime_for(format),
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    }

    /// `data:<mime>;base64,<payload>` form expected by the service
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        VideoFrame::new(data, width, height, 0, 0)
    }

    #[test]
    fn test_get_pixel_bounds() {
        let frame = gradient(4, 3);
        assert_eq!(frame.get_pixel(2, 1), Some([2, 1, 0]));
        assert_eq!(frame.get_pixel(4, 0), None);
    }

    #[test]
    fn test_resize_halves() {
        let frame = gradient(8, 8).resize(4, 4);
        assert_eq!((frame.width, frame.height), (4, 4));
        assert_eq!(frame.data.len(), 4 * 4 * 3);
        assert_eq!(frame.get_pixel(1, 1), Some([2, 2, 0]));
    }

    #[test]
    fn test_encode_jpeg_data_uri() {
        let still = StillImage::encode(&gradient(16, 16), 80).unwrap();
        assert_eq!(still.mime, "image/jpeg");
        assert!(still.data_uri().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn test_encode_rejects_short_buffer() {
        let frame = VideoFrame::new(vec![0; 5], 4, 4, 0, 0);
        assert!(matches!(
            StillImage::encode(&frame, 90),
            Err(CameraError::Format(_))
        ));
    }
}
