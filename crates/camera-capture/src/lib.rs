//! Camera Capture Library for the face overlay
//!
//! Provides the frames the overlay engine submits for detection:
//! - Decoded RGB video frames and JPEG data-URI stills
//! - Live still sources (webcam snapshot or uploaded image)
//! - File-backed playback over an ordered image sequence

pub mod frame;
pub mod source;

pub use frame::{StillImage, VideoFrame};
pub use source::{ImageSequence, PlaybackState, StillSource, VideoSource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Invalid frame: {0}")]
    Format(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Source contains no frames")]
    Empty,
}

impl From<image::ImageError> for CameraError {
    fn from(err: image::ImageError) -> Self {
        CameraError::Encode(err.to_string())
    }
}

/// Which way a live camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Camera facing mode
    pub facing_mode: FacingMode,
    /// Screenshot width submitted for detection (native width when unset)
    pub screenshot_width: Option<u32>,
    /// Screenshot height submitted for detection (native height when unset)
    pub screenshot_height: Option<u32>,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            facing_mode: FacingMode::User,
            screenshot_width: None,
            screenshot_height: None,
            jpeg_quality: 92,
        }
    }
}

impl CaptureConfig {
    /// Screenshot dimensions for a frame of the given native size.
    ///
    /// A single configured side keeps the native aspect ratio.
    pub fn screenshot_size(&self, native_width: u32, native_height: u32) -> (u32, u32) {
        match (self.screenshot_width, self.screenshot_height) {
            (Some(w), Some(h)) => (w.max(1), h.max(1)),
            (Some(w), None) if native_width > 0 => {
                let h = (w as u64 * native_height as u64 / native_width as u64) as u32;
                (w.max(1), h.max(1))
            }
            (None, Some(h)) if native_height > 0 => {
                let w = (h as u64 * native_width as u64 / native_height as u64) as u32;
                (w.max(1), h.max(1))
            }
            _ => (native_width, native_height),
        }
    }

    /// Produce the still submitted for detection from a captured frame
    pub fn screenshot(&self, frame: &VideoFrame) -> Result<StillImage, CameraError> {
        let (w, h) = self.screenshot_size(frame.width, frame.height);
        if (w, h) == (frame.width, frame.height) {
            StillImage::encode(frame, self.jpeg_quality)
        } else {
            StillImage::encode(&frame.resize(w, h), self.jpeg_quality)
        }
    }
}
