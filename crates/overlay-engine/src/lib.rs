//! Face Overlay Engine
//!
//! Real-time overlay of remote face detection results on a video view:
//! - Source-to-display geometry mapping
//! - User-positioned detection region with drag/resize gestures
//! - Overlay rendering onto a drawing surface
//! - Detection loop with single in-flight request and cancellation
//! - Stable face ordering for the detail panel

pub mod config;
pub mod geometry;
pub mod identity;
pub mod interaction;
pub mod raster;
pub mod region;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod status;

pub use config::OverlayConfig;
pub use geometry::{to_display, to_source, FrameGeometry, SourceRect};
pub use identity::{face_identifier, panel_entries, FaceEntry};
pub use interaction::{Corner, InteractionState, PointerEvent, RegionEditor};
pub use raster::{RasterSurface, TextRun};
pub use region::{DetectionRegion, RegionFilter};
pub use render::{Color, DrawOp, DrawSurface, Font, OverlayRenderer, RecordingSurface, Rect, Stroke};
pub use scheduler::{Command, DetectionLoop, LoopHandle};
pub use session::OverlaySession;
pub use status::{BackendStatus, FaceStats, OverlaySnapshot, View};

pub use vision_client::{BoundingBox, DetectedFace, DetectionResponse};

use thiserror::Error;

/// Overlay error types
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Detection loop has shut down")]
    LoopClosed,

    #[error("Capture failed: {0}")]
    Camera(#[from] camera_capture::CameraError),

    #[error("Detection failed: {0}")]
    Vision(#[from] vision_client::VisionError),

    #[error("{0}")]
    Unavailable(&'static str),
}
