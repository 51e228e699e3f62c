//! Source-space / display-space coordinate mapping
//!
//! Detection results arrive in the pixel space of the image the backend
//! processed. The overlay is drawn in the pixel space of the video view as it
//! is currently laid out. The two are related by independent x/y scale
//! factors, re-derived for every frame.

use serde::{Deserialize, Serialize};
use vision_client::{BoundingBox, RegionHint};

use crate::DetectionRegion;

/// Source and display dimensions for one rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub src_width: f32,
    pub src_height: f32,
    pub display_width: f32,
    pub display_height: f32,
}

impl FrameGeometry {
    /// `None` unless every dimension is positive and finite
    pub fn new(src_width: f32, src_height: f32, display_width: f32, display_height: f32) -> Option<Self> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if [src_width, src_height, display_width, display_height]
            .into_iter()
            .all(valid)
        {
            Some(Self {
                src_width,
                src_height,
                display_width,
                display_height,
            })
        } else {
            None
        }
    }

    /// Backend-reported dimensions win over the submitted frame's dimensions
    pub fn resolve(
        reported: Option<(u32, u32)>,
        submitted: (u32, u32),
        display: (f32, f32),
    ) -> Option<Self> {
        let (src_w, src_h) = reported.unwrap_or(submitted);
        Self::new(src_w as f32, src_h as f32, display.0, display.1)
    }

    /// (scale_x, scale_y) from source to display
    pub fn scale(&self) -> (f32, f32) {
        (
            self.display_width / self.src_width,
            self.display_height / self.src_height,
        )
    }
}

/// Integer rectangle in source space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SourceRect {
    /// Inclusive containment test
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x as f32
            && px <= (self.x + self.width) as f32
            && py >= self.y as f32
            && py <= (self.y + self.height) as f32
    }
}

impl From<SourceRect> for RegionHint {
    fn from(r: SourceRect) -> Self {
        RegionHint {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

/// Map a source-space box into display space
pub fn to_display(bbox: &BoundingBox, geometry: &FrameGeometry) -> BoundingBox {
    let (sx, sy) = geometry.scale();
    BoundingBox {
        x: bbox.x * sx,
        y: bbox.y * sy,
        w: bbox.w * sx,
        h: bbox.h * sy,
    }
}

/// Map a display-space region into source space, rounded to whole pixels
pub fn to_source(region: &DetectionRegion, geometry: &FrameGeometry) -> SourceRect {
    let x = |v: f32| (v / geometry.display_width * geometry.src_width).round() as i32;
    let y = |v: f32| (v / geometry.display_height * geometry.src_height).round() as i32;
    SourceRect {
        x: x(region.x),
        y: y(region.y),
        width: x(region.width),
        height: y(region.height),
    }
}
