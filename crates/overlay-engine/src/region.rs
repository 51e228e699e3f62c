//! Detection region and face filtering

use serde::{Deserialize, Serialize};
use tracing::debug;
use vision_client::DetectedFace;

use crate::geometry::{to_source, FrameGeometry};
use crate::interaction::Corner;

/// User-positioned rectangle in display space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DetectionRegion {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Inclusive point containment
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn corner(&self, corner: Corner) -> (f32, f32) {
        match corner {
            Corner::TopLeft => (self.x, self.y),
            Corner::TopRight => (self.right(), self.y),
            Corner::BottomLeft => (self.x, self.bottom()),
            Corner::BottomRight => (self.right(), self.bottom()),
        }
    }

    /// Shrink and shift the region until it lies inside the canvas.
    ///
    /// Width and height never drop below `min_size`; on a canvas smaller
    /// than `min_size` the region is pinned to the origin.
    pub fn fit_within(&self, canvas_width: f32, canvas_height: f32, min_size: f32) -> Self {
        let width = self.width.min(canvas_width).max(min_size);
        let height = self.height.min(canvas_height).max(min_size);
        Self {
            x: self.x.min(canvas_width - width).max(0.0),
            y: self.y.min(canvas_height - height).max(0.0),
            width,
            height,
        }
    }
}

/// Region feature state: the rectangle plus whether it filters results
#[derive(Debug, Clone)]
pub struct RegionFilter {
    enabled: bool,
    region: DetectionRegion,
    min_size: f32,
}

impl RegionFilter {
    pub fn new(default_region: DetectionRegion, min_size: f32) -> Self {
        Self {
            enabled: false,
            region: default_region,
            min_size,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Region, when the feature is enabled
    pub fn region(&self) -> Option<&DetectionRegion> {
        self.enabled.then_some(&self.region)
    }

    pub fn region_mut(&mut self) -> Option<&mut DetectionRegion> {
        if self.enabled {
            Some(&mut self.region)
        } else {
            None
        }
    }

    /// Turn the feature on, placing `default_region` inside the canvas when known
    pub fn enable(&mut self, default_region: DetectionRegion, canvas: Option<(f32, f32)>) {
        self.region = match canvas {
            Some((w, h)) => default_region.fit_within(w, h, self.min_size),
            None => default_region,
        };
        self.enabled = true;
        debug!("Detection region enabled at {:?}", self.region);
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Re-fit the region after a layout change
    pub fn fit(&mut self, canvas_width: f32, canvas_height: f32) {
        self.region = self.region.fit_within(canvas_width, canvas_height, self.min_size);
    }

    /// Faces whose source-space center lies inside the region.
    ///
    /// Every face passes when the feature is disabled.
    pub fn apply(&self, faces: &[DetectedFace], geometry: &FrameGeometry) -> Vec<DetectedFace> {
        let Some(region) = self.region() else {
            return faces.to_vec();
        };

        let bounds = to_source(region, geometry);
        faces
            .iter()
            .filter(|face| {
                let (cx, cy) = face.bbox.center();
                bounds.contains(cx, cy)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vision_client::BoundingBox;

    fn face_centered_at(cx: f32, cy: f32) -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox::new(cx - 10.0, cy - 10.0, 20.0, 20.0),
            ..Default::default()
        }
    }

    fn enabled_filter() -> RegionFilter {
        let mut filter = RegionFilter::new(DetectionRegion::new(0.0, 0.0, 100.0, 100.0), 50.0);
        filter.enable(DetectionRegion::new(50.0, 50.0, 400.0, 300.0), None);
        filter
    }

    #[test]
    fn test_region_scenario() {
        let geometry = FrameGeometry::new(640.0, 480.0, 320.0, 240.0).unwrap();
        let faces = vec![face_centered_at(90.0, 90.0), face_centered_at(500.0, 400.0)];

        let kept = enabled_filter().apply(&faces, &geometry);
        assert_eq!(kept, vec![faces[1].clone()]);
    }

    #[test]
    fn test_disabled_filter_passes_everything() {
        let geometry = FrameGeometry::new(640.0, 480.0, 320.0, 240.0).unwrap();
        let faces = vec![face_centered_at(1.0, 1.0), face_centered_at(600.0, 470.0)];
        let filter = RegionFilter::new(DetectionRegion::new(50.0, 50.0, 60.0, 60.0), 50.0);
        assert_eq!(filter.apply(&faces, &geometry).len(), 2);
        assert!(filter.region().is_none());
    }

    #[test]
    fn test_boundary_center_included() {
        let geometry = FrameGeometry::new(640.0, 480.0, 320.0, 240.0).unwrap();
        let on_edge = face_centered_at(100.0, 100.0);
        assert_eq!(enabled_filter().apply(&[on_edge], &geometry).len(), 1);
    }

    #[test]
    fn test_enable_fits_into_canvas() {
        let mut filter = RegionFilter::new(DetectionRegion::new(0.0, 0.0, 0.0, 0.0), 50.0);
        filter.enable(DetectionRegion::new(50.0, 50.0, 400.0, 300.0), Some((320.0, 240.0)));
        let region = *filter.region().unwrap();
        assert_eq!(region, DetectionRegion::new(0.0, 0.0, 320.0, 240.0));
    }

    #[test]
    fn test_fit_after_shrink() {
        let region = DetectionRegion::new(500.0, 300.0, 200.0, 150.0).fit_within(640.0, 360.0, 50.0);
        assert_eq!(region, DetectionRegion::new(440.0, 210.0, 200.0, 150.0));
    }

    proptest! {
        #[test]
        fn prop_filter_matches_center_containment(
            rx in 0f32..300.0, ry in 0f32..200.0, rw in 50f32..300.0, rh in 50f32..300.0,
            cx in 0f32..700.0, cy in 0f32..500.0,
        ) {
            let geometry = FrameGeometry::new(640.0, 480.0, 320.0, 240.0).unwrap();
            let mut filter = RegionFilter::new(DetectionRegion::new(0.0, 0.0, 50.0, 50.0), 50.0);
            let region = DetectionRegion::new(rx, ry, rw, rh);
            filter.enable(region, None);

            let face = face_centered_at(cx, cy);
            let passes = !filter.apply(&[face.clone()], &geometry).is_empty();
            let (fx, fy) = face.bbox.center();
            prop_assert_eq!(passes, to_source(&region, &geometry).contains(fx, fy));
        }
    }
}
