//! Overlay state for one video view: last result, region, gestures, surface

use tracing::debug;
use vision_client::{DetectedFace, DetectionResponse, RegionHint};

use crate::geometry::{to_source, FrameGeometry};
use crate::identity::{panel_entries, FaceEntry};
use crate::interaction::{InteractionState, PointerEvent, RegionEditor};
use crate::region::RegionFilter;
use crate::render::{DrawSurface, OverlayRenderer};
use crate::status::FaceStats;
use crate::{DetectionRegion, OverlayConfig};

/// Latest detection result and the frame size it was computed on
#[derive(Debug, Clone)]
struct AppliedResult {
    response: DetectionResponse,
    submitted: (u32, u32),
}

/// Everything the overlay draws from, independent of scheduling
pub struct OverlaySession<S: DrawSurface> {
    surface: Option<S>,
    renderer: OverlayRenderer,
    filter: RegionFilter,
    editor: RegionEditor,
    default_region: DetectionRegion,
    result: Option<AppliedResult>,
    geometry: Option<FrameGeometry>,
    visible: Vec<DetectedFace>,
}

fn usable(display: Option<(f32, f32)>) -> Option<(f32, f32)> {
    display.filter(|&(w, h)| w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite())
}

impl<S: DrawSurface> OverlaySession<S> {
    pub fn new(surface: Option<S>, config: &OverlayConfig) -> Self {
        Self {
            surface,
            renderer: OverlayRenderer::new(config.handle_size),
            filter: RegionFilter::new(config.default_region, config.min_region_size),
            editor: RegionEditor::new(config.handle_size, config.min_region_size),
            default_region: config.default_region,
            result: None,
            geometry: None,
            visible: Vec::new(),
        }
    }

    /// Replace the current result and redraw
    pub fn apply(
        &mut self,
        response: DetectionResponse,
        submitted: (u32, u32),
        display: Option<(f32, f32)>,
    ) {
        if response.image_size().is_none() {
            debug!(
                "Backend did not report image size, using submitted {}x{}",
                submitted.0, submitted.1
            );
        }
        self.result = Some(AppliedResult { response, submitted });
        self.refresh(display);
    }

    /// Drop the current result and blank the surface
    pub fn clear(&mut self) {
        self.result = None;
        self.geometry = None;
        self.visible.clear();
        if let Some(surface) = self.surface.as_mut() {
            self.renderer.clear(surface);
        }
    }

    pub fn set_region_enabled(&mut self, enabled: bool, display: Option<(f32, f32)>) {
        if enabled == self.filter.is_enabled() {
            return;
        }
        if enabled {
            self.filter.enable(self.default_region, usable(display));
        } else {
            self.filter.disable();
            self.editor.reset();
        }
        self.refresh(display);
    }

    /// Enable the region at an explicit display-space rectangle
    pub fn place_region(&mut self, region: DetectionRegion, display: Option<(f32, f32)>) {
        self.filter.enable(region, usable(display));
        self.editor.reset();
        self.refresh(display);
    }

    /// Feed a gesture event. Returns true when the region changed.
    pub fn pointer(&mut self, event: PointerEvent, display: Option<(f32, f32)>) -> bool {
        let Some(canvas) = usable(display) else {
            return false;
        };
        let Some(region) = self.filter.region_mut() else {
            return false;
        };

        let changed = self.editor.handle(event, region, canvas);
        if changed {
            self.refresh(display);
        }
        changed
    }

    /// Re-derive geometry from the live display size, re-filter, and redraw
    pub fn refresh(&mut self, display: Option<(f32, f32)>) {
        let Some((width, height)) = usable(display) else {
            return;
        };
        if self.filter.is_enabled() {
            self.filter.fit(width, height);
        }

        self.geometry = self.result.as_ref().and_then(|r| {
            FrameGeometry::resolve(r.response.image_size(), r.submitted, (width, height))
        });
        self.visible = match (&self.result, &self.geometry) {
            (Some(r), Some(g)) => self.filter.apply(&r.response.faces, g),
            (Some(r), None) => r.response.faces.clone(),
            (None, _) => Vec::new(),
        };

        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match self.geometry {
            Some(geometry) => {
                self.renderer
                    .render(surface, &self.visible, &geometry, self.filter.region())
            }
            None => {
                // Nothing mapped yet: draw the region alone in display space
                if let Some(identity) = FrameGeometry::new(width, height, width, height) {
                    self.renderer.render(surface, &[], &identity, self.filter.region());
                }
            }
        }
    }

    /// Source-space region to send with a frame of the given size
    pub fn region_hint(&self, frame: (u32, u32), display: Option<(f32, f32)>) -> Option<RegionHint> {
        let region = self.filter.region()?;
        let (w, h) = usable(display)?;
        let geometry = FrameGeometry::new(frame.0 as f32, frame.1 as f32, w, h)?;
        Some(to_source(region, &geometry).into())
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Faces that passed the region filter, in backend order
    pub fn visible_faces(&self) -> &[DetectedFace] {
        &self.visible
    }

    pub fn entries(&self) -> Vec<FaceEntry> {
        panel_entries(&self.visible)
    }

    pub fn stats(&self) -> FaceStats {
        FaceStats::from_faces(&self.visible)
    }

    pub fn geometry(&self) -> Option<FrameGeometry> {
        self.geometry
    }

    pub fn region(&self) -> Option<DetectionRegion> {
        self.filter.region().copied()
    }

    pub fn interaction(&self) -> InteractionState {
        self.editor.state()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn into_surface(self) -> Option<S> {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingSurface;
    use vision_client::BoundingBox;

    const DISPLAY: Option<(f32, f32)> = Some((320.0, 240.0));
    const WIDE: Option<(f32, f32)> = Some((640.0, 480.0));

    fn session() -> OverlaySession<RecordingSurface> {
        OverlaySession::new(Some(RecordingSurface::new()), &OverlayConfig::default())
    }

    fn response() -> DetectionResponse {
        DetectionResponse {
            faces: vec![
                DetectedFace {
                    bbox: BoundingBox::new(100.0, 100.0, 100.0, 100.0),
                    recognized: true,
                    tracking_id: Some(2),
                    ..Default::default()
                },
                DetectedFace {
                    bbox: BoundingBox::new(500.0, 380.0, 80.0, 80.0),
                    tracking_id: Some(1),
                    ..Default::default()
                },
            ],
            image_width: Some(640),
            image_height: Some(480),
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_renders_scaled_faces() {
        let mut s = session();
        s.apply(response(), (1280, 960), DISPLAY);

        assert_eq!(s.geometry().unwrap().src_width, 640.0);
        assert_eq!(s.stats().total, 2);
        let surface = s.surface().unwrap();
        assert_eq!((surface.width, surface.height), (320, 240));
        assert_eq!(surface.strokes().len(), 2);
        assert_eq!(surface.strokes()[0].0.x, 50.0);
    }

    #[test]
    fn test_submitted_size_used_without_report() {
        let mut s = session();
        let mut r = response();
        r.image_width = None;
        s.apply(r, (320, 240), DISPLAY);
        assert_eq!(s.geometry().unwrap().scale(), (1.0, 1.0));
    }

    #[test]
    fn test_region_filters_faces_and_stats() {
        let mut s = session();
        s.set_region_enabled(true, WIDE);
        s.apply(response(), (640, 480), WIDE);

        // Default region spans 50..450 x 50..350, holding only the first center
        let visible = s.visible_faces();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].tracking_id, Some(2));
        assert_eq!(s.stats().recognized, 1);
        assert_eq!(s.stats().unknown, 0);
    }

    #[test]
    fn test_region_fitted_to_canvas() {
        let mut s = session();
        s.set_region_enabled(true, DISPLAY);
        let region = s.region().unwrap();
        assert!(region.right() <= 320.0 && region.bottom() <= 240.0);
        assert!(region.width >= 50.0 && region.height >= 50.0);

        let surface = s.surface().unwrap();
        assert_eq!(surface.strokes().len(), 1);
    }

    #[test]
    fn test_place_region_fits_explicit_rect() {
        let mut s = session();
        s.place_region(DetectionRegion::new(300.0, 10.0, 100.0, 100.0), DISPLAY);
        let region = s.region().unwrap();
        assert_eq!((region.x, region.y, region.width, region.height), (220.0, 10.0, 100.0, 100.0));
    }

    #[test]
    fn test_pointer_ignored_when_region_disabled() {
        let mut s = session();
        assert!(!s.pointer(PointerEvent::Down { x: 60.0, y: 60.0 }, DISPLAY));
        assert!(!s.pointer(PointerEvent::Move { x: 80.0, y: 80.0 }, DISPLAY));
        assert_eq!(s.interaction(), InteractionState::Idle);
    }

    #[test]
    fn test_drag_refilters_current_result() {
        let mut s = session();
        s.set_region_enabled(true, WIDE);
        s.apply(response(), (640, 480), WIDE);
        assert_eq!(s.visible_faces().len(), 1);

        let region = s.region().unwrap();
        s.pointer(
            PointerEvent::Down { x: region.x + 10.0, y: region.y + 10.0 },
            WIDE,
        );
        // Drag toward the bottom-right corner; clamped to the canvas
        assert!(s.pointer(PointerEvent::Move { x: 1000.0, y: 1000.0 }, WIDE));
        s.pointer(PointerEvent::Up, WIDE);

        let ids: Vec<_> = s.visible_faces().iter().map(|f| f.tracking_id).collect();
        assert_eq!(ids, vec![Some(1)]);
        assert_eq!(s.interaction(), InteractionState::Idle);
    }

    #[test]
    fn test_disable_resets_gesture() {
        let mut s = session();
        s.set_region_enabled(true, DISPLAY);
        let region = s.region().unwrap();
        s.pointer(PointerEvent::Down { x: region.x + 15.0, y: region.y + 20.0 }, DISPLAY);
        assert!(matches!(s.interaction(), InteractionState::Dragging { .. }));

        s.set_region_enabled(false, DISPLAY);
        assert_eq!(s.interaction(), InteractionState::Idle);
        assert!(s.region().is_none());
    }

    #[test]
    fn test_clear_blanks_surface() {
        let mut s = session();
        s.apply(response(), (640, 480), DISPLAY);
        s.clear();
        assert!(!s.has_result());
        assert!(s.visible_faces().is_empty());
        assert!(s.surface().unwrap().ops.is_empty());
    }

    #[test]
    fn test_unusable_display_is_noop() {
        let mut s = session();
        s.apply(response(), (640, 480), Some((0.0, 240.0)));
        assert!(s.geometry().is_none());
        assert_eq!(s.surface().unwrap().presented, 0);
    }

    #[test]
    fn test_region_hint_in_source_space() {
        let mut s = session();
        assert!(s.region_hint((640, 480), DISPLAY).is_none());
        s.set_region_enabled(true, DISPLAY);
        let region = s.region().unwrap();
        let hint = s.region_hint((640, 480), DISPLAY).unwrap();
        assert_eq!(hint.x, (region.x * 2.0).round() as i32);
        assert_eq!(hint.width, (region.width * 2.0).round() as i32);
    }
}
