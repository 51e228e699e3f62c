//! Drag/resize gestures over the detection region
//!
//! Pointer coordinates are raw offsets into the drawing surface (display
//! space). The region the editor mutates is display space as well.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DetectionRegion;

/// Region corner grabbed by a resize gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Hit-test order
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    fn moves_left_edge(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    fn moves_top_edge(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }
}

/// Pointer input on the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    Leave,
}

/// Gesture in progress
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging {
        grab_offset: (f32, f32),
    },
    Resizing {
        corner: Corner,
        last_pointer: (f32, f32),
    },
}

/// Gesture state machine for one region
#[derive(Debug, Clone)]
pub struct RegionEditor {
    state: InteractionState,
    handle_size: f32,
    min_size: f32,
}

impl RegionEditor {
    pub fn new(handle_size: f32, min_size: f32) -> Self {
        Self {
            state: InteractionState::Idle,
            handle_size,
            min_size,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// Corner whose handle hit box contains the point
    pub fn hit_corner(&self, region: &DetectionRegion, px: f32, py: f32) -> Option<Corner> {
        let half = self.handle_size / 2.0;
        Corner::ALL.into_iter().find(|&corner| {
            let (cx, cy) = region.corner(corner);
            (px - cx).abs() <= half && (py - cy).abs() <= half
        })
    }

    /// Feed one pointer event. Returns true when the region moved or resized.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        region: &mut DetectionRegion,
        canvas: (f32, f32),
    ) -> bool {
        match event {
            PointerEvent::Down { x, y } => {
                self.pointer_down(region, x, y);
                false
            }
            PointerEvent::Move { x, y } => self.pointer_move(region, canvas, x, y),
            PointerEvent::Up | PointerEvent::Leave => {
                self.reset();
                false
            }
        }
    }

    fn pointer_down(&mut self, region: &DetectionRegion, px: f32, py: f32) {
        self.state = if let Some(corner) = self.hit_corner(region, px, py) {
            debug!("Resizing region from {:?}", corner);
            InteractionState::Resizing {
                corner,
                last_pointer: (px, py),
            }
        } else if region.contains_point(px, py) {
            InteractionState::Dragging {
                grab_offset: (px - region.x, py - region.y),
            }
        } else {
            InteractionState::Idle
        };
    }

    fn pointer_move(
        &mut self,
        region: &mut DetectionRegion,
        (canvas_width, canvas_height): (f32, f32),
        px: f32,
        py: f32,
    ) -> bool {
        match self.state {
            InteractionState::Idle => false,
            InteractionState::Dragging { grab_offset } => {
                region.x = (px - grab_offset.0)
                    .min(canvas_width - region.width)
                    .max(0.0);
                region.y = (py - grab_offset.1)
                    .min(canvas_height - region.height)
                    .max(0.0);
                true
            }
            InteractionState::Resizing {
                corner,
                last_pointer,
            } => {
                let dx = px - last_pointer.0;
                let dy = py - last_pointer.1;
                let min = self.min_size;

                if corner.moves_left_edge() {
                    let right = region.right();
                    region.x = (region.x + dx).min(right - min).max(0.0);
                    region.width = (right - region.x).max(min);
                } else {
                    let max_width = (canvas_width - region.x).max(min);
                    region.width = (region.width + dx).min(max_width).max(min);
                }

                if corner.moves_top_edge() {
                    let bottom = region.bottom();
                    region.y = (region.y + dy).min(bottom - min).max(0.0);
                    region.height = (bottom - region.y).max(min);
                } else {
                    let max_height = (canvas_height - region.y).max(min);
                    region.height = (region.height + dy).min(max_height).max(min);
                }

                self.state = InteractionState::Resizing {
                    corner,
                    last_pointer: (px, py),
                };
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CANVAS: (f32, f32) = (640.0, 480.0);

    fn region() -> DetectionRegion {
        DetectionRegion::new(100.0, 100.0, 200.0, 150.0)
    }

    #[test]
    fn test_down_on_handle_starts_resize() {
        let mut editor = RegionEditor::new(12.0, 50.0);
        let mut r = region();
        editor.handle(PointerEvent::Down { x: 305.0, y: 254.0 }, &mut r, CANVAS);
        assert_eq!(
            editor.state(),
            InteractionState::Resizing {
                corner: Corner::BottomRight,
                last_pointer: (305.0, 254.0)
            }
        );
    }

    #[test]
    fn test_down_in_body_starts_drag() {
        let mut editor = RegionEditor::new(12.0, 50.0);
        let mut r = region();
        editor.handle(PointerEvent::Down { x: 150.0, y: 120.0 }, &mut r, CANVAS);
        assert_eq!(
            editor.state(),
            InteractionState::Dragging { grab_offset: (50.0, 20.0) }
        );
    }

    #[test]
    fn test_down_outside_stays_idle() {
        let mut editor = RegionEditor::new(12.0, 50.0);
        let mut r = region();
        editor.handle(PointerEvent::Down { x: 10.0, y: 10.0 }, &mut r, CANVAS);
        assert_eq!(editor.state(), InteractionState::Idle);
        assert!(!editor.handle(PointerEvent::Move { x: 20.0, y: 20.0 }, &mut r, CANVAS));
        assert_eq!(r, region());
    }

    #[test]
    fn test_drag_clamps_to_canvas() {
        let mut editor = RegionEditor::new(12.0, 50.0);
        let mut r = region();
        editor.handle(PointerEvent::Down { x: 150.0, y: 150.0 }, &mut r, CANVAS);
        editor.handle(PointerEvent::Move { x: 900.0, y: -300.0 }, &mut r, CANVAS);
        assert_eq!((r.x, r.y), (440.0, 0.0));
    }

    #[test]
    fn test_top_left_resize_keeps_opposite_corner() {
        let mut editor = RegionEditor::new(12.0, 50.0);
        let mut r = region();
        editor.handle(PointerEvent::Down { x: 100.0, y: 100.0 }, &mut r, CANVAS);
        editor.handle(PointerEvent::Move { x: 80.0, y: 70.0 }, &mut r, CANVAS);
        assert_eq!(r, DetectionRegion::new(80.0, 70.0, 220.0, 180.0));

        // Past the opposite corner: size floors at the minimum
        editor.handle(PointerEvent::Move { x: 500.0, y: 500.0 }, &mut r, CANVAS);
        assert_eq!(r.right(), 300.0);
        assert_eq!(r.bottom(), 250.0);
        assert_eq!((r.width, r.height), (50.0, 50.0));
    }

    #[test]
    fn test_up_and_leave_end_gesture() {
        let mut editor = RegionEditor::new(12.0, 50.0);
        let mut r = region();
        editor.handle(PointerEvent::Down { x: 150.0, y: 150.0 }, &mut r, CANVAS);
        editor.handle(PointerEvent::Leave, &mut r, CANVAS);
        assert_eq!(editor.state(), InteractionState::Idle);

        editor.handle(PointerEvent::Down { x: 300.0, y: 250.0 }, &mut r, CANVAS);
        editor.handle(PointerEvent::Up, &mut r, CANVAS);
        assert_eq!(editor.state(), InteractionState::Idle);
    }

    fn pointer_events() -> impl Strategy<Value = Vec<PointerEvent>> {
        let point = (-200f32..900.0, -200f32..700.0);
        prop::collection::vec(
            prop_oneof![
                point.clone().prop_map(|(x, y)| PointerEvent::Down { x, y }),
                point.prop_map(|(x, y)| PointerEvent::Move { x, y }),
                Just(PointerEvent::Up),
            ],
            1..40,
        )
    }

    proptest! {
        #[test]
        fn prop_gestures_keep_region_valid(events in pointer_events()) {
            let mut editor = RegionEditor::new(12.0, 50.0);
            let mut r = region();
            for event in events {
                editor.handle(event, &mut r, CANVAS);
                prop_assert!(r.width >= 50.0 && r.height >= 50.0);
                prop_assert!(r.x >= 0.0 && r.y >= 0.0);
                prop_assert!(r.right() <= CANVAS.0 + 1e-3);
                prop_assert!(r.bottom() <= CANVAS.1 + 1e-3);
            }
        }
    }
}
