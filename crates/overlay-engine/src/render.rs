//! Overlay rendering onto a drawing surface

use serde::Serialize;
use vision_client::{BoundingBox, DetectedFace};

use crate::geometry::{to_display, FrameGeometry};
use crate::DetectionRegion;

/// Box stroke width for faces
const FACE_STROKE_WIDTH: f32 = 3.0;
/// Label band height without / with an employee id line
const LABEL_HEIGHT: f32 = 30.0;
const LABEL_HEIGHT_WITH_ID: f32 = 50.0;
/// Region dash pattern (on, off)
const REGION_DASH: (f32, f32) = (6.0, 4.0);

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RECOGNIZED: Color = Color::rgb(0x00, 0xff, 0x00);
    pub const UNKNOWN: Color = Color::rgb(0xff, 0x00, 0x00);
    pub const LABEL_TEXT: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const REGION: Color = Color::rgb(0x00, 0xbf, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }
}

/// Rectangle in display space
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl From<BoundingBox> for Rect {
    fn from(b: BoundingBox) -> Self {
        Rect {
            x: b.x,
            y: b.y,
            width: b.w,
            height: b.h,
        }
    }
}

impl From<DetectionRegion> for Rect {
    fn from(r: DetectionRegion) -> Self {
        Rect {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
    /// (on, off) dash lengths; solid when `None`
    pub dash: Option<(f32, f32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Font {
    pub size_px: f32,
    pub bold: bool,
}

impl Font {
    const NAME: Font = Font {
        size_px: 16.0,
        bold: true,
    };
    const DETAIL: Font = Font {
        size_px: 12.0,
        bold: false,
    };
}

/// 2D drawing target sized in display pixels
pub trait DrawSurface {
    fn resize(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, color: Color);

    /// Called once a full pass has been drawn
    fn present(&mut self) {}
}

/// Recorded drawing operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    StrokeRect { rect: Rect, stroke: Stroke },
    FillRect { rect: Rect, color: Color },
    FillText { text: String, x: f32, y: f32, font: Font, color: Color },
}

/// Surface that records operations since the last clear
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingSurface {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
    pub presented: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text drawn since the last clear
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Rectangles stroked since the last clear
    pub fn strokes(&self) -> Vec<(Rect, Stroke)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::StrokeRect { rect, stroke } => Some((*rect, *stroke)),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn clear(&mut self) {
        self.ops.clear();
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke) {
        self.ops.push(DrawOp::StrokeRect { rect, stroke });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, color: Color) {
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            x,
            y,
            font,
            color,
        });
    }

    fn present(&mut self) {
        self.presented += 1;
    }
}

/// Draws face boxes, labels, and the detection region
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    handle_size: f32,
}

impl OverlayRenderer {
    pub fn new(handle_size: f32) -> Self {
        Self { handle_size }
    }

    /// Draw one full overlay pass. `faces` are in source space.
    pub fn render<S: DrawSurface>(
        &self,
        surface: &mut S,
        faces: &[DetectedFace],
        geometry: &FrameGeometry,
        region: Option<&DetectionRegion>,
    ) {
        surface.resize(
            geometry.display_width.round() as u32,
            geometry.display_height.round() as u32,
        );
        surface.clear();

        for face in faces {
            self.draw_face(surface, face, geometry);
        }
        if let Some(region) = region {
            self.draw_region(surface, region);
        }
        surface.present();
    }

    /// Clear the surface without drawing
    pub fn clear<S: DrawSurface>(&self, surface: &mut S) {
        surface.clear();
        surface.present();
    }

    fn draw_face<S: DrawSurface>(&self, surface: &mut S, face: &DetectedFace, geometry: &FrameGeometry) {
        let b = to_display(&face.bbox, geometry);
        let color = if face.recognized {
            Color::RECOGNIZED
        } else {
            Color::UNKNOWN
        };

        surface.stroke_rect(
            b.into(),
            Stroke {
                color,
                width: FACE_STROKE_WIDTH,
                dash: None,
            },
        );

        let employee_id = face.employee_id();
        let band = if employee_id.is_some() {
            LABEL_HEIGHT_WITH_ID
        } else {
            LABEL_HEIGHT
        };
        surface.fill_rect(
            Rect {
                x: b.x,
                y: b.y - band,
                width: b.w,
                height: band,
            },
            color,
        );

        surface.fill_text(face.display_name(), b.x + 5.0, b.y - band + 20.0, Font::NAME, Color::LABEL_TEXT);
        if let Some(id) = employee_id {
            surface.fill_text(
                &format!("ID: {}", id),
                b.x + 5.0,
                b.y - band + 40.0,
                Font::DETAIL,
                Color::LABEL_TEXT,
            );
        }
        if let Some(confidence) = face.confidence() {
            surface.fill_text(
                &format!("{:.1}%", confidence),
                b.x + b.w - 50.0,
                b.y - 10.0,
                Font::DETAIL,
                Color::LABEL_TEXT,
            );
        }
    }

    fn draw_region<S: DrawSurface>(&self, surface: &mut S, region: &DetectionRegion) {
        surface.stroke_rect(
            (*region).into(),
            Stroke {
                color: Color::REGION,
                width: 2.0,
                dash: Some(REGION_DASH),
            },
        );

        let half = self.handle_size / 2.0;
        for corner in crate::Corner::ALL {
            let (cx, cy) = region.corner(corner);
            surface.fill_rect(
                Rect {
                    x: cx - half,
                    y: cy - half,
                    width: self.handle_size,
                    height: self.handle_size,
                },
                Color::REGION,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vision_client::RecognizedPerson;

    fn geometry() -> FrameGeometry {
        FrameGeometry::new(640.0, 480.0, 320.0, 240.0).unwrap()
    }

    fn known() -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox::new(100.0, 100.0, 200.0, 200.0),
            recognized: true,
            person: Some(RecognizedPerson {
                name: "Ada".into(),
                employee_id: Some("E-7".into()),
                confidence: Some(87.26),
                ..Default::default()
            }),
            tracking_id: Some(1),
            ..Default::default()
        }
    }

    fn stranger() -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox::new(400.0, 200.0, 100.0, 100.0),
            unknown_id: Some("Unknown-2".into()),
            tracking_id: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_surface_sized_to_display() {
        let mut surface = RecordingSurface::new();
        OverlayRenderer::new(12.0).render(&mut surface, &[], &geometry(), None);
        assert_eq!((surface.width, surface.height), (320, 240));
        assert!(surface.ops.is_empty());
        assert_eq!(surface.presented, 1);
    }

    #[test]
    fn test_faces_color_coded_and_labelled() {
        let mut surface = RecordingSurface::new();
        OverlayRenderer::new(12.0).render(&mut surface, &[known(), stranger()], &geometry(), None);

        let strokes = surface.strokes();
        assert_eq!(strokes[0].0, Rect { x: 50.0, y: 50.0, width: 100.0, height: 100.0 });
        assert_eq!(strokes[0].1.color, Color::RECOGNIZED);
        assert_eq!(strokes[1].1.color, Color::UNKNOWN);
        assert_eq!(surface.texts(), vec!["Ada", "ID: E-7", "87.3%", "Unknown-2"]);
    }

    #[test]
    fn test_label_band_above_box() {
        let mut surface = RecordingSurface::new();
        OverlayRenderer::new(12.0).render(&mut surface, &[stranger()], &geometry(), None);
        let band = surface.ops.iter().find_map(|op| match op {
            DrawOp::FillRect { rect, .. } => Some(*rect),
            _ => None,
        });
        assert_eq!(band, Some(Rect { x: 200.0, y: 70.0, width: 50.0, height: 30.0 }));
    }

    #[test]
    fn test_region_drawn_last_with_handles() {
        let mut surface = RecordingSurface::new();
        let region = DetectionRegion::new(10.0, 10.0, 100.0, 80.0);
        OverlayRenderer::new(12.0).render(&mut surface, &[known()], &geometry(), Some(&region));

        let tail = &surface.ops[surface.ops.len() - 5..];
        match &tail[0] {
            DrawOp::StrokeRect { stroke, .. } => assert!(stroke.dash.is_some()),
            other => panic!("expected dashed region stroke, got {other:?}"),
        }
        assert!(tail[1..].iter().all(|op| matches!(
            op,
            DrawOp::FillRect { rect, color: Color::REGION } if rect.width == 12.0
        )));
    }

    #[test]
    fn test_render_replaces_previous_pass() {
        let mut surface = RecordingSurface::new();
        let renderer = OverlayRenderer::new(12.0);
        renderer.render(&mut surface, &[known(), stranger()], &geometry(), None);
        renderer.render(&mut surface, &[stranger()], &geometry(), None);
        assert_eq!(surface.strokes().len(), 1);

        renderer.clear(&mut surface);
        assert!(surface.ops.is_empty());
    }
}
