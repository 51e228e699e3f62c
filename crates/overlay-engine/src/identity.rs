//! Stable face identifiers and detail-panel ordering

use serde::Serialize;
use vision_client::{BoundingBox, DetectedFace};

/// Identifier shown for a face: its tracking id, else its 1-based list position
pub fn face_identifier(face: &DetectedFace, index: usize) -> u64 {
    face.tracking_id.unwrap_or(index as u64 + 1)
}

/// One row of the face detail panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceEntry {
    pub identifier: u64,
    pub tracking_id: Option<u64>,
    pub recognized: bool,
    pub name: String,
    pub employee_id: Option<String>,
    pub confidence: Option<f32>,
    /// Source-space box
    pub bbox: BoundingBox,
}

/// Panel rows, ordered by tracking id (absent sorts as 0). Ties keep backend order.
pub fn panel_entries(faces: &[DetectedFace]) -> Vec<FaceEntry> {
    let mut entries: Vec<FaceEntry> = faces
        .iter()
        .enumerate()
        .map(|(index, face)| FaceEntry {
            identifier: face_identifier(face, index),
            tracking_id: face.tracking_id,
            recognized: face.recognized,
            name: face.display_name().to_string(),
            employee_id: face.employee_id().map(str::to_string),
            confidence: face.confidence(),
            bbox: face.bbox,
        })
        .collect();

    entries.sort_by_key(|e| e.tracking_id.unwrap_or(0));
    entries
}
