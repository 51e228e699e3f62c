//! Wire types exchanged with the vision service

use serde::{Deserialize, Serialize};

/// Face bounding box in source-image pixel space (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Center point of the box
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Registered person matched to a face
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognizedPerson {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "employeeId")]
    pub employee_id: Option<String>,
    /// Match confidence in percent
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Raw cosine similarity (0-1)
    #[serde(default)]
    pub similarity: Option<f32>,
}

/// One detected face
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub detection_confidence: Option<f32>,
    #[serde(default)]
    pub recognized: bool,
    #[serde(default)]
    pub person: Option<RecognizedPerson>,
    #[serde(default, alias = "unknownId")]
    pub unknown_id: Option<String>,
    /// Frame-to-frame stable identifier, when the backend tracks faces
    #[serde(default, alias = "trackingId", alias = "track_id", alias = "trackId")]
    pub tracking_id: Option<u64>,
}

impl DetectedFace {
    /// Name shown on the overlay: person name, then unknown label, then "Unknown"
    pub fn display_name(&self) -> &str {
        self.person
            .as_ref()
            .map(|p| p.name.as_str())
            .filter(|n| !n.is_empty())
            .or(self.unknown_id.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn employee_id(&self) -> Option<&str> {
        self.person
            .as_ref()
            .and_then(|p| p.employee_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Confidence worth displaying (recognized faces only)
    pub fn confidence(&self) -> Option<f32> {
        if !self.recognized {
            return None;
        }
        self.person.as_ref().and_then(|p| p.confidence)
    }
}

/// Backend processing latency breakdown
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Latency {
    #[serde(default)]
    pub detection_ms: f64,
    #[serde(default)]
    pub recognition_ms: f64,
    #[serde(default)]
    pub total_ms: f64,
}

/// Result of `POST /api/detect-and-recognize`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub message: Option<String>,
    /// Width of the image the backend actually processed
    #[serde(default, alias = "imageWidth")]
    pub image_width: Option<u32>,
    /// Height of the image the backend actually processed
    #[serde(default, alias = "imageHeight")]
    pub image_height: Option<u32>,
    #[serde(default)]
    pub latency: Option<Latency>,
}

impl DetectionResponse {
    /// Backend-reported image dimensions, when both are present
    pub fn image_size(&self) -> Option<(u32, u32)> {
        match (self.image_width, self.image_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// Source-space crop hint sent alongside a detection request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionHint {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Body of `POST /api/detect-and-recognize`
#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionHint>,
}

/// Body of `POST /api/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

/// Registered person record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub added_date: String,
    #[serde(default = "default_image_count")]
    pub image_count: u32,
}

fn default_image_count() -> u32 {
    1
}

/// Result of `POST /api/register`
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: String,
    pub person: Person,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeopleResponse {
    #[serde(default)]
    pub people: Vec<Person>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Result of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub library: Option<String>,
    #[serde(default)]
    pub detector: Option<String>,
    #[serde(default)]
    pub recognizer: Option<String>,
    #[serde(default)]
    pub detection_threshold: Option<f32>,
    #[serde(default)]
    pub recognition_threshold: Option<f32>,
    #[serde(default)]
    pub registered_people: Option<usize>,
    #[serde(default)]
    pub cached_encodings: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_face_parses() {
        let json = r#"{
            "bbox": {"x": 100, "y": 80, "w": 50, "h": 60},
            "detection_confidence": 0.98,
            "recognized": true,
            "person": {"name": "Ada", "id": "p1", "employee_id": "E-7", "similarity": 0.61, "confidence": 61.0},
            "unknown_id": null,
            "tracking_id": 4
        }"#;
        let face: DetectedFace = serde_json::from_str(json).unwrap();
        assert_eq!(face.bbox, BoundingBox::new(100.0, 80.0, 50.0, 60.0));
        assert_eq!(face.display_name(), "Ada");
        assert_eq!(face.employee_id(), Some("E-7"));
        assert_eq!(face.confidence(), Some(61.0));
        assert_eq!(face.tracking_id, Some(4));
    }

    #[test]
    fn test_tracking_id_aliases() {
        for key in ["trackingId", "track_id", "trackId"] {
            let json = format!(r#"{{"bbox": {{"x": 0, "y": 0, "w": 1, "h": 1}}, "{}": 9}}"#, key);
            let face: DetectedFace = serde_json::from_str(&json).unwrap();
            assert_eq!(face.tracking_id, Some(9), "alias {}", key);
        }
    }

    #[test]
    fn test_unknown_label_fallbacks() {
        let mut face = DetectedFace {
            unknown_id: Some("Unknown-3".into()),
            ..Default::default()
        };
        assert_eq!(face.display_name(), "Unknown-3");
        assert_eq!(face.confidence(), None);

        face.unknown_id = None;
        assert_eq!(face.display_name(), "Unknown");
    }

    #[test]
    fn test_confidence_hidden_when_unrecognized() {
        let face = DetectedFace {
            recognized: false,
            person: Some(RecognizedPerson {
                name: "Ada".into(),
                confidence: Some(12.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(face.confidence(), None);
    }

    #[test]
    fn test_empty_response_without_dimensions() {
        let resp: DetectionResponse =
            serde_json::from_str(r#"{"faces": [], "count": 0, "message": "No faces detected"}"#)
                .unwrap();
        assert!(resp.faces.is_empty());
        assert_eq!(resp.image_size(), None);
    }

    #[test]
    fn test_detect_request_omits_missing_region() {
        let body = serde_json::to_value(DetectRequest {
            image: "data:image/jpeg;base64,AA==".into(),
            region: None,
        })
        .unwrap();
        assert!(body.get("region").is_none());
    }
}
