//! Vision Service Client
//!
//! Typed HTTP access to the remote face detection/recognition backend:
//! detection on a single encoded still, person registration, and the
//! people gallery.

mod client;
mod error;
mod types;

pub use client::{ClientConfig, Detector, VisionClient};
pub use error::VisionError;
pub use types::{
    BoundingBox, DetectRequest, DetectedFace, DetectionResponse, HealthStatus, Latency, Person,
    RecognizedPerson, RegisterRequest, RegisterResponse, RegionHint,
};
