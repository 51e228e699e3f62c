//! Observable overlay state published by the detection loop

use serde::{Deserialize, Serialize};
use vision_client::DetectedFace;

use crate::identity::FaceEntry;
use crate::DetectionRegion;

/// Vision backend reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    #[default]
    Checking,
    Online,
    Offline,
}

/// Top-level screen; only `Recognize` runs detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Recognize,
    Register,
    Gallery,
}

/// Face counts for the current result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FaceStats {
    pub total: usize,
    pub recognized: usize,
    pub unknown: usize,
}

impl FaceStats {
    pub fn from_faces(faces: &[DetectedFace]) -> Self {
        let recognized = faces.iter().filter(|f| f.recognized).count();
        Self {
            total: faces.len(),
            recognized,
            unknown: faces.len() - recognized,
        }
    }
}

/// Snapshot of the overlay after each state change
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverlaySnapshot {
    pub view: View,
    pub backend: BackendStatus,
    pub continuous: bool,
    pub playing: bool,
    /// A detection request is outstanding
    pub processing: bool,
    /// Last cycle failure, cleared by the next success
    pub error: Option<String>,
    /// Display-space region, when enabled
    pub region: Option<DetectionRegion>,
    pub faces: Vec<FaceEntry>,
    pub stats: FaceStats,
    pub cycles_completed: u64,
    pub ticks_dropped: u64,
    pub period_ms: u64,
}
