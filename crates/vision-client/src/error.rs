//! Vision client error types

use thiserror::Error;

/// Errors that can occur talking to the vision service
#[derive(Debug, Error)]
pub enum VisionError {
    /// Connection refused, DNS failure, reset
    #[error("Vision service unreachable: {0}")]
    Unreachable(String),

    /// Timeout waiting for a response
    #[error("Timeout waiting for vision service after {0}ms")]
    Timeout(u64),

    /// Service answered with an error status
    #[error("Vision service returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Image could not be prepared for submission
    #[error("Image error: {0}")]
    Image(#[from] camera_capture::CameraError),
}

impl From<serde_json::Error> for VisionError {
    fn from(err: serde_json::Error) -> Self {
        VisionError::InvalidResponse(err.to_string())
    }
}
