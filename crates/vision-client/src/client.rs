//! HTTP client for the vision service
//!
//! Provides async JSON calls against the detection/recognition backend.

use std::future::Future;
use std::time::Duration;

use camera_capture::StillImage;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{ErrorBody, PeopleResponse};
use crate::{
    DetectRequest, DetectionResponse, HealthStatus, Person, RegionHint, RegisterRequest,
    RegisterResponse, VisionError,
};

/// Default timeout for service calls
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Vision client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the service (e.g., "http://localhost:5001")
    pub url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5001".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Anything that can run detection on a single encoded still.
pub trait Detector: Send + Sync + 'static {
    fn detect(
        &self,
        image: &StillImage,
        region: Option<RegionHint>,
    ) -> impl Future<Output = Result<DetectionResponse, VisionError>> + Send;
}

/// Client for the face detection/recognition REST API
#[derive(Debug, Clone)]
pub struct VisionClient {
    base_url: String,
    http: reqwest::Client,
    timeout_ms: u64,
}

impl VisionClient {
    /// Create a new client
    pub fn new(config: &ClientConfig) -> Result<Self, VisionError> {
        let base_url = config.url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(VisionError::Config(format!("unsupported base URL {:?}", config.url)));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| VisionError::Config(e.to_string()))?;

        info!("Vision client targeting {}", base_url);
        Ok(Self {
            base_url,
            http,
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Detect and recognize every face in `image`
    pub async fn detect_and_recognize(
        &self,
        image: &StillImage,
        region: Option<RegionHint>,
    ) -> Result<DetectionResponse, VisionError> {
        let body = DetectRequest {
            image: image.data_uri(),
            region,
        };
        debug!(
            "Submitting {}x{} still ({} bytes) for detection",
            image.width,
            image.height,
            image.bytes.len()
        );

        let response = self
            .http
            .post(self.url("/api/detect-and-recognize"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let result: DetectionResponse = self.decode(response).await?;

        if let Some(latency) = result.latency {
            debug!(
                "Backend latency: detection {:.1}ms, recognition {:.1}ms, total {:.1}ms",
                latency.detection_ms, latency.recognition_ms, latency.total_ms
            );
        }
        Ok(result)
    }

    /// Register a person from a still containing exactly one face
    pub async fn register_face(
        &self,
        name: &str,
        image: &StillImage,
        email: Option<&str>,
        employee_id: Option<&str>,
    ) -> Result<Person, VisionError> {
        let body = RegisterRequest {
            name: name.to_string(),
            image: image.data_uri(),
            email: email.map(str::to_string),
            employee_id: employee_id.map(str::to_string),
        };

        let response = self
            .http
            .post(self.url("/api/register"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let registered: RegisterResponse = self.decode(response).await?;

        info!("Registered {} as {}", registered.person.name, registered.person.id);
        Ok(registered.person)
    }

    /// List registered people
    pub async fn list_people(&self) -> Result<Vec<Person>, VisionError> {
        let response = self
            .http
            .get(self.url("/api/people"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let people: PeopleResponse = self.decode(response).await?;
        Ok(people.people)
    }

    /// Delete a registered person
    pub async fn delete_person(&self, person_id: &str) -> Result<(), VisionError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/people/{}", person_id)))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let _: serde_json::Value = self.decode(response).await?;
        info!("Deleted person {}", person_id);
        Ok(())
    }

    /// Query service health
    pub async fn health_check(&self) -> Result<HealthStatus, VisionError> {
        let response = self
            .http
            .get(self.url("/api/health"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    /// URL of a registered person's enrollment image
    pub fn person_image_url(&self, person_id: &str) -> String {
        self.url(&format!("/api/people/{}/image", person_id))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> VisionError {
        if err.is_timeout() {
            VisionError::Timeout(self.timeout_ms)
        } else {
            VisionError::Unreachable(err.to_string())
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, VisionError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| fallback_message(status, &body));
            warn!("Vision service error {}: {}", status.as_u16(), message);
            return Err(VisionError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

impl Detector for VisionClient {
    fn detect(
        &self,
        image: &StillImage,
        region: Option<RegionHint>,
    ) -> impl Future<Output = Result<DetectionResponse, VisionError>> + Send {
        self.detect_and_recognize(image, region)
    }
}

fn fallback_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.chars().take(200).collect()
    }
}
