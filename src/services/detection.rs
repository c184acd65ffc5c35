use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::analysis::{DetectionResult, FaceDetection};

/// Face detection capability of the vision service.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect_faces(&self, image_bytes: &[u8]) -> Result<DetectionResult, DetectionError>;
}

/// Client for a JSON face detection endpoint.
pub struct HttpFaceDetector {
    http: Client,
    endpoint: String,
    api_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectFacesRequest<'a> {
    image: ImagePayload,
    attributes: [&'a str; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ImagePayload {
    bytes: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectFacesResponse {
    #[serde(default)]
    face_details: Vec<FaceDetail>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FaceDetail {
    confidence: f32,
}

impl HttpFaceDetector {
    pub fn new(
        endpoint: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DetectionError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DetectionError::Http)?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_token,
        })
    }
}

#[async_trait]
impl FaceDetector for HttpFaceDetector {
    /// Request every facial attribute; only the confidence is kept.
    async fn detect_faces(&self, image_bytes: &[u8]) -> Result<DetectionResult, DetectionError> {
        let body = DetectFacesRequest {
            image: ImagePayload {
                bytes: base64::engine::general_purpose::STANDARD.encode(image_bytes),
            },
            attributes: ["ALL"],
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(DetectionError::Http)?;

        let text = response.text().await.map_err(DetectionError::Http)?;
        parse_detect_faces(&text)
    }
}

fn parse_detect_faces(body: &str) -> Result<DetectionResult, DetectionError> {
    let parsed: DetectFacesResponse = serde_json::from_str(body).map_err(DetectionError::Parse)?;
    Ok(DetectionResult {
        faces: parsed
            .face_details
            .into_iter()
            .map(|d| FaceDetection {
                confidence: d.confidence,
            })
            .collect(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse face detection response: {0}")]
    Parse(#[from] serde_json::Error),
}
