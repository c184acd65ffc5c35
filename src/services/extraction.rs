use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::analysis::{BlockType, ExtractionResult, FeatureType, TextBlock};

/// Document text extraction capability of the vision service.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(
        &self,
        image_bytes: &[u8],
        features: &[FeatureType],
    ) -> Result<ExtractionResult, ExtractionError>;
}

/// Client for a JSON document analysis endpoint.
pub struct HttpTextExtractor {
    http: Client,
    endpoint: String,
    api_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AnalyzeDocumentRequest<'a> {
    document: DocumentPayload,
    feature_types: &'a [FeatureType],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DocumentPayload {
    bytes: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AnalyzeDocumentResponse {
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Block {
    block_type: BlockType,
    text: Option<String>,
}

impl HttpTextExtractor {
    pub fn new(
        endpoint: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ExtractionError::Http)?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_token,
        })
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract_text(
        &self,
        image_bytes: &[u8],
        features: &[FeatureType],
    ) -> Result<ExtractionResult, ExtractionError> {
        let body = AnalyzeDocumentRequest {
            document: DocumentPayload {
                bytes: base64::engine::general_purpose::STANDARD.encode(image_bytes),
            },
            feature_types: features,
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(ExtractionError::Http)?;

        let text = response.text().await.map_err(ExtractionError::Http)?;
        parse_analyze_document(&text)
    }
}

fn parse_analyze_document(body: &str) -> Result<ExtractionResult, ExtractionError> {
    let parsed: AnalyzeDocumentResponse =
        serde_json::from_str(body).map_err(ExtractionError::Parse)?;
    Ok(ExtractionResult {
        blocks: parsed
            .blocks
            .into_iter()
            .map(|b| TextBlock {
                block_type: b.block_type,
                text: b.text,
            })
            .collect(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse document analysis response: {0}")]
    Parse(#[from] serde_json::Error),
}
