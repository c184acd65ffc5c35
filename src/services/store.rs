use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::models::image::ImageKey;

/// Read access to the image pool.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn fetch(&self, key: &ImageKey) -> Result<Vec<u8>, StoreError>;
}

/// Static object storage exposing images at `GET {base_url}/{key}`.
pub struct HttpImageStore {
    http: Client,
    base_url: String,
}

impl HttpImageStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn object_url(&self, key: &ImageKey) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn fetch(&self, key: &ImageKey) -> Result<Vec<u8>, StoreError> {
        let response = self
            .http
            .get(self.object_url(key))
            .send()
            .await
            .map_err(StoreError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                key: key.clone(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(StoreError::Http)?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image {key} unavailable (HTTP {status})")]
    Status { key: ImageKey, status: StatusCode },

    #[error("Failed to write image to disk: {0}")]
    Io(#[from] std::io::Error),
}
