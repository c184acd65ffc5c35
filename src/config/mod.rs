use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::consumer::ConsumerSettings;
use crate::pipeline::producer::ProducerSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of images in the store, keyed `1.jpg` through `{pool_size}.jpg`.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Distinct images scanned per producer run. Must not exceed `pool_size`.
    #[serde(default = "default_sample_size")]
    pub sample_size: u32,

    /// A face must score strictly above this (0-100) to be enqueued.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Redis connection string for the work queue
    pub redis_url: String,

    /// Key prefix for the queue's Redis structures
    #[serde(default = "default_queue_name")]
    pub queue_name: String,

    /// Seconds a received message stays hidden before it can be redelivered
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    /// Image store base URL (e.g., "https://bucket.example.com")
    pub store_base_url: String,

    /// Face detection endpoint. Only the producer needs it.
    #[serde(default)]
    pub detection_url: Option<String>,

    /// Document text extraction endpoint. Only the consumer needs it.
    #[serde(default)]
    pub extraction_url: Option<String>,

    /// Bearer token for the detection and extraction endpoints
    #[serde(default)]
    pub api_token: Option<String>,

    /// Append-only match log
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Scratch directory for downloaded images
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    #[serde(default = "default_target_phrase")]
    pub target_phrase: String,

    /// Connect/read timeout for every outbound HTTP call
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Long-poll wait per queue receive
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: u64,

    /// Skip keys already present in the match log
    #[serde(default)]
    pub dedupe_log: bool,

    /// Fixed seed for reproducible sampling
    #[serde(default)]
    pub sample_seed: Option<u64>,

    #[serde(default)]
    pub log_json: bool,

    /// Prometheus listener address. Metrics are not exported when unset.
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
}

fn default_pool_size() -> u32 {
    12
}

fn default_sample_size() -> u32 {
    10
}

fn default_confidence_threshold() -> f32 {
    75.0
}

fn default_queue_name() -> String {
    "image-recognition".to_string()
}

fn default_visibility_timeout_secs() -> u64 {
    30
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output.txt")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_target_phrase() -> String {
    "DRIVER LICENSE".to_string()
}

fn default_http_timeout_secs() -> u64 {
    5
}

fn default_wait_time_secs() -> u64 {
    10
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be at least 1".to_string()));
        }
        if self.sample_size > self.pool_size {
            return Err(ConfigError::Invalid(format!(
                "sample_size ({}) exceeds pool_size ({})",
                self.sample_size, self.pool_size
            )));
        }
        if !(0.0..=100.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold {} is outside 0-100",
                self.confidence_threshold
            )));
        }
        if self.target_phrase.trim().is_empty() {
            return Err(ConfigError::Invalid("target_phrase is empty".to_string()));
        }
        if self.visibility_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "visibility_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn detection_url(&self) -> Result<&str, ConfigError> {
        self.detection_url
            .as_deref()
            .ok_or(ConfigError::Missing("DETECTION_URL"))
    }

    pub fn extraction_url(&self) -> Result<&str, ConfigError> {
        self.extraction_url
            .as_deref()
            .ok_or(ConfigError::Missing("EXTRACTION_URL"))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn producer_settings(&self) -> ProducerSettings {
        ProducerSettings {
            pool_size: self.pool_size,
            sample_size: self.sample_size,
            confidence_threshold: self.confidence_threshold,
            seed: self.sample_seed,
        }
    }

    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            download_dir: self.download_dir.clone(),
            wait_time: Duration::from_secs(self.wait_time_secs),
            max_messages: 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting {0}")]
    Missing(&'static str),
}
