//! The two orchestrators and the fatal error type they share.
//!
//! Per-image failures never surface here; they are logged and counted in the
//! run reports. A [`PipelineError`] means the run itself could not continue.

pub mod consumer;
pub mod context;
pub mod producer;

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::services::{
    detection::DetectionError, extraction::ExtractionError, match_log::LogError,
    matcher::MatcherError, queue::QueueError, store::StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot sample {sample_size} distinct images from a pool of {pool_size}")]
    InvalidSample { pool_size: u32, sample_size: u32 },

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Match log error: {0}")]
    Log(#[from] LogError),

    #[error("Failed to create download directory {path}: {source}")]
    DownloadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Image store client error: {0}")]
    Store(#[from] StoreError),

    #[error("Face detection client error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Text extraction client error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Phrase matcher error: {0}")]
    Matcher(#[from] MatcherError),
}
