use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::pipeline::{consumer::Consumer, producer::Producer, PipelineError};
use crate::services::{
    detection::{FaceDetector, HttpFaceDetector},
    extraction::{HttpTextExtractor, TextExtractor},
    match_log::MatchLog,
    matcher::PhraseMatcher,
    queue::{RedisWorkQueue, WorkQueue},
    store::{HttpImageStore, ImageStore},
};

/// Services the producer binary talks to.
#[derive(Clone)]
pub struct ProducerState {
    pub store: Arc<dyn ImageStore>,
    pub detector: Arc<dyn FaceDetector>,
    pub queue: Arc<dyn WorkQueue>,
}

impl ProducerState {
    pub fn new(
        store: Arc<dyn ImageStore>,
        detector: Arc<dyn FaceDetector>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            store,
            detector,
            queue,
        }
    }

    /// Build the store and detection clients and connect to the Redis queue.
    ///
    /// Requires `DETECTION_URL`; the extraction endpoint is never touched.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let store = image_store(config)?;

        tracing::info!("Initializing face detection client");
        let detector = HttpFaceDetector::new(
            config.detection_url()?,
            config.api_token.clone(),
            config.http_timeout(),
        )?;

        let queue = connect_queue(config).await?;

        Ok(Self::new(Arc::new(store), Arc::new(detector), Arc::new(queue)))
    }

    pub fn producer(&self, config: &PipelineConfig) -> Producer {
        Producer::new(
            config.producer_settings(),
            self.store.clone(),
            self.detector.clone(),
            self.queue.clone(),
        )
    }
}

/// Services the consumer binary talks to.
#[derive(Clone)]
pub struct ConsumerState {
    pub store: Arc<dyn ImageStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub queue: Arc<dyn WorkQueue>,
}

impl ConsumerState {
    pub fn new(
        store: Arc<dyn ImageStore>,
        extractor: Arc<dyn TextExtractor>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            store,
            extractor,
            queue,
        }
    }

    /// Build the store and extraction clients and connect to the Redis queue.
    ///
    /// Requires `EXTRACTION_URL`; the detection endpoint is never touched.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let store = image_store(config)?;

        tracing::info!("Initializing text extraction client");
        let extractor = HttpTextExtractor::new(
            config.extraction_url()?,
            config.api_token.clone(),
            config.http_timeout(),
        )?;

        let queue = connect_queue(config).await?;

        Ok(Self::new(Arc::new(store), Arc::new(extractor), Arc::new(queue)))
    }

    /// Opens the match log, so this fails if the log path is unusable.
    pub async fn consumer(&self, config: &PipelineConfig) -> Result<Consumer, PipelineError> {
        let matcher = PhraseMatcher::new(&config.target_phrase)?;
        let log = MatchLog::open(&config.output_path, config.dedupe_log).await?;

        Ok(Consumer::new(
            config.consumer_settings(),
            self.store.clone(),
            self.extractor.clone(),
            self.queue.clone(),
            matcher,
            log,
        ))
    }
}

fn image_store(config: &PipelineConfig) -> Result<HttpImageStore, PipelineError> {
    tracing::info!(base_url = %config.store_base_url, "Initializing image store client");
    Ok(HttpImageStore::new(
        &config.store_base_url,
        config.http_timeout(),
    )?)
}

/// Fails if Redis is unreachable.
async fn connect_queue(config: &PipelineConfig) -> Result<RedisWorkQueue, PipelineError> {
    tracing::info!(queue = %config.queue_name, "Connecting to Redis work queue");
    let queue = RedisWorkQueue::new(
        &config.redis_url,
        &config.queue_name,
        config.visibility_timeout(),
    )?;
    queue.health_check().await?;
    Ok(queue)
}
