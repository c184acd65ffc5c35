use std::sync::Arc;
use uuid::Uuid;

use super::PipelineError;
use crate::models::image::ImageKey;
use crate::models::message::SENTINEL;
use crate::models::report::ProducerReport;
use crate::services::{
    detection::{DetectionError, FaceDetector},
    queue::{QueueError, WorkQueue},
    sampling::{sample_keys, sampling_rng},
    store::{ImageStore, StoreError},
};

#[derive(Debug, Clone)]
pub struct ProducerSettings {
    pub pool_size: u32,
    pub sample_size: u32,
    /// Faces must score strictly above this to count.
    pub confidence_threshold: f32,
    pub seed: Option<u64>,
}

/// Scans a random sample of the image pool for faces and enqueues matches.
pub struct Producer {
    settings: ProducerSettings,
    store: Arc<dyn ImageStore>,
    detector: Arc<dyn FaceDetector>,
    queue: Arc<dyn WorkQueue>,
}

#[derive(Debug, thiserror::Error)]
enum ScanError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] StoreError),

    #[error("face detection failed: {0}")]
    Detect(#[from] DetectionError),

    #[error("enqueue failed: {0}")]
    Enqueue(#[from] QueueError),
}

/// Fresh tag isolating one run's messages from any other run on the queue.
pub fn new_group_id() -> String {
    format!("group-{}", Uuid::new_v4().simple())
}

impl Producer {
    pub fn new(
        settings: ProducerSettings,
        store: Arc<dyn ImageStore>,
        detector: Arc<dyn FaceDetector>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            settings,
            store,
            detector,
            queue,
        }
    }

    /// Sample, scan, enqueue matches, then send the end-of-work sentinel.
    pub async fn run(&self) -> Result<ProducerReport, PipelineError> {
        let ProducerSettings {
            pool_size,
            sample_size,
            seed,
            ..
        } = self.settings;

        let keys = {
            let mut rng = sampling_rng(seed);
            sample_keys(&mut rng, pool_size, sample_size).ok_or(PipelineError::InvalidSample {
                pool_size,
                sample_size,
            })?
        };

        self.run_keys(new_group_id(), keys).await
    }

    /// Scan the given keys under `group_id`. The sentinel is always sent last,
    /// whatever happened to the individual images.
    pub async fn run_keys(
        &self,
        group_id: String,
        keys: Vec<ImageKey>,
    ) -> Result<ProducerReport, PipelineError> {
        tracing::info!(
            group_id = %group_id,
            sample_size = keys.len(),
            threshold = self.settings.confidence_threshold,
            "Starting face scan"
        );

        let mut enqueued = Vec::new();
        let mut failed = Vec::new();

        for key in &keys {
            metrics::counter!("producer_images_sampled_total").increment(1);

            match self.scan_image(key, &group_id).await {
                Ok(true) => {
                    metrics::counter!("producer_images_enqueued_total").increment(1);
                    enqueued.push(key.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    metrics::counter!("producer_images_failed_total").increment(1);
                    tracing::warn!(image_key = %key, error = %e, "Skipping image");
                    failed.push(key.clone());
                }
            }
        }

        self.queue.send(SENTINEL, &group_id).await?;
        tracing::info!(
            group_id = %group_id,
            enqueued = enqueued.len(),
            failed = failed.len(),
            "Face scan complete, end-of-work signal sent"
        );

        Ok(ProducerReport {
            group_id,
            sampled: keys,
            enqueued,
            failed,
        })
    }

    /// Returns whether the image was enqueued.
    async fn scan_image(&self, key: &ImageKey, group_id: &str) -> Result<bool, ScanError> {
        tracing::debug!(image_key = %key, "Processing image");
        let image_bytes = self.store.fetch(key).await?;
        let detection = self.detector.detect_faces(&image_bytes).await?;

        if !detection.has_face_above(self.settings.confidence_threshold) {
            tracing::info!(
                image_key = %key,
                faces = detection.faces.len(),
                best_confidence = detection.best_confidence(),
                "No face above threshold"
            );
            return Ok(false);
        }

        let message_id = self.queue.send(key.as_str(), group_id).await?;
        tracing::info!(
            image_key = %key,
            message_id = %message_id,
            best_confidence = detection.best_confidence(),
            "Face detected, image enqueued"
        );
        Ok(true)
    }
}
