use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use super::context::RunContext;
use super::PipelineError;
use crate::models::analysis::FeatureType;
use crate::models::image::ImageKey;
use crate::models::message::QueueMessage;
use crate::models::report::{ConsumerReport, LogEntry, StopReason};
use crate::services::{
    extraction::{ExtractionError, TextExtractor},
    match_log::{AppendOutcome, MatchLog},
    matcher::PhraseMatcher,
    queue::WorkQueue,
    store::{ImageStore, StoreError},
};

/// Back-off after a failed receive before polling again.
const RECEIVE_RETRY_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub download_dir: PathBuf,
    /// Long-poll wait per receive.
    pub wait_time: Duration,
    pub max_messages: usize,
}

/// What happened to one non-sentinel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Matched,
    Duplicate,
    NoMatch,
    NoText,
    Failed,
}

#[derive(Debug, thiserror::Error)]
enum DownloadError {
    #[error("image key {0:?} is not a plain file name")]
    InvalidKey(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drains the work queue, extracting text from each image and logging
/// those that contain the target phrase.
pub struct Consumer {
    settings: ConsumerSettings,
    store: Arc<dyn ImageStore>,
    extractor: Arc<dyn TextExtractor>,
    queue: Arc<dyn WorkQueue>,
    matcher: PhraseMatcher,
    log: MatchLog,
}

impl Consumer {
    pub fn new(
        settings: ConsumerSettings,
        store: Arc<dyn ImageStore>,
        extractor: Arc<dyn TextExtractor>,
        queue: Arc<dyn WorkQueue>,
        matcher: PhraseMatcher,
        log: MatchLog,
    ) -> Self {
        Self {
            settings,
            store,
            extractor,
            queue,
            matcher,
            log,
        }
    }

    /// Poll until the end-of-work sentinel arrives or `ctx` is stopped.
    ///
    /// Every received message is deleted after it is handled, whether or not
    /// it could be processed. Only match log failures end the run early.
    pub async fn run(mut self, ctx: &RunContext) -> Result<ConsumerReport, PipelineError> {
        tokio::fs::create_dir_all(&self.settings.download_dir)
            .await
            .map_err(|source| PipelineError::DownloadDir {
                path: self.settings.download_dir.clone(),
                source,
            })?;

        tracing::info!(
            log = %self.log.path().display(),
            phrase = self.matcher.phrase(),
            "Consumer ready, polling for messages"
        );

        let mut report = ConsumerReport {
            processed: 0,
            matched: 0,
            skipped_duplicates: 0,
            failed: 0,
            stop: StopReason::Cancelled,
        };

        loop {
            if ctx.is_stopped() {
                break;
            }

            let received = tokio::select! {
                biased;
                _ = ctx.stopped() => break,
                received = self.queue.receive(self.settings.max_messages, self.settings.wait_time) => received,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::error!(error = %e, "Receive failed, will retry");
                    tokio::select! {
                        _ = ctx.stopped() => break,
                        _ = sleep(Duration::from_millis(RECEIVE_RETRY_MS)) => continue,
                    }
                }
            };

            if messages.is_empty() {
                tracing::trace!("No messages available");
                continue;
            }

            for message in messages {
                if message.is_sentinel() {
                    tracing::info!(group_id = %message.group_id, "Received end-of-work signal, stopping");
                    self.acknowledge(&message).await;
                    report.stop = StopReason::Sentinel;
                    self.log.close().await?;
                    return Ok(report);
                }

                let outcome = self.handle_message(&message).await?;
                report.processed += 1;
                match outcome {
                    MessageOutcome::Matched => report.matched += 1,
                    MessageOutcome::Duplicate => report.skipped_duplicates += 1,
                    MessageOutcome::Failed => report.failed += 1,
                    MessageOutcome::NoMatch | MessageOutcome::NoText => {}
                }
                self.acknowledge(&message).await;
            }
        }

        tracing::info!(processed = report.processed, "Consumer cancelled");
        self.log.close().await?;
        Ok(report)
    }

    /// Download, extract and match one image. Does not delete the message.
    pub async fn handle_message(
        &mut self,
        message: &QueueMessage,
    ) -> Result<MessageOutcome, PipelineError> {
        let key = ImageKey::new(message.body.trim());
        tracing::info!(image_key = %key, message_id = %message.message_id, "Processing image");
        metrics::counter!("consumer_messages_processed_total").increment(1);

        let image_bytes = match self.download(&key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                metrics::counter!("consumer_messages_failed_total").increment(1);
                tracing::warn!(image_key = %key, error = %e, "Failed to download image");
                return Ok(MessageOutcome::Failed);
            }
        };

        let text = match self.extract(&key, &image_bytes).await {
            Ok(text) => text,
            Err(e) => {
                metrics::counter!("consumer_messages_failed_total").increment(1);
                tracing::warn!(image_key = %key, error = %e, "Failed to extract text");
                return Ok(MessageOutcome::Failed);
            }
        };

        if text.is_empty() {
            tracing::info!(image_key = %key, "No text found in image");
            return Ok(MessageOutcome::NoText);
        }

        if !self.matcher.is_match(&text) {
            tracing::info!(image_key = %key, phrase = self.matcher.phrase(), "Phrase not found in image");
            return Ok(MessageOutcome::NoMatch);
        }

        let entry = LogEntry {
            image_key: key,
            extracted_text: text,
        };
        match self.log.append(&entry).await? {
            AppendOutcome::Written => {
                metrics::counter!("consumer_matches_logged_total").increment(1);
                tracing::info!(image_key = %entry.image_key, "Phrase found, match logged");
                Ok(MessageOutcome::Matched)
            }
            AppendOutcome::Duplicate => {
                tracing::info!(image_key = %entry.image_key, "Match already logged, skipping");
                Ok(MessageOutcome::Duplicate)
            }
        }
    }

    /// Fetch the image and keep a copy in the download directory.
    async fn download(&self, key: &ImageKey) -> Result<Vec<u8>, DownloadError> {
        let file_name = Path::new(key.as_str())
            .file_name()
            .filter(|name| name.len() == key.as_str().len())
            .ok_or_else(|| DownloadError::InvalidKey(key.to_string()))?;

        let bytes = self.store.fetch(key).await?;
        // handle_message may run without run() having prepared the directory.
        tokio::fs::create_dir_all(&self.settings.download_dir)
            .await
            .map_err(StoreError::Io)?;
        let local_path = self.settings.download_dir.join(file_name);
        tokio::fs::write(&local_path, &bytes)
            .await
            .map_err(StoreError::Io)?;

        tracing::debug!(image_key = %key, path = %local_path.display(), bytes = bytes.len(), "Downloaded image");
        Ok(bytes)
    }

    async fn extract(&self, key: &ImageKey, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let start = Instant::now();
        let result = self
            .extractor
            .extract_text(image_bytes, &[FeatureType::Forms])
            .await?;
        let elapsed = start.elapsed();
        metrics::histogram!("consumer_extraction_seconds").record(elapsed.as_secs_f64());

        tracing::debug!(
            image_key = %key,
            blocks = result.blocks.len(),
            extraction_ms = elapsed.as_millis() as u64,
            "Text extraction complete"
        );
        Ok(result.line_text())
    }

    /// Delete failures are not fatal: the queue redelivers after the
    /// visibility timeout.
    async fn acknowledge(&self, message: &QueueMessage) {
        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            tracing::error!(message_id = %message.message_id, error = %e, "Failed to delete message");
        }
    }
}
