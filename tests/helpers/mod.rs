//! Test doubles for the external services

#![allow(dead_code)]

use async_trait::async_trait;
use face_license_scan::models::analysis::{
    BlockType, DetectionResult, ExtractionResult, FaceDetection, FeatureType, TextBlock,
};
use face_license_scan::models::image::ImageKey;
use face_license_scan::models::message::QueueMessage;
use face_license_scan::services::{
    detection::{DetectionError, FaceDetector},
    extraction::{ExtractionError, TextExtractor},
    memory_queue::MemoryWorkQueue,
    queue::{QueueError, WorkQueue},
    store::{ImageStore, StoreError},
};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::fixtures;

/// Image store holding a fixed set of keys; anything else is a 404.
pub struct StubStore {
    images: HashMap<String, Vec<u8>>,
    fetches: Mutex<Vec<String>>,
}

impl StubStore {
    pub fn with_pool(pool_size: u32) -> Self {
        let images = (1..=pool_size)
            .map(|n| {
                let key = format!("{n}.jpg");
                let bytes = fixtures::image_bytes(&key);
                (key, bytes)
            })
            .collect();
        Self {
            images,
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            images: HashMap::new(),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn without(mut self, key: &str) -> Self {
        self.images.remove(key);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for StubStore {
    async fn fetch(&self, key: &ImageKey) -> Result<Vec<u8>, StoreError> {
        self.fetches.lock().unwrap().push(key.to_string());
        self.images
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| StoreError::Status {
                key: key.clone(),
                status: StatusCode::NOT_FOUND,
            })
    }
}

/// Face detector reporting the fixture confidence for the image's key.
pub struct StubDetector {
    overrides: HashMap<String, Vec<f32>>,
}

impl StubDetector {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    /// Report exactly these face confidences for `key`.
    pub fn with_faces(mut self, key: &str, confidences: &[f32]) -> Self {
        self.overrides.insert(key.to_string(), confidences.to_vec());
        self
    }
}

#[async_trait]
impl FaceDetector for StubDetector {
    async fn detect_faces(&self, image_bytes: &[u8]) -> Result<DetectionResult, DetectionError> {
        let key = String::from_utf8_lossy(image_bytes).to_string();
        let confidences = self
            .overrides
            .get(&key)
            .cloned()
            .unwrap_or_else(|| vec![fixtures::confidence_for(&key)]);
        Ok(DetectionResult {
            faces: confidences
                .into_iter()
                .map(|confidence| FaceDetection { confidence })
                .collect(),
        })
    }
}

/// Text extractor returning fixture text as a single LINE block.
pub struct StubExtractor {
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl StubExtractor {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract_text(
        &self,
        image_bytes: &[u8],
        features: &[FeatureType],
    ) -> Result<ExtractionResult, ExtractionError> {
        assert_eq!(features, &[FeatureType::Forms]);
        self.calls.fetch_add(1, Ordering::SeqCst);

        let key = String::from_utf8_lossy(image_bytes).to_string();
        if self.failing.contains(&key) {
            let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
            return Err(ExtractionError::Parse(parse_error));
        }

        let blocks = match fixtures::text_for(&key) {
            Some(text) => vec![
                TextBlock {
                    block_type: BlockType::Page,
                    text: None,
                },
                TextBlock {
                    block_type: BlockType::Line,
                    text: Some(text.to_string()),
                },
            ],
            None => Vec::new(),
        };
        Ok(ExtractionResult { blocks })
    }
}

/// Memory queue that records traffic and injects failures.
///
/// Dropped deletes report success without deleting, like a consumer that
/// crashed before acknowledging. Failed operations return a connection error
/// and leave the queue untouched.
pub struct RecordingQueue {
    inner: MemoryWorkQueue,
    sent: Mutex<Vec<(String, String)>>,
    receives: AtomicUsize,
    deletes_to_drop: AtomicUsize,
    failing_sends: Mutex<HashSet<String>>,
    receives_to_fail: AtomicUsize,
    deletes_to_fail: AtomicUsize,
    failed_deletes: AtomicUsize,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::with_visibility_timeout(Duration::from_secs(30))
    }

    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            inner: MemoryWorkQueue::new(visibility_timeout),
            sent: Mutex::new(Vec::new()),
            receives: AtomicUsize::new(0),
            deletes_to_drop: AtomicUsize::new(0),
            failing_sends: Mutex::new(HashSet::new()),
            receives_to_fail: AtomicUsize::new(0),
            deletes_to_fail: AtomicUsize::new(0),
            failed_deletes: AtomicUsize::new(0),
        }
    }

    pub fn drop_next_deletes(self, count: usize) -> Self {
        self.deletes_to_drop.store(count, Ordering::SeqCst);
        self
    }

    /// Every send of `body` fails.
    pub fn fail_sends_of(self, body: &str) -> Self {
        self.failing_sends.lock().unwrap().insert(body.to_string());
        self
    }

    pub fn fail_next_receives(self, count: usize) -> Self {
        self.receives_to_fail.store(count, Ordering::SeqCst);
        self
    }

    pub fn fail_next_deletes(self, count: usize) -> Self {
        self.deletes_to_fail.store(count, Ordering::SeqCst);
        self
    }

    pub fn failed_deletes(&self) -> usize {
        self.failed_deletes.load(Ordering::SeqCst)
    }

    /// `(body, group_id)` of every send, in order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_bodies(&self) -> Vec<String> {
        self.sent().into_iter().map(|(body, _)| body).collect()
    }

    pub fn receives(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }

    pub async fn depth(&self) -> usize {
        self.inner.depth().await
    }
}

#[async_trait]
impl WorkQueue for RecordingQueue {
    async fn send(&self, body: &str, group_id: &str) -> Result<String, QueueError> {
        if self.failing_sends.lock().unwrap().contains(body) {
            return Err(connection_reset());
        }
        self.sent
            .lock()
            .unwrap()
            .push((body.to_string(), group_id.to_string()));
        self.inner.send(body, group_id).await
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        self.receives.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.receives_to_fail) {
            return Err(connection_reset());
        }
        self.inner.receive(max_messages, wait).await
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        if take_one(&self.deletes_to_fail) {
            self.failed_deletes.fetch_add(1, Ordering::SeqCst);
            return Err(connection_reset());
        }
        if take_one(&self.deletes_to_drop) {
            return Ok(());
        }
        self.inner.delete(receipt_handle).await
    }
}

/// Decrement a countdown, returning whether it was still positive.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn connection_reset() -> QueueError {
    QueueError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection reset by peer",
    )))
}

pub async fn read_log(path: &std::path::Path) -> String {
    tokio::fs::read_to_string(path).await.unwrap_or_default()
}
