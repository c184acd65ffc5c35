use std::fmt;

use super::image::ImageKey;

/// One line of the match log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub image_key: ImageKey,
    pub extracted_text: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.image_key, self.extracted_text)
    }
}

/// Outcome of one producer run.
#[derive(Debug, Clone)]
pub struct ProducerReport {
    pub group_id: String,
    pub sampled: Vec<ImageKey>,
    pub enqueued: Vec<ImageKey>,
    pub failed: Vec<ImageKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The end-of-work message was received.
    Sentinel,
    /// The run context was stopped before a sentinel arrived.
    Cancelled,
}

/// Outcome of one consumer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    pub processed: u64,
    pub matched: u64,
    pub skipped_duplicates: u64,
    pub failed: u64,
    pub stop: StopReason,
}
