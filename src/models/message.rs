use serde::{Deserialize, Serialize};

/// Reserved body that tells the consumer no more work follows.
pub const SENTINEL: &str = "-1";

/// A message as handed out by a [`WorkQueue`](crate::services::queue::WorkQueue) receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_id: String,
    pub body: String,
    pub group_id: String,
    /// Opaque token valid for one delivery; required to delete the message.
    pub receipt_handle: String,
}

impl QueueMessage {
    pub fn is_sentinel(&self) -> bool {
        self.body.trim() == SENTINEL
    }
}
