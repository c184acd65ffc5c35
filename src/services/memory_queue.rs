use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout, Instant};

use super::queue::{decode_receipt, encode_receipt, QueueError, WorkQueue};
use crate::models::message::QueueMessage;

/// Upper bound on one idle wait so expired visibility locks are noticed.
const RECHECK_INTERVAL: Duration = Duration::from_millis(50);

struct Stored {
    id: u64,
    body: String,
    group_id: String,
}

struct InFlight {
    message_id: u64,
    visible_at: Instant,
}

#[derive(Default)]
struct State {
    next_id: u64,
    messages: VecDeque<Stored>,
    in_flight: HashMap<String, InFlight>,
}

/// In-process grouped FIFO queue with the same delivery rules as
/// [`RedisWorkQueue`](super::queue::RedisWorkQueue).
pub struct MemoryWorkQueue {
    state: Mutex<State>,
    changed: Notify,
    visibility_timeout: Duration,
}

impl MemoryWorkQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            changed: Notify::new(),
            visibility_timeout,
        }
    }

    /// Messages not yet deleted, in flight or not.
    pub async fn depth(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    async fn claim_available(&self, max_messages: usize) -> Vec<QueueMessage> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let mut seen_groups = HashSet::new();
        let mut claimed = Vec::new();

        let State {
            messages,
            in_flight,
            ..
        } = &mut *state;

        for stored in messages.iter() {
            if claimed.len() >= max_messages {
                break;
            }
            // Only the head of each group is deliverable.
            if !seen_groups.insert(stored.group_id.as_str()) {
                continue;
            }
            if let Some(lock) = in_flight.get(&stored.group_id) {
                if lock.visible_at > now {
                    continue;
                }
            }
            in_flight.insert(
                stored.group_id.clone(),
                InFlight {
                    message_id: stored.id,
                    visible_at: now + self.visibility_timeout,
                },
            );
            let message_id = stored.id.to_string();
            claimed.push(QueueMessage {
                receipt_handle: encode_receipt(&message_id, &stored.group_id),
                message_id,
                body: stored.body.clone(),
                group_id: stored.group_id.clone(),
            });
        }
        claimed
    }
}

impl Default for MemoryWorkQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn send(&self, body: &str, group_id: &str) -> Result<String, QueueError> {
        let id = {
            let mut state = self.state.lock().await;
            state.next_id += 1;
            let id = state.next_id;
            state.messages.push_back(Stored {
                id,
                body: body.to_string(),
                group_id: group_id.to_string(),
            });
            id
        };
        self.changed.notify_waiters();
        Ok(id.to_string())
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let deadline = Instant::now() + wait;
        loop {
            let messages = self.claim_available(max_messages.max(1)).await;
            let now = Instant::now();
            if !messages.is_empty() || now >= deadline {
                return Ok(messages);
            }
            let _ = timeout(
                RECHECK_INTERVAL.min(deadline - now),
                self.changed.notified(),
            )
            .await;
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let (message_id, group_id) = decode_receipt(receipt_handle)?;
        let message_id: u64 = message_id
            .parse()
            .map_err(|_| QueueError::InvalidReceipt(receipt_handle.to_string()))?;

        {
            let mut state = self.state.lock().await;
            state.messages.retain(|m| m.id != message_id);
            if state
                .in_flight
                .get(group_id)
                .is_some_and(|lock| lock.message_id == message_id)
            {
                state.in_flight.remove(group_id);
            }
        }
        self.changed.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_WAIT: Duration = Duration::ZERO;

    #[tokio::test]
    async fn test_group_order_preserved() {
        let queue = MemoryWorkQueue::default();
        for body in ["2.jpg", "5.jpg", "-1"] {
            queue.send(body, "group-a").await.unwrap();
        }

        let mut bodies = Vec::new();
        loop {
            let batch = queue.receive(1, NO_WAIT).await.unwrap();
            let Some(message) = batch.into_iter().next() else {
                break;
            };
            bodies.push(message.body.clone());
            queue.delete(&message.receipt_handle).await.unwrap();
        }
        assert_eq!(bodies, vec!["2.jpg", "5.jpg", "-1"]);
        assert_eq!(queue.depth().await, 0);
    }

    #[tokio::test]
    async fn test_group_blocked_while_head_in_flight() {
        let queue = MemoryWorkQueue::default();
        queue.send("1.jpg", "group-a").await.unwrap();
        queue.send("2.jpg", "group-a").await.unwrap();
        queue.send("9.jpg", "group-b").await.unwrap();

        let first = queue.receive(10, NO_WAIT).await.unwrap();
        let bodies: Vec<_> = first.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["1.jpg", "9.jpg"]);

        assert!(queue.receive(10, NO_WAIT).await.unwrap().is_empty());

        queue.delete(&first[0].receipt_handle).await.unwrap();
        let next = queue.receive(10, NO_WAIT).await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].body, "2.jpg");
    }

    #[tokio::test]
    async fn test_undeleted_message_redelivered_after_visibility_timeout() {
        let queue = MemoryWorkQueue::new(Duration::from_millis(30));
        queue.send("3.jpg", "group-a").await.unwrap();

        let first = queue.receive(1, NO_WAIT).await.unwrap();
        assert_eq!(first.len(), 1);

        let again = queue.receive(1, Duration::from_secs(2)).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].message_id, first[0].message_id);
        assert_ne!(again[0].receipt_handle, first[0].receipt_handle);
    }

    #[tokio::test]
    async fn test_long_poll_wakes_on_send() {
        let queue = std::sync::Arc::new(MemoryWorkQueue::default());
        let sender = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sender.send("7.jpg", "group-a").await.unwrap();
        });

        let received = queue.receive(1, Duration::from_secs(5)).await.unwrap();
        assert_eq!(received[0].body, "7.jpg");
    }

    #[tokio::test]
    async fn test_empty_receive_returns_after_wait() {
        let queue = MemoryWorkQueue::default();
        let started = Instant::now();
        let received = queue.receive(1, Duration::from_millis(60)).await.unwrap();
        assert!(received.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_delete_rejects_bad_receipt() {
        let queue = MemoryWorkQueue::default();
        assert!(queue.delete("nope").await.is_err());
        assert!(queue.delete("abc:n:group").await.is_err());
    }
}
