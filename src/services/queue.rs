use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use crate::models::message::QueueMessage;

/// How often an empty long-poll re-checks Redis.
const POLL_INTERVAL_MS: u64 = 200;

const CLAIM_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return false
end
local id = redis.call('LINDEX', KEYS[2], 0)
if not id then
    return false
end
redis.call('SET', KEYS[1], id, 'PX', ARGV[1])
local body = redis.call('HGET', KEYS[3], id) or ''
return {id, body}
"#;

const DELETE_SCRIPT: &str = r#"
local removed = redis.call('LREM', KEYS[1], 0, ARGV[1])
redis.call('HDEL', KEYS[2], ARGV[1])
if redis.call('GET', KEYS[3]) == ARGV[1] then
    redis.call('DEL', KEYS[3])
end
if redis.call('LLEN', KEYS[1]) == 0 then
    redis.call('ZREM', KEYS[4], ARGV[2])
end
return removed
"#;

/// FIFO work queue with group-scoped ordering.
///
/// Within a group, messages are delivered in send order and only one message
/// of a group is in flight at a time. A received message stays hidden for the
/// visibility timeout; if it is not deleted by then it is delivered again.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue `body` under `group_id`, returning the message id.
    async fn send(&self, body: &str, group_id: &str) -> Result<String, QueueError>;

    /// Receive up to `max_messages`, waiting at most `wait` for the first one.
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledge a received message so it is never redelivered.
    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}

/// Receipt handles carry the message id and group so deletes need no lookup.
pub(crate) fn encode_receipt(message_id: &str, group_id: &str) -> String {
    format!("{}:{}:{}", message_id, Uuid::new_v4().simple(), group_id)
}

pub(crate) fn decode_receipt(receipt_handle: &str) -> Result<(&str, &str), QueueError> {
    let mut parts = receipt_handle.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(_nonce), Some(group)) if !id.is_empty() && !group.is_empty() => {
            Ok((id, group))
        }
        _ => Err(QueueError::InvalidReceipt(receipt_handle.to_string())),
    }
}

/// Redis-backed grouped FIFO queue.
pub struct RedisWorkQueue {
    client: redis::Client,
    name: String,
    visibility_timeout: Duration,
    claim: redis::Script,
    remove: redis::Script,
}

impl RedisWorkQueue {
    pub fn new(
        redis_url: &str,
        name: &str,
        visibility_timeout: Duration,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self {
            client,
            name: name.to_string(),
            visibility_timeout,
            claim: redis::Script::new(CLAIM_SCRIPT),
            remove: redis::Script::new(DELETE_SCRIPT),
        })
    }

    fn seq_key(&self) -> String {
        format!("{}:seq", self.name)
    }

    fn groups_key(&self) -> String {
        format!("{}:groups", self.name)
    }

    fn bodies_key(&self) -> String {
        format!("{}:bodies", self.name)
    }

    fn group_key(&self, group_id: &str) -> String {
        format!("{}:group:{}", self.name, group_id)
    }

    fn lock_key(&self, group_id: &str) -> String {
        format!("{}:lock:{}", self.name, group_id)
    }

    /// Check Redis connectivity.
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Messages not yet deleted, in flight or not.
    pub async fn depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        let depth: u64 = conn.hlen(self.bodies_key()).await.map_err(QueueError::Redis)?;
        Ok(depth)
    }

    async fn claim_available(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let groups: Vec<String> = conn
            .zrange(self.groups_key(), 0, -1)
            .await
            .map_err(QueueError::Redis)?;

        let visibility_ms = self.visibility_timeout.as_millis() as u64;
        let mut messages = Vec::new();
        for group_id in groups {
            if messages.len() >= max_messages {
                break;
            }
            let claimed: Option<(String, String)> = self
                .claim
                .key(self.lock_key(&group_id))
                .key(self.group_key(&group_id))
                .key(self.bodies_key())
                .arg(visibility_ms)
                .invoke_async(conn)
                .await
                .map_err(QueueError::Redis)?;

            if let Some((message_id, body)) = claimed {
                messages.push(QueueMessage {
                    receipt_handle: encode_receipt(&message_id, &group_id),
                    message_id,
                    body,
                    group_id,
                });
            }
        }
        Ok(messages)
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn send(&self, body: &str, group_id: &str) -> Result<String, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        let id: u64 = conn.incr(self.seq_key(), 1).await.map_err(QueueError::Redis)?;

        redis::pipe()
            .atomic()
            .hset(self.bodies_key(), id, body)
            .ignore()
            .rpush(self.group_key(group_id), id)
            .ignore()
            .cmd("ZADD")
            .arg(self.groups_key())
            .arg("NX")
            .arg(id)
            .arg(group_id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;

        Ok(id.to_string())
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        let deadline = Instant::now() + wait;

        loop {
            let messages = self.claim_available(&mut conn, max_messages.max(1)).await?;
            let now = Instant::now();
            if !messages.is_empty() || now >= deadline {
                return Ok(messages);
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS).min(deadline - now)).await;
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let (message_id, group_id) = decode_receipt(receipt_handle)?;
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;

        let removed: i64 = self
            .remove
            .key(self.group_key(group_id))
            .key(self.bodies_key())
            .key(self.lock_key(group_id))
            .key(self.groups_key())
            .arg(message_id)
            .arg(group_id)
            .invoke_async(&mut conn)
            .await
            .map_err(QueueError::Redis)?;

        if removed == 0 {
            tracing::debug!(message_id, group_id, "Delete found no message, already acknowledged");
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Malformed receipt handle: {0}")]
    InvalidReceipt(String),
}
