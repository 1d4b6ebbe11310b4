//! Queue consumer trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use geoingest_core::config::{
    QueueConfig, MAX_RECEIVE_BATCH, MAX_VISIBILITY_TIMEOUT_SECS, MAX_WAIT_TIME_SECS,
};

use crate::error::QueueError;

/// A raw message received from a queue.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Unique message identifier from the queue provider.
    pub id: String,
    /// Raw message body (JSON string).
    pub body: String,
    /// Provider-specific handle for ack (e.g., SQS receipt handle).
    pub receipt_handle: String,
    /// When the message was sent to the queue.
    pub timestamp: DateTime<Utc>,
    /// Number of times this message has been received (for retry tracking).
    pub attempt_count: u32,
}

impl QueueMessage {
    /// Milliseconds between the send and now; never negative.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.timestamp).num_milliseconds().max(0)
    }
}

/// Parameters of a single long-poll receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub max_messages: u32,
    pub wait_time_secs: u32,
    /// How long a received message stays hidden from other consumers.
    pub visibility_timeout_secs: u32,
}

impl From<&QueueConfig> for ReceiveOptions {
    fn from(queue: &QueueConfig) -> Self {
        Self {
            max_messages: queue.max_messages.clamp(1, MAX_RECEIVE_BATCH),
            wait_time_secs: queue.wait_time_secs.min(MAX_WAIT_TIME_SECS),
            visibility_timeout_secs: queue.visibility_timeout_secs.min(MAX_VISIBILITY_TIMEOUT_SECS),
        }
    }
}

/// Trait for queue consumer backends.
///
/// There is no negative acknowledgement: a message that is not acked becomes
/// visible again once its visibility timeout elapses.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Poll up to `opts.max_messages` from the queue.
    ///
    /// May block for up to `opts.wait_time_secs`.
    /// Returns an empty vec if no messages are available.
    async fn poll_batch(&self, opts: &ReceiveOptions) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledge successful processing. Removes the message from the queue.
    async fn ack(&self, receipt_handle: &str) -> Result<(), QueueError>;
}
