//! The dead-letter queue notifications land in when the push path fails.

mod memory;
mod sqs;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryQueue;
pub use sqs::SqsQueue;

use crate::error::QueueError;

/// A message received from the queue.
///
/// It stays owned by the queue until [`DeadLetterQueue::delete`] succeeds and
/// reappears once its visibility timeout lapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    pub receipt_handle: String,
    /// Notification-shaped JSON, `{"Message": "<event json>", ...}`
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Long-poll duration when the queue is empty
    pub wait_time: Duration,
    /// How long received messages are hidden from other consumers
    pub visibility_timeout: Duration,
    pub max_messages: u32,
}

#[async_trait]
pub trait DeadLetterQueue: Send + Sync {
    /// Receive up to `options.max_messages` messages. An empty batch means
    /// the queue is drained.
    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledge a message so it is never redelivered.
    async fn delete(&self, message: &QueueMessage) -> Result<(), QueueError>;
}
