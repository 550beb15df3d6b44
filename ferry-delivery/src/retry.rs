//! Dead-letter queue retry worker
//!
//! Notifications the push endpoint could not process end up in the
//! dead-letter queue. The worker drains that queue periodically and runs each
//! one through the same [`NotificationHandler`] as the endpoint.

use std::{sync::Arc, time::Duration};

use ferry_common::{ShutdownSignal, internal};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::RetryConfig,
    handler::NotificationHandler,
    queue::{DeadLetterQueue, QueueMessage, ReceiveOptions},
};

/// Outcome counts for one drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    /// Delivered, message deleted
    pub successes: usize,
    /// Object already gone, message deleted
    pub consumed: usize,
    /// Left on the queue for a later pass
    pub failures: usize,
}

impl DrainSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.successes + self.consumed + self.failures
    }
}

/// The body of a dead-lettered notification. Only `Message` matters.
#[derive(Deserialize)]
struct DeadLetter {
    #[serde(rename = "Message")]
    message: Value,
}

pub struct RetryWorker {
    queue: Arc<dyn DeadLetterQueue>,
    handler: Arc<dyn NotificationHandler>,
    options: ReceiveOptions,
    interval: Duration,
}

impl RetryWorker {
    pub fn new(
        queue: Arc<dyn DeadLetterQueue>,
        handler: Arc<dyn NotificationHandler>,
        config: &RetryConfig,
    ) -> Self {
        Self {
            queue,
            handler,
            options: config.receive_options(),
            interval: config.check_interval(),
        }
    }

    /// Drain the queue, sleep, repeat, until shutdown.
    ///
    /// Shutdown never interrupts a delivery in progress; it stops the worker
    /// from starting the next message or the next pass.
    pub async fn serve(&self, shutdown: ShutdownSignal) {
        internal!(level = INFO, interval = ?self.interval, "Dead letter queue worker started");

        while !shutdown.is_triggered() {
            let summary = self.drain_once(&shutdown).await;

            if summary.total() > 0 {
                tracing::info!(
                    successes = summary.successes,
                    consumed = summary.consumed,
                    failures = summary.failures,
                    "Dead letter queue processing complete"
                );
            }

            if shutdown.sleep(self.interval).await {
                break;
            }
        }

        internal!(level = INFO, "Dead letter queue worker stopped");
    }

    /// One pass: receive batches until the queue is empty, a receive fails,
    /// or shutdown is requested.
    pub async fn drain_once(&self, shutdown: &ShutdownSignal) -> DrainSummary {
        let mut summary = DrainSummary::default();

        'drain: while !shutdown.is_triggered() {
            let batch = match self.queue.receive(&self.options).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!(error = %e, "Unable to receive from dead letter queue");
                    break;
                }
            };

            if batch.is_empty() {
                break;
            }

            for message in &batch {
                if shutdown.is_triggered() {
                    internal!(
                        level = DEBUG,
                        batch_size = batch.len(),
                        "Shutdown requested, leaving remaining messages on the queue"
                    );
                    break 'drain;
                }

                self.process(message, &mut summary).await;
            }
        }

        summary
    }

    #[tracing::instrument(level = "debug", skip_all, fields(message_id = %message.id))]
    async fn process(&self, message: &QueueMessage, summary: &mut DrainSummary) {
        let dead_letter: DeadLetter = match serde_json::from_str(&message.body) {
            Ok(dead_letter) => dead_letter,
            Err(e) => {
                tracing::error!(error = %e, "Undecodable dead letter queue message");
                summary.failures += 1;
                return;
            }
        };

        match self.handler.handle(&dead_letter.message).await {
            Ok(()) => {
                summary.successes += 1;
                self.acknowledge(message).await;
            }
            Err(e) if e.is_terminal() => {
                tracing::error!(error = %e, "Object is gone, discarding notification");
                summary.consumed += 1;
                self.acknowledge(message).await;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "Retry failed, leaving notification on the queue"
                );
                summary.failures += 1;
            }
        }
    }

    async fn acknowledge(&self, message: &QueueMessage) {
        if let Err(e) = self.queue.delete(message).await {
            tracing::error!(error = %e, "Unable to delete message from dead letter queue");
        }
    }
}
