use async_trait::async_trait;
use aws_sdk_sqs::{Client, error::DisplayErrorContext};

use super::{DeadLetterQueue, QueueMessage, ReceiveOptions};
use crate::error::QueueError;

/// [`DeadLetterQueue`] over Amazon SQS
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

fn seconds(duration: std::time::Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

impl SqsQueue {
    #[must_use]
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl DeadLetterQueue for SqsQueue {
    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .wait_time_seconds(seconds(options.wait_time))
            .visibility_timeout(seconds(options.visibility_timeout))
            .max_number_of_messages(i32::try_from(options.max_messages).unwrap_or(10))
            .send()
            .await
            .map_err(|e| QueueError::Receive(DisplayErrorContext(&e).to_string()))?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let Some(receipt_handle) = message.receipt_handle else {
                    tracing::warn!(id = ?message.message_id, "Skipping queue message without a receipt handle");
                    return None;
                };

                Some(QueueMessage {
                    id: message.message_id.unwrap_or_default(),
                    receipt_handle,
                    body: message.body.unwrap_or_default(),
                })
            })
            .collect();

        Ok(messages)
    }

    async fn delete(&self, message: &QueueMessage) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Delete {
                id: message.id.clone(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(())
    }
}
