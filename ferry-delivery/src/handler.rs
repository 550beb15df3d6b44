use async_trait::async_trait;
use serde_json::Value;

use crate::DeliveryError;

/// Consumer of a notification's `Message` field.
///
/// Shared by the push endpoint and the dead-letter retry worker so both
/// paths run the same delivery.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// `message` is either the JSON text of the event or the event itself.
    async fn handle(&self, message: &Value) -> Result<(), DeliveryError>;
}
