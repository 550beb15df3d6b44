//! The mail event carried inside a notification's `Message` field.

use serde::Deserialize;
use serde_json::Value;

use crate::DeliveryError;

/// Which object to deliver and to whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailEventPayload {
    pub bucket: String,
    pub object_key: String,
    /// Envelope recipients as reported by the receiving service. May be empty.
    pub recipients: Vec<String>,
}

#[derive(Deserialize)]
struct Wire {
    receipt: Receipt,
}

#[derive(Deserialize)]
struct Receipt {
    action: Action,
    recipients: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Action {
    bucket_name: String,
    object_key: String,
}

impl MailEventPayload {
    /// Decode from either a JSON string holding the event or an already
    /// structured JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::MalformedNotification`] when the text is not
    /// JSON or a required field (`receipt.action.bucketName`,
    /// `receipt.action.objectKey`, `receipt.recipients`) is missing.
    pub fn from_value(message: &Value) -> Result<Self, DeliveryError> {
        let wire: Wire = match message {
            Value::String(text) => serde_json::from_str(text),
            other => Wire::deserialize(other),
        }
        .map_err(|e| DeliveryError::MalformedNotification(e.to_string()))?;

        Ok(Self {
            bucket: wire.receipt.action.bucket_name,
            object_key: wire.receipt.action.object_key,
            recipients: wire.receipt.recipients,
        })
    }
}
