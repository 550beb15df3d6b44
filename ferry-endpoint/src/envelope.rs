//! The outer JSON document pushed by the notification service.

use serde::Deserialize;
use serde_json::Value;

use crate::EndpointError;

/// A pushed notification, keyed by its `Type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEnvelope {
    /// A message published to the topic; `message` is handed to the pipeline.
    Notification {
        message: Value,
        topic_arn: Option<String>,
    },
    /// The topic asks the endpoint to confirm by fetching `subscribe_url`.
    SubscriptionConfirmation {
        subscribe_url: String,
        topic_arn: String,
    },
    UnsubscribeConfirmation { topic_arn: Option<String> },
    Unknown(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Wire {
    #[serde(rename = "Type")]
    kind: String,
    message: Option<Value>,
    #[serde(rename = "SubscribeURL")]
    subscribe_url: Option<String>,
    topic_arn: Option<String>,
}

fn missing(kind: &str, field: &str) -> EndpointError {
    EndpointError::Malformed(format!("{kind} without '{field}'"))
}

impl NotificationEnvelope {
    /// Parse a request body.
    ///
    /// # Errors
    ///
    /// [`EndpointError::Malformed`] if the body is not JSON, has no `Type`, or
    /// lacks a field its type requires.
    pub fn parse(body: &[u8]) -> Result<Self, EndpointError> {
        let wire: Wire =
            serde_json::from_slice(body).map_err(|e| EndpointError::Malformed(e.to_string()))?;

        Ok(match wire.kind.as_str() {
            "Notification" => Self::Notification {
                message: wire.message.ok_or_else(|| missing(&wire.kind, "Message"))?,
                topic_arn: wire.topic_arn,
            },
            "SubscriptionConfirmation" => Self::SubscriptionConfirmation {
                subscribe_url: wire
                    .subscribe_url
                    .ok_or_else(|| missing(&wire.kind, "SubscribeURL"))?,
                topic_arn: wire.topic_arn.ok_or_else(|| missing(&wire.kind, "TopicArn"))?,
            },
            "UnsubscribeConfirmation" => Self::UnsubscribeConfirmation {
                topic_arn: wire.topic_arn,
            },
            _ => Self::Unknown(wire.kind),
        })
    }

    /// The `Type` this envelope was parsed from.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Notification { .. } => "Notification",
            Self::SubscriptionConfirmation { .. } => "SubscriptionConfirmation",
            Self::UnsubscribeConfirmation { .. } => "UnsubscribeConfirmation",
            Self::Unknown(kind) => kind,
        }
    }
}
