//! The shared delivery pipeline: storage object in, LMTP transaction out.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    DeliveryError,
    claim::ClaimSet,
    handler::NotificationHandler,
    message::EmailObject,
    payload::MailEventPayload,
    resolver::RecipientResolver,
    store::ObjectStore,
    transport::MailTransport,
};

/// Delivers stored messages and deletes them once delivered.
///
/// Deleting the object is the only commit point: every failure before it
/// leaves the object where it was, so the delivery can be attempted again.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    resolver: RecipientResolver,
    transport: Arc<dyn MailTransport>,
    claims: ClaimSet,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        resolver: RecipientResolver,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            store,
            resolver,
            transport,
            claims: ClaimSet::new(),
        }
    }

    /// Deliver the object at `bucket`/`key`.
    ///
    /// With no explicit recipients (or an empty list) the candidates come
    /// from the message's `To`, `Cc` and `Bcc` headers.
    ///
    /// # Errors
    ///
    /// Any [`DeliveryError`]; the object is only deleted on `Ok`.
    #[tracing::instrument(level = "info", skip(self, explicit_recipients), err(Display))]
    pub async fn deliver_object(
        &self,
        bucket: &str,
        key: &str,
        explicit_recipients: Option<&[String]>,
    ) -> Result<(), DeliveryError> {
        let _claim = self
            .claims
            .try_claim(bucket, key)
            .ok_or_else(|| DeliveryError::InProgress {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;

        let raw = self.store.get(bucket, key).await?;
        let email = EmailObject::parse(raw).map_err(|e| DeliveryError::MalformedMessage {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let candidates = match explicit_recipients {
            Some(list) if !list.is_empty() => list,
            _ => {
                tracing::debug!("No envelope recipients given, using message headers");
                email.header_recipients()
            }
        };

        let recipients = self.resolver.resolve(candidates).await?;

        let sender = email.return_path().unwrap_or_else(|| {
            tracing::warn!("Message has no Return-Path, using the null reverse-path");
            ""
        });

        self.transport
            .deliver(sender, &recipients, &email.without_bcc())
            .await?;

        self.store
            .delete(bucket, key)
            .await
            .map_err(DeliveryError::Storage)?;

        tracing::info!(recipients = ?recipients, "Delivered and removed object");
        Ok(())
    }

    /// Decode a mail event and deliver the object it names to the event's
    /// recipients.
    ///
    /// # Errors
    ///
    /// [`DeliveryError::MalformedNotification`] if `message` is not a mail
    /// event, otherwise as [`deliver_object`](Self::deliver_object).
    pub async fn deliver_from_envelope(&self, message: &Value) -> Result<(), DeliveryError> {
        let payload = MailEventPayload::from_value(message)?;
        self.deliver_object(&payload.bucket, &payload.object_key, Some(&payload.recipients))
            .await
    }
}

#[async_trait]
impl NotificationHandler for Pipeline {
    async fn handle(&self, message: &Value) -> Result<(), DeliveryError> {
        self.deliver_from_envelope(message).await
    }
}
