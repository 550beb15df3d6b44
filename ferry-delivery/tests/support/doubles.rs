//! Recording and failing collaborators
#![allow(dead_code)] // Test utility module - not all helpers used in every test

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use ferry_delivery::{
    DeliveryError, LookupError, MailTransport, MemoryObjectStore, NotificationHandler, Pipeline,
    RecipientLookup, RecipientResolver, ResolvedRecipientSet, StaticLookup, TransportError,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Notify;

/// One call to `MailTransport::deliver`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub sender: String,
    pub recipients: Vec<String>,
    pub message: Vec<u8>,
}

/// Transport that records every delivery, optionally failing them
#[derive(Default)]
pub struct RecordingTransport {
    deliveries: Mutex<Vec<Delivery>>,
    failure: Mutex<Option<String>>,
    failing_mailboxes: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
    }

    /// Fail any delivery that includes `mailbox`
    pub fn fail_for(&self, mailbox: impl Into<String>) {
        self.failing_mailboxes.lock().insert(mailbox.into());
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(
        &self,
        sender: &str,
        recipients: &ResolvedRecipientSet,
        message: &[u8],
    ) -> Result<(), TransportError> {
        if let Some(reason) = self.failure.lock().clone() {
            return Err(TransportError::Temporary(reason));
        }

        if let Some(mailbox) = recipients
            .iter()
            .find(|mailbox| self.failing_mailboxes.lock().contains(*mailbox))
        {
            return Err(TransportError::Temporary(format!(
                "{mailbox}: 452 4.2.2 Mailbox full"
            )));
        }

        self.deliveries.lock().push(Delivery {
            sender: sender.to_string(),
            recipients: recipients.iter().cloned().collect(),
            message: message.to_vec(),
        });
        Ok(())
    }
}

/// Transport that blocks inside `deliver` until released
#[derive(Default)]
pub struct GatedTransport {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl MailTransport for GatedTransport {
    async fn deliver(
        &self,
        _sender: &str,
        _recipients: &ResolvedRecipientSet,
        _message: &[u8],
    ) -> Result<(), TransportError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

/// Lookup whose backing table is unavailable
pub struct BrokenLookup;

#[async_trait]
impl RecipientLookup for BrokenLookup {
    async fn lookup(&self, _address: &str) -> Result<Option<String>, LookupError> {
        Err(LookupError::Failed {
            program: "postmap".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "fatal: open database /etc/postfix/virtual.db: No such file or directory"
                .to_string(),
        })
    }
}

/// Handler that counts calls and defers to an inner handler
pub struct CountingHandler<H> {
    pub inner: H,
    pub calls: AtomicUsize,
}

impl<H> CountingHandler<H> {
    pub fn new(inner: H) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<H: NotificationHandler> NotificationHandler for CountingHandler<H> {
    async fn handle(&self, message: &Value) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.handle(message).await
    }
}

pub fn lookup_table() -> StaticLookup {
    StaticLookup::new([
        ("alice@example.com", "alice"),
        ("a.smith@example.com", "alice"),
        ("bob@example.com", "bob"),
        ("carol@example.com", "carol"),
    ])
}

pub fn pipeline(
    store: &MemoryObjectStore,
    transport: Arc<dyn MailTransport>,
) -> Pipeline {
    Pipeline::new(
        Arc::new(store.clone()),
        RecipientResolver::new(Arc::new(lookup_table())),
        transport,
    )
}

/// A small message addressed through headers
pub fn message(to: &str) -> Vec<u8> {
    format!(
        "Return-Path: <bounces@sender.example>\r\n\
         From: Sender <sender@sender.example>\r\n\
         To: {to}\r\n\
         Subject: Test\r\n\
         \r\n\
         Hello\r\n"
    )
    .into_bytes()
}

/// The mail event carried in a notification's `Message`
pub fn event(bucket: &str, key: &str, recipients: &[&str]) -> Value {
    json!({
        "notificationType": "Received",
        "receipt": {
            "action": { "type": "S3", "bucketName": bucket, "objectKey": key },
            "recipients": recipients,
        }
    })
}

/// A dead-lettered notification body: the event as JSON text under `Message`
pub fn dead_letter(bucket: &str, key: &str, recipients: &[&str]) -> String {
    json!({
        "Type": "Notification",
        "MessageId": "00000000-0000-0000-0000-000000000000",
        "Message": event(bucket, key, recipients).to_string(),
    })
    .to_string()
}
