//! Delivery of stored email objects to a local LMTP server
//!
//! This crate provides:
//! - The shared [`Pipeline`]: fetch, resolve recipients, deliver, delete
//! - [`RecipientResolver`] over a [`RecipientLookup`] (Postfix `postmap`)
//! - [`RetryWorker`] draining the dead-letter queue
//! - Collaborator traits with AWS and in-memory implementations

mod claim;
mod config;
mod error;
mod handler;
mod lookup;
mod message;
mod payload;
mod pipeline;
pub mod queue;
mod resolver;
mod retry;
pub mod store;
mod transport;

pub use claim::{Claim, ClaimSet};
pub use config::{DeliveryConfig, LmtpTimeouts, PostmapConfig, RetryConfig};
pub use error::{DeliveryError, LookupError, QueueError, StoreError, TransportError};
pub use handler::NotificationHandler;
pub use lookup::{PostmapLookup, RecipientLookup, StaticLookup};
pub use message::EmailObject;
pub use payload::MailEventPayload;
pub use pipeline::Pipeline;
pub use queue::{DeadLetterQueue, MemoryQueue, QueueMessage, ReceiveOptions, SqsQueue};
pub use resolver::{RecipientResolver, ResolvedRecipientSet};
pub use retry::{DrainSummary, RetryWorker};
pub use store::{MemoryObjectStore, ObjectStore, S3ObjectStore};
pub use transport::{LmtpTransport, MailTransport};
