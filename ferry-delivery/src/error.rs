//! Typed error handling for delivery operations.
//!
//! A delivery either commits (the stored object is deleted) or fails with a
//! [`DeliveryError`]. Only [`DeliveryError::ObjectNotFound`] is terminal: the
//! object is already gone, so there is nothing left to retry.

use ferry_lmtp::ClientError;
use thiserror::Error;

/// Top-level delivery error type.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The storage object does not exist (already delivered, or never stored).
    #[error("Object '{key}' not found in bucket '{bucket}'")]
    ObjectNotFound { bucket: String, key: String },

    /// The notification payload could not be decoded.
    #[error("Malformed notification: {0}")]
    MalformedNotification(String),

    /// The stored object is not a parseable email message.
    #[error("Malformed message in object '{key}' of bucket '{bucket}': {reason}")]
    MalformedMessage {
        bucket: String,
        key: String,
        reason: String,
    },

    /// None of the candidate addresses mapped to a local mailbox.
    #[error("None of the {candidates} provided address(es) returned a local account username")]
    RecipientResolution { candidates: usize },

    /// The lookup table could not be queried.
    #[error("Recipient lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// The mail transport refused or failed the transaction.
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Object storage failed for a reason other than a missing object.
    #[error("Storage failure: {0}")]
    Storage(StoreError),

    /// Another task in this process is already delivering this object.
    #[error("Object '{key}' in bucket '{bucket}' is already being delivered")]
    InProgress { bucket: String, key: String },
}

impl DeliveryError {
    /// Returns `true` if retrying can never succeed because the object is gone.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }

    /// Returns `true` if a later attempt may succeed.
    ///
    /// Malformed inputs and permanent LMTP rejections are not retryable: the
    /// same bytes will fail the same way.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ObjectNotFound { .. }
            | Self::MalformedNotification(_)
            | Self::MalformedMessage { .. } => false,
            Self::Transport(e) => e.is_temporary(),
            _ => true,
        }
    }
}

/// Convert from `StoreError`, lifting a missing object to the terminal variant.
impl From<StoreError> for DeliveryError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { bucket, key } => Self::ObjectNotFound { bucket, key },
            other @ StoreError::Backend(_) => Self::Storage(other),
        }
    }
}

/// Errors from an [`ObjectStore`](crate::ObjectStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object '{key}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    #[error("{0}")]
    Backend(String),
}

/// Errors from a [`RecipientLookup`](crate::RecipientLookup).
#[derive(Debug, Error)]
pub enum LookupError {
    /// The lookup program could not be run at all.
    #[error("Unable to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The lookup program ran but reported an error.
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Errors from a [`DeadLetterQueue`](crate::DeadLetterQueue).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Receiving from queue failed: {0}")]
    Receive(String),

    #[error("Deleting message '{id}' failed: {reason}")]
    Delete { id: String, reason: String },
}

/// Errors from a [`MailTransport`](crate::MailTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// 4xx reply, timeout or other condition worth retrying.
    #[error("Temporary failure: {0}")]
    Temporary(String),

    /// 5xx reply to a command that concerns the whole transaction.
    #[error("Permanent failure: {0}")]
    Permanent(String),

    /// Every recipient was refused at RCPT.
    #[error("No recipients accepted: {0}")]
    NoRecipientsAccepted(String),

    /// The session itself broke (connection, protocol).
    #[error("LMTP client error: {0}")]
    Client(#[from] ClientError),
}

impl TransportError {
    /// Returns `true` if this error is temporary and should be retried.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(
            self,
            Self::Temporary(_) | Self::Client(ClientError::Io(_) | ClientError::ConnectionClosed)
        )
    }
}
