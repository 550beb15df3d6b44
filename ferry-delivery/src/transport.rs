//! LMTP transaction execution
//!
//! One [`MailTransport::deliver`] call is one session: connect, `LHLO`,
//! `MAIL FROM`, a `RCPT TO` per mailbox, `DATA`, then the per-recipient
//! replies LMTP sends after the message.
//!
//! Reply handling:
//! - any 4xx fails the whole transaction as temporary, so it is retried
//! - a 5xx for a single recipient is logged and that recipient dropped
//! - the delivery fails if no recipient ends up with the message

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use ferry_common::outgoing;
use ferry_lmtp::{LmtpAddress, LmtpClient, Response};

use crate::{
    config::{DeliveryConfig, LmtpTimeouts},
    error::TransportError,
    resolver::ResolvedRecipientSet,
};

/// Submits one message to the mail store.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver `message` from `sender` (empty for the null reverse-path) to
    /// every mailbox in `recipients`.
    async fn deliver(
        &self,
        sender: &str,
        recipients: &ResolvedRecipientSet,
        message: &[u8],
    ) -> Result<(), TransportError>;
}

/// [`MailTransport`] speaking LMTP to a TCP or Unix socket endpoint.
#[derive(Debug, Clone)]
pub struct LmtpTransport {
    address: LmtpAddress,
    lhlo_domain: String,
    timeouts: LmtpTimeouts,
}

fn rejection(step: &str, response: &Response) -> TransportError {
    let detail = format!("{step} rejected: {} {}", response.code, response.message());
    if response.is_temporary_error() {
        TransportError::Temporary(detail)
    } else if response.is_permanent_error() {
        TransportError::Permanent(detail)
    } else {
        TransportError::Client(ferry_lmtp::ClientError::UnexpectedResponse {
            code: response.code,
            message: response.message(),
        })
    }
}

async fn bounded<T>(
    step: &str,
    secs: u64,
    fut: impl Future<Output = ferry_lmtp::Result<T>>,
) -> Result<T, TransportError> {
    tokio::time::timeout(Duration::from_secs(secs), fut)
        .await
        .map_err(|_| TransportError::Temporary(format!("{step} timed out after {secs}s")))?
        .map_err(TransportError::from)
}

impl LmtpTransport {
    #[must_use]
    pub fn new(address: LmtpAddress, lhlo_domain: impl Into<String>, timeouts: LmtpTimeouts) -> Self {
        Self {
            address,
            lhlo_domain: lhlo_domain.into(),
            timeouts,
        }
    }

    /// `None` when no LMTP address is configured.
    #[must_use]
    pub fn from_config(config: &DeliveryConfig) -> Option<Self> {
        config.lmtp_address.clone().map(|address| {
            Self::new(address, config.lhlo_domain.clone(), config.timeouts.clone())
        })
    }

    async fn open(&self) -> Result<LmtpClient, TransportError> {
        let t = &self.timeouts;

        let mut client = bounded("connect", t.connect_secs, LmtpClient::connect(&self.address))
            .await
            .map_err(|e| match e {
                TransportError::Client(inner) => TransportError::Temporary(format!(
                    "Failed to connect to {}: {inner}",
                    self.address
                )),
                other => other,
            })?;

        let greeting = bounded("greeting", t.connect_secs, client.read_greeting()).await?;
        if !greeting.is_success() {
            return Err(rejection("Connection", &greeting));
        }

        let lhlo = bounded("LHLO", t.lhlo_secs, client.lhlo(&self.lhlo_domain)).await?;
        if !lhlo.is_success() {
            return Err(rejection("LHLO", &lhlo));
        }

        Ok(client)
    }
}

#[async_trait]
impl MailTransport for LmtpTransport {
    #[tracing::instrument(
        level = "debug",
        skip(self, recipients, message),
        fields(server = %self.address, recipients = recipients.len(), size = message.len())
    )]
    async fn deliver(
        &self,
        sender: &str,
        recipients: &ResolvedRecipientSet,
        message: &[u8],
    ) -> Result<(), TransportError> {
        let t = &self.timeouts;
        let mut client = self.open().await?;

        let mail_from = bounded("MAIL FROM", t.mail_from_secs, client.mail_from(sender)).await?;
        if !mail_from.is_success() {
            return Err(rejection("MAIL FROM", &mail_from));
        }

        let mut accepted = Vec::with_capacity(recipients.len());
        let mut refused = Vec::new();
        for recipient in recipients {
            let reply = bounded("RCPT TO", t.rcpt_to_secs, client.rcpt_to(recipient)).await?;
            if reply.is_success() {
                accepted.push(recipient.as_str());
            } else if reply.is_permanent_error() {
                tracing::warn!(%recipient, code = reply.code, reply = %reply.message(), "Recipient refused");
                refused.push(format!("{recipient}: {} {}", reply.code, reply.message()));
            } else {
                return Err(rejection(&format!("RCPT TO:<{recipient}>"), &reply));
            }
        }

        if accepted.is_empty() {
            return Err(TransportError::NoRecipientsAccepted(refused.join("; ")));
        }

        let data = bounded("DATA", t.data_secs, client.data()).await?;
        if !data.is_intermediate() {
            return Err(rejection("DATA", &data));
        }

        let replies = bounded(
            "message transmission",
            t.data_secs,
            client.send_data(message, accepted.len()),
        )
        .await?;

        let mut delivered = 0usize;
        let mut deferred = Vec::new();
        for (recipient, reply) in accepted.iter().zip(&replies) {
            if reply.is_success() {
                delivered += 1;
                outgoing!(level = DEBUG, %recipient, "Delivered");
            } else if reply.is_temporary_error() {
                deferred.push(format!("{recipient}: {} {}", reply.code, reply.message()));
            } else {
                tracing::warn!(%recipient, code = reply.code, reply = %reply.message(), "Delivery refused");
                refused.push(format!("{recipient}: {} {}", reply.code, reply.message()));
            }
        }

        // The transaction is settled by now; QUIT trouble only gets logged.
        match bounded("QUIT", t.quit_secs, client.quit()).await {
            Ok(reply) if !reply.is_success() => {
                tracing::warn!(server = %self.address, code = reply.code, reply = %reply.message(), "QUIT refused");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(server = %self.address, error = %e, "QUIT failed after delivery"),
        }

        if !deferred.is_empty() {
            return Err(TransportError::Temporary(format!(
                "Delivery deferred for {}",
                deferred.join("; ")
            )));
        }

        if delivered == 0 {
            return Err(TransportError::Permanent(format!(
                "Message refused for every recipient: {}",
                refused.join("; ")
            )));
        }

        Ok(())
    }
}
