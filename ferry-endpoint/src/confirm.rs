use std::time::Duration;

use async_trait::async_trait;

use crate::EndpointError;

/// Completes a topic subscription by visiting its confirmation URL.
#[async_trait]
pub trait SubscriptionConfirmer: Send + Sync {
    async fn confirm(&self, url: &str) -> Result<(), EndpointError>;
}

/// [`SubscriptionConfirmer`] issuing a plain `GET` with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpConfirmer {
    client: reqwest::Client,
}

impl HttpConfirmer {
    /// # Errors
    ///
    /// Returns [`EndpointError::Confirmation`] if the HTTP client cannot be
    /// built (no TLS backend).
    pub fn new(timeout: Duration) -> Result<Self, EndpointError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EndpointError::Confirmation(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SubscriptionConfirmer for HttpConfirmer {
    async fn confirm(&self, url: &str) -> Result<(), EndpointError> {
        self.client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(drop)
            .map_err(|e| EndpointError::Confirmation(e.to_string()))
    }
}
