//! Endpoint error types

use axum::http::StatusCode;
use ferry_delivery::DeliveryError;
use thiserror::Error;

/// Errors raised while starting the endpoint or answering a request
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Missing or wrong `Authorization` header
    #[error("Authentication failed")]
    Authentication,

    /// The body is not a notification envelope
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Unknown notification type '{0}'")]
    UnknownNotificationType(String),

    /// A notification arrived but no delivery pipeline is configured
    #[error("No notification handler configured")]
    NoHandler,

    /// The subscription URL could not be fetched
    #[error("Subscription confirmation failed: {0}")]
    Confirmation(String),

    /// The delivery pipeline failed; the notification should be redelivered
    #[error(transparent)]
    Handler(#[from] DeliveryError),

    /// The delivery task panicked or was aborted
    #[error("Notification handler did not complete: {0}")]
    Interrupted(String),

    /// Configured credentials are not in `user:password` form
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    /// Failed to load the certificate or key
    #[error("Failed to load TLS material from {path}: {reason}")]
    Tls { path: String, reason: String },

    /// Failed to bind to the specified address
    #[error("Failed to bind endpoint to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

impl EndpointError {
    /// The HTTP status a request failing with this error is answered with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Malformed(_)
            | Self::UnknownNotificationType(_)
            | Self::NoHandler
            | Self::Confirmation(_) => StatusCode::BAD_REQUEST,
            Self::Handler(_)
            | Self::Interrupted(_)
            | Self::Credentials(_)
            | Self::Tls { .. }
            | Self::Bind { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio_rustls::rustls::Error> for EndpointError {
    fn from(err: tokio_rustls::rustls::Error) -> Self {
        Self::Tls {
            path: "certificate/key pair".to_string(),
            reason: err.to_string(),
        }
    }
}
