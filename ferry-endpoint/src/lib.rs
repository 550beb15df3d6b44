//! Push endpoint for storage notifications
//!
//! Accepts notifications pushed by the topic over HTTP(S), authenticates them
//! with HTTP Basic credentials and hands mail events to a
//! [`NotificationHandler`](ferry_delivery::NotificationHandler).
//!
//! # Responses
//!
//! | Method     | Success | Failure          |
//! |------------|---------|------------------|
//! | `GET/HEAD` | 200     | 401              |
//! | `POST`     | 200     | 400, 401, 500    |
//! | other      |         | 501              |
//!
//! A 500 tells the topic to redeliver, and eventually to dead-letter the
//! notification for the retry worker.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use ferry_common::ShutdownCoordinator;
//! use ferry_endpoint::{Credentials, Endpoint, EndpointConfig, EndpointServer, HttpConfirmer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EndpointConfig {
//!     basic_auth: Some("sns:s3cret".to_string()),
//!     tls: None,
//!     ..EndpointConfig::default()
//! };
//!
//! let endpoint = Endpoint::new(
//!     Credentials::new("sns:s3cret")?,
//!     Arc::new(HttpConfirmer::new(Duration::from_secs(10))?),
//! );
//!
//! let shutdown = ShutdownCoordinator::new();
//! let server = EndpointServer::bind(&config, endpoint).await?;
//! server.serve(shutdown.signal()).await;
//! # Ok(())
//! # }
//! ```

mod auth;
mod config;
mod confirm;
mod envelope;
mod error;
mod server;

pub use auth::Credentials;
pub use config::{EndpointConfig, TlsConfig};
pub use confirm::{HttpConfirmer, SubscriptionConfirmer};
pub use envelope::NotificationEnvelope;
pub use error::EndpointError;
pub use server::{Endpoint, EndpointServer, load_tls};
