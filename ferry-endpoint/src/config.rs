//! Endpoint configuration

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Certificate chain and private key, both PEM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default = "default_certificate")]
    pub certificate: PathBuf,

    #[serde(default = "default_key")]
    pub key: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            certificate: default_certificate(),
            key: default_key(),
        }
    }
}

/// Configuration for the notification endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Address to bind
    ///
    /// Common values:
    /// - `0.0.0.0:443` (IPv4 any address, HTTPS port)
    /// - `[::]:8443` (IPv6 any address)
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// `Basic` credentials as `user:password`. Requests are refused until set.
    #[serde(default)]
    pub basic_auth: Option<String>,

    /// TLS material; `None` serves plain HTTP (e.g. behind a terminating proxy)
    #[serde(default = "default_tls")]
    pub tls: Option<TlsConfig>,

    /// Upper bound for the TLS handshake, request headers and request body
    /// (in seconds). Delivery itself is not bounded by this.
    ///
    /// Default: 30 seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_listen_address() -> String {
    "0.0.0.0:443".to_string()
}

fn default_certificate() -> PathBuf {
    PathBuf::from("/srv/cert.pem")
}

fn default_key() -> PathBuf {
    PathBuf::from("/srv/key.pem")
}

#[allow(clippy::unnecessary_wraps)]
fn default_tls() -> Option<TlsConfig> {
    Some(TlsConfig::default())
}

const fn default_read_timeout() -> u64 {
    30
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            basic_auth: None,
            tls: default_tls(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl EndpointConfig {
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
