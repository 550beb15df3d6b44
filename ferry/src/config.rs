//! Configuration loading
//!
//! A RON file supplies the base configuration and environment variables
//! override individual settings. Each variable may instead name a file with
//! a `_FILE` suffix, for secrets mounted into containers.

use std::path::{Path, PathBuf};

use anyhow::Context;
use ferry_common::{ConfigError, env};
use ferry_delivery::{DeliveryConfig, RetryConfig};
use ferry_endpoint::EndpointConfig;
use ferry_lmtp::LmtpAddress;
use serde::Deserialize;

use crate::aws::AwsConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FerryConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub aws: AwsConfig,
}

/// Find the configuration file using the following precedence:
/// 1. `FERRY_CONFIG` environment variable
/// 2. ./ferry.config.ron (current working directory)
/// 3. /etc/ferry/ferry.config.ron (system-wide config)
///
/// No file at all is fine: the environment alone can configure ferry.
///
/// # Errors
///
/// Returns an error if `FERRY_CONFIG` names a file that does not exist.
pub fn find_config_file() -> anyhow::Result<Option<PathBuf>> {
    if let Ok(env_path) = std::env::var("FERRY_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!(
            "FERRY_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    Ok([
        PathBuf::from("./ferry.config.ron"),
        PathBuf::from("/etc/ferry/ferry.config.ron"),
    ]
    .into_iter()
    .find(|path| path.exists()))
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Result<Option<String>, ConfigError>,
    var: &str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)?
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| ConfigError::invalid(var, format!("'{raw}': {e}")))
        })
        .transpose()
}

impl FerryConfig {
    /// # Errors
    ///
    /// Returns an error if `source` is not a valid configuration.
    pub fn from_ron(source: &str) -> anyhow::Result<Self> {
        ron::from_str(source).context("Invalid configuration")
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_ron(&source).with_context(|| format!("In {}", path.display()))
    }

    /// The configuration file, if any, overlaid with the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or invalid, or an
    /// environment value does not parse.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match find_config_file()? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.overlay(env::get)?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value cannot be read or parsed.
    pub fn overlay(
        &mut self,
        lookup: impl Fn(&str) -> Result<Option<String>, ConfigError>,
    ) -> Result<(), ConfigError> {
        if let Some(credentials) = lookup("BASIC_AUTH_CREDENTIALS")? {
            self.endpoint.basic_auth = Some(credentials);
        }
        if let Some(address) = lookup("LISTEN_ADDRESS")? {
            self.endpoint.listen_address = address;
        }

        if let Some(credentials) = lookup("AWS_CREDENTIALS")? {
            self.aws.credentials = Some(credentials);
        }
        if let Some(region) = lookup("AWS_REGION")? {
            self.aws.region = Some(region);
        }

        if let Some(address) = parsed::<LmtpAddress>(&lookup, "LMTP_ADDRESS")? {
            self.delivery.lmtp_address = Some(address);
        }
        if let Some(table) = lookup("POSTFIX_LOOKUP_TABLE")? {
            self.delivery.lookup.table = Some(table);
        }

        if let Some(url) = lookup("DEAD_LETTER_QUEUE_URL")? {
            self.retry.queue_url = Some(url);
        }
        if let Some(interval) = parsed(&lookup, "DEAD_LETTER_QUEUE_CHECK_INTERVAL")? {
            self.retry.check_interval_secs = interval;
        }

        Ok(())
    }
}
