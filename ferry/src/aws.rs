//! AWS SDK configuration shared by the S3, SQS and STS clients

use anyhow::{Context, anyhow};
use aws_config::{Region, SdkConfig};
use aws_credential_types::Credentials;
use ferry_common::tracing;
use serde::{Deserialize, Serialize};

const fn default_verify_credentials() -> bool {
    true
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region for every client; the SDK's provider chain decides when unset
    #[serde(default)]
    pub region: Option<String>,

    /// Static `access_key_id:secret_access_key`; the SDK's provider chain
    /// (instance role, profile, ...) is used when unset
    #[serde(default)]
    pub credentials: Option<String>,

    /// Call STS `GetCallerIdentity` once at startup
    #[serde(default = "default_verify_credentials")]
    pub verify_credentials: bool,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: None,
            credentials: None,
            verify_credentials: default_verify_credentials(),
        }
    }
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("credentials", &self.credentials.as_ref().map(|_| "<redacted>"))
            .field("verify_credentials", &self.verify_credentials)
            .finish()
    }
}

/// Split `access_key_id:secret_access_key`.
///
/// # Errors
///
/// Returns an error if either half is missing.
pub fn parse_credentials(pair: &str) -> anyhow::Result<Credentials> {
    match pair.split_once(':') {
        Some((key, secret)) if !key.is_empty() && !secret.is_empty() => {
            Ok(Credentials::new(key, secret, None, None, "ferry"))
        }
        _ => Err(anyhow!(
            "AWS credentials must have the form 'access_key_id:secret_access_key'"
        )),
    }
}

/// Load the SDK configuration, applying the configured region and static
/// credentials over the SDK defaults.
///
/// # Errors
///
/// Returns an error if static credentials are configured but malformed.
pub async fn sdk_config(config: &AwsConfig) -> anyhow::Result<SdkConfig> {
    let mut loader = aws_config::from_env();

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    if let Some(pair) = &config.credentials {
        loader = loader.credentials_provider(parse_credentials(pair)?);
    }

    Ok(loader.load().await)
}

/// Ask STS who we are, proving the credentials work before any delivery.
///
/// # Errors
///
/// Returns an error if the call fails (bad credentials, no network).
pub async fn verify_credentials(sdk: &SdkConfig) -> anyhow::Result<()> {
    let identity = aws_sdk_sts::Client::new(sdk)
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| anyhow!("{}", aws_sdk_sts::error::DisplayErrorContext(e)))
        .context("Unable to verify AWS credentials")?;

    tracing::info!(
        account = identity.account().unwrap_or_default(),
        arn = identity.arn().unwrap_or_default(),
        "AWS credentials verified"
    );
    Ok(())
}
