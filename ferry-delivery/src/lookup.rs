//! Address to local mailbox lookups.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{config::PostmapConfig, error::LookupError};

/// Maps an email address to a local mailbox identifier.
#[async_trait]
pub trait RecipientLookup: Send + Sync {
    /// `Ok(None)` means the address has no mapping; `Err` means the table
    /// could not be consulted at all.
    async fn lookup(&self, address: &str) -> Result<Option<String>, LookupError>;
}

/// Queries a Postfix lookup table with `postmap -q <address> <table>`.
///
/// `postmap` exits 1 with empty output when the key is absent, so only
/// output matters for "no mapping"; a non-zero exit with something on stderr
/// is treated as a failure of the table itself.
#[derive(Debug, Clone)]
pub struct PostmapLookup {
    program: String,
    table: String,
}

impl PostmapLookup {
    #[must_use]
    pub fn new(program: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            table: table.into(),
        }
    }

    /// `None` when no table is configured.
    #[must_use]
    pub fn from_config(config: &PostmapConfig) -> Option<Self> {
        config
            .table
            .as_ref()
            .map(|table| Self::new(config.program.clone(), table.clone()))
    }
}

#[async_trait]
impl RecipientLookup for PostmapLookup {
    #[tracing::instrument(level = "trace", skip(self), fields(table = %self.table))]
    async fn lookup(&self, address: &str) -> Result<Option<String>, LookupError> {
        let output = Command::new(&self.program)
            .arg("-q")
            .arg(address)
            .arg(&self.table)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| LookupError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mapped = stdout.trim_end();
        if !mapped.is_empty() {
            return Ok(Some(mapped.to_string()));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() && !stderr.trim().is_empty() {
            return Err(LookupError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(None)
    }
}

/// A fixed in-memory table that stands in for `postmap` where no Postfix
/// maps are available, such as tests. Matching ignores ASCII case.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    entries: HashMap<String, String>,
}

impl StaticLookup {
    #[must_use]
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into().to_ascii_lowercase(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl RecipientLookup for StaticLookup {
    async fn lookup(&self, address: &str) -> Result<Option<String>, LookupError> {
        Ok(self.entries.get(&address.to_ascii_lowercase()).cloned())
    }
}
