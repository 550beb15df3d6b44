//! Error types for the ferry-common crate.

use std::io;

use thiserror::Error;

/// Errors that can occur while resolving configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `VAR_FILE` points at a file that could not be read.
    #[error("Error reading file specified in environment variable '{var}': {source}")]
    FileRead {
        var: String,
        #[source]
        source: io::Error,
    },

    /// A value is present but cannot be used.
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    /// Convenience constructor for [`ConfigError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
