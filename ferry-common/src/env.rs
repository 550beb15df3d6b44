//! Environment variable lookup with `_FILE` indirection.
//!
//! Secrets are commonly mounted as files (Docker/Kubernetes secrets), so every
//! lookup of `VAR` falls back to reading the file named by `VAR_FILE`.

use crate::ConfigError;

/// Look up `var`, falling back to the contents of the file named by `var_FILE`.
///
/// Trailing whitespace is stripped from file contents. Returns `Ok(None)` if
/// neither variable is set.
///
/// # Errors
///
/// Returns [`ConfigError::FileRead`] if `var_FILE` is set but unreadable.
pub fn get(var: &str) -> Result<Option<String>, ConfigError> {
    if let Ok(value) = std::env::var(var) {
        return Ok(Some(value));
    }

    let file_var = format!("{var}_FILE");
    let Ok(path) = std::env::var(&file_var) else {
        return Ok(None);
    };

    std::fs::read_to_string(&path)
        .map(|contents| Some(contents.trim_end().to_string()))
        .map_err(|source| ConfigError::FileRead {
            var: file_var,
            source,
        })
}
