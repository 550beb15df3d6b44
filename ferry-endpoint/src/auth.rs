//! HTTP Basic authentication
//!
//! The configured `user:password` pair is kept only as its SHA-256 digest.
//! Incoming credentials are decoded, hashed and compared against it.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

use crate::EndpointError;

/// The single credential pair the endpoint accepts
#[derive(Clone)]
pub struct Credentials {
    digest: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

fn digest(pair: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pair);
    hex::encode(hasher.finalize())
}

impl Credentials {
    /// # Errors
    ///
    /// Returns [`EndpointError::Credentials`] if `pair` is not `user:password`
    /// with a non-empty user.
    pub fn new(pair: &str) -> Result<Self, EndpointError> {
        match pair.split_once(':') {
            Some((user, _)) if !user.is_empty() => Ok(Self {
                digest: digest(pair.as_bytes()),
            }),
            _ => Err(EndpointError::Credentials(
                "expected the form 'user:password'".to_string(),
            )),
        }
    }

    /// Validate the `Authorization` header of a request.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::Authentication`] if the header is missing, is
    /// not `Basic`, does not decode, or carries other credentials.
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), EndpointError> {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("basic"))
            .and_then(|(_, encoded)| STANDARD.decode(encoded.trim()).ok())
            .ok_or(EndpointError::Authentication)?;

        if digest(&presented) == self.digest {
            Ok(())
        } else {
            Err(EndpointError::Authentication)
        }
    }
}
