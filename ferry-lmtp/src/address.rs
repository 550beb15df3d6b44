use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ClientError;

const UNIX_PREFIX: &str = "unix:";

/// Where the LMTP server listens.
///
/// Written as `host:port` for TCP or `unix:/path/to/socket` for a local
/// socket (the usual Dovecot setup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LmtpAddress {
    Tcp(String),
    Unix(PathBuf),
}

impl FromStr for LmtpAddress {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(path) = s.strip_prefix(UNIX_PREFIX) {
            if path.is_empty() {
                return Err(ClientError::InvalidAddress(s.to_string()));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        match s.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Self::Tcp(s.to_string()))
            }
            _ => Err(ClientError::InvalidAddress(s.to_string())),
        }
    }
}

impl TryFrom<String> for LmtpAddress {
    type Error = ClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LmtpAddress> for String {
    fn from(value: LmtpAddress) -> Self {
        value.to_string()
    }
}

impl fmt::Display for LmtpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => f.write_str(addr),
            Self::Unix(path) => write!(f, "{UNIX_PREFIX}{}", path.display()),
        }
    }
}
