//! Configuration for the delivery pipeline and the dead-letter retry worker

use std::time::Duration;

use ferry_lmtp::LmtpAddress;
use serde::{Deserialize, Serialize};

use crate::queue::ReceiveOptions;

const fn default_connect_timeout() -> u64 {
    30
}

const fn default_lhlo_timeout() -> u64 {
    30
}

const fn default_mail_from_timeout() -> u64 {
    30
}

const fn default_rcpt_to_timeout() -> u64 {
    30
}

const fn default_data_timeout() -> u64 {
    120
}

const fn default_quit_timeout() -> u64 {
    10
}

/// LMTP operation timeout configuration
///
/// Each step of a session is bounded separately so a stuck mailbox server
/// turns into a retryable failure instead of a hung delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LmtpTimeouts {
    #[serde(default = "default_connect_timeout")]
    pub connect_secs: u64,

    #[serde(default = "default_lhlo_timeout")]
    pub lhlo_secs: u64,

    #[serde(default = "default_mail_from_timeout")]
    pub mail_from_secs: u64,

    #[serde(default = "default_rcpt_to_timeout")]
    pub rcpt_to_secs: u64,

    /// Covers transmitting the message and collecting every per-recipient
    /// reply, so it is longer than the others.
    ///
    /// Default: 120 seconds
    #[serde(default = "default_data_timeout")]
    pub data_secs: u64,

    #[serde(default = "default_quit_timeout")]
    pub quit_secs: u64,
}

impl Default for LmtpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_timeout(),
            lhlo_secs: default_lhlo_timeout(),
            mail_from_secs: default_mail_from_timeout(),
            rcpt_to_secs: default_rcpt_to_timeout(),
            data_secs: default_data_timeout(),
            quit_secs: default_quit_timeout(),
        }
    }
}

fn default_lhlo_domain() -> String {
    "localhost".to_string()
}

fn default_postmap_program() -> String {
    "postmap".to_string()
}

/// `postmap -q` lookup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostmapConfig {
    /// Program to run; resolved through `PATH` unless absolute
    #[serde(default = "default_postmap_program")]
    pub program: String,

    /// Lookup table argument, e.g. `hash:/etc/postfix/virtual`
    #[serde(default)]
    pub table: Option<String>,
}

impl Default for PostmapConfig {
    fn default() -> Self {
        Self {
            program: default_postmap_program(),
            table: None,
        }
    }
}

/// Settings for the shared mail delivery pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Where to deliver; `host:port` or `unix:/path`
    #[serde(default)]
    pub lmtp_address: Option<LmtpAddress>,

    /// Name announced in `LHLO`
    #[serde(default = "default_lhlo_domain")]
    pub lhlo_domain: String,

    #[serde(default)]
    pub lookup: PostmapConfig,

    #[serde(default)]
    pub timeouts: LmtpTimeouts,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            lmtp_address: None,
            lhlo_domain: default_lhlo_domain(),
            lookup: PostmapConfig::default(),
            timeouts: LmtpTimeouts::default(),
        }
    }
}

const fn default_check_interval() -> u64 {
    21_600 // 6 hours
}

const fn default_wait_time() -> u32 {
    10
}

const fn default_visibility_timeout() -> u32 {
    3_600
}

const fn default_max_messages() -> u32 {
    10
}

/// Settings for the dead-letter queue retry worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Queue to drain; the worker is not started without one
    #[serde(default)]
    pub queue_url: Option<String>,

    /// Pause between drain passes (in seconds)
    ///
    /// Default: 21600 seconds (6 hours)
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Long-poll duration of each receive (in seconds, at most 20)
    #[serde(default = "default_wait_time")]
    pub wait_time_secs: u32,

    /// How long a received message stays hidden from other consumers
    /// (in seconds). Must exceed the worst-case delivery time.
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_secs: u32,

    /// Batch size per receive (1 to 10)
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            queue_url: None,
            check_interval_secs: default_check_interval(),
            wait_time_secs: default_wait_time(),
            visibility_timeout_secs: default_visibility_timeout(),
            max_messages: default_max_messages(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    #[must_use]
    pub fn receive_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            wait_time: Duration::from_secs(u64::from(self.wait_time_secs.min(20))),
            visibility_timeout: Duration::from_secs(u64::from(self.visibility_timeout_secs)),
            max_messages: self.max_messages.clamp(1, 10),
        }
    }
}
