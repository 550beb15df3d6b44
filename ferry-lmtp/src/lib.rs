//! A small LMTP (RFC 2033) client.
//!
//! LMTP is SMTP with two differences that matter here: the session opens with
//! `LHLO` instead of `EHLO`, and after the end-of-data marker the server sends
//! one reply *per accepted recipient* rather than a single reply for the whole
//! transaction. [`LmtpClient::send_data`] reads those replies back.
//!
//! ```no_run
//! use ferry_lmtp::{LmtpAddress, LmtpClient};
//!
//! # async fn example() -> Result<(), ferry_lmtp::ClientError> {
//! let address: LmtpAddress = "unix:/run/dovecot/lmtp".parse()?;
//! let mut client = LmtpClient::connect(&address).await?;
//! client.read_greeting().await?;
//! client.lhlo("relay.example.com").await?;
//! client.mail_from("sender@example.com").await?;
//! client.rcpt_to("alice").await?;
//! client.data().await?;
//! let replies = client.send_data(b"Subject: hi\r\n\r\nhello\r\n", 1).await?;
//! assert!(replies.iter().all(ferry_lmtp::Response::is_success));
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod address;
mod client;
mod data;
mod error;
mod response;

pub use address::LmtpAddress;
pub use client::LmtpClient;
pub use error::{ClientError, Result};
pub use response::{Response, ResponseLine};
