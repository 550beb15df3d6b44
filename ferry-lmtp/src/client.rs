//! Session-level LMTP client over TCP or a Unix socket.

use ferry_common::tracing;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

use super::{
    LmtpAddress, data,
    error::{ClientError, Result},
    response::Response,
};

/// Initial size of the read buffer for replies.
const BUFFER_SIZE: usize = 4096;

/// Upper bound on a single reply, guarding against a misbehaving peer.
const MAX_BUFFER_SIZE: usize = 64 * 1024;

enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

impl Connection {
    async fn open(address: &LmtpAddress) -> Result<Self> {
        match address {
            LmtpAddress::Tcp(addr) => Ok(Self::Tcp(TcpStream::connect(addr.as_str()).await?)),
            #[cfg(unix)]
            LmtpAddress::Unix(path) => Ok(Self::Unix(tokio::net::UnixStream::connect(path).await?)),
            #[cfg(not(unix))]
            LmtpAddress::Unix(_) => Err(ClientError::InvalidAddress(address.to_string())),
        }
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(stream) => stream.write_all(data).await?,
            #[cfg(unix)]
            Self::Unix(stream) => stream.write_all(data).await?,
        }
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = match self {
            Self::Tcp(stream) => stream.read(buf).await?,
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf).await?,
        };
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(n)
    }
}

/// One LMTP session, good for a single transaction.
pub struct LmtpClient {
    connection: Connection,
    buffer: Vec<u8>,
    buffer_pos: usize,
    peer: String,
}

impl LmtpClient {
    /// Opens a connection. The greeting is left unread.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(address: &LmtpAddress) -> Result<Self> {
        let connection = Connection::open(address).await?;

        Ok(Self {
            connection,
            buffer: vec![0u8; BUFFER_SIZE],
            buffer_pos: 0,
            peer: address.to_string(),
        })
    }

    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the greeting is malformed.
    pub async fn read_greeting(&mut self) -> Result<Response> {
        self.read_response().await
    }

    /// Sends a command line and reads the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        tracing::trace!(peer = %self.peer, "C: {command}");
        self.connection
            .send(format!("{command}\r\n").as_bytes())
            .await?;
        self.read_response().await
    }

    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn lhlo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("LHLO {domain}")).await
    }

    /// Sends `MAIL FROM`. An empty `from` produces the null reverse-path `<>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn mail_from(&mut self, from: &str) -> Result<Response> {
        self.command(&format!("MAIL FROM:<{from}>")).await
    }

    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn data(&mut self) -> Result<Response> {
        self.command("DATA").await
    }

    /// Transmits the message body and collects the per-recipient replies.
    ///
    /// `accepted` is the number of recipients the server accepted at `RCPT`;
    /// LMTP answers the end-of-data marker once for each, in `RCPT` order.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails or any reply cannot be read.
    pub async fn send_data(&mut self, raw: &[u8], accepted: usize) -> Result<Vec<Response>> {
        self.connection.send(&data::encode(raw)).await?;

        let mut replies = Vec::with_capacity(accepted);
        for _ in 0..accepted {
            replies.push(self.read_response().await?);
        }
        Ok(replies)
    }

    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn quit(&mut self) -> Result<Response> {
        self.command("QUIT").await
    }

    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) =
                Response::parse_response(&self.buffer[..self.buffer_pos])?
            {
                self.buffer.copy_within(consumed..self.buffer_pos, 0);
                self.buffer_pos -= consumed;

                tracing::trace!(peer = %self.peer, "S: {} {}", response.code, response.message());
                return Ok(response);
            }

            if self.buffer_pos >= self.buffer.len() {
                let new_size = self.buffer.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(ClientError::ParseError(format!(
                        "Response too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                    )));
                }
                self.buffer.resize(new_size, 0);
            }

            let n = self
                .connection
                .read(&mut self.buffer[self.buffer_pos..])
                .await?;
            self.buffer_pos += n;
        }
    }
}
