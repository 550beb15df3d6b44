//! Mock LMTP server for testing delivery scenarios
//!
//! This module provides a configurable mock LMTP server that can:
#![allow(dead_code)] // Test utility module - not all methods used in every test
//! - Answer each recipient's RCPT and end-of-data replies individually
//! - Listen on TCP or a Unix socket
//! - Drop the connection after N commands
//! - Track received commands for verification
//!
//! # Example
//!
//! ```rust,no_run
//! use support::mock_server::MockLmtpServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MockLmtpServer::builder()
//!     .with_rcpt_to_response_for("ghost", 550, "5.1.1 User unknown")
//!     .with_delivery_response_for("bob", 452, "4.2.2 Mailbox full")
//!     .build()
//!     .await?;
//!
//! // Server is now running on server.addr()
//!
//! server.shutdown();
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    fmt::Write,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpListener,
    sync::RwLock,
    time::timeout,
};

/// LMTP command received by the mock server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LmtpCommand {
    Lhlo(String),
    /// Reverse-path without angle brackets
    MailFrom(String),
    /// Forward-path without angle brackets
    RcptTo(String),
    Data,
    /// Message content as received, still dot-stuffed, without the final `.`
    MessageContent(Vec<u8>),
    Rset,
    Quit,
    Other(String),
}

/// Response configuration for LMTP commands
#[derive(Debug, Clone)]
pub struct LmtpResponse {
    pub code: u16,
    pub message: String,
}

impl LmtpResponse {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\r\n", self.code, self.message).into_bytes()
    }

    const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }
}

#[derive(Clone)]
struct MockServerConfig {
    greeting: LmtpResponse,
    lhlo_capabilities: Vec<String>,
    mail_from_response: LmtpResponse,
    rcpt_to_response: LmtpResponse,
    rcpt_to_overrides: HashMap<String, LmtpResponse>,
    data_response: LmtpResponse,
    delivery_response: LmtpResponse,
    delivery_overrides: HashMap<String, LmtpResponse>,
    quit_response: LmtpResponse,

    // Failure injection
    drop_after_commands: Option<usize>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            greeting: LmtpResponse::new(220, "mock.lmtp LMTP ready"),
            lhlo_capabilities: vec![
                "mock.lmtp".to_string(),
                "8BITMIME".to_string(),
                "ENHANCEDSTATUSCODES".to_string(),
            ],
            mail_from_response: LmtpResponse::new(250, "2.1.0 OK"),
            rcpt_to_response: LmtpResponse::new(250, "2.1.5 OK"),
            rcpt_to_overrides: HashMap::new(),
            data_response: LmtpResponse::new(354, "OK"),
            delivery_response: LmtpResponse::new(250, "2.0.0 Saved"),
            delivery_overrides: HashMap::new(),
            quit_response: LmtpResponse::new(221, "2.0.0 Bye"),
            drop_after_commands: None,
        }
    }
}

impl MockServerConfig {
    fn lhlo_bytes(&self) -> Vec<u8> {
        let mut response = String::new();
        let last = self.lhlo_capabilities.len().saturating_sub(1);

        for (i, cap) in self.lhlo_capabilities.iter().enumerate() {
            let separator = if i == last { ' ' } else { '-' };
            let _ = write!(&mut response, "250{separator}{cap}\r\n");
        }

        response.into_bytes()
    }
}

fn strip_path(argument: &str) -> String {
    let path = argument
        .split_once(':')
        .map_or(argument, |(_, path)| path)
        .trim();
    path.trim_start_matches('<')
        .split('>')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Mock LMTP server for testing
pub struct MockLmtpServer {
    addr: String,
    commands_received: Arc<RwLock<Vec<LmtpCommand>>>,
    connections: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
}

impl MockLmtpServer {
    /// Create a new builder for configuring the mock server
    #[must_use]
    pub fn builder() -> MockLmtpServerBuilder {
        MockLmtpServerBuilder::new()
    }

    /// `host:port` for TCP servers, `unix:/path` for socket servers
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Get all commands received by the server, across connections
    pub async fn commands(&self) -> Vec<LmtpCommand> {
        self.commands_received.read().await.clone()
    }

    /// The message bodies received, in order
    pub async fn messages(&self) -> Vec<Vec<u8>> {
        self.commands()
            .await
            .into_iter()
            .filter_map(|command| match command {
                LmtpCommand::MessageContent(content) => Some(content),
                _ => None,
            })
            .collect()
    }

    /// Number of connections accepted so far
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn handle_client<S>(
        stream: S,
        config: Arc<MockServerConfig>,
        commands: Arc<RwLock<Vec<LmtpCommand>>>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut command_count = 0;
        let mut accepted: Vec<String> = Vec::new();

        writer.write_all(&config.greeting.to_bytes()).await?;
        writer.flush().await?;

        loop {
            line.clear();

            if let Some(drop_after) = config.drop_after_commands
                && command_count >= drop_after
            {
                return Ok(());
            }

            let Ok(read) = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await
            else {
                return Ok(());
            };
            if read? == 0 {
                return Ok(());
            }

            command_count += 1;

            let cmd_line = line.trim_end();
            tracing::debug!("Mock server received: {}", cmd_line);

            let (verb, argument) = cmd_line.split_once(' ').unwrap_or((cmd_line, ""));

            let (response, command) = match verb.to_uppercase().as_str() {
                "LHLO" => (config.lhlo_bytes(), LmtpCommand::Lhlo(argument.to_string())),
                "MAIL" => {
                    accepted.clear();
                    (
                        config.mail_from_response.to_bytes(),
                        LmtpCommand::MailFrom(strip_path(argument)),
                    )
                }
                "RCPT" => {
                    let recipient = strip_path(argument);
                    let response = config
                        .rcpt_to_overrides
                        .get(&recipient)
                        .unwrap_or(&config.rcpt_to_response);
                    if response.is_success() {
                        accepted.push(recipient.clone());
                    }
                    (response.to_bytes(), LmtpCommand::RcptTo(recipient))
                }
                "DATA" => (config.data_response.to_bytes(), LmtpCommand::Data),
                "RSET" => {
                    accepted.clear();
                    (
                        LmtpResponse::new(250, "2.0.0 OK").to_bytes(),
                        LmtpCommand::Rset,
                    )
                }
                "QUIT" => {
                    commands.write().await.push(LmtpCommand::Quit);
                    writer.write_all(&config.quit_response.to_bytes()).await?;
                    writer.flush().await?;
                    return Ok(());
                }
                _ => (
                    LmtpResponse::new(500, "5.5.1 Unknown command").to_bytes(),
                    LmtpCommand::Other(cmd_line.to_string()),
                ),
            };

            commands.write().await.push(command.clone());
            writer.write_all(&response).await?;
            writer.flush().await?;

            if matches!(command, LmtpCommand::Data) && config.data_response.code == 354 {
                let mut content = Vec::new();
                let mut data_line = Vec::new();

                loop {
                    data_line.clear();
                    if reader.read_until(b'\n', &mut data_line).await? == 0 {
                        return Ok(());
                    }
                    if data_line == b".\r\n" {
                        break;
                    }
                    content.extend_from_slice(&data_line);
                }

                commands
                    .write()
                    .await
                    .push(LmtpCommand::MessageContent(content));

                // One reply per accepted recipient, in RCPT order
                for recipient in accepted.drain(..) {
                    let response = config
                        .delivery_overrides
                        .get(&recipient)
                        .unwrap_or(&config.delivery_response);
                    writer.write_all(&response.to_bytes()).await?;
                }
                writer.flush().await?;
            }
        }
    }
}

/// Builder for configuring a `MockLmtpServer`
pub struct MockLmtpServerBuilder {
    config: MockServerConfig,
}

impl MockLmtpServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_greeting(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.greeting = LmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_mail_from_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.mail_from_response = LmtpResponse::new(code, message);
        self
    }

    /// Default RCPT reply for recipients without an override
    #[must_use]
    pub fn with_rcpt_to_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.rcpt_to_response = LmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_rcpt_to_response_for(
        mut self,
        recipient: impl Into<String>,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        self.config
            .rcpt_to_overrides
            .insert(recipient.into(), LmtpResponse::new(code, message));
        self
    }

    #[must_use]
    pub fn with_data_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_response = LmtpResponse::new(code, message);
        self
    }

    /// Default end-of-data reply for recipients without an override
    #[must_use]
    pub fn with_delivery_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.delivery_response = LmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_delivery_response_for(
        mut self,
        recipient: impl Into<String>,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        self.config
            .delivery_overrides
            .insert(recipient.into(), LmtpResponse::new(code, message));
        self
    }

    #[must_use]
    pub fn with_quit_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.quit_response = LmtpResponse::new(code, message);
        self
    }

    /// Drop the connection after N commands
    #[must_use]
    pub const fn with_network_error_after_commands(mut self, count: usize) -> Self {
        self.config.drop_after_commands = Some(count);
        self
    }

    /// Build and start the mock server on a random TCP port
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port
    pub async fn build(self) -> Result<MockLmtpServer, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        let server = self.new_server(addr);

        let config = Arc::new(self.config);
        let commands = Arc::clone(&server.commands_received);
        let connections = Arc::clone(&server.connections);
        let shutdown = Arc::clone(&server.shutdown);

        tokio::spawn(async move {
            while !shutdown.load(Ordering::Relaxed) {
                // Accept with timeout to allow checking the shutdown flag
                if let Ok(Ok((stream, _peer))) =
                    timeout(Duration::from_millis(100), listener.accept()).await
                {
                    connections.fetch_add(1, Ordering::Relaxed);
                    Self::spawn_client(stream, &config, &commands);
                }
            }
        });

        Ok(server)
    }

    /// Build and start the mock server on a Unix socket at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound
    #[cfg(unix)]
    pub async fn build_unix(self, path: &Path) -> Result<MockLmtpServer, std::io::Error> {
        let listener = tokio::net::UnixListener::bind(path)?;
        let server = self.new_server(format!("unix:{}", path.display()));

        let config = Arc::new(self.config);
        let commands = Arc::clone(&server.commands_received);
        let connections = Arc::clone(&server.connections);
        let shutdown = Arc::clone(&server.shutdown);

        tokio::spawn(async move {
            while !shutdown.load(Ordering::Relaxed) {
                if let Ok(Ok((stream, _peer))) =
                    timeout(Duration::from_millis(100), listener.accept()).await
                {
                    connections.fetch_add(1, Ordering::Relaxed);
                    Self::spawn_client(stream, &config, &commands);
                }
            }
        });

        Ok(server)
    }

    fn new_server(&self, addr: String) -> MockLmtpServer {
        MockLmtpServer {
            addr,
            commands_received: Arc::new(RwLock::new(Vec::new())),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    fn spawn_client<S>(
        stream: S,
        config: &Arc<MockServerConfig>,
        commands: &Arc<RwLock<Vec<LmtpCommand>>>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let config = Arc::clone(config);
        let commands = Arc::clone(commands);

        tokio::spawn(async move {
            if let Err(e) = MockLmtpServer::handle_client(stream, config, commands).await {
                tracing::debug!("Mock server client error: {}", e);
            }
        });
    }
}
