//! LMTP reply parsing and representation.

use super::error::{ClientError, Result};

/// A single line of a server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    pub code: u16,
    /// `false` for `NNN-` continuation lines.
    pub is_last: bool,
    pub message: String,
}

/// A complete, possibly multi-line, server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Response {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// The reply text with lines joined by newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// `354`, the go-ahead after `DATA`.
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        self.code >= 300 && self.code < 400
    }

    #[must_use]
    pub const fn is_temporary_error(&self) -> bool {
        self.code >= 400 && self.code < 500
    }

    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.code >= 500 && self.code < 600
    }

    /// Parses a single reply line (without its line terminator).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` if the line doesn't start with a
    /// three digit code followed by a space, a dash or nothing.
    pub fn parse_line(line: &str) -> Result<ResponseLine> {
        let code_str = line
            .get(..3)
            .ok_or_else(|| ClientError::ParseError(format!("Response line too short: '{line}'")))?;

        let code = code_str
            .parse::<u16>()
            .map_err(|_| ClientError::ParseError(format!("Invalid status code: '{code_str}'")))?;

        let rest = &line[3..];
        let (is_last, message) = match rest.chars().next() {
            None => (true, ""),
            Some(' ') => (true, &rest[1..]),
            Some('-') => (false, &rest[1..]),
            Some(c) => {
                return Err(ClientError::ParseError(format!(
                    "Invalid separator character: '{c}'"
                )));
            }
        };

        Ok(ResponseLine {
            code,
            is_last,
            message: message.to_string(),
        })
    }

    /// Parses one complete reply from the front of `buffer`.
    ///
    /// Returns the reply and the number of bytes it occupied, or `None` if
    /// the buffer does not yet hold a complete reply. Both CRLF and bare LF
    /// terminators are accepted.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` if the reply is malformed, including
    /// a multi-line reply whose lines disagree on the status code.
    pub fn parse_response(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let mut consumed = 0;
        let mut lines = Vec::new();
        let mut first_code = None;

        while let Some(end) = buffer[consumed..].iter().position(|&b| b == b'\n') {
            let raw = &buffer[consumed..consumed + end];
            consumed += end + 1;

            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }

            let line = Self::parse_line(std::str::from_utf8(raw)?)?;

            match first_code {
                Some(code) if code != line.code => {
                    return Err(ClientError::ParseError(format!(
                        "Status code mismatch in multi-line response: expected {code}, got {}",
                        line.code
                    )));
                }
                Some(_) => {}
                None => first_code = Some(line.code),
            }

            lines.push(line.message);

            if line.is_last {
                return Ok(Some((Self::new(line.code, lines), consumed)));
            }
        }

        Ok(None)
    }
}
