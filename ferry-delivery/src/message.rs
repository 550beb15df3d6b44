//! The stored email object, as much of it as delivery needs to understand.

use std::borrow::Cow;

use mailparse::{MailAddr, MailHeaderMap, MailParseError};

/// Header fields consulted for recipients when the notification has none.
const RECIPIENT_HEADERS: [&str; 3] = ["To", "Cc", "Bcc"];

/// Raw message bytes plus the few header values delivery relies on.
///
/// The bytes are never rewritten except for dropping `Bcc` on the way out.
#[derive(Debug, Clone)]
pub struct EmailObject {
    raw: Vec<u8>,
    header_end: usize,
    header_recipients: Vec<String>,
    return_path: Option<String>,
}

impl EmailObject {
    /// Parse the header section of `raw`.
    ///
    /// # Errors
    ///
    /// Returns the parser's error if the header section is not well formed.
    pub fn parse(raw: Vec<u8>) -> Result<Self, MailParseError> {
        let (headers, header_end) = mailparse::parse_headers(&raw)?;

        let mut header_recipients = Vec::new();
        for name in RECIPIENT_HEADERS {
            for header in headers.get_all_headers(name) {
                match mailparse::addrparse_header(header) {
                    Ok(list) => {
                        for addr in list.iter() {
                            match addr {
                                MailAddr::Single(info) => {
                                    header_recipients.push(info.addr.clone());
                                }
                                MailAddr::Group(group) => header_recipients
                                    .extend(group.addrs.iter().map(|info| info.addr.clone())),
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(header = name, error = %e, "Ignoring unparsable address header");
                    }
                }
            }
        }

        let return_path = headers
            .get_first_value("Return-Path")
            .map(|value| {
                value
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .trim()
                    .to_string()
            })
            .filter(|path| !path.is_empty());

        Ok(Self {
            raw,
            header_end,
            header_recipients,
            return_path,
        })
    }

    /// Addresses from `To`, `Cc` and `Bcc`, in header order, groups flattened.
    #[must_use]
    pub fn header_recipients(&self) -> &[String] {
        &self.header_recipients
    }

    /// `Return-Path` without angle brackets. `None` when absent or `<>`.
    #[must_use]
    pub fn return_path(&self) -> Option<&str> {
        self.return_path.as_deref()
    }

    /// The message with every `Bcc` field (and its continuation lines)
    /// removed from the header section. Borrowed when there is none.
    #[must_use]
    pub fn without_bcc(&self) -> Cow<'_, [u8]> {
        let (header, body) = self.raw.split_at(self.header_end);

        let mut kept = Vec::with_capacity(self.raw.len());
        let mut skipping = false;
        let mut removed = false;

        for line in header.split_inclusive(|&b| b == b'\n') {
            let continuation = matches!(line.first(), Some(b' ' | b'\t'));
            if !continuation {
                let name = line
                    .iter()
                    .position(|&b| b == b':')
                    .map_or(&line[..0], |colon| &line[..colon]);
                skipping = name.trim_ascii().eq_ignore_ascii_case(b"bcc");
            }

            if skipping {
                removed = true;
            } else {
                kept.extend_from_slice(line);
            }
        }

        if !removed {
            return Cow::Borrowed(&self.raw);
        }

        kept.extend_from_slice(body);
        Cow::Owned(kept)
    }
}
