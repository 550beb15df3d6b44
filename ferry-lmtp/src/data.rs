//! DATA section encoding.

/// Encode a raw message for transmission after `DATA`.
///
/// Line endings are normalised to CRLF, lines beginning with `.` are
/// dot-stuffed, and the end-of-data marker is appended. The message is
/// treated as opaque bytes; nothing else is rewritten.
#[must_use]
pub fn encode(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + raw.len() / 64 + 5);
    let mut at_line_start = true;
    let mut bytes = raw.iter().copied().peekable();

    while let Some(byte) = bytes.next() {
        match byte {
            b'\r' => {
                bytes.next_if_eq(&b'\n');
                out.extend_from_slice(b"\r\n");
                at_line_start = true;
            }
            b'\n' => {
                out.extend_from_slice(b"\r\n");
                at_line_start = true;
            }
            b'.' if at_line_start => {
                out.extend_from_slice(b"..");
                at_line_start = false;
            }
            _ => {
                out.push(byte);
                at_line_start = false;
            }
        }
    }

    if !out.ends_with(b"\r\n") {
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b".\r\n");

    out
}
