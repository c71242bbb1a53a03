//! Helpers for line based text protocols (HTTP, SIP)

use serde::Serialize;

use crate::errors::Error;
use crate::packet::Frame;
use crate::range::ByteRange;

/// Header lines kept per message.
pub const MAX_HEADERS: usize = 64;

/// The start line and header fields of a text message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextMessage {
    pub start_line: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    /// Offset of the body from the start of the message, when the header section is complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_offset: Option<usize>,
}

impl TextMessage {
    /// Parses the lines before the blank line ending the header section.
    ///
    /// A message cut short by the end of the segment keeps the headers seen so far.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let mut lines = Lines { bytes, pos: 0 };
        let start_line = match lines.next() {
            Some(Ok(line)) if !line.is_empty() => line.to_string(),
            Some(Err(e)) => return Err(e),
            _ => return Err(Error::parse("empty start line")),
        };

        let mut message = TextMessage {
            start_line,
            ..Default::default()
        };
        while let Some(line) = lines.next() {
            let line = line?;
            if line.is_empty() {
                message.body_offset = Some(lines.pos);
                break;
            }
            if message.headers.len() == MAX_HEADERS {
                continue;
            }
            match line.split_once(':') {
                Some((name, value)) => message
                    .headers
                    .push((name.trim().to_string(), value.trim().to_string())),
                None => return Err(Error::parse(format!("malformed header line: {}", line))),
            }
        }
        Ok(message)
    }

    /// Value of the first header named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length")?.parse().ok()
    }

    /// Splits `range`, holding this message, into the message itself and its body.
    ///
    /// With a `Content-Length` the message ends after that many bytes of body. A body running
    /// past the captured bytes is clamped, with an anomaly on the header section.
    pub(crate) fn extent(
        &self,
        frame: &Frame,
        range: ByteRange,
        protocol: &str,
    ) -> (ByteRange, Option<ByteRange>) {
        let Some(offset) = self.body_offset else {
            return (range, None);
        };
        let own = match self.content_length() {
            Some(len) => match offset.checked_add(len) {
                Some(end) if end <= range.len() => range.take(end).unwrap_or(range),
                _ => {
                    frame.record_anomaly(
                        range.take(offset).unwrap_or(range),
                        format!(
                            "{} Content-Length {} exceeds the {} bytes available",
                            protocol,
                            len,
                            range.len() - offset.min(range.len())
                        ),
                    );
                    range
                }
            },
            None => range,
        };
        (own, own.skip(offset))
    }
}

/// Whether `bytes` starts with one of `tokens` followed by a space.
pub fn starts_with_token(bytes: &[u8], tokens: &[&str]) -> bool {
    tokens.iter().any(|token| {
        bytes.len() > token.len()
            && bytes.starts_with(token.as_bytes())
            && bytes[token.len()] == b' '
    })
}

/// CRLF (or bare LF) terminated lines. A final line without terminator is returned as is.
struct Lines<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = Result<&'a str, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.bytes.get(self.pos..)?;
        if rest.is_empty() {
            return None;
        }
        let (line, consumed) = match rest.iter().position(|b| *b == b'\n') {
            Some(nl) => (&rest[..nl], nl + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some(core::str::from_utf8(line).map_err(|_| Error::parse("non UTF-8 text line")))
    }
}
