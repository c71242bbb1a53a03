//! HTTP/1.x messages

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::layers::text::{starts_with_token, TextMessage};
use crate::packet::Frame;
use crate::range::ByteRange;

const HTTP_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

/// Whether `bytes` starts like an HTTP/1.x request or response.
pub fn looks_like_http(bytes: &[u8]) -> bool {
    starts_with_token(bytes, HTTP_METHODS) || bytes.starts_with(b"HTTP/1.")
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StartLine {
    Request {
        method: String,
        uri: String,
        version: String,
    },
    Response {
        version: String,
        status_code: u16,
        reason: String,
    },
}

impl StartLine {
    fn parse(line: &str) -> Result<Self, Error> {
        let mut parts = line.splitn(3, ' ');
        let first = parts.next().unwrap_or_default();
        let second = parts.next().unwrap_or_default();
        let third = parts.next().unwrap_or_default();

        if first.starts_with("HTTP/") {
            let status_code = second
                .parse::<u16>()
                .ok()
                .filter(|code| (100..1000).contains(code))
                .ok_or_else(|| Error::parse(format!("HTTP status code {:?}", second)))?;
            Ok(StartLine::Response {
                version: first.to_string(),
                status_code,
                reason: third.to_string(),
            })
        } else if !second.is_empty() && third.starts_with("HTTP/") {
            Ok(StartLine::Request {
                method: first.to_string(),
                uri: second.to_string(),
                version: third.to_string(),
            })
        } else {
            Err(Error::parse(format!("HTTP start line {:?}", line)))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Http {
    start_line: StartLine,
    headers: Vec<(String, String)>,
    body_length: usize,
}

impl Http {
    /// Decodes the header section of an HTTP message; the body is left raw.
    ///
    /// With a `Content-Length` the message ends after its body, and whatever follows (a pipelined
    /// message) is a separate node.
    pub(crate) fn decode(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if !looks_like_http(bytes) {
            return Err(Error::Unrecognized);
        }

        let message = TextMessage::parse(bytes)?;
        let start_line = StartLine::parse(&message.start_line)?;

        let (own, body) = message.extent(frame, range, "HTTP");

        let http = Http {
            start_line,
            body_length: body.map_or(0, |b| b.len()),
            headers: message.headers,
        };
        Ok(Decoded::new(http, own)
            .child(Dispatch::Raw, body)
            .following(Dispatch::Raw, range.after(&own)))
    }

    pub fn start_line(&self) -> &StartLine {
        &self.start_line
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start_line, StartLine::Request { .. })
    }

    /// Value of the first header named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl Layer for Http {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    fn short_name(&self) -> &'static str {
        "http"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        match self.start_line {
            StartLine::Request {
                ref method,
                ref uri,
                ref version,
            } => {
                attrs.add("Method", method);
                attrs.add("URI", uri);
                attrs.add("Version", version);
            }
            StartLine::Response {
                ref version,
                status_code,
                ref reason,
            } => {
                attrs.add("Version", version);
                attrs.add("Status Code", status_code);
                attrs.add("Reason", reason);
            }
        }
        for (name, value) in &self.headers {
            attrs.add("Header", format!("{}: {}", name, value));
        }
        if self.body_length > 0 {
            attrs.add("Body Length", self.body_length);
        }
    }
}
