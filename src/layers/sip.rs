//! SIP messages (RFC 3261)

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::layers::text::{starts_with_token, TextMessage};
use crate::packet::Frame;
use crate::range::ByteRange;

const SIP_VERSION: &str = "SIP/2.0";

const SIP_METHODS: &[&str] = &[
    "INVITE", "ACK", "BYE", "CANCEL", "REGISTER", "OPTIONS", "PRACK", "SUBSCRIBE", "NOTIFY",
    "PUBLISH", "INFO", "REFER", "MESSAGE", "UPDATE",
];

// Compact header forms (RFC 3261, section 7.3.3) and their full names.
const COMPACT_HEADERS: &[(&str, &str)] = &[
    ("i", "Call-ID"),
    ("f", "From"),
    ("t", "To"),
    ("v", "Via"),
    ("m", "Contact"),
    ("c", "Content-Type"),
    ("l", "Content-Length"),
];

fn first_line(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .position(|b| *b == b'\r' || *b == b'\n')
        .unwrap_or(bytes.len());
    &bytes[..end]
}

/// Whether `bytes` starts with a SIP request or status line.
pub fn looks_like_sip(bytes: &[u8]) -> bool {
    let line = first_line(bytes);
    if line.starts_with(b"SIP/2.0 ") {
        return true;
    }
    starts_with_token(line, SIP_METHODS) && line.ends_with(SIP_VERSION.as_bytes())
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SipStartLine {
    Request { method: String, uri: String },
    Response { status_code: u16, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Sip {
    start_line: SipStartLine,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cseq: Option<String>,
    headers: Vec<(String, String)>,
}

impl Sip {
    pub(crate) fn decode(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if !looks_like_sip(bytes) {
            return Err(Error::Unrecognized);
        }

        let mut message = TextMessage::parse(bytes)?;
        for (name, _) in message.headers.iter_mut() {
            if let Some((_, full)) = COMPACT_HEADERS
                .iter()
                .find(|(short, _)| name.eq_ignore_ascii_case(short))
            {
                *name = full.to_string();
            }
        }

        let mut parts = message.start_line.splitn(3, ' ');
        let first = parts.next().unwrap_or_default();
        let second = parts.next().unwrap_or_default();
        let third = parts.next().unwrap_or_default();
        let start_line = if first == SIP_VERSION {
            let status_code = second
                .parse::<u16>()
                .map_err(|_| Error::parse(format!("SIP status code {:?}", second)))?;
            SipStartLine::Response {
                status_code,
                reason: third.to_string(),
            }
        } else {
            SipStartLine::Request {
                method: first.to_string(),
                uri: second.to_string(),
            }
        };

        // Over a stream the message ends after Content-Length bytes of body; a datagram holds
        // exactly one message.
        let (own, body) = message.extent(frame, range, "SIP");

        let sip = Sip {
            start_line,
            call_id: message.header("Call-ID").map(String::from),
            from: message.header("From").map(String::from),
            to: message.header("To").map(String::from),
            cseq: message.header("CSeq").map(String::from),
            headers: message.headers,
        };
        Ok(Decoded::new(sip, own)
            .child(Dispatch::Raw, body)
            .following(Dispatch::Raw, range.after(&own)))
    }

    pub fn start_line(&self) -> &SipStartLine {
        &self.start_line
    }

    pub fn call_id(&self) -> Option<&str> {
        self.call_id.as_deref()
    }
}

impl Layer for Sip {
    fn name(&self) -> &'static str {
        "SIP"
    }

    fn short_name(&self) -> &'static str {
        "sip"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        match self.start_line {
            SipStartLine::Request {
                ref method,
                ref uri,
            } => {
                attrs.add("Method", method);
                attrs.add("Request-URI", uri);
            }
            SipStartLine::Response {
                status_code,
                ref reason,
            } => {
                attrs.add("Status Code", status_code);
                attrs.add("Reason", reason);
            }
        }
        if let Some(ref call_id) = self.call_id {
            attrs.add("Call-ID", call_id);
        }
        if let Some(ref from) = self.from {
            attrs.add("From", from);
        }
        if let Some(ref to) = self.to {
            attrs.add("To", to);
        }
        if let Some(ref cseq) = self.cseq {
            attrs.add("CSeq", cseq);
        }
    }
}
