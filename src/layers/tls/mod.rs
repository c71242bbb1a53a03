//! TLS records
//!
//! A TCP segment may hold several records, and a handshake message may be split over several
//! records. Records are decoded one at a time, each following the one before it. When the
//! handshake messages of a record are not all complete, the records after it in the same segment
//! are looked at to rebuild them; the messages are then shown under the first record and the
//! records whose content went into them are shown without children.

use std::sync::Arc;

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::reassembly::{MessageReassembler, ReassemblyStatus};

mod handshake;

pub use handshake::{
    handshake_length, parse_handshake_messages, version_name, Certificate, ClientHello,
    Handshake, HandshakeBody, ServerHello,
};

pub const TLS_RECORD_HEADER_LENGTH: usize = 5_usize;

// RFC 8446, section 5.1: 2^14 plus the largest expansion allowed by any version.
const TLS_MAX_RECORD_LENGTH: usize = (1 << 14) + 2048;

pub const CHANGE_CIPHER_SPEC: u8 = 20;
pub const ALERT: u8 = 21;
pub const HANDSHAKE: u8 = 22;
pub const APPLICATION_DATA: u8 = 23;
pub const HEARTBEAT: u8 = 24;

struct RecordHeader {
    content_type: u8,
    version: u16,
    length: usize,
}

fn record_header(bytes: &[u8]) -> Option<RecordHeader> {
    if bytes.len() < TLS_RECORD_HEADER_LENGTH {
        return None;
    }
    let header = RecordHeader {
        content_type: bytes[0],
        version: (bytes[1] as u16) << 8 | bytes[2] as u16,
        length: (bytes[3] as usize) << 8 | bytes[4] as usize,
    };
    let valid = (CHANGE_CIPHER_SPEC..=HEARTBEAT).contains(&header.content_type)
        && bytes[1] == 3
        && bytes[2] <= 4
        && header.length <= TLS_MAX_RECORD_LENGTH;
    valid.then_some(header)
}

/// Whether `bytes` starts with a plausible TLS record header.
pub fn looks_like_record(bytes: &[u8]) -> bool {
    record_header(bytes).is_some()
}

/// Whether `content` is made of whole handshake messages only.
fn whole_messages(content: &[u8]) -> bool {
    let mut pos = 0;
    while pos < content.len() {
        match handshake_length(&content[pos..]) {
            Some(len) if pos + len <= content.len() => pos += len,
            _ => return false,
        }
    }
    true
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Alert {
    level: u8,
    description: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct TlsRecord {
    content_type: u8,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    version: u16,
    length: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    alert: Option<Alert>,
    /// Records after this one whose content completed its handshake messages.
    #[serde(skip_serializing_if = "is_zero")]
    reassembled_records: usize,
    /// Set on a record whose content belongs to a message started in an earlier record.
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    continuation: bool,
    /// Set when the handshake messages continue past the end of the segment.
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    incomplete_handshake: bool,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl TlsRecord {
    /// Decodes the record at the start of `range`.
    ///
    /// `continuation` counts the records, this one included, whose content was already consumed
    /// by the reassembly of an earlier record.
    pub(crate) fn decode(
        frame: &Frame,
        range: ByteRange,
        continuation: usize,
    ) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < TLS_RECORD_HEADER_LENGTH {
            return Err(Error::too_short(TLS_RECORD_HEADER_LENGTH, bytes));
        }
        let header = record_header(bytes).ok_or(Error::Unrecognized)?;

        let available = bytes.len() - TLS_RECORD_HEADER_LENGTH;
        if header.length > available {
            frame.record_anomaly(
                range.sub(3, 2).unwrap_or(range),
                format!(
                    "TLS record length {} exceeds the {} bytes available",
                    header.length, available
                ),
            );
        }
        let own = range
            .take(TLS_RECORD_HEADER_LENGTH + header.length)
            .unwrap_or(range);
        let content = own.skip(TLS_RECORD_HEADER_LENGTH);

        let mut record = TlsRecord {
            content_type: header.content_type,
            version: header.version,
            length: header.length as u16,
            alert: None,
            reassembled_records: 0,
            continuation: continuation > 0,
            incomplete_handshake: false,
        };

        if continuation > 0 {
            return Ok(Decoded::new(record, own).following(
                Dispatch::TlsRecord {
                    continuation: continuation - 1,
                },
                range.after(&own),
            ));
        }

        let mut children = vec![];
        let mut next_continuation = 0;
        match (header.content_type, content) {
            (HANDSHAKE, Some(content)) => {
                let content_bytes = frame.slice(content);
                if whole_messages(content_bytes) {
                    children.push((Dispatch::TlsHandshake, content));
                } else {
                    let rest = range.after(&own).map(|r| frame.slice(r)).unwrap_or(&[]);
                    let (status, consumed) = Self::reassemble_handshake(
                        content_bytes,
                        rest,
                        frame.options().max_reassembly_records,
                    );
                    next_continuation = consumed;
                    record.reassembled_records = consumed;
                    match status {
                        ReassemblyStatus::Complete(buffer) => {
                            match parse_handshake_messages(&buffer) {
                                Ok(messages) => {
                                    let messages: Arc<[Handshake]> = messages.into();
                                    for index in 0..messages.len() {
                                        children.push((
                                            Dispatch::ReassembledHandshake {
                                                messages: Arc::clone(&messages),
                                                index,
                                            },
                                            content,
                                        ));
                                    }
                                }
                                // The records stay decoded; only the messages are lost.
                                Err(e) => {
                                    frame.record_anomaly(
                                        content,
                                        format!(
                                            "TLS handshake reassembled from {} records: {}",
                                            consumed + 1,
                                            e
                                        ),
                                    );
                                    children.push((Dispatch::Raw, content));
                                }
                            }
                        }
                        ReassemblyStatus::Incomplete { needed } => {
                            log::debug!(
                                "TLS handshake incomplete after {} records, {:?} bytes missing",
                                consumed + 1,
                                needed
                            );
                            record.incomplete_handshake = true;
                        }
                    }
                }
            }
            (ALERT, Some(content)) if content.len() == 2 => {
                let b = frame.slice(content);
                record.alert = Some(Alert {
                    level: b[0],
                    description: b[1],
                });
            }
            (_, Some(content)) => children.push((Dispatch::Raw, content)),
            (_, None) => {}
        }

        let mut decoded = Decoded::new(record, own);
        for (dispatch, range) in children {
            decoded = decoded.child(dispatch, Some(range));
        }
        Ok(decoded.following(
            Dispatch::TlsRecord {
                continuation: next_continuation,
            },
            range.after(&own),
        ))
    }

    /// Feeds `first` and then the content of the handshake records at the start of `rest` to a
    /// reassembler, stopping as soon as the messages are complete. Returns the status and the
    /// number of records taken from `rest`.
    fn reassemble_handshake(
        first: &[u8],
        rest: &[u8],
        max_records: usize,
    ) -> (ReassemblyStatus, usize) {
        let mut reassembler = MessageReassembler::new(handshake_length, max_records);
        let mut status = match reassembler.push(first) {
            Ok(status) => status,
            Err(_) => return (reassembler.status(), 0),
        };
        let mut consumed = 0;
        let mut pos = 0;
        while !status.is_complete() {
            let header = match record_header(&rest[pos..]) {
                Some(header) if header.content_type == HANDSHAKE => header,
                _ => break,
            };
            let start = pos + TLS_RECORD_HEADER_LENGTH;
            let end = (start + header.length).min(rest.len());
            status = match reassembler.push(&rest[start..end]) {
                Ok(status) => status,
                Err(e) => {
                    log::debug!("TLS handshake reassembly stopped: {}", e);
                    break;
                }
            };
            consumed += 1;
            pos = end;
        }
        (status, consumed)
    }

    pub fn content_type(&self) -> u8 {
        self.content_type
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    fn content_type_name(&self) -> &'static str {
        match self.content_type {
            CHANGE_CIPHER_SPEC => "Change Cipher Spec",
            ALERT => "Alert",
            HANDSHAKE => "Handshake",
            APPLICATION_DATA => "Application Data",
            HEARTBEAT => "Heartbeat",
            _ => "Unknown",
        }
    }
}

impl Layer for TlsRecord {
    fn name(&self) -> &'static str {
        "TLS Record"
    }

    fn short_name(&self) -> &'static str {
        "tls"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add(
            "Content Type",
            format!("{} ({})", self.content_type_name(), self.content_type),
        );
        attrs.add("Version", version_name(self.version));
        attrs.add("Length", self.length);
        if let Some(alert) = self.alert {
            attrs.add("Alert Level", alert.level);
            attrs.add("Alert Description", alert.description);
        }
        if self.reassembled_records > 0 {
            attrs.add("Reassembled Records", self.reassembled_records);
        }
        if self.continuation {
            attrs.add("Continuation", "content reassembled into an earlier record");
        }
        if self.incomplete_handshake {
            attrs.add("Incomplete Handshake", "message continues past this segment");
        }
    }
}
