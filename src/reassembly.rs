//! Reassembly of messages split over several records
//!
//! Some protocols carry one logical message in several length-delimited records. A
//! [`MessageReassembler`] accumulates the payloads of those records, without their headers, until
//! the buffer holds only complete messages. The caller then parses the buffer as one unit, which
//! may turn out to hold several messages back to back.

use crate::errors::Error;

/// Length of the message at the start of a buffer, header included. `None` while the buffer is
/// too short to tell.
pub type MessageLengthFn = fn(&[u8]) -> Option<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyStatus {
    /// More fragments are needed. `needed` is the number of missing bytes, when known.
    Incomplete { needed: Option<usize> },
    /// The buffer holds complete messages only.
    Complete(Vec<u8>),
}

impl ReassemblyStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ReassemblyStatus::Complete(_))
    }
}

#[derive(Debug, Clone)]
pub struct MessageReassembler {
    length_of: MessageLengthFn,
    buffer: Vec<u8>,
    fragments: usize,
    max_fragments: usize,
}

impl MessageReassembler {
    pub fn new(length_of: MessageLengthFn, max_fragments: usize) -> Self {
        Self {
            length_of,
            buffer: vec![],
            fragments: 0,
            max_fragments,
        }
    }

    /// Appends the payload of one more record.
    pub fn push(&mut self, fragment: &[u8]) -> Result<ReassemblyStatus, Error> {
        if self.fragments >= self.max_fragments {
            return Err(Error::parse(format!(
                "message spread over more than {} records",
                self.max_fragments
            )));
        }
        self.fragments += 1;
        self.buffer.extend_from_slice(fragment);
        Ok(self.status())
    }

    /// Whether the bytes pushed so far form complete messages.
    pub fn status(&self) -> ReassemblyStatus {
        if self.buffer.is_empty() {
            return ReassemblyStatus::Incomplete { needed: None };
        }
        let mut cursor = 0;
        while cursor < self.buffer.len() {
            match (self.length_of)(&self.buffer[cursor..]) {
                Some(0) | None => return ReassemblyStatus::Incomplete { needed: None },
                Some(len) => match cursor.checked_add(len) {
                    Some(end) if end <= self.buffer.len() => cursor = end,
                    Some(end) => {
                        return ReassemblyStatus::Incomplete {
                            needed: Some(end - self.buffer.len()),
                        }
                    }
                    None => return ReassemblyStatus::Incomplete { needed: None },
                },
            }
        }
        ReassemblyStatus::Complete(self.buffer.clone())
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.fragments = 0;
    }
}

/// Pushes `fragments` in order, stopping as soon as the messages are complete.
pub fn reassemble<'a, I>(
    length_of: MessageLengthFn,
    max_fragments: usize,
    fragments: I,
) -> Result<ReassemblyStatus, Error>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut reassembler = MessageReassembler::new(length_of, max_fragments);
    let mut status = reassembler.status();
    for fragment in fragments {
        status = reassembler.push(fragment)?;
        if status.is_complete() {
            break;
        }
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    // One length byte followed by that many bytes.
    fn length_prefixed(bytes: &[u8]) -> Option<usize> {
        bytes.first().map(|len| *len as usize + 1)
    }

    #[test]
    fn completes_across_fragments() {
        let mut r = MessageReassembler::new(length_prefixed, 8);
        assert_eq!(
            r.push(&[4, 1, 2]).unwrap(),
            ReassemblyStatus::Incomplete { needed: Some(2) }
        );
        assert_eq!(
            r.push(&[3, 4]).unwrap(),
            ReassemblyStatus::Complete(vec![4, 1, 2, 3, 4])
        );
        assert_eq!(r.fragments(), 2);
    }

    #[test]
    fn back_to_back_messages() {
        let status = reassemble(length_prefixed, 8, [&[1, 9, 2][..], &[8, 7][..]]).unwrap();
        assert_eq!(status, ReassemblyStatus::Complete(vec![1, 9, 2, 8, 7]));

        let status = reassemble(length_prefixed, 8, [&[1, 9, 2][..]]).unwrap();
        assert_eq!(status, ReassemblyStatus::Incomplete { needed: Some(2) });
    }

    #[test]
    fn fragment_bound() {
        let mut r = MessageReassembler::new(length_prefixed, 2);
        r.push(&[200]).unwrap();
        r.push(&[0]).unwrap();
        assert!(r.push(&[0]).is_err());
        r.reset();
        assert_eq!(r.status(), ReassemblyStatus::Incomplete { needed: None });
        assert!(r.push(&[0]).is_ok());
    }

    #[test]
    fn idempotent() {
        let fragments: [&[u8]; 3] = [&[6, 1], &[2, 3, 4], &[5, 6]];
        let first = reassemble(length_prefixed, 8, fragments).unwrap();
        let second = reassemble(length_prefixed, 8, fragments).unwrap();
        assert_eq!(first, second);
        assert!(first.is_complete());
    }
}
