//! Byte ranges over a Frame's buffer
//!
//! A [`ByteRange`] is an inclusive `[start, end]` pair of indices into the buffer owned by a
//! [`Frame`][`crate::Frame`]. Layers never copy the bytes they describe, they only carry ranges
//! and borrow the buffer through the Frame when they need to look at the bytes. A range always
//! covers at least one byte.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ByteRange {
    start: usize,
    end: usize,
}

impl ByteRange {
    /// Inclusive range `[start, end]`. `None` if `start > end`.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Range of `len` bytes starting at `start`. `None` for an empty range.
    pub fn from_len(start: usize, len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let end = start.checked_add(len - 1)?;
        Some(Self { start, end })
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    /// Index of the last byte in the range.
    pub const fn end(&self) -> usize {
        self.end
    }

    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// A range is never empty, kept for API symmetry with slices.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &ByteRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// The first `n` bytes of the range, clamped to the range itself.
    pub fn take(&self, n: usize) -> Option<ByteRange> {
        if n == 0 {
            return None;
        }
        let n = n.min(self.len());
        Some(Self {
            start: self.start,
            end: self.start + n - 1,
        })
    }

    /// Whatever remains after skipping the first `n` bytes.
    pub fn skip(&self, n: usize) -> Option<ByteRange> {
        if n >= self.len() {
            return None;
        }
        Some(Self {
            start: self.start + n,
            end: self.end,
        })
    }

    /// `len` bytes at `offset` relative to the start, clamped to the range.
    pub fn sub(&self, offset: usize, len: usize) -> Option<ByteRange> {
        self.skip(offset)?.take(len)
    }

    /// Bytes following `inner` up to the end of `self`.
    pub fn after(&self, inner: &ByteRange) -> Option<ByteRange> {
        if inner.end >= self.end {
            return None;
        }
        ByteRange::new(inner.end + 1, self.end)
    }

    /// Absolute byte index of `offset` relative to the start of this range.
    pub const fn at(&self, offset: usize) -> usize {
        self.start + offset
    }
}
