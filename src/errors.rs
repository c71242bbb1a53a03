//! Error types
//!
//! Every decoder returns a `Result<_, Error>`. None of these errors ever escapes the dispatch
//! boundary: [`Error::Unrecognized`] becomes a silent `Raw` fallback, the other variants become a
//! `Raw` fallback plus an [`Anomaly`][`crate::anomaly::Anomaly`].

use core::fmt;

/// Hex bytes kept in a [`Error::TooShort`] for diagnostics.
const MAX_ERROR_DATA_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Declared or fixed length exceeds the bytes available.
    TooShort {
        required: usize,
        available: usize,
        data: String,
    },
    /// Bytes are available but do not match the expected structure.
    ParseError(String),
    /// The bytes are not this protocol at all.
    Unrecognized,
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TruncatedData,
    StructuralMismatch,
    UnknownProtocol,
}

impl Error {
    /// Builds a [`Error::TooShort`] carrying (a prefix of) the offending bytes.
    pub fn too_short(required: usize, bytes: &[u8]) -> Self {
        let shown = &bytes[..bytes.len().min(MAX_ERROR_DATA_BYTES)];
        Error::TooShort {
            required,
            available: bytes.len(),
            data: hex::encode(shown),
        }
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Error::ParseError(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TooShort { .. } => ErrorKind::TruncatedData,
            Error::ParseError(_) => ErrorKind::StructuralMismatch,
            Error::Unrecognized => ErrorKind::UnknownProtocol,
        }
    }

    /// Whether the decoder merely declined the bytes, as opposed to failing on them.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Error::Unrecognized)
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TooShort {
                required,
                available,
                data,
            } => write!(
                f,
                "too short: required {} bytes, available {} (data: {})",
                required, available, data
            ),
            Error::ParseError(msg) => write!(f, "parse error: {}", msg),
            Error::Unrecognized => write!(f, "unrecognized protocol"),
        }
    }
}
