//! The four error kinds produced by this crate.

use std::fmt;
use std::io;

/// A value has no built-in codec and no matching extension entry, or an
/// extension serializer returned something other than raw bytes.
#[derive(Debug)]
pub struct EncodingError {
    pub message: String,
}

/// The input was truncated, carried an unknown tag/group sub-tag/extension
/// index, or was otherwise structurally corrupt.
#[derive(Debug)]
pub struct DecodingError {
    pub message: String,
    pub offset: Option<u64>,
}

/// The validator found a structural defect (only raised when the caller
/// asked for a strict verdict instead of a boolean).
#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

/// Bad argument combinations at a public entry point: both or neither of
/// `encoded`/`file_name`, negative/invalid offsets, a `chunk_size` below
/// the header width, a resumed stream whose on-disk header doesn't match.
#[derive(Debug)]
pub struct UsageError {
    pub message: String,
}

#[derive(Debug)]
pub enum Error {
    Encoding(EncodingError),
    Decoding(DecodingError),
    Validation(ValidationError),
    Usage(UsageError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding(EncodingError { message: message.into() })
    }

    pub(crate) fn decoding(message: impl Into<String>) -> Self {
        Error::Decoding(DecodingError { message: message.into(), offset: None })
    }

    pub(crate) fn decoding_at(message: impl Into<String>, offset: u64) -> Self {
        Error::Decoding(DecodingError { message: message.into(), offset: Some(offset) })
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(ValidationError { message: message.into() })
    }

    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Error::Usage(UsageError { message: message.into() })
    }

    /// An I/O failure while reading back a file the caller is constructing
    /// or resuming a stream from: surfaced as a usage error, since it
    /// happens before any wire-format byte has been interpreted.
    pub(crate) fn usage_io(context: &str, err: io::Error) -> Self {
        Error::usage(format!("{context}: {err}"))
    }

    /// An I/O failure encountered mid-decode, once bytes are already being
    /// interpreted as the wire format.
    pub(crate) fn decoding_io(context: &str, err: io::Error) -> Self {
        Error::decoding(format!("{context}: {err}"))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Encoding(e) => write!(f, "encoding error: {}", e.message),
            Error::Decoding(e) => match e.offset {
                Some(off) => write!(f, "decoding error at byte {off}: {}", e.message),
                None => write!(f, "decoding error: {}", e.message),
            },
            Error::Validation(e) => write!(f, "validation error: {}", e.message),
            Error::Usage(e) => write!(f, "usage error: {}", e.message),
        }
    }
}

impl std::error::Error for Error {}
