//! Error types for piece table reads.
//!
//! Edits never fail: invalid arguments make them return `false`. Errors only
//! come from reads and from loading raw bytes.

use std::fmt;
use std::io;

/// Result type alias for piece table operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for piece table operations.
#[derive(Debug)]
pub enum Error {
    /// I/O error surfaced through the `Read`/`Seek` adapter.
    Io(io::Error),
    /// Read started at or past the end of the document.
    Eof,
    /// Input bytes were not valid UTF-8.
    InvalidUtf8 { valid_up_to: usize },
    /// Seek target before the start of the document.
    OutOfRange { offset: i128, len: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Eof => write!(f, "end of document"),
            Self::InvalidUtf8 { valid_up_to } => {
                write!(f, "invalid UTF-8 after byte {valid_up_to}")
            }
            Self::OutOfRange { offset, len } => {
                write!(f, "offset {offset} out of range for {len}-byte document")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::InvalidUtf8 {
            valid_up_to: e.valid_up_to(),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            Error::Eof => Self::new(io::ErrorKind::UnexpectedEof, e.to_string()),
            Error::InvalidUtf8 { .. } => Self::new(io::ErrorKind::InvalidData, e.to_string()),
            Error::OutOfRange { .. } => Self::new(io::ErrorKind::InvalidInput, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::Eof.to_string(), "end of document");

        let err = Error::InvalidUtf8 { valid_up_to: 3 };
        assert!(err.to_string().contains("after byte 3"));

        let err = Error::OutOfRange {
            offset: -4,
            len: 10,
        };
        assert!(err.to_string().contains("-4"));
        assert!(err.to_string().contains("10-byte"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));

        let back: io::Error = Error::Eof.into();
        assert_eq!(back.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_utf8_error_conversion() {
        let bytes = [b'a', 0xff];
        let err: Error = std::str::from_utf8(&bytes).unwrap_err().into();
        assert!(matches!(err, Error::InvalidUtf8 { valid_up_to: 1 }));
    }
}
