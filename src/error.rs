//! Error types for gzstream operations.
//!
//! This module provides a single error type covering every failure the
//! adapter can report: lifecycle misuse, mode validation, underlying handle
//! failures, and short writes.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for gzstream operations.
#[derive(Debug, Error)]
pub enum GzStreamError {
    /// I/O error from the underlying file or codec.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// `open` was called on an adapter that is already open.
    #[error("Stream is already open")]
    AlreadyOpen,

    /// An operation that requires an open adapter was called on a closed one.
    #[error("Stream is not open")]
    NotOpen,

    /// The requested open mode is unsupported.
    ///
    /// Only pure read or pure write is allowed: append, at-end positioning,
    /// and simultaneous read+write are all rejected.
    #[error("Invalid open mode: {message}")]
    InvalidMode {
        /// Description of the rejected mode combination.
        message: String,
    },

    /// The underlying compressed file could not be opened.
    #[error("Failed to open {path:?}: {source}")]
    OpenFailure {
        /// Path that failed to open.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// No more data is available from the compressed stream.
    ///
    /// End-of-file and read errors are intentionally not distinguished; the
    /// underlying codec's short-read signal is ambiguous and callers see a
    /// uniform "no more data" condition either way.
    #[error("End of compressed stream")]
    EndOfStream,

    /// The handle accepted fewer bytes than the adapter flushed.
    #[error("Short write: flushed {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes the flush intended to write.
        expected: usize,
        /// Bytes the handle actually accepted.
        written: usize,
    },

    /// The underlying handle reported a failure while closing.
    #[error("Failed to close compressed stream: {message}")]
    CloseFailure {
        /// Description of the close failure.
        message: String,
    },

    /// Seek request the compressed handle cannot satisfy.
    #[error("Unsupported seek: {message}")]
    UnsupportedSeek {
        /// Description of the rejected seek.
        message: String,
    },

    /// An operation was attempted against the wrong stream direction.
    #[error("Operation requires {required} mode")]
    WrongDirection {
        /// The direction the operation needs ("read" or "write").
        required: &'static str,
    },
}

/// Result type alias for gzstream operations.
pub type Result<T> = std::result::Result<T, GzStreamError>;

impl GzStreamError {
    /// Create an invalid mode error.
    pub fn invalid_mode(message: impl Into<String>) -> Self {
        Self::InvalidMode {
            message: message.into(),
        }
    }

    /// Create an open failure error.
    pub fn open_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::OpenFailure {
            path: path.into(),
            source,
        }
    }

    /// Create a short write error.
    pub fn short_write(expected: usize, written: usize) -> Self {
        Self::ShortWrite { expected, written }
    }

    /// Create a close failure error.
    pub fn close_failure(message: impl Into<String>) -> Self {
        Self::CloseFailure {
            message: message.into(),
        }
    }

    /// Create an unsupported seek error.
    pub fn unsupported_seek(message: impl Into<String>) -> Self {
        Self::UnsupportedSeek {
            message: message.into(),
        }
    }

    /// True if this error is the uniform end-of-stream signal.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

impl From<GzStreamError> for io::Error {
    fn from(err: GzStreamError) -> Self {
        match err {
            GzStreamError::Io(e) => e,
            GzStreamError::EndOfStream => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GzStreamError::invalid_mode("append requested");
        assert!(err.to_string().contains("append requested"));

        let err = GzStreamError::short_write(512, 100);
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("512"));

        assert!(GzStreamError::EndOfStream.is_end_of_stream());
        assert!(!GzStreamError::AlreadyOpen.is_end_of_stream());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: GzStreamError = io_err.into();
        assert!(matches!(err, GzStreamError::Io(_)));

        let back: io::Error = GzStreamError::EndOfStream.into();
        assert_eq!(back.kind(), io::ErrorKind::UnexpectedEof);
    }
}
