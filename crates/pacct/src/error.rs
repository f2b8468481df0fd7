//! Error types for pacct
//!
//! Every fallible operation in the crate reports one of these variants.
//! Nothing is retried internally.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while reading or writing accounting logs
#[derive(Debug, Error)]
pub enum PacctError {
    /// Open, read, write or seek failure on the underlying file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File length is not a whole number of records
    #[error(
        "{} is not an accounting log: {length} bytes is not a multiple of the {record_size}-byte record size",
        path.display()
    )]
    MalformedLog {
        path: PathBuf,
        length: u64,
        record_size: usize,
    },

    /// Unrecognized open-mode string
    #[error("Invalid open mode {0:?} (expected rb, wb, r+b or w+b)")]
    InvalidMode(String),

    /// Entry index past the end of the log
    #[error("Entry index {index} out of range for log with {entries} entries")]
    IndexOutOfRange { index: u64, entries: u64 },

    /// Operation attempted after `close`
    #[error("Accounting log is closed")]
    LogClosed,

    /// The identity directory has no matching user or group
    #[error("Identity lookup failed: {0}")]
    IdentityLookup(String),

    /// Zero page size or tick rate
    #[error("Invalid system parameters: {0}")]
    InvalidParams(String),
}

impl PacctError {
    /// Create a new I/O error tied to a path
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new IdentityLookup error
    pub fn identity(message: impl Into<String>) -> Self {
        Self::IdentityLookup(message.into())
    }

    /// OS error code of an `Io` error, if the OS supplied one
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_path_and_code() {
        let err = PacctError::io("/var/log/pacct", std::io::Error::from_raw_os_error(2));
        assert!(matches!(err, PacctError::Io { .. }));
        assert_eq!(err.raw_os_error(), Some(2));
        assert!(err.to_string().contains("/var/log/pacct"));
    }

    #[test]
    fn test_malformed_message() {
        let err = PacctError::MalformedLog {
            path: PathBuf::from("broken"),
            length: 65,
            record_size: 64,
        };
        let message = err.to_string();
        assert!(message.contains("65 bytes"));
        assert!(message.contains("64-byte"));
        assert_eq!(err.raw_os_error(), None);
    }

    #[test]
    fn test_identity_error() {
        let err = PacctError::identity("no user with ID 4242");
        assert!(matches!(err, PacctError::IdentityLookup(_)));
        assert!(err.to_string().contains("4242"));
    }
}
