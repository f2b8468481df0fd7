//! Open modes for accounting logs
//!
//! The four `fopen`-style mode strings accepted by
//! [`AccountingLog::open`](crate::AccountingLog::open).

use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;

use crate::error::PacctError;

/// How an accounting log file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// `"rb"`: read only, the file must exist
    Read,
    /// `"wb"`: write only, created or truncated
    Write,
    /// `"r+b"`: read and write, the file must exist
    ReadWrite,
    /// `"w+b"`: read and write, created or truncated
    ReadWriteCreate,
}

impl OpenMode {
    /// The mode string this variant is parsed from
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "rb",
            Self::Write => "wb",
            Self::ReadWrite => "r+b",
            Self::ReadWriteCreate => "w+b",
        }
    }

    /// Whether records can be read through this mode
    pub fn is_readable(&self) -> bool {
        !matches!(self, Self::Write)
    }

    /// Whether records can be appended through this mode
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::Read)
    }

    /// Whether opening creates a missing file and truncates an existing one
    pub fn truncates(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWriteCreate)
    }

    pub(crate) fn options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.is_readable())
            .write(self.is_writable())
            .create(self.truncates())
            .truncate(self.truncates());
        options
    }
}

impl FromStr for OpenMode {
    type Err = PacctError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rb" => Ok(Self::Read),
            "wb" => Ok(Self::Write),
            "r+b" => Ok(Self::ReadWrite),
            "w+b" => Ok(Self::ReadWriteCreate),
            other => Err(PacctError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
