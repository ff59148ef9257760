//! Error and result types shared across the crate.
//!
//! Every failure the system layer can produce maps onto one [`Error`] variant so
//! callers can tell a malformed directory file apart from a failed account
//! command or a missing platform backend.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A line in the account or group file does not follow the field layout.
    #[error("{}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external account command could not be run or exited non-zero.
    #[error("{command} failed: {detail}")]
    Command { command: String, detail: String },

    /// Home directory creation or ownership change failed.
    #[error("{}: {detail}", .path.display())]
    FileSystem { path: PathBuf, detail: String },

    #[error("no account backend supports platform '{0}'")]
    UnsupportedPlatform(String),

    #[error("{kind} '{name}' already exists")]
    Duplicate { kind: &'static str, name: String },

    /// Rejected before anything was touched, e.g. a blank account name.
    #[error("{0}")]
    Invalid(String),

    /// The file was rewritten by someone else after it was loaded.
    #[error("{} changed on disk since it was loaded; reload first", .path.display())]
    Modified { path: PathBuf },

    /// An edited copy was taken before the most recent reload.
    #[error("edits are based on load {based_on} but the directory is at load {current}; reload first")]
    StaleDraft { based_on: u64, current: u64 },
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn file_system(path: impl AsRef<Path>, detail: impl Into<String>) -> Self {
        Error::FileSystem {
            path: path.as_ref().to_path_buf(),
            detail: detail.into(),
        }
    }

    /// Short stable label used when reporting to the user.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Format { .. } => "format",
            Error::Io { .. } => "io",
            Error::Command { .. } => "command",
            Error::FileSystem { .. } => "filesystem",
            Error::UnsupportedPlatform(_) => "platform",
            Error::Duplicate { .. } => "duplicate",
            Error::Invalid(_) => "invalid",
            Error::Modified { .. } => "conflict",
            Error::StaleDraft { .. } => "stale",
        }
    }
}

/// Parse failure for a single directory file line (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct FormatError {
    pub line: usize,
    pub kind: FormatErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatErrorKind {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("empty name field")]
    EmptyName,
    #[error("{field} '{value}' is not a number")]
    InvalidId { field: &'static str, value: String },
    #[error("{field} '{value}' is not in canonical decimal form")]
    NonCanonicalId { field: &'static str, value: String },
    #[error("duplicate entry '{name}'")]
    Duplicate { name: String },
}
