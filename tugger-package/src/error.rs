// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Coarse classification of failures shared by all package formats.
///
/// Crate specific error types map onto these via a `kind()` method so callers
/// can react to a failure without matching on every variant.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// The package definition is incomplete or inconsistent.
    InvalidPackage,
    /// Reading or writing a file or stream failed.
    Io,
    /// Malformed data was encountered while parsing.
    Format,
    /// Content does not match its recorded digest.
    ChecksumMismatch,
    /// A valid but unsupported feature was encountered.
    Unsupported,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::InvalidPackage => "invalid package",
            Self::Io => "I/O error",
            Self::Format => "format error",
            Self::ChecksumMismatch => "checksum mismatch",
            Self::Unsupported => "unsupported",
        })
    }
}

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("required package field missing: {0}")]
    MissingField(&'static str),

    #[error("package has no resources")]
    NoResources,

    #[error("resource has empty target path")]
    EmptyTarget,

    #[error("duplicate resource target: {0}")]
    DuplicateTarget(String),

    #[error("unrecognized architecture: {0}")]
    UnknownArchitecture(String),

    #[error("resource {0} was already staged")]
    AlreadyStaged(String),

    #[error("resource {0} has not been staged")]
    NotStaged(String),

    #[error("path escapes extraction directory: {0}")]
    PathEscape(String),

    #[error("checksum mismatch for {path}: expected {expected}; got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

impl PackageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::PathEscape(_) => ErrorKind::Format,
            _ => ErrorKind::InvalidPackage,
        }
    }
}

/// Result wrapper for this crate.
pub type PackageResult<T> = std::result::Result<T, PackageError>;
