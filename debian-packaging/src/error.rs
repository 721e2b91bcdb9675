// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {
    thiserror::Error,
    tugger_package::{ErrorKind, PackageError},
};

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum DebianError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("package error: {0}")]
    Package(#[from] PackageError),

    #[error("ar archive error: {0}")]
    Ar(#[from] ar_archive::Error),

    #[error("tar archive error: {0}")]
    Tar(#[from] ustar_archive::Error),

    #[error("control file parse error: {0}")]
    ControlParseError(String),

    #[error("Control file lacks a paragraph")]
    ControlFileNoParagraph,

    #[error("Control file not found")]
    ControlFileNotFound,

    #[error("required field missing in binary package control file: {0}")]
    BinaryPackageControlRequiredFieldMissing(&'static str),

    #[error("unknown entry in binary package archive: {0}")]
    DebUnknownBinaryPackageEntry(String),

    #[error("unknown compression in deb archive file: {0}")]
    DebUnknownCompression(String),

    #[error("deb archive lacks member: {0}")]
    DebMissingMember(&'static str),

    #[error("unsupported deb format version: {0}")]
    DebUnsupportedVersion(String),

    #[error("md5sums entry has no matching data entry: {0}")]
    DebMissingDataEntry(String),

    #[error("md5sums line is malformed: {0}")]
    Md5sumsParse(String),

    #[error("checksum mismatch for {path}: expected {expected}; got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

impl DebianError {
    /// The failure classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Package(e) => e.kind(),
            Self::Ar(ar_archive::Error::Io(_)) | Self::Tar(ustar_archive::Error::Io(_)) => {
                ErrorKind::Io
            }
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::DebUnknownCompression(_) | Self::DebUnsupportedVersion(_) => {
                ErrorKind::Unsupported
            }
            _ => ErrorKind::Format,
        }
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, DebianError>;
