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
pub enum RpmError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("package error: {0}")]
    Package(#[from] PackageError),

    #[error("cpio archive error: {0}")]
    Cpio(#[from] cpio_archive::Error),

    #[error("binary parse error: {0}")]
    Scroll(#[from] scroll::Error),

    #[error("lead does not begin with RPM magic")]
    BadLeadMagic,

    #[error("header section does not begin with magic")]
    BadMagic,

    #[error("header section store is truncated")]
    TruncatedStore,

    #[error("tag {tag} has unsupported type {kind}")]
    UnsupportedType { tag: String, kind: u32 },

    #[error("tag {tag} references offset {offset} outside of store")]
    OffsetOutOfRange { tag: String, offset: i64 },

    #[error("tag {0} holds a string lacking a NUL terminator")]
    StringNotTerminated(String),

    #[error("header lacks tag {0}")]
    MissingTag(String),

    #[error("tag {0} has an unexpected type")]
    WrongType(String),

    #[error("value {value} of tag {tag} does not fit in a 32-bit field")]
    ValueOverflow { tag: String, value: u64 },

    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),

    #[error("payload lacks entry for {0}")]
    MissingPayloadEntry(String),

    #[error("signature {tag} mismatch: expected {expected}; got {actual}")]
    SignatureMismatch {
        tag: String,
        expected: String,
        actual: String,
    },

    #[error("checksum mismatch for {path}: expected {expected}; got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

impl RpmError {
    /// The failure classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Cpio(cpio_archive::Error::Io(_)) => ErrorKind::Io,
            Self::Package(e) => e.kind(),
            Self::ChecksumMismatch { .. } | Self::SignatureMismatch { .. } => {
                ErrorKind::ChecksumMismatch
            }
            Self::UnsupportedPayload(_) => ErrorKind::Unsupported,
            Self::ValueOverflow { .. } => ErrorKind::InvalidPackage,
            _ => ErrorKind::Format,
        }
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, RpmError>;
