// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {
    debian_packaging::error::DebianError,
    rpm_packaging::RpmError,
    thiserror::Error,
    tugger_package::{ErrorKind, PackageError},
};

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum PackagerError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("package error: {0}")]
    Package(#[from] PackageError),

    #[error("deb error: {0}")]
    Debian(#[from] DebianError),

    #[error("rpm error: {0}")]
    Rpm(#[from] RpmError),

    #[error("unknown package format: {0}")]
    UnknownFormat(String),
}

impl PackagerError {
    /// The failure classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Package(e) => e.kind(),
            Self::Debian(e) => e.kind(),
            Self::Rpm(e) => e.kind(),
            Self::UnknownFormat(_) => ErrorKind::Unsupported,
        }
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, PackagerError>;
