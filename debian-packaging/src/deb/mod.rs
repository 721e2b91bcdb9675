// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Interfaces for .deb package files.

The .deb file specification lives at <https://manpages.debian.org/unstable/dpkg-dev/deb.5.en.html>.
*/

use {
    crate::error::{DebianError, Result},
    std::io::Read,
    tugger_package::io::gunzip_reader,
};

pub mod builder;
pub mod reader;

/// Content of the `debian-binary` member.
pub const DEBIAN_BINARY: &[u8] = b"2.0\n";

/// Progress of a [builder::DebBuilder] through the members of an archive.
///
/// Members are written in declaration order and no state may be skipped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DebState {
    Initial,
    DebianWritten,
    ControlWritten,
    DataWritten,
    Closed,
}

impl DebState {
    /// The state following this one.
    pub fn next(&self) -> Self {
        match self {
            Self::Initial => Self::DebianWritten,
            Self::DebianWritten => Self::ControlWritten,
            Self::ControlWritten => Self::DataWritten,
            Self::DataWritten | Self::Closed => Self::Closed,
        }
    }
}

/// Compression format of `.deb` archive members.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DebCompression {
    /// Do not compress contents of `.deb` files.
    Uncompressed,
    /// Compress as `.gz` files.
    Gzip,
}

impl DebCompression {
    /// Obtain the filename extension for this compression format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Uncompressed => "",
            Self::Gzip => ".gz",
        }
    }

    /// Resolve the compression of a member from its name.
    ///
    /// `prefix` is the name without extension, e.g. `control.tar`.
    pub fn from_member_name(name: &str, prefix: &str) -> Result<Self> {
        match name.strip_prefix(prefix) {
            Some("") => Ok(Self::Uncompressed),
            Some(".gz") => Ok(Self::Gzip),
            _ => Err(DebianError::DebUnknownCompression(name.to_string())),
        }
    }

    /// Wrap a reader so it yields decompressed content.
    pub fn decompress<R: Read>(&self, reader: R) -> MemberStream<R> {
        match self {
            Self::Uncompressed => MemberStream::Plain(reader),
            Self::Gzip => MemberStream::Gzip(gunzip_reader(reader)),
        }
    }
}

/// Decompressed content of an archive member.
pub enum MemberStream<R: Read> {
    Plain(R),
    Gzip(flate2::read::GzDecoder<R>),
}

impl<R: Read> Read for MemberStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(r) => r.read(buf),
            Self::Gzip(r) => r.read(buf),
        }
    }
}
