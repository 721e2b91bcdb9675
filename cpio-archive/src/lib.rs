// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! cpio archive reading and writing.

Only the *New ASCII* (`newc`, magic `070701`) format is supported. This is
the format RPM uses for its payload.
*/

pub mod newc;
pub use newc::{NewcHeader, NewcReader, NewcWriter};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic value encountered")]
    BadMagic,

    #[error("value in header is not an ASCII string")]
    BadHeaderString,

    #[error("string value in header is not in hex: {0}")]
    BadHeaderHex(String),

    #[error("filename could not be decoded")]
    FilenameDecode,

    #[error("archive ended in the middle of an entry")]
    UnexpectedEnd,

    #[error("entry body size mismatch: header says {expected} bytes; got {actual}")]
    BodySizeMismatch { expected: u64, actual: u64 },

    #[error("value {0} does not fit in an 8 digit hex field")]
    FieldOverflow(u64),
}

/// Result type for this crate.
pub type CpioResult<T> = Result<T, Error>;

/// Number of NUL bytes needed to pad `size` to a 4 byte boundary.
pub(crate) fn pad4(size: u64) -> u64 {
    (4 - size % 4) % 4
}
