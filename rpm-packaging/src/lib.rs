// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! RPM package files.

An `.rpm` file is a fixed size [lead::Lead], a signature [header::Header]
padded to 8 bytes, the immutable header and a gzipped cpio payload.

[builder::RpmBuilder] turns a [tugger_package::Package] into such a file.
[reader::RpmReader] reads one back, exposing header values, payload entries
and verification of recorded digests.

Header values are addressed by [tag::IndexTag] and [tag::SignatureTag] and
represented as [header::IndexData].
*/

pub mod builder;
pub mod changelog;
pub mod error;
pub mod flags;
pub mod header;
pub mod lead;
pub mod reader;
pub mod tag;

pub use {
    builder::RpmBuilder,
    error::{Result, RpmError},
    reader::{PayloadEntries, RpmFile, RpmReader},
};
