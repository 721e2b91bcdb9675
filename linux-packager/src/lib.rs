// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Build and inspect Linux packages.

This crate puts the `.deb` support of [debian_packaging] and the `.rpm`
support of [rpm_packaging] behind a common interface.

[builder::PackageBuilder] emits a [tugger_package::Package] in a chosen
[format::PackageFormat]. [handle::PackageHandle] opens an existing package
file, exposing its metadata, archived files, verification and extraction.
The format of an existing file is resolved from its extension.

The [render] module produces the human readable descriptions behind
[info()] and [content()].
*/

pub mod builder;
pub mod error;
pub mod format;
pub mod handle;
pub mod render;

pub use {
    builder::{build, build_file, PackageBuilder},
    error::{PackagerError, Result},
    format::PackageFormat,
    handle::{PackageEntries, PackageHandle},
};

use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Open a package file.
pub fn open(path: impl AsRef<Path>) -> Result<PackageHandle<BufReader<File>>> {
    PackageHandle::open(path)
}

/// Write the metadata of a package file.
pub fn info(path: impl AsRef<Path>, writer: &mut impl Write) -> Result<()> {
    render::write_info(&open(path)?, writer)
}

/// Write a listing of the files archived in a package file.
pub fn content(path: impl AsRef<Path>, writer: &mut impl Write) -> Result<()> {
    render::write_content(open(path)?, writer)
}

/// Verify the content of a package file against its recorded digests.
pub fn verify(path: impl AsRef<Path>) -> Result<()> {
    open(path)?.verify()
}

/// Extract the files archived in a package file below `dest`.
pub fn extract(
    path: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    preserve_perms: bool,
) -> Result<Vec<PathBuf>> {
    open(path)?.extract(dest, preserve_perms)
}
