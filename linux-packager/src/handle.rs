// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reading packages of either format. */

use {
    crate::{error::Result, format::PackageFormat},
    debian_packaging::deb::reader::{DataEntries, DebReader},
    log::debug,
    rpm_packaging::{PayloadEntries, RpmReader},
    std::{
        fs::File,
        io::{BufReader, Read},
        path::{Path, PathBuf},
    },
    tugger_package::{EntryMetadata, Package},
};

/// An opened package file.
///
/// The format specific reader is positioned before the archived files, which
/// are consumed by [Self::entries], [Self::verify] or [Self::extract].
pub enum PackageHandle<R: Read> {
    Deb(DebReader<R>),
    Rpm(RpmReader<R>),
}

impl PackageHandle<BufReader<File>> {
    /// Open a package file, resolving its format from the file extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = PackageFormat::from_path(path)?;
        debug!("opening {} as {}", path.display(), format);

        Self::new(format, BufReader::new(File::open(path)?))
    }
}

impl<R: Read> PackageHandle<R> {
    /// Construct an instance from a reader of a package in `format`.
    pub fn new(format: PackageFormat, reader: R) -> Result<Self> {
        Ok(match format {
            PackageFormat::Deb => Self::Deb(DebReader::new(reader)?),
            PackageFormat::Rpm => Self::Rpm(RpmReader::new(reader)?),
        })
    }

    pub fn format(&self) -> PackageFormat {
        match self {
            Self::Deb(_) => PackageFormat::Deb,
            Self::Rpm(_) => PackageFormat::Rpm,
        }
    }

    /// Package metadata decoded from the control file or header.
    ///
    /// The returned package has no resources.
    pub fn metadata(&self) -> Result<Package> {
        match self {
            Self::Deb(reader) => {
                let mut package = reader.control_file()?.to_package()?;
                package.scripts = reader.control().scripts().clone();

                Ok(package)
            }
            Self::Rpm(reader) => Ok(reader.to_package()?),
        }
    }

    /// Obtain a cursor over archived files.
    pub fn entries(self) -> PackageEntries<R> {
        match self {
            Self::Deb(reader) => PackageEntries::Deb(reader.into_entries()),
            Self::Rpm(reader) => PackageEntries::Rpm(reader.into_entries()),
        }
    }

    /// Verify archived file content against the digests the package records.
    pub fn verify(self) -> Result<()> {
        match self {
            Self::Deb(reader) => Ok(reader.verify()?),
            Self::Rpm(reader) => Ok(reader.verify()?),
        }
    }

    /// Extract archived files below `dest`, returning the paths written.
    pub fn extract(self, dest: impl AsRef<Path>, preserve_perms: bool) -> Result<Vec<PathBuf>> {
        match self {
            Self::Deb(reader) => Ok(reader.extract(dest, preserve_perms)?),
            Self::Rpm(reader) => Ok(reader.extract(dest, preserve_perms)?),
        }
    }
}

/// A cursor over the files archived in a package.
///
/// [Self::next_entry] advances to the next entry. The [Read] implementation
/// reads content of the current entry.
pub enum PackageEntries<R: Read> {
    Deb(DataEntries<R>),
    Rpm(PayloadEntries<R>),
}

impl<R: Read> PackageEntries<R> {
    /// Advance to the next entry.
    pub fn next_entry(&mut self) -> Result<Option<EntryMetadata>> {
        match self {
            Self::Deb(entries) => Ok(entries.next_entry()?),
            Self::Rpm(entries) => Ok(entries.next_entry()?),
        }
    }

    /// Collect the metadata of all remaining entries, skipping their content.
    pub fn collect_metadata(mut self) -> Result<Vec<EntryMetadata>> {
        let mut res = vec![];
        while let Some(entry) = self.next_entry()? {
            res.push(entry);
        }

        Ok(res)
    }
}

impl<R: Read> Read for PackageEntries<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Deb(entries) => entries.read(buf),
            Self::Rpm(entries) => entries.read(buf),
        }
    }
}
