// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Files installed by a package. */

use {
    crate::{
        error::{PackageError, PackageResult},
        io::{gzip, ContentDigest},
    },
    bitflags::bitflags,
    log::debug,
    std::{
        io::{Cursor, Read},
        path::{Path, PathBuf},
    },
};

bitflags! {
    /// Attributes of a [Resource].
    pub struct ResourceFlags: u32 {
        const REGULAR = 0x01;
        const DIR = 0x02;
        const CONFIG = 0x04;
        const DOC = 0x08;
        const GHOST = 0x10;
        const LICENSE = 0x20;
        const README = 0x40;
    }
}

impl Default for ResourceFlags {
    fn default() -> Self {
        Self::REGULAR
    }
}

/// Where the content of a [Resource] comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

impl ResourceSource {
    /// Size of the source content in bytes.
    pub fn size(&self) -> std::io::Result<u64> {
        match self {
            Self::Path(p) => Ok(std::fs::metadata(p)?.len()),
            Self::Memory(data) => Ok(data.len() as u64),
        }
    }

    /// Open a reader over the source content.
    pub fn open(&self) -> std::io::Result<Box<dyn Read + '_>> {
        match self {
            Self::Path(p) => Ok(Box::new(std::fs::File::open(p)?)),
            Self::Memory(data) => Ok(Box::new(Cursor::new(data))),
        }
    }
}

impl From<&Path> for ResourceSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ResourceSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for ResourceSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Memory(data)
    }
}

impl From<&[u8]> for ResourceSource {
    fn from(data: &[u8]) -> Self {
        Self::Memory(data.into())
    }
}

impl From<&str> for ResourceSource {
    fn from(data: &str) -> Self {
        Self::Memory(data.as_bytes().into())
    }
}

/// Values derived when a resource is copied into an archive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StagedResource {
    /// Size of the content as written to the archive.
    pub size: u64,
    /// Modification time as seconds since UNIX epoch.
    pub mtime: u64,
    /// MD5 of the content as written to the archive.
    pub digest: ContentDigest,
    /// Synthetic inode number.
    pub inode: u32,
}

/// A file to install.
#[derive(Clone, Debug)]
pub struct Resource {
    pub source: ResourceSource,
    /// Absolute install path.
    pub target: String,
    /// Permission bits.
    pub perm: u32,
    pub flags: ResourceFlags,
    /// Gzip content before adding it to an archive.
    pub compress: bool,
    /// Locale tag.
    pub language: Option<String>,
    staged: Option<StagedResource>,
}

impl Resource {
    /// Construct a regular file resource with mode `0644`.
    pub fn new(target: impl ToString, source: impl Into<ResourceSource>) -> Self {
        Self {
            source: source.into(),
            target: target.to_string(),
            perm: 0o644,
            flags: ResourceFlags::REGULAR,
            compress: false,
            language: None,
            staged: None,
        }
    }

    #[must_use]
    pub fn with_perm(mut self, perm: u32) -> Self {
        self.perm = perm;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ResourceFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl ToString) -> Self {
        self.language = Some(language.to_string());
        self
    }

    /// The target path without any leading `/`.
    ///
    /// This is the form used in tar member names.
    pub fn relative_target(&self) -> &str {
        self.target.trim_start_matches('/')
    }

    /// The target path with a leading `/`.
    pub fn absolute_target(&self) -> String {
        format!("/{}", self.relative_target())
    }

    /// The parent directory of the target, with leading and trailing `/`.
    pub fn dir_name(&self) -> String {
        match self.relative_target().rsplit_once('/') {
            Some((dir, _)) => format!("/{}/", dir),
            None => "/".to_string(),
        }
    }

    /// The final path component of the target.
    pub fn base_name(&self) -> &str {
        match self.relative_target().rsplit_once('/') {
            Some((_, base)) => base,
            None => self.relative_target(),
        }
    }

    /// Obtain the content as it should be written to an archive.
    ///
    /// Returns the size and a reader. Compressed resources are gzipped in
    /// memory at `level`.
    pub fn content(&self, level: u32) -> PackageResult<(u64, Box<dyn Read + '_>)> {
        if self.compress {
            let mut data = Vec::new();
            self.source.open()?.read_to_end(&mut data)?;
            let data = gzip(&data, level)?;
            debug!("compressed {} to {} bytes", self.target, data.len());

            Ok((data.len() as u64, Box::new(Cursor::new(data))))
        } else {
            Ok((self.source.size()?, self.source.open()?))
        }
    }

    /// Record the values computed when copying this resource into an archive.
    ///
    /// May only be called once per resource.
    pub fn record_staged(&mut self, staged: StagedResource) -> PackageResult<()> {
        if self.staged.is_some() {
            return Err(PackageError::AlreadyStaged(self.target.clone()));
        }

        debug!(
            "staged {} ({} bytes, md5 {})",
            self.target,
            staged.size,
            staged.digest.digest_hex()
        );
        self.staged = Some(staged);

        Ok(())
    }

    /// Values recorded by [Self::record_staged], if any.
    pub fn staged(&self) -> Option<&StagedResource> {
        self.staged.as_ref()
    }

    /// Values recorded by [Self::record_staged], or an error if not yet staged.
    pub fn require_staged(&self) -> PackageResult<&StagedResource> {
        self.staged
            .as_ref()
            .ok_or_else(|| PackageError::NotStaged(self.target.clone()))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::io::DigestType};

    #[test]
    fn path_forms() {
        let resource = Resource::new("/usr/bin/hello", "X");
        assert_eq!(resource.relative_target(), "usr/bin/hello");
        assert_eq!(resource.absolute_target(), "/usr/bin/hello");
        assert_eq!(resource.dir_name(), "/usr/bin/");
        assert_eq!(resource.base_name(), "hello");

        let top = Resource::new("README", "");
        assert_eq!(top.dir_name(), "/");
        assert_eq!(top.base_name(), "README");
    }

    #[test]
    fn staged_once() -> PackageResult<()> {
        let mut resource = Resource::new("/a", "X");
        assert!(resource.require_staged().is_err());

        let staged = StagedResource {
            size: 1,
            mtime: 0,
            digest: DigestType::Md5.digest(b"X"),
            inode: 1,
        };
        resource.record_staged(staged.clone())?;
        assert_eq!(resource.require_staged()?, &staged);

        assert!(matches!(
            resource.record_staged(staged),
            Err(PackageError::AlreadyStaged(_))
        ));

        Ok(())
    }

    #[test]
    fn compressed_content() -> PackageResult<()> {
        let resource = Resource::new("/usr/share/man/man1/a.1.gz", "text text text text")
            .with_compress(true);
        let (size, mut reader) = resource.content(9)?;

        let mut data = vec![];
        reader.read_to_end(&mut data)?;
        assert_eq!(size, data.len() as u64);
        assert_eq!(&data[0..2], &[0x1f, 0x8b]);

        Ok(())
    }

    #[test]
    fn path_source() -> PackageResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("file");
        std::fs::write(&path, b"on disk")?;

        let resource = Resource::new("/opt/file", path.as_path());
        let (size, mut reader) = resource.content(9)?;
        let mut data = String::new();
        reader.read_to_string(&mut data)?;

        assert_eq!(size, 7);
        assert_eq!(data, "on disk");

        Ok(())
    }
}
