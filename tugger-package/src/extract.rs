// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Materializing archive entries on the filesystem. */

use {
    crate::error::{PackageError, PackageResult},
    filetime::FileTime,
    log::{debug, warn},
    std::{
        io::Read,
        path::{Component, Path, PathBuf},
    },
};

/// Metadata of an entry being extracted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryMetadata {
    /// Path of the entry within the archive.
    pub path: String,
    /// Permission bits. File type bits are ignored.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Size of the entry content.
    pub size: u64,
    /// Modification time as seconds since UNIX epoch.
    pub mtime: u64,
    pub is_dir: bool,
}

/// Writes archive entries below a destination directory.
pub struct Extractor {
    dest: PathBuf,
    preserve_perms: bool,
}

impl Extractor {
    /// Construct a new instance.
    ///
    /// If `preserve_perms` is set, modes, modification times and (when
    /// permitted) ownership of entries are applied to the extracted files.
    pub fn new(dest: impl AsRef<Path>, preserve_perms: bool) -> Self {
        Self {
            dest: dest.as_ref().to_path_buf(),
            preserve_perms,
        }
    }

    /// Resolve an archive path to a filesystem path below the destination.
    ///
    /// Leading `/` and `./` are ignored. Paths containing `..` are rejected.
    pub fn resolve(&self, path: &str) -> PackageResult<PathBuf> {
        let mut resolved = self.dest.clone();

        for component in Path::new(path).components() {
            match component {
                Component::Normal(c) => resolved.push(c),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(PackageError::PathEscape(path.to_string()));
                }
            }
        }

        if resolved == self.dest {
            return Err(PackageError::PathEscape(path.to_string()));
        }

        Ok(resolved)
    }

    /// Extract a single entry, returning the filesystem path written.
    pub fn extract_entry(
        &self,
        entry: &EntryMetadata,
        reader: &mut impl Read,
    ) -> PackageResult<PathBuf> {
        let dest_path = self.resolve(&entry.path)?;

        if entry.is_dir {
            std::fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut fh = std::fs::File::create(&dest_path)?;
            let written = std::io::copy(reader, &mut fh)?;
            if written != entry.size {
                return Err(PackageError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "failed to write entire file {}: wrote {} of {} bytes",
                        dest_path.display(),
                        written,
                        entry.size
                    ),
                )));
            }
        }

        debug!("extracted {} to {}", entry.path, dest_path.display());

        if self.preserve_perms {
            self.apply_metadata(&dest_path, entry)?;
        }

        Ok(dest_path)
    }

    fn apply_metadata(&self, path: &Path, entry: &EntryMetadata) -> PackageResult<()> {
        set_perms(path, entry.mode & 0o7777)?;

        let mtime = FileTime::from_unix_time(entry.mtime as i64, 0);
        filetime::set_file_times(path, mtime, mtime)?;

        set_owner(path, entry.uid, entry.gid);

        Ok(())
    }
}

#[cfg(unix)]
fn set_perms(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(windows)]
fn set_perms(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut perm = std::fs::metadata(path)?.permissions();
    perm.set_readonly(mode & 0o200 != 0o200);
    std::fs::set_permissions(path, perm)
}

/// Change ownership. Only privileged processes can do this, so failures are logged.
#[cfg(unix)]
fn set_owner(path: &Path, uid: u32, gid: u32) {
    if let Err(e) = std::os::unix::fs::chown(path, Some(uid), Some(gid)) {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            debug!("not permitted to chown {}", path.display());
        } else {
            warn!("failed to chown {}: {}", path.display(), e);
        }
    }
}

#[cfg(windows)]
fn set_owner(_path: &Path, _uid: u32, _gid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, size: u64) -> EntryMetadata {
        EntryMetadata {
            path: path.to_string(),
            mode: 0o100755,
            uid: 0,
            gid: 0,
            size,
            mtime: 1_700_000_000,
            is_dir: false,
        }
    }

    #[test]
    fn rejects_escapes() -> PackageResult<()> {
        let dir = tempfile::tempdir()?;
        let extractor = Extractor::new(dir.path(), false);

        assert!(matches!(
            extractor.resolve("../etc/passwd"),
            Err(PackageError::PathEscape(_))
        ));
        assert!(matches!(
            extractor.resolve("usr/../../x"),
            Err(PackageError::PathEscape(_))
        ));
        assert!(matches!(
            extractor.resolve("./"),
            Err(PackageError::PathEscape(_))
        ));
        assert_eq!(
            extractor.resolve("/usr/bin/hello")?,
            dir.path().join("usr").join("bin").join("hello")
        );
        assert_eq!(
            extractor.resolve("./usr/bin/hello")?,
            dir.path().join("usr").join("bin").join("hello")
        );

        Ok(())
    }

    #[test]
    fn writes_files() -> PackageResult<()> {
        let dir = tempfile::tempdir()?;
        let extractor = Extractor::new(dir.path(), true);

        let path = extractor.extract_entry(&file("usr/bin/hello", 1), &mut &b"X"[..])?;
        assert_eq!(std::fs::read(&path)?, b"X");

        let mtime = FileTime::from_last_modification_time(&std::fs::metadata(&path)?);
        assert_eq!(mtime.unix_seconds(), 1_700_000_000);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(
                std::fs::metadata(&path)?.permissions().mode() & 0o7777,
                0o755
            );
        }

        Ok(())
    }

    #[test]
    fn short_content_detected() -> PackageResult<()> {
        let dir = tempfile::tempdir()?;
        let extractor = Extractor::new(dir.path(), false);

        assert!(extractor
            .extract_entry(&file("a", 10), &mut &b"abc"[..])
            .is_err());

        Ok(())
    }
}
