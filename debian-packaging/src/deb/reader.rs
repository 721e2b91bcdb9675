// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reading of .deb package files. */

use {
    crate::{
        binary_package_control::BinaryPackageControlFile,
        control::{ControlFile, ControlParagraph},
        deb::{DebCompression, MemberStream},
        error::{DebianError, Result},
    },
    ar_archive::ArReader,
    log::{debug, warn},
    std::{
        collections::{BTreeMap, HashSet},
        fs::File,
        io::{BufReader, Read},
        path::{Path, PathBuf},
    },
    tugger_package::{
        io::{digest_reader, ContentDigest, DigestType},
        EntryMetadata, Extractor, Scripts,
    },
    ustar_archive::{EntryType, TarReader},
};

/// Strip the `./` and `/` prefixes archive paths are written with.
fn normalize_path(path: &str) -> &str {
    let mut path = path;
    while let Some(p) = path.strip_prefix("./") {
        path = p;
    }

    path.trim_start_matches('/')
}

/// Parse the content of an `md5sums` file.
///
/// Lines have the form `<hex digest>  <path>`.
pub fn parse_md5sums(data: &str) -> Result<Vec<(String, ContentDigest)>> {
    data.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (hex, path) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| DebianError::Md5sumsParse(line.to_string()))?;
            let digest = ContentDigest::from_hex_digest(DigestType::Md5, hex)
                .map_err(|_| DebianError::Md5sumsParse(line.to_string()))?;

            if digest.digest_bytes().len() != 16 {
                return Err(DebianError::Md5sumsParse(line.to_string()));
            }

            Ok((normalize_path(path.trim()).to_string(), digest))
        })
        .collect()
}

/// Members of a `control.tar` archive.
#[derive(Clone, Debug, Default)]
pub struct ControlTarFile {
    paragraphs: Vec<ControlParagraph<'static>>,
    md5sums: Vec<(String, ContentDigest)>,
    conffiles: Vec<String>,
    scripts: Scripts,
    other: BTreeMap<String, Vec<u8>>,
}

impl ControlTarFile {
    /// Parse a decompressed `control.tar` stream.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut archive = TarReader::new(reader);
        let mut res = Self::default();
        let mut seen_control = false;

        while let Some(header) = archive.read_next()? {
            if header.is_directory() {
                continue;
            }

            let name = normalize_path(&header.path).to_string();
            let mut data = vec![];
            archive.read_to_end(&mut data)?;

            let text = String::from_utf8_lossy(&data).to_string();

            match name.as_str() {
                "control" => {
                    res.paragraphs = ControlFile::parse_str(&text)?
                        .into_paragraphs()
                        .collect();
                    seen_control = true;
                }
                "md5sums" => {
                    res.md5sums = parse_md5sums(&text)?;
                }
                "conffiles" => {
                    res.conffiles = text
                        .lines()
                        .map(|l| l.trim())
                        .filter(|l| !l.is_empty())
                        .map(|l| l.to_string())
                        .collect();
                }
                "preinst" => res.scripts.pre_install = Some(text),
                "postinst" => res.scripts.post_install = Some(text),
                "prerm" => res.scripts.pre_remove = Some(text),
                "postrm" => res.scripts.post_remove = Some(text),
                _ => {
                    debug!("retaining unrecognized control member {}", name);
                    res.other.insert(name.clone(), data);
                }
            }
        }

        if !seen_control {
            return Err(DebianError::ControlFileNotFound);
        }

        Ok(res)
    }

    /// The binary package control paragraph.
    pub fn control_file(&self) -> Result<BinaryPackageControlFile<'static>> {
        self.paragraphs
            .first()
            .cloned()
            .map(BinaryPackageControlFile::from)
            .ok_or(DebianError::ControlFileNoParagraph)
    }

    /// All paragraphs of the `control` member.
    ///
    /// Status style files hold more than one.
    pub fn paragraphs(&self) -> &[ControlParagraph<'static>] {
        &self.paragraphs
    }

    /// Entries of `md5sums` in file order, paths without `./` prefix.
    pub fn md5sums(&self) -> &[(String, ContentDigest)] {
        &self.md5sums
    }

    /// Absolute paths of configuration files.
    pub fn conffiles(&self) -> &[String] {
        &self.conffiles
    }

    /// Maintainer scripts.
    pub fn scripts(&self) -> &Scripts {
        &self.scripts
    }

    /// Members not interpreted by this type, keyed by name.
    pub fn other_members(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.other
    }
}

/// A reader of `.deb` package files.
///
/// Construction reads the `debian-binary` and `control.tar` members. The
/// archive is then positioned at `data.tar`, whose entries are read lazily via
/// [Self::into_entries].
pub struct DebReader<R: Read> {
    archive: ArReader<R>,
    version: String,
    control: ControlTarFile,
    data_compression: DebCompression,
}

impl DebReader<BufReader<File>> {
    /// Open a package file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufReader::new(File::open(path.as_ref())?))
    }
}

impl<R: Read> DebReader<R> {
    /// Construct a new instance from a reader of a `.deb` file.
    pub fn new(reader: R) -> Result<Self> {
        let mut archive = ArReader::new(reader)?;

        let version = match archive.read_next()? {
            Some(header) if header.name == "debian-binary" => {
                let mut data = String::new();
                archive.read_to_string(&mut data)?;
                data.trim().to_string()
            }
            _ => return Err(DebianError::DebMissingMember("debian-binary")),
        };
        if !version.starts_with("2.") {
            return Err(DebianError::DebUnsupportedVersion(version));
        }

        let mut control = None;

        let data_compression = loop {
            let header = match archive.read_next()? {
                Some(header) => header,
                None if control.is_none() => {
                    return Err(DebianError::DebMissingMember("control.tar"))
                }
                None => return Err(DebianError::DebMissingMember("data.tar")),
            };

            if header.name.starts_with("control.tar") {
                let compression = DebCompression::from_member_name(&header.name, "control.tar")?;
                control = Some(ControlTarFile::from_reader(
                    compression.decompress(&mut archive),
                )?);
            } else if header.name.starts_with("data.tar") {
                if control.is_none() {
                    return Err(DebianError::DebMissingMember("control.tar"));
                }
                break DebCompression::from_member_name(&header.name, "data.tar")?;
            } else if header.name.starts_with('_') {
                warn!("ignoring deb member {}", header.name);
            } else {
                return Err(DebianError::DebUnknownBinaryPackageEntry(header.name));
            }
        };

        let control = control.ok_or(DebianError::DebMissingMember("control.tar"))?;

        Ok(Self {
            archive,
            version,
            control,
            data_compression,
        })
    }

    /// The content of `debian-binary`, without trailing newline.
    pub fn format_version(&self) -> &str {
        &self.version
    }

    /// Content of the `control.tar` member.
    pub fn control(&self) -> &ControlTarFile {
        &self.control
    }

    /// The binary package control paragraph.
    pub fn control_file(&self) -> Result<BinaryPackageControlFile<'static>> {
        self.control.control_file()
    }

    /// Obtain a cursor over entries of `data.tar`.
    pub fn into_entries(self) -> DataEntries<R> {
        DataEntries {
            archive: TarReader::new(self.data_compression.decompress(self.archive)),
        }
    }

    /// Verify the content of every data entry against `md5sums`.
    ///
    /// Fails on the first mismatch. Paths listed in `md5sums` but absent from
    /// the data archive are also an error.
    pub fn verify(self) -> Result<()> {
        let expected = self
            .control
            .md5sums()
            .iter()
            .cloned()
            .collect::<BTreeMap<_, _>>();
        let mut seen = HashSet::new();

        let mut entries = self.into_entries();
        while let Some(entry) = entries.next_entry()? {
            if entry.is_dir {
                continue;
            }

            let (_, digests) = digest_reader(&mut entries)?;

            if let Some(digest) = expected.get(&entry.path) {
                if !digests.matches_digest(digest) {
                    return Err(DebianError::ChecksumMismatch {
                        path: entry.path,
                        expected: digest.digest_hex(),
                        actual: digests.md5.digest_hex(),
                    });
                }

                debug!("verified {}", entry.path);
                seen.insert(entry.path);
            } else {
                debug!("{} not listed in md5sums", entry.path);
            }
        }

        if let Some(path) = expected.keys().find(|p| !seen.contains(*p)) {
            return Err(DebianError::DebMissingDataEntry(path.clone()));
        }

        Ok(())
    }

    /// Extract data entries below a directory.
    ///
    /// Returns the paths written.
    pub fn extract(self, dest: impl AsRef<Path>, preserve_perms: bool) -> Result<Vec<PathBuf>> {
        let extractor = Extractor::new(dest, preserve_perms);
        let mut written = vec![];

        let mut entries = self.into_entries();
        while let Some(entry) = entries.next_entry()? {
            written.push(extractor.extract_entry(&entry, &mut entries)?);
        }

        Ok(written)
    }
}

/// A cursor over entries of a `data.tar` member.
///
/// [Self::next_entry] advances to the next entry. The [Read] implementation
/// reads content of the current entry.
pub struct DataEntries<R: Read> {
    archive: TarReader<MemberStream<ArReader<R>>>,
}

impl<R: Read> DataEntries<R> {
    /// Advance to the next entry.
    ///
    /// The archive root and entries other than files and directories are skipped.
    pub fn next_entry(&mut self) -> Result<Option<EntryMetadata>> {
        while let Some(header) = self.archive.read_next()? {
            let path = normalize_path(&header.path).to_string();

            if path.is_empty() {
                continue;
            }
            if let EntryType::Other(kind) = header.entry_type {
                warn!("skipping {} of unsupported entry type {}", path, kind as char);
                continue;
            }

            let is_dir = header.is_directory();

            return Ok(Some(EntryMetadata {
                path,
                mode: header.mode,
                uid: header.uid,
                gid: header.gid,
                size: if is_dir { 0 } else { header.size },
                mtime: header.mtime,
                is_dir,
            }));
        }

        Ok(None)
    }
}

impl<R: Read> Read for DataEntries<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.archive.read(buf)
    }
}
