// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reading of .rpm package files. */

use {
    crate::{
        builder::{PAYLOAD_COMPRESSOR, PAYLOAD_FORMAT},
        error::{Result, RpmError},
        flags::{dependency_tags, flags_constraint, resource_flags},
        header::{section_padding, Header, IndexData},
        lead::Lead,
        tag::{IndexTag, SignatureTag, Tag},
    },
    chrono::{TimeZone, Utc},
    cpio_archive::NewcReader,
    flate2::read::GzDecoder,
    log::{debug, warn},
    std::{
        collections::BTreeMap,
        fs::File,
        io::{BufReader, Cursor, Read},
        path::{Path, PathBuf},
        str::FromStr,
    },
    tugger_package::{
        io::{digest_reader, DigestType, DigestingReader},
        Arch, Change, Dependency, DependencyKind, EntryMetadata, Extractor, Maintainer, Package,
        ResourceFlags, Scripts,
    },
};

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;

/// Strip the `./` and `/` prefixes payload paths are written with.
fn normalize_path(path: &str) -> &str {
    let mut path = path;
    while let Some(p) = path.strip_prefix("./") {
        path = p;
    }

    path.trim_start_matches('/')
}

/// A file described by the header's file arrays.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RpmFile {
    /// Absolute install path.
    pub path: String,
    pub size: u64,
    /// Mode including file type bits.
    pub mode: u32,
    pub mtime: u64,
    /// Hex MD5 of the content. Empty for directories.
    pub digest: String,
    pub flags: ResourceFlags,
    pub user_name: String,
    pub group_name: String,
}

impl RpmFile {
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }
}

/// A reader of `.rpm` package files.
///
/// Construction reads the lead, the signature and the header. The payload is
/// read lazily via [Self::into_entries].
pub struct RpmReader<R: Read> {
    lead: Lead,
    signature: Header<SignatureTag>,
    header: Header<IndexTag>,
    header_data: Vec<u8>,
    payload: R,
}

impl RpmReader<BufReader<File>> {
    /// Open a package file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufReader::new(File::open(path.as_ref())?))
    }
}

impl<R: Read> RpmReader<R> {
    /// Construct a new instance from a reader of an `.rpm` file.
    pub fn new(mut reader: R) -> Result<Self> {
        let lead = Lead::read(&mut reader)?;
        debug!("read lead of {}", lead.name());

        let (signature, signature_data) = Header::<SignatureTag>::read(&mut reader)?;
        let mut padding = vec![0u8; section_padding(signature_data.len())];
        reader.read_exact(&mut padding)?;

        let (header, header_data) = Header::<IndexTag>::read(&mut reader)?;
        debug!(
            "read signature ({} bytes) and header ({} bytes)",
            signature_data.len(),
            header_data.len()
        );

        // Older packages omit these tags and imply gzipped cpio.
        let format = header
            .get(IndexTag::PayloadFormat)
            .and_then(IndexData::as_str)
            .unwrap_or(PAYLOAD_FORMAT);
        if format != PAYLOAD_FORMAT {
            return Err(RpmError::UnsupportedPayload(format!("format {}", format)));
        }
        let compressor = header
            .get(IndexTag::PayloadCompressor)
            .and_then(IndexData::as_str)
            .unwrap_or(PAYLOAD_COMPRESSOR);
        if compressor != PAYLOAD_COMPRESSOR {
            return Err(RpmError::UnsupportedPayload(format!(
                "compressor {}",
                compressor
            )));
        }

        Ok(Self {
            lead,
            signature,
            header,
            header_data,
            payload: reader,
        })
    }

    pub fn lead(&self) -> &Lead {
        &self.lead
    }

    pub fn signature(&self) -> &Header<SignatureTag> {
        &self.signature
    }

    /// The immutable header.
    pub fn header(&self) -> &Header<IndexTag> {
        &self.header
    }

    /// The raw bytes of the immutable header.
    pub fn header_data(&self) -> &[u8] {
        &self.header_data
    }

    pub fn name(&self) -> Result<&str> {
        self.header.string(IndexTag::Name)
    }

    /// Version including the release, if any.
    pub fn full_version(&self) -> Result<String> {
        let version = self.header.string(IndexTag::Version)?;

        Ok(match self.header.string_or_empty(IndexTag::Release) {
            "" => version.to_string(),
            release => format!("{}-{}", version, release),
        })
    }

    pub fn arch(&self) -> &str {
        self.header.string_or_empty(IndexTag::Arch)
    }

    /// Files described by the header, in header order.
    pub fn files(&self) -> Result<Vec<RpmFile>> {
        let base_names = self.header.strings_or_empty(IndexTag::BaseNames);
        if base_names.is_empty() {
            return Ok(vec![]);
        }

        let dir_names = self.header.string_array(IndexTag::DirNames)?;
        let dir_indexes = self.header.i32s(IndexTag::DirIndexes)?;
        let sizes = self.header.i32s(IndexTag::FileSizes)?;
        let modes = self.header.i16s(IndexTag::FileModes)?;
        let mtimes = self.header.i32s(IndexTag::FileMTimes)?;
        let digests = self.header.strings_or_empty(IndexTag::FileDigests);
        let flags = self
            .header
            .get(IndexTag::FileFlags)
            .and_then(IndexData::as_i32s)
            .unwrap_or_default();
        let users = self.header.strings_or_empty(IndexTag::FileUserName);
        let groups = self.header.strings_or_empty(IndexTag::FileGroupName);

        base_names
            .iter()
            .enumerate()
            .map(|(i, base_name)| -> Result<RpmFile> {
                let dir_name = dir_indexes
                    .get(i)
                    .and_then(|index| dir_names.get(*index as usize))
                    .ok_or_else(|| RpmError::OffsetOutOfRange {
                        tag: IndexTag::DirIndexes.name().to_string(),
                        offset: i as i64,
                    })?;

                Ok(RpmFile {
                    path: format!("{}{}", dir_name, base_name),
                    size: sizes.get(i).copied().unwrap_or_default() as u32 as u64,
                    mode: modes.get(i).copied().unwrap_or_default() as u16 as u32,
                    mtime: mtimes.get(i).copied().unwrap_or_default() as u32 as u64,
                    digest: digests.get(i).cloned().unwrap_or_default(),
                    flags: resource_flags(flags.get(i).copied().unwrap_or_default()),
                    user_name: users.get(i).cloned().unwrap_or_default(),
                    group_name: groups.get(i).cloned().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Absolute paths of files described by the header.
    pub fn file_paths(&self) -> Result<Vec<String>> {
        Ok(self.files()?.into_iter().map(|f| f.path).collect())
    }

    /// Reconstruct the package metadata.
    ///
    /// Resources are not reconstructed. Their content lives in the payload.
    pub fn to_package(&self) -> Result<Package> {
        let header = &self.header;
        let mut package = Package::new(self.name()?, header.string(IndexTag::Version)?);

        package.release = header.string_or_empty(IndexTag::Release).to_string();
        package.arch = match self.arch() {
            "" => Arch::Noarch,
            arch => Arch::from_str(arch)?,
        };
        package.os = header.string_or_empty(IndexTag::Os).to_string();
        package.section = header.string_or_empty(IndexTag::Group).to_string();
        package.vendor = header.string_or_empty(IndexTag::Vendor).to_string();
        package.distrib = header.string_or_empty(IndexTag::Distribution).to_string();
        package.home = header.string_or_empty(IndexTag::Url).to_string();
        package.summary = header.string_or_empty(IndexTag::Summary).to_string();
        package.description = header.string_or_empty(IndexTag::Description).to_string();
        package.license = header.string_or_empty(IndexTag::License).to_string();
        package.packager = header.string_or_empty(IndexTag::Packager).to_string();
        package.build_host = header.string_or_empty(IndexTag::BuildHost).to_string();
        if let Ok(time) = header.i32(IndexTag::BuildTime) {
            if let Some(time) = Utc.timestamp_opt(time as u32 as i64, 0).single() {
                package.build_time = time;
            }
        }
        if !package.packager.is_empty() {
            package.maintainer = Maintainer::from_str(&package.packager).ok();
        }

        package.scripts = Scripts {
            pre_install: self.script(IndexTag::PreIn, IndexTag::PreInProg),
            post_install: self.script(IndexTag::PostIn, IndexTag::PostInProg),
            pre_remove: self.script(IndexTag::PreUn, IndexTag::PreUnProg),
            post_remove: self.script(IndexTag::PostUn, IndexTag::PostUnProg),
            check: self.script(IndexTag::VerifyScript, IndexTag::VerifyScriptProg),
        };

        for kind in DependencyKind::ALL {
            let (name_tag, version_tag, flags_tag) = match dependency_tags(kind) {
                Some(tags) => tags,
                None => continue,
            };

            let versions = header.strings_or_empty(version_tag);
            let flags = header
                .get(flags_tag)
                .and_then(IndexData::as_i32s)
                .unwrap_or_default();

            for (i, name) in header.strings_or_empty(name_tag).iter().enumerate() {
                let mut dependency = Dependency::new(kind, name);
                let constraint = flags_constraint(flags.get(i).copied().unwrap_or_default());

                match versions.get(i) {
                    Some(version) if !version.is_empty() => {
                        dependency = dependency.with_version(constraint, version);
                    }
                    _ => {}
                }

                package.dependencies.push(dependency);
            }
        }

        package.changes = self.changes();

        Ok(package)
    }

    fn script(&self, tag: IndexTag, program_tag: IndexTag) -> Option<String> {
        let body = self.header.get(tag).and_then(IndexData::as_str)?;

        Some(match self.header.get(program_tag).and_then(IndexData::as_str) {
            Some(program) if !body.starts_with("#!") => format!("#!{}\n{}", program, body),
            _ => body.to_string(),
        })
    }

    fn changes(&self) -> Vec<Change> {
        let times = self
            .header
            .get(IndexTag::ChangelogTime)
            .and_then(IndexData::as_i32s)
            .unwrap_or_default();
        let names = self.header.strings_or_empty(IndexTag::ChangelogName);
        let texts = self.header.strings_or_empty(IndexTag::ChangelogText);

        times
            .iter()
            .zip(names.iter().zip(texts.iter()))
            .map(|(time, (name, text))| {
                let (who, version) = match name.rsplit_once(" - ") {
                    Some((who, version)) => (who, version),
                    None => (name.as_str(), ""),
                };

                let mut summary = vec![];
                let mut entries: Vec<String> = vec![];
                for line in text.lines() {
                    if let Some(entry) = line.strip_prefix("- ") {
                        entries.push(entry.to_string());
                    } else if let (Some(last), Some(rest)) =
                        (entries.last_mut(), line.strip_prefix("  "))
                    {
                        last.push(' ');
                        last.push_str(rest.trim());
                    } else {
                        summary.push(line);
                    }
                }

                Change {
                    when: Utc
                        .timestamp_opt(*time as u32 as i64, 0)
                        .single()
                        .unwrap_or_default(),
                    summary: summary.join("\n"),
                    entries,
                    version: version.to_string(),
                    maintainer: Maintainer::from_str(who).ok(),
                }
            })
            .collect()
    }

    /// Obtain a cursor over entries of the payload.
    pub fn into_entries(self) -> PayloadEntries<R> {
        PayloadEntries::new(self.payload)
    }

    /// Verify the package against its recorded digests.
    ///
    /// The header is checked against `Sha1Header` first. Every payload entry
    /// is then checked against `FileDigests`, failing on the first mismatch.
    /// Finally the header and payload are checked against the signature `Md5`.
    pub fn verify(self) -> Result<()> {
        if let Some(expected) = self
            .signature
            .get(SignatureTag::Sha1Header)
            .and_then(IndexData::as_str)
        {
            let actual = DigestType::Sha1.digest(&self.header_data).digest_hex();
            if actual != expected {
                return Err(RpmError::SignatureMismatch {
                    tag: SignatureTag::Sha1Header.name().to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
            debug!("verified header digest");
        }

        let mut expected = BTreeMap::new();
        for file in self.files()? {
            if !file.is_dir() && !file.digest.is_empty() {
                expected.insert(normalize_path(&file.path).to_string(), file.digest);
            }
        }

        let expected_md5 = self
            .signature
            .get(SignatureTag::Md5)
            .and_then(IndexData::as_bytes)
            .map(|d| d.to_vec());

        // The signature covers header and payload, so digest both as one stream.
        let header_len = self.header_data.len() as u64;
        let mut source = DigestingReader::new(Cursor::new(self.header_data).chain(self.payload));
        std::io::copy(&mut (&mut source).take(header_len), &mut std::io::sink())?;

        let mut entries = PayloadEntries::new(source);
        while let Some(entry) = entries.next_entry()? {
            if entry.is_dir {
                continue;
            }

            let (_, digests) = digest_reader(&mut entries)?;

            match expected.remove(&entry.path) {
                Some(digest) => {
                    let actual = digests.md5.digest_hex();
                    if actual != digest {
                        return Err(RpmError::ChecksumMismatch {
                            path: format!("/{}", entry.path),
                            expected: digest,
                            actual,
                        });
                    }

                    debug!("verified {}", entry.path);
                }
                None => {
                    debug!("{} has no recorded digest", entry.path);
                }
            }
        }

        if let Some(path) = expected.keys().next() {
            return Err(RpmError::MissingPayloadEntry(format!("/{}", path)));
        }

        match (expected_md5, entries.into_inner()) {
            (Some(expected), Some(decoder)) => {
                let mut source = decoder.into_inner();
                std::io::copy(&mut source, &mut std::io::sink())?;
                let (_, _, digests) = source.finish();

                if digests.md5.digest_bytes() != expected.as_slice() {
                    return Err(RpmError::SignatureMismatch {
                        tag: SignatureTag::Md5.name().to_string(),
                        expected: hex::encode(&expected),
                        actual: digests.md5.digest_hex(),
                    });
                }
                debug!("verified signature digest");
            }
            (None, _) => {
                warn!("package has no signature digest");
            }
            (Some(_), None) => {}
        }

        Ok(())
    }

    /// Extract payload entries below a directory.
    ///
    /// Returns the filesystem paths written.
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

/// A cursor over entries of the gzipped cpio payload.
///
/// [Self::next_entry] advances to the next entry. The [Read] implementation
/// reads the content of the current entry.
pub struct PayloadEntries<R: Read> {
    archive: NewcReader<GzDecoder<R>>,
}

impl<R: Read> PayloadEntries<R> {
    fn new(payload: R) -> Self {
        Self {
            archive: NewcReader::new(GzDecoder::new(payload)),
        }
    }

    /// Advance to the next entry.
    pub fn next_entry(&mut self) -> Result<Option<EntryMetadata>> {
        while let Some(header) = self.archive.read_next()? {
            let path = normalize_path(&header.name).to_string();
            if path.is_empty() {
                continue;
            }

            let is_dir = header.is_directory();

            return Ok(Some(EntryMetadata {
                path,
                mode: header.mode,
                uid: header.uid,
                gid: header.gid,
                size: header.file_size as u64,
                mtime: header.mtime as u64,
                is_dir,
            }));
        }

        Ok(None)
    }

    /// The decompressing reader, once the trailer has been read.
    fn into_inner(self) -> Option<GzDecoder<R>> {
        self.archive.into_inner()
    }
}

impl<R: Read> Read for PayloadEntries<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.archive.read(buf)
    }
}
