// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Create .rpm package files. */

use {
    crate::{
        changelog::ChangelogArrays,
        error::{Result, RpmError},
        flags::{constraint_flags, dependency_tags, file_flags},
        header::{section_padding, Header, IndexData},
        lead::Lead,
        tag::{IndexTag, SignatureTag, Tag},
    },
    cpio_archive::{NewcHeader, NewcWriter},
    log::{debug, info, warn},
    std::{collections::BTreeSet, io::Write},
    tugger_package::{
        io::{gzip_writer, DigestType, DigestingWriter},
        package::non_empty_script,
        BuildConfig, DependencyKind, Package, Resource, ResourceFlags, StagedResource,
        StagingBuffer,
    },
};

/// Payload format recorded in headers.
pub const PAYLOAD_FORMAT: &str = "cpio";

/// Payload compressor recorded in headers.
pub const PAYLOAD_COMPRESSOR: &str = "gzip";

/// Narrow a value to the signed 32-bit form headers store.
fn int32(tag: impl Tag, value: u64) -> Result<i32> {
    i32::try_from(value).map_err(|_| RpmError::ValueOverflow {
        tag: tag.name().to_string(),
        value,
    })
}

const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;

/// Add the license resource a package implies.
///
/// Resources are sorted by target afterwards and the package is validated.
pub fn add_synthetic_resources(package: &mut Package) -> Result<()> {
    if let Some(body) = package.license_body.clone().filter(|_| package.has_license()) {
        let target = package.doc_path("LICENSE");
        debug!("adding license {}", target);

        package.add_resource(
            Resource::new(target, body.into_bytes())
                .with_perm(0o644)
                .with_flags(ResourceFlags::REGULAR | ResourceFlags::LICENSE),
        );
    }

    package.sort_resources();
    package.validate()?;

    Ok(())
}

/// Split a script into its interpreter and body.
///
/// A `#!` line names the interpreter. Otherwise `default` is used and the
/// script is kept intact.
fn script_program<'a>(script: &'a str, default: &'a str) -> (&'a str, &'a str) {
    match script.strip_prefix("#!") {
        Some(rest) => {
            let (line, body) = rest.split_once('\n').unwrap_or((rest, ""));
            match line.split_whitespace().next() {
                Some(program) => (program, body),
                None => (default, body),
            }
        }
        None => (default, script),
    }
}

/// The name of a payload entry.
fn entry_name(relative_target: &str) -> String {
    format!("./{}", relative_target)
}

/// A builder for `.rpm` package files.
///
/// The payload is staged first, since the header records digests of its
/// content and the signature records digests of both.
pub struct RpmBuilder<'cfg, W: Write> {
    config: &'cfg BuildConfig,
    writer: W,
}

impl<'cfg, W: Write> RpmBuilder<'cfg, W> {
    pub fn new(config: &'cfg BuildConfig, writer: W) -> Self {
        Self { config, writer }
    }

    /// Build a complete package.
    ///
    /// The package gains its synthetic resources and its resources are staged.
    /// A package can therefore only be built once.
    pub fn build(mut self, package: &mut Package) -> Result<W> {
        add_synthetic_resources(package)?;

        let mut payload = self.stage_payload(package)?;
        let header = self.header(package)?.encode()?;
        let signature = Self::signature(&header, &mut payload)?.encode()?;

        let lead = Lead::new(&format!("{}-{}", package.name, package.full_version()));
        lead.write(&mut self.writer)?;

        info!("writing signature ({} bytes)", signature.len());
        self.writer.write_all(&signature)?;
        self.writer
            .write_all(&vec![0u8; section_padding(signature.len())])?;

        info!("writing header ({} bytes)", header.len());
        self.writer.write_all(&header)?;

        let size = payload.copy_to(&mut self.writer)?;
        info!("wrote payload ({} bytes)", size);
        self.writer.flush()?;

        Ok(self.writer)
    }

    /// Write the gzipped cpio payload to a staging buffer.
    ///
    /// Parent directories of resources are emitted before the first entry
    /// below them. Each resource has its size and digest recorded as it is
    /// copied.
    pub fn stage_payload(&self, package: &mut Package) -> Result<StagingBuffer> {
        let level = self.config.compression_level;
        let mtime = package.build_timestamp() as u32;

        let mut staging = self.config.staging_buffer()?;
        let mut cpio = NewcWriter::new(gzip_writer(&mut staging, level));
        let mut directories = BTreeSet::new();
        let mut inode = 0u32;

        for resource in package.resources.iter_mut() {
            let target = resource.relative_target().replace('\\', "/");

            let components = target.split('/').collect::<Vec<_>>();
            let mut parent = String::new();
            for component in &components[0..components.len() - 1] {
                if !parent.is_empty() {
                    parent.push('/');
                }
                parent.push_str(component);

                if directories.insert(parent.clone()) {
                    inode += 1;
                    debug!("adding directory {}", parent);
                    cpio.append_header(&self.entry_owner(
                        NewcHeader::directory(entry_name(&parent), 0o755)
                            .with_inode(inode)
                            .with_mtime(mtime),
                    ))?;
                }
            }

            inode += 1;

            let staged = if resource.flags.contains(ResourceFlags::DIR) {
                if directories.insert(target.clone()) {
                    cpio.append_header(&self.entry_owner(
                        NewcHeader::directory(entry_name(&target), resource.perm & 0o7777)
                            .with_inode(inode)
                            .with_mtime(mtime),
                    ))?;
                }

                StagedResource {
                    size: 0,
                    mtime: mtime as u64,
                    digest: DigestType::Md5.digest(b""),
                    inode,
                }
            } else {
                let (size, mut reader) = resource.content(level)?;
                let size = u32::try_from(size)
                    .map_err(|_| RpmError::Cpio(cpio_archive::Error::FieldOverflow(size)))?;

                cpio.append_header(&self.entry_owner(
                    NewcHeader::file(entry_name(&target), resource.perm & 0o7777, size)
                        .with_inode(inode)
                        .with_mtime(mtime),
                ))?;

                let mut writer = DigestingWriter::new(&mut cpio);
                std::io::copy(&mut reader, &mut writer)?;
                let (_, size, digests) = writer.finish();

                StagedResource {
                    size,
                    mtime: mtime as u64,
                    digest: digests.md5,
                    inode,
                }
            };

            resource.record_staged(staged)?;
        }

        cpio.finish()?.finish()?;
        info!("staged payload ({} bytes)", staging.len()?);

        Ok(staging)
    }

    fn entry_owner(&self, header: NewcHeader) -> NewcHeader {
        header.with_owner(self.config.uid, self.config.gid)
    }

    /// Materialize the immutable header of a staged package.
    pub fn header(&self, package: &Package) -> Result<Header<IndexTag>> {
        let mut header = Header::default();
        let string = |s: &str| IndexData::String(s.to_string());
        let i18n = |s: &str| IndexData::I18nString(vec![s.to_string()]);

        header.set(
            IndexTag::HeaderI18nTable,
            IndexData::StringArray(vec!["C".into()]),
        );
        header.set(IndexTag::Name, string(&package.name));
        header.set(IndexTag::Version, string(&package.version));
        header.set(IndexTag::Release, string(&package.release));
        header.set(IndexTag::Summary, i18n(&package.summary));
        header.set(IndexTag::Description, i18n(&package.description));
        header.set(IndexTag::Group, i18n(&package.section));
        header.set(
            IndexTag::BuildTime,
            IndexData::Int32(vec![int32(
                IndexTag::BuildTime,
                package.build_timestamp(),
            )?]),
        );
        header.set(IndexTag::BuildHost, string(&package.build_host));
        header.set(
            IndexTag::Size,
            IndexData::Int32(vec![int32(
                IndexTag::Size,
                package.total_size(),
            )?]),
        );
        header.set(IndexTag::Distribution, string(&package.distrib));
        header.set(IndexTag::Vendor, string(&package.vendor));
        header.set(IndexTag::License, string(&package.license));
        header.set(
            IndexTag::Packager,
            if package.packager.is_empty() {
                string(&package.maintainer.clone().unwrap_or_default().to_string())
            } else {
                string(&package.packager)
            },
        );
        header.set(IndexTag::Url, string(&package.home));
        header.set(
            IndexTag::Os,
            string(if package.os.is_empty() {
                &self.config.os
            } else {
                &package.os
            }),
        );
        header.set(IndexTag::Arch, string(package.arch.rpm_name()));

        self.set_scripts(&mut header, package);
        self.set_files(&mut header, package)?;
        self.set_dependencies(&mut header, package);

        let changelog = ChangelogArrays::from_package(package, self.config);
        header.set(IndexTag::ChangelogTime, IndexData::Int32(changelog.times));
        header.set(IndexTag::ChangelogName, IndexData::StringArray(changelog.names));
        header.set(IndexTag::ChangelogText, IndexData::StringArray(changelog.texts));

        header.set(IndexTag::PayloadFormat, string(PAYLOAD_FORMAT));
        header.set(IndexTag::PayloadCompressor, string(PAYLOAD_COMPRESSOR));
        header.set(
            IndexTag::PayloadFlags,
            string(&self.config.compression_level.to_string()),
        );

        debug!("materialized header with {} tags", header.len());

        Ok(header)
    }

    fn set_scripts(&self, header: &mut Header<IndexTag>, package: &Package) {
        let scripts = [
            (IndexTag::PreIn, IndexTag::PreInProg, &package.scripts.pre_install),
            (IndexTag::PostIn, IndexTag::PostInProg, &package.scripts.post_install),
            (IndexTag::PreUn, IndexTag::PreUnProg, &package.scripts.pre_remove),
            (IndexTag::PostUn, IndexTag::PostUnProg, &package.scripts.post_remove),
            (
                IndexTag::VerifyScript,
                IndexTag::VerifyScriptProg,
                &package.scripts.check,
            ),
        ];

        for (tag, program_tag, script) in scripts {
            if let Some(script) = non_empty_script(script) {
                let (program, body) = script_program(script, &self.config.interpreter);
                header.set(tag, IndexData::String(body.to_string()));
                header.set(program_tag, IndexData::String(program.to_string()));
            }
        }
    }

    fn set_files(&self, header: &mut Header<IndexTag>, package: &Package) -> Result<()> {
        let mut dir_names: Vec<String> = vec![];
        let mut dir_indexes = vec![];
        let mut base_names = vec![];
        let mut sizes = vec![];
        let mut modes = vec![];
        let mut mtimes = vec![];
        let mut digests = vec![];
        let mut inodes = vec![];
        let mut flags = vec![];
        let mut langs = vec![];

        for resource in &package.resources {
            let staged = resource.require_staged()?;
            let is_dir = resource.flags.contains(ResourceFlags::DIR);

            let dir_name = resource.dir_name();
            let index = match dir_names.iter().position(|d| *d == dir_name) {
                Some(index) => index,
                None => {
                    dir_names.push(dir_name);
                    dir_names.len() - 1
                }
            };

            dir_indexes.push(index as i32);
            base_names.push(resource.base_name().to_string());
            sizes.push(int32(IndexTag::FileSizes, staged.size)?);
            modes.push(
                ((resource.perm & 0o7777) | if is_dir { S_IFDIR } else { S_IFREG }) as u16 as i16,
            );
            mtimes.push(int32(IndexTag::FileMTimes, staged.mtime)?);
            digests.push(if is_dir {
                String::new()
            } else {
                staged.digest.digest_hex()
            });
            inodes.push(staged.inode as i32);
            flags.push(file_flags(resource.flags));
            langs.push(resource.language.clone().unwrap_or_default());
        }

        let count = base_names.len();
        let repeat = |s: &str| IndexData::StringArray(vec![s.to_string(); count]);

        header.set(IndexTag::BaseNames, IndexData::StringArray(base_names));
        header.set(IndexTag::DirNames, IndexData::StringArray(dir_names));
        header.set(IndexTag::DirIndexes, IndexData::Int32(dir_indexes));
        header.set(IndexTag::FileSizes, IndexData::Int32(sizes));
        header.set(IndexTag::FileModes, IndexData::Int16(modes));
        header.set(IndexTag::FileRDevs, IndexData::Int16(vec![0; count]));
        header.set(IndexTag::FileMTimes, IndexData::Int32(mtimes));
        header.set(IndexTag::FileDigests, IndexData::StringArray(digests));
        header.set(IndexTag::FileLinkTos, repeat(""));
        header.set(IndexTag::FileFlags, IndexData::Int32(flags));
        header.set(IndexTag::FileUserName, repeat(&self.config.user_name));
        header.set(IndexTag::FileGroupName, repeat(&self.config.group_name));
        header.set(IndexTag::FileDevices, IndexData::Int32(vec![0; count]));
        header.set(IndexTag::FileInodes, IndexData::Int32(inodes));
        header.set(IndexTag::FileLangs, IndexData::StringArray(langs));

        Ok(())
    }

    fn set_dependencies(&self, header: &mut Header<IndexTag>, package: &Package) {
        for kind in DependencyKind::ALL {
            let dependencies = package.dependencies_of(kind).collect::<Vec<_>>();
            if dependencies.is_empty() {
                continue;
            }

            let (name_tag, version_tag, flags_tag) = match dependency_tags(kind) {
                Some(tags) => tags,
                None => {
                    warn!(
                        "rpm has no {} relationship; ignoring {} dependencies",
                        kind.name(),
                        dependencies.len()
                    );
                    continue;
                }
            };

            header.set(
                name_tag,
                IndexData::StringArray(dependencies.iter().map(|d| d.name.clone()).collect()),
            );
            header.set(
                version_tag,
                IndexData::StringArray(
                    dependencies
                        .iter()
                        .map(|d| d.constrained_version().unwrap_or_default().to_string())
                        .collect(),
                ),
            );
            header.set(
                flags_tag,
                IndexData::Int32(
                    dependencies
                        .iter()
                        .map(|d| constraint_flags(d.constraint))
                        .collect(),
                ),
            );
        }
    }

    /// Materialize the signature of an encoded header and a staged payload.
    pub fn signature(header: &[u8], payload: &mut StagingBuffer) -> Result<Header<SignatureTag>> {
        let mut writer = DigestingWriter::new(std::io::sink());
        writer.write_all(header)?;
        payload.copy_to(&mut writer)?;
        let (_, total, digests) = writer.finish();

        let mut signature = Header::default();
        signature.set(
            SignatureTag::HeaderSize,
            IndexData::Int32(vec![int32(
                SignatureTag::HeaderSize,
                header.len() as u64,
            )?]),
        );
        signature.set(
            SignatureTag::PayloadSize,
            IndexData::Int32(vec![int32(
                SignatureTag::PayloadSize,
                total - header.len() as u64,
            )?]),
        );
        signature.set(
            SignatureTag::Sha1Header,
            IndexData::String(DigestType::Sha1.digest(header).digest_hex()),
        );
        signature.set(
            SignatureTag::Sha256Header,
            IndexData::String(DigestType::Sha256.digest(header).digest_hex()),
        );
        signature.set(
            SignatureTag::Md5,
            IndexData::Binary(digests.md5.digest_bytes().to_vec()),
        );

        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::header::SECTION_MAGIC,
        cpio_archive::NewcReader,
        std::io::Read,
        tugger_package::{io::gunzip_reader, Dependency, Maintainer},
    };

    fn package() -> Package {
        let mut package = Package::new("hello", "1.0");
        package.arch = tugger_package::Arch::Amd64;
        package.maintainer = Some(Maintainer::new("A", "a@x"));
        package.summary = "hi".into();
        package.add_resource(Resource::new("/usr/bin/hello", "X").with_perm(0o755));
        package
    }

    #[test]
    fn scripts_split_interpreter() {
        assert_eq!(
            script_program("#!/bin/bash -e\necho hi\n", "/bin/sh"),
            ("/bin/bash", "echo hi\n")
        );
        assert_eq!(script_program("echo hi", "/bin/sh"), ("/bin/sh", "echo hi"));
    }

    #[test]
    fn payload_entries() -> Result<()> {
        let config = BuildConfig::default();
        let mut package = package();
        package.add_resource(Resource::new("/usr/lib/hello/data", "abc"));
        package.sort_resources();

        let builder = RpmBuilder::new(&config, vec![]);
        let mut payload = builder.stage_payload(&mut package)?;

        let data = payload.to_vec()?;
        let mut reader = NewcReader::new(gunzip_reader(data.as_slice()));
        let mut entries = vec![];
        while let Some(header) = reader.read_next()? {
            let mut data = vec![];
            reader.read_to_end(&mut data)?;
            entries.push((header.name.clone(), header.mode, header.inode, data));
        }

        assert_eq!(
            entries
                .iter()
                .map(|(name, mode, inode, _)| (name.as_str(), *mode, *inode))
                .collect::<Vec<_>>(),
            vec![
                ("./usr", 0o040755, 1),
                ("./usr/bin", 0o040755, 2),
                ("./usr/bin/hello", 0o100755, 3),
                ("./usr/lib", 0o040755, 4),
                ("./usr/lib/hello", 0o040755, 5),
                ("./usr/lib/hello/data", 0o100644, 6),
            ]
        );
        assert_eq!(entries[2].3, b"X");
        assert_eq!(package.resources[1].require_staged()?.inode, 6);

        Ok(())
    }

    #[test]
    fn minimal_header() -> Result<()> {
        let config = BuildConfig::default();
        let mut package = package();
        let data = RpmBuilder::new(&config, vec![]).build(&mut package)?;

        let lead = Lead::read(&mut &data[..])?;
        assert_eq!(lead.name(), "hello-1.0");

        let mut reader = &data[96..];
        let (signature, raw_signature) = Header::<SignatureTag>::read(&mut reader)?;
        let padding = section_padding(raw_signature.len());
        reader = &reader[padding..];
        assert_eq!(&reader[0..8], &SECTION_MAGIC);

        let (header, raw_header) = Header::<IndexTag>::read(&mut reader)?;
        assert_eq!(header.string(IndexTag::Name)?, "hello");
        assert_eq!(header.string(IndexTag::Version)?, "1.0");
        assert_eq!(header.string(IndexTag::Arch)?, "x86_64");
        assert_eq!(header.i32(IndexTag::Size)?, 1);
        assert_eq!(header.string_array(IndexTag::BaseNames)?, &["hello".to_string()]);
        assert_eq!(header.string_array(IndexTag::DirNames)?, &["/usr/bin/".to_string()]);
        assert_eq!(header.i32s(IndexTag::DirIndexes)?, &[0]);
        assert_eq!(header.string(IndexTag::PayloadFormat)?, "cpio");
        assert_eq!(header.string(IndexTag::PayloadCompressor)?, "gzip");
        assert_eq!(header.string(IndexTag::PayloadFlags)?, "9");
        assert_eq!(header.i16s(IndexTag::FileModes)?, &[0o100755u32 as u16 as i16]);
        assert_eq!(header.string(IndexTag::Packager)?, "A <a@x>");
        assert!(header.get(IndexTag::Release).is_none());

        assert_eq!(signature.i32(SignatureTag::HeaderSize)?, raw_header.len() as i32);
        assert_eq!(signature.i32(SignatureTag::PayloadSize)?, reader.len() as i32);

        let mut signed = raw_header.clone();
        signed.extend_from_slice(reader);
        assert_eq!(
            signature.binary(SignatureTag::Md5)?,
            DigestType::Md5.digest(&signed).digest_bytes()
        );
        assert_eq!(
            signature.string(SignatureTag::Sha1Header)?,
            DigestType::Sha1.digest(&raw_header).digest_hex()
        );

        Ok(())
    }

    #[test]
    fn sizes_beyond_i32_rejected() -> Result<()> {
        let config = BuildConfig::default();
        let mut package = package();
        package.resources[0].record_staged(StagedResource {
            size: 3 << 30,
            mtime: 0,
            digest: DigestType::Md5.digest(b""),
            inode: 1,
        })?;

        match RpmBuilder::new(&config, vec![]).header(&package) {
            Err(e @ RpmError::ValueOverflow { .. }) => {
                assert_eq!(e.kind(), tugger_package::ErrorKind::InvalidPackage);
                assert!(e.to_string().contains("Size"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            int32(SignatureTag::PayloadSize, u32::MAX as u64),
            Err(RpmError::ValueOverflow { value: 4294967295, .. })
        ));
        assert_eq!(int32(SignatureTag::PayloadSize, i32::MAX as u64)?, i32::MAX);

        Ok(())
    }

    #[test]
    fn dependencies_and_scripts() -> Result<()> {
        let config = BuildConfig::default();
        let mut package = package();
        package.dependencies = vec![
            Dependency::new(DependencyKind::Requires, "libc"),
            Dependency::new(DependencyKind::Requires, "python3")
                .with_version(tugger_package::Constraint::GreaterEqual, "3.8"),
            Dependency::new(DependencyKind::Breaks, "old"),
        ];
        package.scripts.post_install = Some("ldconfig\n".into());
        package.license_body = Some("MIT".into());

        add_synthetic_resources(&mut package)?;
        let builder = RpmBuilder::new(&config, vec![]);
        builder.stage_payload(&mut package)?;
        let header = builder.header(&package)?;

        assert_eq!(
            header.string_array(IndexTag::RequireName)?,
            &["libc".to_string(), "python3".to_string()]
        );
        assert_eq!(
            header.string_array(IndexTag::RequireVersion)?,
            &["".to_string(), "3.8".to_string()]
        );
        assert_eq!(header.i32s(IndexTag::RequireFlags)?, &[0, 12]);
        assert_eq!(header.string(IndexTag::PostIn)?, "ldconfig\n");
        assert_eq!(header.string(IndexTag::PostInProg)?, "/bin/sh");

        assert_eq!(
            header.string_array(IndexTag::BaseNames)?,
            &["hello".to_string(), "LICENSE".to_string()]
        );
        assert_eq!(header.i32s(IndexTag::FileFlags)?, &[0, 128]);
        assert_eq!(
            header.string_array(IndexTag::DirNames)?,
            &["/usr/bin/".to_string(), "/usr/share/doc/hello/".to_string()]
        );

        Ok(())
    }
}
