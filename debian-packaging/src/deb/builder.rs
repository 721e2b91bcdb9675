// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Create .deb package files and their components. */

use {
    crate::{
        binary_package_control::BinaryPackageControlFile,
        changelog::Changelog,
        deb::{DebCompression, DebState, DEBIAN_BINARY},
        error::{DebianError, Result},
    },
    ar_archive::{ArHeader, ArWriter},
    log::{debug, info},
    std::io::Write,
    tugger_package::{
        io::{gzip_writer, DigestType, DigestingWriter},
        normalize_script,
        package::non_empty_script,
        BuildConfig, Package, Resource, ResourceFlags, StagedResource, StagingBuffer,
    },
    ustar_archive::{TarHeader, TarWriter},
};

/// Maintainer script members of `control.tar` and the package scripts they hold.
fn maintainer_scripts(package: &Package) -> [(&'static str, Option<&str>); 4] {
    [
        ("preinst", non_empty_script(&package.scripts.pre_install)),
        ("postinst", non_empty_script(&package.scripts.post_install)),
        ("prerm", non_empty_script(&package.scripts.pre_remove)),
        ("postrm", non_empty_script(&package.scripts.post_remove)),
    ]
}

/// Add the changelog and copyright resources a package implies.
///
/// Resources are sorted by target afterwards and the package is validated.
pub fn add_synthetic_resources(package: &mut Package, config: &BuildConfig) -> Result<()> {
    if package.has_changelog() {
        let data = Changelog::from_package(package, config).to_gzip(config.compression_level)?;
        let target = package.doc_path("changelog.gz");
        debug!("adding changelog {} ({} bytes)", target, data.len());

        package.add_resource(
            Resource::new(target, data)
                .with_perm(0o644)
                .with_flags(ResourceFlags::REGULAR | ResourceFlags::DOC),
        );
    }

    if let Some(body) = package.license_body.clone().filter(|_| package.has_license()) {
        let target = package.doc_path("copyright");
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

/// A builder for a `.deb` package file.
///
/// Members are emitted in the order `debian-binary`, `control.tar.gz`,
/// `data.tar.gz`. The data archive is staged before anything is written because
/// the control archive records digests of its content.
pub struct DebBuilder<'cfg, W: Write> {
    config: &'cfg BuildConfig,
    archive: ArWriter<W>,
    state: DebState,
    compression: DebCompression,
    data: Option<StagingBuffer>,
}

impl<'cfg, W: Write> DebBuilder<'cfg, W> {
    /// Construct a new instance writing to `writer`.
    pub fn new(config: &'cfg BuildConfig, writer: W) -> Result<Self> {
        Ok(Self {
            config,
            archive: ArWriter::new(writer)?,
            state: DebState::Initial,
            compression: DebCompression::Gzip,
            data: None,
        })
    }

    /// The member writing progress.
    pub fn state(&self) -> DebState {
        self.state
    }

    fn advance(&mut self, from: DebState) {
        assert_eq!(
            self.state, from,
            "deb members must be written in order; in state {:?}",
            self.state
        );
        self.state = from.next();
    }

    fn member_header(&self, name: &str, size: u64, package: &Package) -> ArHeader {
        ArHeader::new(name, size)
            .with_mode(0o100644)
            .with_owner(0, 0)
            .with_mtime(package.build_timestamp())
    }

    fn tar_owner(&self, header: TarHeader) -> TarHeader {
        header.with_owner(
            self.config.uid,
            self.config.gid,
            &self.config.user_name,
            &self.config.group_name,
        )
    }

    /// Build a complete package.
    ///
    /// The package gains its synthetic resources and its resources are staged.
    /// A package can therefore only be built once.
    pub fn build(mut self, package: &mut Package) -> Result<W> {
        add_synthetic_resources(package, self.config)?;

        self.stage_data(package)?;
        self.write_debian_binary(package)?;
        self.write_control(package)?;
        self.write_data(package)?;

        self.finish()
    }

    /// Write the gzipped `data.tar` to a staging buffer.
    ///
    /// Each resource has its size and digest recorded as it is copied.
    pub fn stage_data(&mut self, package: &mut Package) -> Result<()> {
        let level = self.config.compression_level;
        let mtime = package.build_timestamp();

        let mut staging = self.config.staging_buffer()?;
        let mut tar = TarWriter::new(gzip_writer(&mut staging, level))
            .with_implicit_directories(self.tar_owner(
                TarHeader::directory("").with_mode(0o755).with_mtime(mtime),
            ));

        for (i, resource) in package.resources.iter_mut().enumerate() {
            let staged = if resource.flags.contains(ResourceFlags::DIR) {
                let header = self.tar_owner(
                    TarHeader::directory(resource.relative_target())
                        .with_mode(resource.perm & 0o7777)
                        .with_mtime(mtime),
                );
                tar.append_header(&header)?;

                StagedResource {
                    size: 0,
                    mtime,
                    digest: DigestType::Md5.digest(b""),
                    inode: i as u32 + 1,
                }
            } else {
                let (size, mut reader) = resource.content(level)?;
                let header = self.tar_owner(
                    TarHeader::file(resource.relative_target(), size)
                        .with_mode(resource.perm & 0o7777)
                        .with_mtime(mtime),
                );
                tar.append_header(&header)?;

                let mut writer = DigestingWriter::new(&mut tar);
                std::io::copy(&mut reader, &mut writer)?;
                let (_, size, digests) = writer.finish();

                StagedResource {
                    size,
                    mtime,
                    digest: digests.md5,
                    inode: i as u32 + 1,
                }
            };

            resource.record_staged(staged)?;
        }

        tar.finish()?.finish()?;

        info!(
            "staged data.tar{} ({} bytes)",
            self.compression.extension(),
            staging.len()?
        );
        self.data = Some(staging);

        Ok(())
    }

    /// Write the `debian-binary` member.
    pub fn write_debian_binary(&mut self, package: &Package) -> Result<()> {
        self.advance(DebState::Initial);

        let header = self.member_header("debian-binary", DEBIAN_BINARY.len() as u64, package);
        self.archive.append(&header, &mut &DEBIAN_BINARY[..])?;

        Ok(())
    }

    /// Write the `control.tar.gz` member.
    ///
    /// Resources must have been staged.
    pub fn write_control(&mut self, package: &Package) -> Result<()> {
        self.advance(DebState::DebianWritten);

        let data = self.control_tar(package)?;
        let name = format!("control.tar{}", self.compression.extension());
        info!("writing {} ({} bytes)", name, data.len());

        let header = self.member_header(&name, data.len() as u64, package);
        self.archive.append(&header, &mut &data[..])?;

        Ok(())
    }

    /// Write the staged `data.tar.gz` member.
    pub fn write_data(&mut self, package: &Package) -> Result<()> {
        self.advance(DebState::ControlWritten);

        let mut data = self
            .data
            .take()
            .ok_or(DebianError::DebMissingMember("data.tar"))?;

        let name = format!("data.tar{}", self.compression.extension());
        let size = data.len()?;
        info!("writing {} ({} bytes)", name, size);

        let header = self.member_header(&name, size, package);
        self.archive.write_header(&header)?;
        data.copy_to(&mut self.archive)?;

        Ok(())
    }

    /// Finish the archive, returning the destination writer.
    pub fn finish(mut self) -> Result<W> {
        self.advance(DebState::DataWritten);

        Ok(self.archive.finish()?)
    }

    /// Produce the gzipped `control.tar`.
    fn control_tar(&self, package: &Package) -> Result<Vec<u8>> {
        let mtime = package.build_timestamp();
        let installed_size = package.total_size() / 1024;

        let mut control = vec![];
        BinaryPackageControlFile::from_package(package, installed_size).write(&mut control)?;

        let mut md5sums = String::new();
        let mut conffiles = String::new();
        for resource in &package.resources {
            if resource.flags.contains(ResourceFlags::DIR) {
                continue;
            }

            let staged = resource.require_staged()?;
            md5sums.push_str(&format!(
                "{}  ./{}\n",
                staged.digest.digest_hex(),
                resource.relative_target()
            ));

            if resource.flags.contains(ResourceFlags::CONFIG) {
                conffiles.push_str(&resource.absolute_target());
                conffiles.push('\n');
            }
        }

        let mut members = vec![
            ("control", control, 0o644),
            ("md5sums", md5sums.into_bytes(), 0o644),
        ];
        if !conffiles.is_empty() {
            members.push(("conffiles", conffiles.into_bytes(), 0o644));
        }
        for (name, script) in maintainer_scripts(package) {
            if let Some(script) = script {
                let body = normalize_script(script, &self.config.interpreter);
                members.push((name, body.into_bytes(), 0o755));
            }
        }
        if non_empty_script(&package.scripts.check).is_some() {
            debug!("deb packages have no verify script; ignoring check script");
        }

        let mut tar = TarWriter::new(gzip_writer(vec![], self.config.compression_level));
        for (name, data, mode) in members {
            let header = self.tar_owner(
                TarHeader::file(name, data.len() as u64)
                    .with_mode(mode)
                    .with_mtime(mtime),
            );
            tar.append(&header, &mut &data[..])?;
        }

        Ok(tar.finish()?.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::io::{Cursor, Read},
        tugger_package::{io::gunzip_reader, Maintainer},
    };

    fn package() -> Package {
        let mut package = Package::new("hello", "1.0");
        package.maintainer = Some(Maintainer::new("A", "a@x"));
        package.summary = "hi".into();
        package.add_resource(Resource::new("/usr/bin/hello", "X").with_perm(0o755));
        package
    }

    fn ar_members(data: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
        let mut archive = ar::Archive::new(Cursor::new(data));
        let mut members = vec![];

        while let Some(entry) = archive.next_entry() {
            let mut entry = entry?;
            let name = String::from_utf8_lossy(entry.header().identifier()).to_string();
            let mut data = vec![];
            entry.read_to_end(&mut data)?;
            members.push((name, data));
        }

        Ok(members)
    }

    fn tar_paths(gz: &[u8]) -> Result<Vec<(String, u32)>> {
        let mut archive = tar::Archive::new(gunzip_reader(gz));
        let mut paths = vec![];

        for entry in archive.entries()? {
            let entry = entry?;
            paths.push((
                entry.path()?.display().to_string(),
                entry.header().mode()?,
            ));
        }

        Ok(paths)
    }

    #[test]
    fn minimal_layout() -> Result<()> {
        let config = BuildConfig::default();
        let mut package = package();

        let data = DebBuilder::new(&config, vec![])?.build(&mut package)?;

        let members = ar_members(&data)?;
        assert_eq!(
            members.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            vec!["debian-binary", "control.tar.gz", "data.tar.gz"]
        );
        assert_eq!(members[0].1, b"2.0\n");

        assert_eq!(
            tar_paths(&members[1].1)?,
            vec![("control".to_string(), 0o644), ("md5sums".to_string(), 0o644)]
        );
        assert_eq!(
            tar_paths(&members[2].1)?,
            vec![
                ("usr/".to_string(), 0o755),
                ("usr/bin/".to_string(), 0o755),
                ("usr/bin/hello".to_string(), 0o755)
            ]
        );

        let staged = package.resources[0].require_staged()?;
        assert_eq!(staged.size, 1);
        assert_eq!(staged.digest.digest_hex(), "02129bb861061d1a052c592e2dc6b383");

        Ok(())
    }

    #[test]
    fn control_members() -> Result<()> {
        let config = BuildConfig::default();
        let mut package = package();
        package.add_resource(
            Resource::new("/etc/hello.conf", "k=v\n")
                .with_flags(ResourceFlags::REGULAR | ResourceFlags::CONFIG),
        );
        package.scripts.post_install = Some("echo hi\n".into());
        package.scripts.pre_remove = Some("  \n".into());

        let data = DebBuilder::new(&config, vec![])?.build(&mut package)?;
        let members = ar_members(&data)?;

        let mut archive = tar::Archive::new(gunzip_reader(&members[1].1[..]));
        let mut files = vec![];
        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = entry.path()?.display().to_string();
            let mode = entry.header().mode()?;
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            files.push((path, mode, content));
        }

        assert_eq!(
            files.iter().map(|(p, _, _)| p.as_str()).collect::<Vec<_>>(),
            vec!["control", "md5sums", "conffiles", "postinst"]
        );
        assert!(files[0].2.contains("Package: hello\n"));
        assert!(files[0].2.contains("Installed-Size: 0\n"));
        assert_eq!(
            files[1].2,
            format!(
                "{}  ./etc/hello.conf\n02129bb861061d1a052c592e2dc6b383  ./usr/bin/hello\n",
                DigestType::Md5.digest(b"k=v\n").digest_hex()
            )
        );
        assert_eq!(files[2].2, "/etc/hello.conf\n");
        assert_eq!(files[3].1, 0o755);
        assert_eq!(files[3].2, "#!/bin/sh\necho hi\n");

        Ok(())
    }

    #[test]
    fn changelog_and_license_synthesized() -> Result<()> {
        let config = BuildConfig::default();
        let mut package = package();
        package.license_body = Some("Public domain.\n".into());
        package.changes = vec![tugger_package::Change::new(
            package.build_time,
            ["initial"],
        )];

        DebBuilder::new(&config, vec![])?.build(&mut package)?;

        assert_eq!(
            package
                .resources
                .iter()
                .map(|r| r.target.as_str())
                .collect::<Vec<_>>(),
            vec![
                "/usr/bin/hello",
                "usr/share/doc/hello/changelog.gz",
                "usr/share/doc/hello/copyright"
            ]
        );

        Ok(())
    }

    #[test]
    #[should_panic(expected = "deb members must be written in order")]
    fn skipping_a_member_panics() {
        let config = BuildConfig::default();
        let package = package();

        if let Ok(mut builder) = DebBuilder::new(&config, vec![]) {
            let _ = builder.write_control(&package);
        }
    }

    #[test]
    fn duplicate_targets_rejected() -> Result<()> {
        let config = BuildConfig::default();
        let mut package = package();
        package.add_resource(Resource::new("usr/bin/hello", "Y"));

        let res = DebBuilder::new(&config, vec![])?.build(&mut package);
        assert!(matches!(
            res,
            Err(crate::error::DebianError::Package(
                tugger_package::PackageError::DuplicateTarget(_)
            ))
        ));

        Ok(())
    }
}
