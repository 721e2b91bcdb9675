// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Building packages of either format. */

use {
    crate::{error::Result, format::PackageFormat},
    debian_packaging::deb::builder::DebBuilder,
    log::{info, warn},
    rpm_packaging::RpmBuilder,
    std::{
        fs::File,
        io::{BufWriter, Write},
        path::{Path, PathBuf},
    },
    tugger_package::{BuildConfig, Package},
};

/// A builder of a package file in a specific format.
pub enum PackageBuilder<'cfg, W: Write> {
    Deb(DebBuilder<'cfg, W>),
    Rpm(RpmBuilder<'cfg, W>),
}

impl<'cfg, W: Write> PackageBuilder<'cfg, W> {
    /// Construct a builder of `format` writing to `writer`.
    pub fn new(format: PackageFormat, config: &'cfg BuildConfig, writer: W) -> Result<Self> {
        Ok(match format {
            PackageFormat::Deb => Self::Deb(DebBuilder::new(config, writer)?),
            PackageFormat::Rpm => Self::Rpm(RpmBuilder::new(config, writer)),
        })
    }

    pub fn format(&self) -> PackageFormat {
        match self {
            Self::Deb(_) => PackageFormat::Deb,
            Self::Rpm(_) => PackageFormat::Rpm,
        }
    }

    /// The file name the package will conventionally be written to.
    pub fn filename(&self, package: &Package) -> String {
        self.format().filename(package)
    }

    /// Emit the package, returning the destination writer.
    ///
    /// On error the destination holds a partial archive and should be discarded.
    pub fn build(self, package: &mut Package) -> Result<W> {
        match self {
            Self::Deb(builder) => Ok(builder.build(package)?),
            Self::Rpm(builder) => Ok(builder.build(package)?),
        }
    }
}

/// Build a package into a writer.
pub fn build<W: Write>(
    format: PackageFormat,
    config: &BuildConfig,
    package: &mut Package,
    writer: W,
) -> Result<W> {
    PackageBuilder::new(format, config, writer)?.build(package)
}

fn write_file(
    format: PackageFormat,
    config: &BuildConfig,
    package: &mut Package,
    path: &Path,
) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    let mut writer = build(format, config, package, writer)?;
    writer.flush()?;

    Ok(())
}

/// Build a package into a file named after it below `dest_dir`.
///
/// A partially written file is removed on error. Returns the path written.
pub fn build_file(
    format: PackageFormat,
    config: &BuildConfig,
    package: &mut Package,
    dest_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let path = dest_dir.as_ref().join(format.filename(package));
    info!("writing {}", path.display());

    match write_file(format, config, package, &path) {
        Ok(()) => Ok(path),
        Err(e) => {
            if path.exists() {
                if let Err(remove) = std::fs::remove_file(&path) {
                    warn!("unable to remove {}: {}", path.display(), remove);
                }
            }

            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::error::PackagerError,
        tugger_package::{Arch, ErrorKind, Maintainer, Resource},
    };

    fn package() -> Package {
        let mut package = Package::new("hello", "1.0");
        package.arch = Arch::Amd64;
        package.maintainer = Some(Maintainer::new("A", "a@x"));
        package.summary = "hi".into();
        package.add_resource(Resource::new("/usr/bin/hello", "X").with_perm(0o755));
        package
    }

    #[test]
    fn build_both_formats() -> Result<()> {
        let config = BuildConfig::default();

        let deb = build(PackageFormat::Deb, &config, &mut package(), vec![])?;
        assert!(deb.starts_with(b"!<arch>\n"));

        let rpm = build(PackageFormat::Rpm, &config, &mut package(), vec![])?;
        assert_eq!(&rpm[0..4], &[0xed, 0xab, 0xee, 0xdb]);

        Ok(())
    }

    #[test]
    fn files_named_after_package() -> Result<()> {
        let config = BuildConfig::default();
        let td = tempfile::tempdir()?;

        let path = build_file(PackageFormat::Rpm, &config, &mut package(), td.path())?;
        assert_eq!(path, td.path().join("hello-1.0.x86_64.rpm"));
        assert!(path.metadata()?.len() > 96);

        Ok(())
    }

    #[test]
    fn failed_build_leaves_no_file() -> Result<()> {
        let config = BuildConfig::default();
        let td = tempfile::tempdir()?;

        let mut package = package();
        package.resources.clear();

        let res = build_file(PackageFormat::Deb, &config, &mut package, td.path());
        match res {
            Err(e @ PackagerError::Debian(_)) => assert_eq!(e.kind(), ErrorKind::InvalidPackage),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!td.path().join("hello-1.0_amd64.deb").exists());

        Ok(())
    }
}
