// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package file formats. */

use {
    crate::error::{PackagerError, Result},
    std::{path::Path, str::FromStr},
    tugger_package::Package,
};

/// A package file format.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PackageFormat {
    Deb,
    Rpm,
}

impl PackageFormat {
    pub const ALL: [Self; 2] = [Self::Deb, Self::Rpm];

    /// Filename extension, without leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Deb => "deb",
            Self::Rpm => "rpm",
        }
    }

    /// Resolve the format of a file from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        path.extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| PackagerError::UnknownFormat(path.display().to_string()))?
            .parse()
    }

    /// The conventional file name of a package in this format.
    pub fn filename(&self, package: &Package) -> String {
        match self {
            Self::Deb => package.deb_filename(),
            Self::Rpm => package.rpm_filename(),
        }
    }

    /// The architecture name this format records for a package.
    pub fn arch_name(&self, package: &Package) -> &'static str {
        match self {
            Self::Deb => package.arch.deb_name(),
            Self::Rpm => package.arch.rpm_name(),
        }
    }
}

impl FromStr for PackageFormat {
    type Err = PackagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "deb" => Ok(Self::Deb),
            "rpm" => Ok(Self::Rpm),
            _ => Err(PackagerError::UnknownFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, tugger_package::Arch};

    #[test]
    fn from_path() -> Result<()> {
        assert_eq!(
            PackageFormat::from_path("out/hello-1.0_amd64.deb")?,
            PackageFormat::Deb
        );
        assert_eq!(PackageFormat::from_path("hello.RPM")?, PackageFormat::Rpm);
        assert!(matches!(
            PackageFormat::from_path("hello.apk"),
            Err(PackagerError::UnknownFormat(_))
        ));
        assert!(PackageFormat::from_path("hello").is_err());

        Ok(())
    }

    #[test]
    fn filenames() {
        let mut package = Package::new("hello", "1.0");
        package.release = "2".into();
        package.arch = Arch::Amd64;

        assert_eq!(PackageFormat::Deb.filename(&package), "hello-1.0-2_amd64.deb");
        assert_eq!(PackageFormat::Rpm.filename(&package), "hello-1.0-2.x86_64.rpm");
        assert_eq!(PackageFormat::Rpm.arch_name(&package), "x86_64");
    }
}
