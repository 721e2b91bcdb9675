// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Format-neutral package definition. */

use {
    crate::{
        error::{PackageError, PackageResult},
        resource::Resource,
    },
    chrono::{DateTime, Utc},
    std::{collections::HashSet, str::FromStr},
};

/// Environment variable holding the default maintainer name.
pub const MAINTAINER_NAME_ENV: &str = "PACK_MAINTAINER_NAME";

/// Environment variable holding the default maintainer email.
pub const MAINTAINER_MAIL_ENV: &str = "PACK_MAINTAINER_MAIL";

/// Machine architecture of a package.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Arch {
    /// Architecture independent.
    Noarch,
    I386,
    Amd64,
}

impl Arch {
    /// Name used in Debian control files and file names.
    pub fn deb_name(&self) -> &'static str {
        match self {
            Self::Noarch => "all",
            Self::I386 => "i386",
            Self::Amd64 => "amd64",
        }
    }

    /// Name used in RPM headers and file names.
    pub fn rpm_name(&self) -> &'static str {
        match self {
            Self::Noarch => "noarch",
            Self::I386 => "i386",
            Self::Amd64 => "x86_64",
        }
    }
}

impl FromStr for Arch {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "noarch" | "all" | "any" => Ok(Self::Noarch),
            "i386" | "i686" | "x86" => Ok(Self::I386),
            "amd64" | "x86_64" => Ok(Self::Amd64),
            _ => Err(PackageError::UnknownArchitecture(s.to_string())),
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.deb_name())
    }
}

/// A person responsible for a package, rendered as `Name <email>`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Maintainer {
    pub name: String,
    pub email: String,
}

impl Maintainer {
    pub fn new(name: impl ToString, email: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    /// Construct an instance from `PACK_MAINTAINER_NAME` and `PACK_MAINTAINER_MAIL`.
    ///
    /// Returns `None` if the name is not set.
    pub fn from_env() -> Option<Self> {
        let name = std::env::var(MAINTAINER_NAME_ENV).ok()?;
        let email = std::env::var(MAINTAINER_MAIL_ENV).unwrap_or_default();

        Some(Self::new(name, email))
    }
}

impl FromStr for Maintainer {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        Ok(match (s.find('<'), s.strip_suffix('>')) {
            (Some(start), Some(rest)) => Self::new(rest[0..start].trim(), &rest[start + 1..]),
            _ => Self::new(s, ""),
        })
    }
}

impl std::fmt::Display for Maintainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.email.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

/// The relationship a [Dependency] expresses.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DependencyKind {
    Requires,
    Recommends,
    Suggests,
    Enhances,
    Provides,
    Conflicts,
    Replaces,
    Breaks,
    Obsoletes,
}

impl DependencyKind {
    /// All variants, in canonical order.
    pub const ALL: [Self; 9] = [
        Self::Requires,
        Self::Recommends,
        Self::Suggests,
        Self::Enhances,
        Self::Provides,
        Self::Conflicts,
        Self::Replaces,
        Self::Breaks,
        Self::Obsoletes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Requires => "requires",
            Self::Recommends => "recommends",
            Self::Suggests => "suggests",
            Self::Enhances => "enhances",
            Self::Provides => "provides",
            Self::Conflicts => "conflicts",
            Self::Replaces => "replaces",
            Self::Breaks => "breaks",
            Self::Obsoletes => "obsoletes",
        }
    }
}

/// Version comparison of a [Dependency].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Constraint {
    Any,
    Equal,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Default for Constraint {
    fn default() -> Self {
        Self::Any
    }
}

impl Constraint {
    /// Parse an operator as written in package metadata.
    ///
    /// Accepts both the Debian (`<<`, `>>`) and RPM (`<`, `>`) spellings.
    pub fn from_operator(s: &str) -> Option<Self> {
        match s {
            "" => Some(Self::Any),
            "=" | "==" => Some(Self::Equal),
            "<" | "<<" => Some(Self::Less),
            "<=" => Some(Self::LessEqual),
            ">" | ">>" => Some(Self::Greater),
            ">=" => Some(Self::GreaterEqual),
            _ => None,
        }
    }
}

/// A relationship to another package.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub name: String,
    pub version: Option<String>,
    pub constraint: Constraint,
    pub arch: Option<String>,
}

impl Dependency {
    /// A dependency on any version of a package.
    pub fn new(kind: DependencyKind, name: impl ToString) -> Self {
        Self {
            kind,
            name: name.to_string(),
            version: None,
            constraint: Constraint::Any,
            arch: None,
        }
    }

    /// Constrain the dependency to a version.
    #[must_use]
    pub fn with_version(mut self, constraint: Constraint, version: impl ToString) -> Self {
        self.constraint = constraint;
        self.version = Some(version.to_string());
        self
    }

    #[must_use]
    pub fn with_arch(mut self, arch: impl ToString) -> Self {
        self.arch = Some(arch.to_string());
        self
    }

    /// The version if a constraint applies to it.
    pub fn constrained_version(&self) -> Option<&str> {
        match (&self.version, self.constraint) {
            (_, Constraint::Any) => None,
            (Some(version), _) => Some(version.as_str()),
            (None, _) => None,
        }
    }
}

/// One changelog block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Change {
    pub when: DateTime<Utc>,
    pub summary: String,
    pub entries: Vec<String>,
    /// Version the change was made in. Empty means the package version.
    pub version: String,
    /// Author of the change. `None` means the package maintainer.
    pub maintainer: Option<Maintainer>,
}

impl Change {
    pub fn new(when: DateTime<Utc>, entries: impl IntoIterator<Item = impl ToString>) -> Self {
        Self {
            when,
            summary: String::new(),
            entries: entries.into_iter().map(|e| e.to_string()).collect(),
            version: String::new(),
            maintainer: None,
        }
    }
}

/// Maintainer scripts run by the package manager.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Scripts {
    pub pre_install: Option<String>,
    pub post_install: Option<String>,
    pub pre_remove: Option<String>,
    pub post_remove: Option<String>,
    pub check: Option<String>,
}

/// Ensure a script body starts with an interpreter line.
pub fn normalize_script(body: &str, interpreter: &str) -> String {
    if body.starts_with("#!") {
        body.to_string()
    } else {
        format!("#!{}\n{}", interpreter, body)
    }
}

/// Returns the script body if it is present and not blank.
pub fn non_empty_script(script: &Option<String>) -> Option<&str> {
    script
        .as_deref()
        .filter(|s| !s.trim().is_empty())
}

/// Describes a piece of installable software.
#[derive(Clone, Debug)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: Arch,
    pub os: String,
    pub section: String,
    pub priority: String,
    pub essential: bool,
    pub vendor: String,
    pub distrib: String,
    pub home: String,
    /// Single line summary.
    pub summary: String,
    /// Long description. May contain blank lines separating paragraphs.
    pub description: String,
    /// Short license identifier.
    pub license: String,
    /// Rendered license text.
    pub license_body: Option<String>,
    /// Build-Using value.
    pub compiler: String,
    pub maintainer: Option<Maintainer>,
    pub packager: String,
    pub build_time: DateTime<Utc>,
    pub build_host: String,
    pub scripts: Scripts,
    pub dependencies: Vec<Dependency>,
    pub changes: Vec<Change>,
    pub resources: Vec<Resource>,
}

impl Package {
    /// Construct a package with a name and version and all else empty.
    ///
    /// The build time defaults to now, truncated to seconds.
    pub fn new(name: impl ToString, version: impl ToString) -> Self {
        let now = Utc::now();
        let build_time = now
            - chrono::Duration::nanoseconds(chrono::Timelike::nanosecond(&now) as i64);

        Self {
            name: name.to_string(),
            version: version.to_string(),
            release: String::new(),
            arch: Arch::Noarch,
            os: "linux".into(),
            section: String::new(),
            priority: String::new(),
            essential: false,
            vendor: String::new(),
            distrib: String::new(),
            home: String::new(),
            summary: String::new(),
            description: String::new(),
            license: String::new(),
            license_body: None,
            compiler: String::new(),
            maintainer: None,
            packager: String::new(),
            build_time,
            build_host: String::new(),
            scripts: Scripts::default(),
            dependencies: vec![],
            changes: vec![],
            resources: vec![],
        }
    }

    /// Version including the release, if any.
    pub fn full_version(&self) -> String {
        if self.release.is_empty() {
            self.version.clone()
        } else {
            format!("{}-{}", self.version, self.release)
        }
    }

    /// Build time as seconds since UNIX epoch.
    pub fn build_timestamp(&self) -> u64 {
        self.build_time.timestamp().max(0) as u64
    }

    /// File name of the Debian package.
    pub fn deb_filename(&self) -> String {
        format!("{}-{}_{}.deb", self.name, self.full_version(), self.arch.deb_name())
    }

    /// File name of the RPM package.
    pub fn rpm_filename(&self) -> String {
        format!("{}-{}.{}.rpm", self.name, self.full_version(), self.arch.rpm_name())
    }

    /// Whether a changelog should be synthesized.
    pub fn has_changelog(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Whether a license file should be synthesized.
    pub fn has_license(&self) -> bool {
        self.license_body
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }

    /// Dependencies of a given kind, in declaration order.
    pub fn dependencies_of(&self, kind: DependencyKind) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(move |d| d.kind == kind)
    }

    /// Sum of the sizes of staged resources.
    pub fn total_size(&self) -> u64 {
        self.resources
            .iter()
            .filter_map(|r| r.staged())
            .map(|s| s.size)
            .sum()
    }

    /// Path of a documentation file of this package, without a leading `/`.
    pub fn doc_path(&self, basename: &str) -> String {
        format!("usr/share/doc/{}/{}", self.name, basename)
    }

    /// Changes sorted newest first.
    ///
    /// Sorting is stable so blocks with equal times keep declaration order.
    pub fn sorted_changes(&self) -> Vec<&Change> {
        let mut changes = self.changes.iter().collect::<Vec<_>>();
        changes.sort_by(|a, b| b.when.cmp(&a.when));

        changes
    }

    /// Add a resource.
    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    /// Sort resources by target path.
    pub fn sort_resources(&mut self) {
        self.resources
            .sort_by(|a, b| a.relative_target().cmp(b.relative_target()));
    }

    /// Check that the package is complete enough to build.
    pub fn validate(&self) -> PackageResult<()> {
        if self.name.is_empty() {
            return Err(PackageError::MissingField("name"));
        }
        if self.version.is_empty() {
            return Err(PackageError::MissingField("version"));
        }
        if self.maintainer.is_none() {
            return Err(PackageError::MissingField("maintainer"));
        }
        if self.resources.is_empty() {
            return Err(PackageError::NoResources);
        }

        let mut seen = HashSet::new();
        for resource in &self.resources {
            let target = resource.relative_target();

            if target.is_empty() {
                return Err(PackageError::EmptyTarget);
            }
            if !seen.insert(target) {
                return Err(PackageError::DuplicateTarget(resource.absolute_target()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{io::DigestType, resource::StagedResource},
        chrono::TimeZone,
    };

    fn hello() -> Package {
        let mut package = Package::new("hello", "1.0");
        package.arch = Arch::Amd64;
        package.maintainer = Some(Maintainer::new("A", "a@x"));
        package.summary = "hi".into();
        package.add_resource(Resource::new("/usr/bin/hello", "X").with_perm(0o755));

        package
    }

    #[test]
    fn filenames() {
        let mut package = hello();
        assert_eq!(package.deb_filename(), "hello-1.0_amd64.deb");
        assert_eq!(package.rpm_filename(), "hello-1.0.x86_64.rpm");

        package.release = "2".into();
        package.arch = Arch::Noarch;
        assert_eq!(package.deb_filename(), "hello-1.0-2_all.deb");
        assert_eq!(package.rpm_filename(), "hello-1.0-2.noarch.rpm");
    }

    #[test]
    fn arch_parse() -> PackageResult<()> {
        assert_eq!(Arch::from_str("x86_64")?, Arch::Amd64);
        assert_eq!(Arch::from_str("all")?, Arch::Noarch);
        assert_eq!(Arch::from_str("i386")?.rpm_name(), "i386");
        assert!(matches!(
            Arch::from_str("sparc"),
            Err(PackageError::UnknownArchitecture(_))
        ));

        Ok(())
    }

    #[test]
    fn maintainer_parse() {
        let m = Maintainer::from_str("Jane Doe <jane@example.com>").unwrap();
        assert_eq!(m, Maintainer::new("Jane Doe", "jane@example.com"));
        assert_eq!(m.to_string(), "Jane Doe <jane@example.com>");

        let m = Maintainer::from_str("nobody").unwrap();
        assert_eq!(m.email, "");
        assert_eq!(m.to_string(), "nobody");
    }

    #[test]
    fn validation() {
        assert!(hello().validate().is_ok());

        let mut package = hello();
        package.maintainer = None;
        assert!(matches!(
            package.validate(),
            Err(PackageError::MissingField("maintainer"))
        ));

        let mut package = hello();
        package.resources.clear();
        assert!(matches!(package.validate(), Err(PackageError::NoResources)));

        let mut package = hello();
        package.add_resource(Resource::new("usr/bin/hello", "Y"));
        assert!(matches!(
            package.validate(),
            Err(PackageError::DuplicateTarget(t)) if t == "/usr/bin/hello"
        ));

        let mut package = hello();
        package.add_resource(Resource::new("/", ""));
        assert!(matches!(package.validate(), Err(PackageError::EmptyTarget)));
    }

    #[test]
    fn dependencies_filtered() {
        let mut package = hello();
        package.dependencies = vec![
            Dependency::new(DependencyKind::Requires, "libc6"),
            Dependency::new(DependencyKind::Conflicts, "goodbye"),
            Dependency::new(DependencyKind::Requires, "zlib")
                .with_version(Constraint::GreaterEqual, "1.2"),
        ];

        let names = package
            .dependencies_of(DependencyKind::Requires)
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["libc6", "zlib"]);
        assert_eq!(package.dependencies[0].constrained_version(), None);
        assert_eq!(package.dependencies[2].constrained_version(), Some("1.2"));
    }

    #[test]
    fn sizes_and_flags() -> PackageResult<()> {
        let mut package = hello();
        assert!(!package.has_changelog());
        assert!(!package.has_license());
        assert_eq!(package.total_size(), 0);

        package.license_body = Some("MIT".into());
        assert!(package.has_license());

        package.resources[0].record_staged(StagedResource {
            size: 1,
            mtime: 0,
            digest: DigestType::Md5.digest(b"X"),
            inode: 1,
        })?;
        assert_eq!(package.total_size(), 1);
        assert_eq!(package.doc_path("copyright"), "usr/share/doc/hello/copyright");

        Ok(())
    }

    #[test]
    fn changes_newest_first() {
        let mut package = hello();
        let old = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        package.changes = vec![Change::new(old, ["old"]), Change::new(new, ["new"])];

        let order = package
            .sorted_changes()
            .iter()
            .map(|c| c.entries[0].as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["new", "old"]);
    }

    #[test]
    fn scripts() {
        assert_eq!(normalize_script("echo hi\n", "/bin/sh"), "#!/bin/sh\necho hi\n");
        assert_eq!(
            normalize_script("#!/bin/bash\necho hi\n", "/bin/sh"),
            "#!/bin/bash\necho hi\n"
        );
        assert_eq!(non_empty_script(&Some("  \n".into())), None);
        assert_eq!(non_empty_script(&Some("x".into())), Some("x"));
        assert_eq!(non_empty_script(&None), None);
    }
}
