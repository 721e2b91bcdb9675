// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian binary package control files. */

use {
    crate::{
        changelog::format_date,
        control::{ControlField, ControlParagraph},
        error::{DebianError, Result},
    },
    chrono::{DateTime, Utc},
    log::warn,
    std::{
        borrow::Cow,
        ops::{Deref, DerefMut},
    },
    tugger_package::{Arch, Constraint, Dependency, DependencyKind, Maintainer, Package},
};

/// Control fields holding dependency lists and the relationship they express.
///
/// Order is the order fields are emitted in.
pub const DEPENDENCY_FIELDS: [(&str, DependencyKind); 8] = [
    ("Depends", DependencyKind::Requires),
    ("Recommends", DependencyKind::Recommends),
    ("Suggests", DependencyKind::Suggests),
    ("Enhances", DependencyKind::Enhances),
    ("Provides", DependencyKind::Provides),
    ("Conflicts", DependencyKind::Conflicts),
    ("Replaces", DependencyKind::Replaces),
    ("Breaks", DependencyKind::Breaks),
];

/// The `control` paragraph of a binary package.
///
/// Wraps a [ControlParagraph], reachable through [Deref] and [DerefMut].
/// Getters of fields the policy manual marks mandatory return [Result];
/// others return [Option].
///
/// See <https://www.debian.org/doc/debian-policy/ch-controlfields.html#binary-package-control-files-debian-control>.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BinaryPackageControlFile<'a> {
    paragraph: ControlParagraph<'a>,
}

impl<'a> Deref for BinaryPackageControlFile<'a> {
    type Target = ControlParagraph<'a>;

    fn deref(&self) -> &Self::Target {
        &self.paragraph
    }
}

impl<'a> DerefMut for BinaryPackageControlFile<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.paragraph
    }
}

impl<'a> From<ControlParagraph<'a>> for BinaryPackageControlFile<'a> {
    fn from(paragraph: ControlParagraph<'a>) -> Self {
        Self { paragraph }
    }
}

impl<'a> From<BinaryPackageControlFile<'a>> for ControlParagraph<'a> {
    fn from(cf: BinaryPackageControlFile<'a>) -> Self {
        cf.paragraph
    }
}

impl<'a> BinaryPackageControlFile<'a> {
    /// Construct the control paragraph describing a package.
    ///
    /// `installed_size` is in KiB. Optional fields with empty values are omitted.
    pub fn from_package(package: &'a Package, installed_size: u64) -> Self {
        let mut cf = Self::default();

        cf.set_field_from_string("Package".into(), Cow::Borrowed(&package.name));
        cf.set_field_from_string("Version".into(), package.full_version().into());
        cf.set_field_if_not_empty("License", package.license.as_str());
        cf.set_field_if_not_empty("Section", package.section.as_str());
        cf.set_field_if_not_empty("Priority", package.priority.as_str());
        if package.essential {
            cf.set_field_from_string("Essential".into(), "yes".into());
        }
        cf.set_field_from_string("Date".into(), format_date(&package.build_time).into());
        cf.set_field_from_string("Architecture".into(), package.arch.deb_name().into());
        cf.set_field_if_not_empty("Vendor", package.vendor.as_str());
        if let Some(maintainer) = &package.maintainer {
            cf.set_field_if_not_empty("Maintainer", maintainer.to_string());
        }
        cf.set_field_if_not_empty("Homepage", package.home.as_str());

        for (field, kind) in DEPENDENCY_FIELDS {
            let deps = package.dependencies_of(kind).collect::<Vec<_>>();
            cf.set_field_if_not_empty(field, format_dependencies(&deps));
        }
        for dep in package.dependencies_of(DependencyKind::Obsoletes) {
            warn!("deb packages cannot express obsoletes; ignoring {}", dep.name);
        }

        cf.set_field_if_not_empty("Build-Using", package.compiler.as_str());
        cf.set_field_from_string("Installed-Size".into(), installed_size.to_string().into());

        let lines = std::iter::once(package.summary.trim().to_string()).chain(
            package
                .description
                .lines()
                .map(|l| l.trim_end().to_string()),
        );
        cf.set_field(ControlField::from_lines("Description".into(), lines));

        cf
    }

    fn required_field_str(&self, field: &'static str) -> Result<&str> {
        self.field_str(field)
            .ok_or(DebianError::BinaryPackageControlRequiredFieldMissing(field))
    }

    /// The `Package` field value.
    pub fn package(&self) -> Result<&str> {
        self.required_field_str("Package")
    }

    /// The `Version` field as its original string.
    pub fn version_str(&self) -> Result<&str> {
        self.required_field_str("Version")
    }

    /// The `Architecture` field.
    pub fn architecture(&self) -> Result<&str> {
        self.required_field_str("Architecture")
    }

    /// The `Maintainer` field.
    pub fn maintainer(&self) -> Result<&str> {
        self.required_field_str("Maintainer")
    }

    /// The `Description` field.
    pub fn description(&self) -> Result<&str> {
        self.required_field_str("Description")
    }

    /// The `Section` field.
    pub fn section(&self) -> Option<&str> {
        self.field_str("Section")
    }

    /// The `Priority` field.
    pub fn priority(&self) -> Option<&str> {
        self.field_str("Priority")
    }

    /// The `Essential` field.
    pub fn essential(&self) -> Option<bool> {
        self.field_bool("Essential")
    }

    /// The `Homepage` field.
    pub fn homepage(&self) -> Option<&str> {
        self.field_str("Homepage")
    }

    /// The `Vendor` field.
    pub fn vendor(&self) -> Option<&str> {
        self.field_str("Vendor")
    }

    /// The `License` field.
    pub fn license(&self) -> Option<&str> {
        self.field_str("License")
    }

    /// The `Date` field, parsed.
    pub fn date(&self) -> Option<Result<DateTime<Utc>>> {
        self.field_str("Date").map(|v| {
            DateTime::parse_from_rfc2822(v)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| DebianError::ControlParseError(format!("bad Date {}: {}", v, e)))
        })
    }

    /// The `Installed-Size` field, parsed to a [u64].
    pub fn installed_size(&self) -> Option<Result<u64>> {
        self.field_u64("Installed-Size")
    }

    /// The `Build-Using` field.
    ///
    /// `Built-Using` is accepted as well.
    pub fn built_using(&self) -> Option<&str> {
        self.field_str("Build-Using")
            .or_else(|| self.field_str("Built-Using"))
    }

    /// Parsed dependencies of a dependency list field.
    pub fn dependencies(&self, field: &str, kind: DependencyKind) -> Result<Vec<Dependency>> {
        match self.field_str(field) {
            Some(value) => parse_dependencies(value, kind),
            None => Ok(vec![]),
        }
    }

    /// Reconstruct the [Package] metadata this paragraph describes.
    ///
    /// Resources, scripts and changes are not part of the paragraph and are left empty.
    pub fn to_package(&self) -> Result<Package> {
        let (version, release) = match self.version_str()?.rsplit_once('-') {
            Some((version, release)) => (version, release),
            None => (self.version_str()?, ""),
        };

        let mut package = Package::new(self.package()?, version);
        package.release = release.to_string();
        package.arch = self.architecture()?.parse::<Arch>()?;
        package.license = self.license().unwrap_or_default().to_string();
        package.section = self.section().unwrap_or_default().to_string();
        package.priority = self.priority().unwrap_or_default().to_string();
        package.essential = self.essential().unwrap_or(false);
        package.vendor = self.vendor().unwrap_or_default().to_string();
        package.home = self.homepage().unwrap_or_default().to_string();
        package.compiler = self.built_using().unwrap_or_default().to_string();

        if let Some(maintainer) = self.field_str("Maintainer") {
            if let Ok(maintainer) = maintainer.parse::<Maintainer>() {
                package.maintainer = Some(maintainer);
            }
        }
        if let Some(date) = self.date() {
            package.build_time = date?;
        }

        if let Some(field) = self.field("Description") {
            let mut lines = field.logical_lines().into_iter();
            package.summary = lines.next().unwrap_or_default();
            package.description = lines.collect::<Vec<_>>().join("\n");
        }

        for (field, kind) in DEPENDENCY_FIELDS {
            package.dependencies.extend(self.dependencies(field, kind)?);
        }

        Ok(package)
    }
}

fn constraint_operator(constraint: Constraint) -> &'static str {
    match constraint {
        Constraint::Any => "",
        Constraint::Equal => "=",
        Constraint::Less => "<<",
        Constraint::LessEqual => "<=",
        Constraint::Greater => ">>",
        Constraint::GreaterEqual => ">=",
    }
}

/// Render a single dependency as `name[:arch] (op version)`.
pub fn format_dependency(dep: &Dependency) -> String {
    let mut s = dep.name.clone();

    if let Some(arch) = &dep.arch {
        s.push(':');
        s.push_str(arch);
    }
    if let Some(version) = dep.constrained_version() {
        s.push_str(&format!(" ({} {})", constraint_operator(dep.constraint), version));
    }

    s
}

/// Render a dependency list, comma separated.
pub fn format_dependencies(deps: &[&Dependency]) -> String {
    deps.iter()
        .map(|d| format_dependency(d))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a comma separated dependency list.
///
/// Only the first of `|` separated alternatives is retained.
pub fn parse_dependencies(value: &str, kind: DependencyKind) -> Result<Vec<Dependency>> {
    let mut deps = vec![];

    for item in value.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let item = match item.split_once('|') {
            Some((first, _)) => {
                warn!("only the first alternative of `{}` is retained", item);
                first.trim()
            }
            None => item,
        };

        deps.push(parse_dependency(item, kind)?);
    }

    Ok(deps)
}

fn parse_dependency(s: &str, kind: DependencyKind) -> Result<Dependency> {
    let (name, restriction) = match s.split_once('(') {
        Some((name, rest)) => {
            let rest = rest.trim().strip_suffix(')').ok_or_else(|| {
                DebianError::ControlParseError(format!("unterminated version in {}", s))
            })?;
            (name.trim(), Some(rest.trim()))
        }
        None => (s.trim(), None),
    };

    let mut dep = match name.split_once(':') {
        Some((name, arch)) => Dependency::new(kind, name).with_arch(arch),
        None => Dependency::new(kind, name),
    };

    if let Some(restriction) = restriction {
        let split = restriction
            .find(|c: char| !matches!(c, '<' | '>' | '='))
            .unwrap_or(restriction.len());
        let (op, version) = restriction.split_at(split);

        let constraint = Constraint::from_operator(op.trim())
            .filter(|c| *c != Constraint::Any)
            .ok_or_else(|| {
                DebianError::ControlParseError(format!("unknown version operator in {}", s))
            })?;
        dep = dep.with_version(constraint, version.trim());
    }

    Ok(dep)
}

#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone, tugger_package::Resource};

    fn package() -> Package {
        let mut p = Package::new("hello", "1.0");
        p.release = "2".into();
        p.arch = Arch::Amd64;
        p.maintainer = Some(Maintainer::new("A", "a@x"));
        p.summary = "hi".into();
        p.description = "First paragraph.\n\nSecond paragraph.".into();
        p.build_time = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        p.dependencies = vec![
            Dependency::new(DependencyKind::Requires, "libc6")
                .with_version(Constraint::GreaterEqual, "2.31"),
            Dependency::new(DependencyKind::Requires, "zlib1g").with_arch("amd64"),
            Dependency::new(DependencyKind::Conflicts, "hello-legacy")
                .with_version(Constraint::Less, "1.0"),
        ];
        p.add_resource(Resource::new("/usr/bin/hello", "X"));
        p
    }

    #[test]
    fn emit_fields() {
        let p = package();
        let cf = BinaryPackageControlFile::from_package(&p, 0);

        assert_eq!(
            cf.to_string(),
            concat!(
                "Package: hello\n",
                "Version: 1.0-2\n",
                "Date: Mon, 02 Jan 2006 15:04:05 +0000\n",
                "Architecture: amd64\n",
                "Maintainer: A <a@x>\n",
                "Depends: libc6 (>= 2.31), zlib1g:amd64\n",
                "Conflicts: hello-legacy (<< 1.0)\n",
                "Installed-Size: 0\n",
                "Description: hi\n",
                " First paragraph.\n",
                " .\n",
                " Second paragraph.\n",
            )
        );
    }

    #[test]
    fn round_trip_package() -> Result<()> {
        let p = package();
        let cf = BinaryPackageControlFile::from_package(&p, 3);

        let parsed = crate::control::ControlFile::parse_str(&cf.to_string())?;
        let paragraph = parsed
            .paragraphs()
            .next()
            .ok_or(DebianError::ControlFileNoParagraph)?
            .clone();
        let cf = BinaryPackageControlFile::from(paragraph);

        assert_eq!(cf.installed_size().transpose()?, Some(3));

        let p2 = cf.to_package()?;
        assert_eq!(p2.name, "hello");
        assert_eq!(p2.version, "1.0");
        assert_eq!(p2.release, "2");
        assert_eq!(p2.arch, Arch::Amd64);
        assert_eq!(p2.maintainer, p.maintainer);
        assert_eq!(p2.summary, "hi");
        assert_eq!(p2.description, p.description);
        assert_eq!(p2.build_time, p.build_time);
        assert_eq!(p2.dependencies, p.dependencies);

        Ok(())
    }

    #[test]
    fn parse_alternatives_and_operators() -> Result<()> {
        let deps = parse_dependencies(
            "a | b, c (>> 1), d(<=2.0) , e:i386 (= 3)",
            DependencyKind::Requires,
        )?;

        assert_eq!(
            deps.iter().map(format_dependency).collect::<Vec<_>>(),
            vec!["a", "c (>> 1)", "d (<= 2.0)", "e:i386 (= 3)"]
        );
        assert!(parse_dependencies("x (>= 1", DependencyKind::Requires).is_err());
        assert!(parse_dependencies("x (~ 1)", DependencyKind::Requires).is_err());

        Ok(())
    }

    #[test]
    fn built_using_alias() {
        let mut cf = BinaryPackageControlFile::default();
        cf.set_field_from_string("Built-Using".into(), "rustc".into());

        assert_eq!(cf.built_using(), Some("rustc"));
    }
}
