// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Human readable descriptions of packages. */

use {
    crate::{error::Result, format::PackageFormat, handle::PackageHandle},
    chrono::{TimeZone, Utc},
    debian_packaging::binary_package_control::format_dependency,
    std::io::{Read, Write},
    tugger_package::{Constraint, Dependency, DependencyKind, EntryMetadata, Package},
};

const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";
const MTIME_FORMAT: &str = "%Y-%m-%d %H:%M";

fn rpm_dependency(dep: &Dependency) -> String {
    let operator = match dep.constraint {
        Constraint::Any => "",
        Constraint::Equal => "=",
        Constraint::Less => "<",
        Constraint::LessEqual => "<=",
        Constraint::Greater => ">",
        Constraint::GreaterEqual => ">=",
    };

    match dep.constrained_version() {
        Some(version) => format!("{} {} {}", dep.name, operator, version),
        None => dep.name.clone(),
    }
}

fn dependency_label(kind: DependencyKind) -> String {
    let name = kind.name();
    let mut chars = name.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn field(writer: &mut impl Write, name: &str, value: &str) -> Result<()> {
    if !value.is_empty() {
        writeln!(writer, "{:<12}: {}", name, value)?;
    }

    Ok(())
}

/// Write identity fields and dependency lists of package metadata.
pub fn write_package_info(
    format: PackageFormat,
    package: &Package,
    writer: &mut impl Write,
) -> Result<()> {
    field(writer, "Name", &package.name)?;
    field(writer, "Version", &package.full_version())?;
    field(writer, "Architecture", format.arch_name(package))?;
    if let Some(maintainer) = &package.maintainer {
        field(writer, "Maintainer", &maintainer.to_string())?;
    }
    field(writer, "Packager", &package.packager)?;
    field(writer, "Section", &package.section)?;
    field(writer, "Priority", &package.priority)?;
    field(writer, "Vendor", &package.vendor)?;
    field(writer, "Homepage", &package.home)?;
    field(writer, "License", &package.license)?;
    field(
        writer,
        "Build Date",
        &package.build_time.format(DATE_FORMAT).to_string(),
    )?;
    field(writer, "Build Host", &package.build_host)?;
    field(writer, "Summary", &package.summary)?;

    if !package.description.is_empty() {
        writeln!(writer, "Description :")?;
        for line in package.description.lines() {
            writeln!(writer, "  {}", line)?;
        }
    }

    for kind in DependencyKind::ALL {
        let deps = package
            .dependencies_of(kind)
            .map(|dep| match format {
                PackageFormat::Deb => format_dependency(dep),
                PackageFormat::Rpm => rpm_dependency(dep),
            })
            .collect::<Vec<_>>();

        field(writer, &dependency_label(kind), &deps.join(", "))?;
    }

    Ok(())
}

/// Write the metadata of an opened package.
pub fn write_info<R: Read>(handle: &PackageHandle<R>, writer: &mut impl Write) -> Result<()> {
    write_package_info(handle.format(), &handle.metadata()?, writer)
}

/// Render permission bits the way `ls -l` does.
pub fn mode_string(mode: u32, is_dir: bool) -> String {
    let mut s = String::with_capacity(10);
    s.push(if is_dir { 'd' } else { '-' });

    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }

    s
}

/// Render an archive entry as a single line.
pub fn entry_line(entry: &EntryMetadata) -> String {
    let mtime = match Utc.timestamp_opt(entry.mtime as i64, 0).single() {
        Some(time) => time.format(MTIME_FORMAT).to_string(),
        None => entry.mtime.to_string(),
    };

    let mut path = format!("/{}", entry.path.trim_end_matches('/'));
    if entry.is_dir && path != "/" {
        path.push('/');
    }

    format!(
        "{} {}/{} {:>8} {} {}",
        mode_string(entry.mode, entry.is_dir),
        entry.uid,
        entry.gid,
        entry.size,
        mtime,
        path
    )
}

/// Write one line per archived file of an opened package.
pub fn write_content<R: Read>(handle: PackageHandle<R>, writer: &mut impl Write) -> Result<()> {
    let mut entries = handle.entries();

    while let Some(entry) = entries.next_entry()? {
        writeln!(writer, "{}", entry_line(&entry))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, tugger_package::Maintainer};

    #[test]
    fn modes() {
        assert_eq!(mode_string(0o755, false), "-rwxr-xr-x");
        assert_eq!(mode_string(0o40750, true), "drwxr-x---");
        assert_eq!(mode_string(0o100644, false), "-rw-r--r--");
    }

    #[test]
    fn lines() {
        let entry = EntryMetadata {
            path: "usr/bin/hello".into(),
            mode: 0o755,
            uid: 0,
            gid: 0,
            size: 1,
            mtime: 1704164645,
            is_dir: false,
        };
        assert_eq!(
            entry_line(&entry),
            "-rwxr-xr-x 0/0        1 2024-01-02 03:04 /usr/bin/hello"
        );

        let entry = EntryMetadata {
            path: "usr/bin/".into(),
            mode: 0o755,
            size: 0,
            is_dir: true,
            ..entry
        };
        assert_eq!(
            entry_line(&entry),
            "drwxr-xr-x 0/0        0 2024-01-02 03:04 /usr/bin/"
        );
    }

    #[test]
    fn package_info() -> Result<()> {
        let mut package = Package::new("hello", "1.0");
        package.maintainer = Some(Maintainer::new("A", "a@x"));
        package.summary = "hi".into();
        package.description = "First.\n\nSecond.".into();
        package.build_time = Utc
            .timestamp_opt(1704164645, 0)
            .single()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "bad time"))?;
        package.dependencies = vec![
            Dependency::new(DependencyKind::Requires, "libc6")
                .with_version(Constraint::GreaterEqual, "2.31"),
            Dependency::new(DependencyKind::Requires, "bash"),
            Dependency::new(DependencyKind::Conflicts, "goodbye")
                .with_version(Constraint::Less, "2"),
        ];

        let mut deb = vec![];
        write_package_info(PackageFormat::Deb, &package, &mut deb)?;
        let deb = String::from_utf8_lossy(&deb);

        assert_eq!(
            deb,
            "Name        : hello\n\
             Version     : 1.0\n\
             Architecture: all\n\
             Maintainer  : A <a@x>\n\
             Build Date  : Tue, 02 Jan 2024 03:04:05 +0000\n\
             Summary     : hi\n\
             Description :\n  \
             First.\n  \n  \
             Second.\n\
             Requires    : libc6 (>= 2.31), bash\n\
             Conflicts   : goodbye (<< 2)\n"
        );

        let mut rpm = vec![];
        write_package_info(PackageFormat::Rpm, &package, &mut rpm)?;
        let rpm = String::from_utf8_lossy(&rpm);
        assert!(rpm.contains("Architecture: noarch\n"));
        assert!(rpm.contains("Requires    : libc6 >= 2.31, bash\n"));
        assert!(rpm.contains("Conflicts   : goodbye < 2\n"));

        Ok(())
    }
}
