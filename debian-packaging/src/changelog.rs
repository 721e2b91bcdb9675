// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian changelog rendering.

The format is described at
<https://www.debian.org/doc/debian-policy/ch-source.html#debian-changelog-debian-changelog>.
*/

use {
    chrono::{DateTime, Utc},
    std::{borrow::Cow, io::Write},
    tugger_package::{io::gzip, BuildConfig, Maintainer, Package},
};

/// `strftime` format of dates in changelogs and control files.
///
/// This is RFC 1123 with a numeric zone.
pub const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Format a time the way changelogs and control files expect.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Clone, Debug)]
pub struct ChangelogEntry<'a> {
    pub package: Cow<'a, str>,
    pub version: Cow<'a, str>,
    pub distributions: Vec<Cow<'a, str>>,
    pub urgency: Cow<'a, str>,
    /// Free text preceding the change items.
    pub summary: Cow<'a, str>,
    /// Individual change items.
    pub details: Vec<Cow<'a, str>>,
    pub maintainer: Maintainer,
    pub date: DateTime<Utc>,
}

impl<'a> ChangelogEntry<'a> {
    /// Write the entry block.
    ///
    /// ```text
    /// hello (1.0-1) unstable; urgency=low
    ///
    ///    * change
    ///
    ///   -- Name <email>  Tue, 02 Jan 2024 03:04:05 +0000
    /// ```
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(
            writer,
            "{} ({}) {}; urgency={}\n",
            self.package,
            self.version,
            self.distributions.join(" "),
            self.urgency
        )?;

        let summary = self.summary.trim();
        if !summary.is_empty() {
            writeln!(writer, "  {}", summary)?;
        }
        for detail in &self.details {
            writeln!(writer, "   * {}", detail)?;
        }

        writeln!(
            writer,
            "\n  -- {}  {}",
            self.maintainer,
            format_date(&self.date)
        )
    }
}

/// The blocks of a `changelog` file, in file order.
#[derive(Default)]
pub struct Changelog<'a> {
    entries: Vec<ChangelogEntry<'a>>,
}

impl<'a> Changelog<'a> {
    /// Construct the changelog of a package, newest change first.
    ///
    /// Changes without an explicit version or maintainer inherit those of
    /// the package.
    pub fn from_package(package: &'a Package, config: &'a BuildConfig) -> Self {
        let default_maintainer = package.maintainer.clone().unwrap_or_default();

        let entries = package
            .sorted_changes()
            .into_iter()
            .map(|change| ChangelogEntry {
                package: Cow::Borrowed(&package.name),
                version: if change.version.is_empty() {
                    Cow::Owned(package.full_version())
                } else {
                    Cow::Borrowed(&change.version)
                },
                distributions: config
                    .distributions
                    .split_whitespace()
                    .map(Cow::Borrowed)
                    .collect(),
                urgency: Cow::Borrowed(&config.urgency),
                summary: Cow::Borrowed(&change.summary),
                details: change.entries.iter().map(|e| Cow::Borrowed(e.as_str())).collect(),
                maintainer: change
                    .maintainer
                    .clone()
                    .unwrap_or_else(|| default_maintainer.clone()),
                date: change.when,
            })
            .collect();

        Self { entries }
    }

    pub fn add_entry<'b: 'a>(&mut self, entry: ChangelogEntry<'b>) {
        self.entries.push(entry)
    }

    /// Iterate over entries.
    pub fn iter_entries(&self) -> impl Iterator<Item = &ChangelogEntry<'a>> {
        self.entries.iter()
    }

    /// Write all blocks, separated by blank lines.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writer.write_all(b"\n")?;
            }
            entry.write(writer)?;
        }

        Ok(())
    }

    /// Render and gzip the changelog.
    pub fn to_gzip(&self, level: u32) -> std::io::Result<Vec<u8>> {
        let mut data = vec![];
        self.write(&mut data)?;

        gzip(&data, level)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        chrono::TimeZone,
        indoc::indoc,
        std::io::Read,
        tugger_package::{io::gunzip_reader, Change},
    };

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 3, 4, 5).unwrap()
    }

    #[test]
    fn block_layout() -> std::io::Result<()> {
        let entry = ChangelogEntry {
            package: "hello".into(),
            version: "2.0-1".into(),
            distributions: vec!["stable".into(), "testing".into()],
            urgency: "high".into(),
            summary: "  Security release. ".into(),
            details: vec!["fix overflow".into()],
            maintainer: Maintainer::new("A", "a@x"),
            date: Utc.timestamp_opt(1420000000, 0).unwrap(),
        };

        let mut buf = vec![];
        entry.write(&mut buf)?;

        assert_eq!(
            String::from_utf8_lossy(&buf),
            "hello (2.0-1) stable testing; urgency=high\n\n  Security release.\n   * fix overflow\n\n  -- A <a@x>  Wed, 31 Dec 2014 04:26:40 +0000\n"
        );

        Ok(())
    }

    #[test]
    fn from_package_newest_first() -> std::io::Result<()> {
        let mut package = Package::new("hello", "1.1");
        package.maintainer = Some(Maintainer::new("A", "a@x"));
        package.changes = vec![
            Change::new(date(2024, 1, 2), ["initial"]),
            Change {
                version: "1.1".into(),
                maintainer: Some(Maintainer::new("B", "b@x")),
                ..Change::new(date(2024, 2, 3), ["fix one", "fix two"])
            },
        ];
        package.changes[0].version = "1.0".into();

        let config = BuildConfig::default();
        let changelog = Changelog::from_package(&package, &config);

        let mut buf = vec![];
        changelog.write(&mut buf)?;
        let s = String::from_utf8(buf).unwrap();

        assert_eq!(
            s,
            indoc! {"
                hello (1.1) unstable; urgency=low

                   * fix one
                   * fix two

                  -- B <b@x>  Sat, 03 Feb 2024 03:04:05 +0000

                hello (1.0) unstable; urgency=low

                   * initial

                  -- A <a@x>  Tue, 02 Jan 2024 03:04:05 +0000
            "}
        );
        assert_eq!(s.lines().filter(|l| l.starts_with("   * ")).count(), 3);

        let mut decompressed = String::new();
        gunzip_reader(&changelog.to_gzip(9)?[..]).read_to_string(&mut decompressed)?;
        assert_eq!(decompressed, s);

        Ok(())
    }
}
