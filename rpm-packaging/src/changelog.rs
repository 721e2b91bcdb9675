// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Changelog values of RPM headers. */

use tugger_package::{BuildConfig, Package};

/// The parallel `ChangelogTime`, `ChangelogName` and `ChangelogText` arrays.
///
/// Entries are ordered newest first.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChangelogArrays {
    pub times: Vec<i32>,
    pub names: Vec<String>,
    pub texts: Vec<String>,
}

impl ChangelogArrays {
    pub fn from_package(package: &Package, config: &BuildConfig) -> Self {
        let default_maintainer = package.maintainer.clone().unwrap_or_default();
        let mut res = Self::default();

        for change in package.sorted_changes() {
            let maintainer = change.maintainer.as_ref().unwrap_or(&default_maintainer);
            let version = if change.version.is_empty() {
                package.full_version()
            } else {
                change.version.clone()
            };

            let mut lines = vec![];
            if !change.summary.trim().is_empty() {
                lines.push(change.summary.trim().to_string());
            }
            for entry in &change.entries {
                let line = format!("- {}", entry);
                match config.changelog_wrap {
                    Some(width) => lines.extend(wrap(&line, width, "  ")),
                    None => lines.push(line),
                }
            }

            res.times.push(change.when.timestamp() as i32);
            res.names.push(format!("{} - {}", maintainer, version));
            res.texts.push(lines.join("\n"));
        }

        res
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Wrap a line at word boundaries, indenting continuation lines.
fn wrap(line: &str, width: usize, indent: &str) -> Vec<String> {
    let mut res = vec![];
    let mut current = String::new();

    for word in line.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            res.push(std::mem::take(&mut current));
        }

        if current.is_empty() {
            if !res.is_empty() {
                current.push_str(indent);
            }
        } else {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        res.push(current);
    }

    res
}
