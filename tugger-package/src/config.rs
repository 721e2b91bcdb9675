// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Build configuration. */

use {
    crate::staging::StagingBuffer,
    std::path::{Path, PathBuf},
};

/// Settings shared by the package builders.
///
/// Instances are plain values handed to a builder at construction time. Nothing
/// in this crate consults process-wide state when building.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// Directory in which to stage large intermediate streams.
    ///
    /// If `None`, intermediate streams are held in memory.
    pub temp_dir: Option<PathBuf>,
    /// Owner name recorded for every archive entry.
    pub user_name: String,
    /// Group name recorded for every archive entry.
    pub group_name: String,
    pub uid: u32,
    pub gid: u32,
    /// Interpreter injected into scripts lacking a `#!` line.
    pub interpreter: String,
    /// Distribution field of Debian changelog blocks.
    pub distributions: String,
    /// Urgency field of Debian changelog blocks.
    pub urgency: String,
    /// gzip level, 0 through 9.
    pub compression_level: u32,
    /// Operating system recorded in RPM headers.
    pub os: String,
    /// Column at which RPM changelog text is wrapped.
    pub changelog_wrap: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            user_name: "root".into(),
            group_name: "root".into(),
            uid: 0,
            gid: 0,
            interpreter: "/bin/sh".into(),
            distributions: "unstable".into(),
            urgency: "low".into(),
            compression_level: 9,
            os: "linux".into(),
            changelog_wrap: None,
        }
    }
}

impl BuildConfig {
    /// Stage intermediate streams in anonymous files under `path`.
    pub fn set_temp_dir(&mut self, path: impl AsRef<Path>) {
        self.temp_dir = Some(path.as_ref().to_path_buf());
    }

    #[must_use]
    pub fn with_temp_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.set_temp_dir(path);
        self
    }

    /// Set the ownership recorded for archive entries.
    #[must_use]
    pub fn with_owner(
        mut self,
        uid: u32,
        gid: u32,
        user_name: impl ToString,
        group_name: impl ToString,
    ) -> Self {
        self.uid = uid;
        self.gid = gid;
        self.user_name = user_name.to_string();
        self.group_name = group_name.to_string();
        self
    }

    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl ToString) -> Self {
        self.interpreter = interpreter.to_string();
        self
    }

    /// Set the gzip level. Values above 9 are clamped.
    #[must_use]
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    #[must_use]
    pub fn with_changelog_wrap(mut self, columns: usize) -> Self {
        self.changelog_wrap = Some(columns);
        self
    }

    /// Create a new staging buffer honoring [Self::temp_dir].
    pub fn staging_buffer(&self) -> std::io::Result<StagingBuffer> {
        StagingBuffer::new(self.temp_dir.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.user_name, "root");
        assert_eq!(config.interpreter, "/bin/sh");
        assert_eq!(config.compression_level, 9);
        assert!(config.temp_dir.is_none());
    }

    #[test]
    fn level_clamped() {
        assert_eq!(
            BuildConfig::default()
                .with_compression_level(20)
                .compression_level,
            9
        );
    }
}
