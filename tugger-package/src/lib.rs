// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Format-neutral primitives for building Linux packages.

This crate holds the pieces shared by the Debian and RPM builders:

* [Package], the description of a piece of installable software, and the
  [Resource] files it installs.
* [BuildConfig], settings threaded through every builder.
* Content digests and a fan-out [io::DigestingWriter] that computes them
  while data is copied into an archive.
* [StagingBuffer] for streams whose size must be known before emission.
* [Extractor] for writing archive entries to the filesystem.
* [ErrorKind], the failure classification all package errors map onto.
*/

pub mod config;
pub use config::BuildConfig;
pub mod error;
pub use error::{ErrorKind, PackageError, PackageResult};
pub mod extract;
pub use extract::{EntryMetadata, Extractor};
pub mod io;
pub mod package;
pub use package::{
    normalize_script, Arch, Change, Constraint, Dependency, DependencyKind, Maintainer, Package,
    Scripts,
};
pub mod resource;
pub use resource::{Resource, ResourceFlags, ResourceSource, StagedResource};
pub mod staging;
pub use staging::StagingBuffer;
