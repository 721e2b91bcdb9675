// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian packaging primitives.

This crate defines pure Rust implementations of the Debian binary package
format. Its scope is producing `.deb` files from a format-neutral
[tugger_package::Package] and reading them back.

# A Tour of Functionality

A `.deb` file defines a Debian package. Readers and writers of `.deb` files exist in the
[deb] module. To read the contents of a `.deb` defining a binary package, use
[deb::reader::DebReader]. To create new `.deb` files, use [deb::builder::DebBuilder].

A common primitive within Debian packaging is *control files*. These consist of *paragraphs*
of key-value metadata. Low-level control file primitives are defined in the [control] module.
[control::ControlParagraph] defines a paragraph, which consists of [control::ControlField].
[control::ControlFile] provides an interface for a *control file*, which consists of multiple
paragraphs. [control::ControlParagraphReader] implements a streaming reader of control files.

[binary_package_control::BinaryPackageControlFile] defines a *control file* for a binary
package. It can be derived from a [tugger_package::Package] and converted back to one.

The [changelog] module renders the `changelog.gz` documentation file of a package.
*/

pub mod binary_package_control;
pub mod changelog;
pub mod control;
pub mod deb;
pub mod error;
