// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ustar header encoding.

use crate::{Error, TarResult, BLOCK_SIZE, USTAR_MAGIC};

const NAME: std::ops::Range<usize> = 0..100;
const MODE: std::ops::Range<usize> = 100..108;
const UID: std::ops::Range<usize> = 108..116;
const GID: std::ops::Range<usize> = 116..124;
const SIZE: std::ops::Range<usize> = 124..136;
const MTIME: std::ops::Range<usize> = 136..148;
const CHECKSUM: std::ops::Range<usize> = 148..156;
const TYPEFLAG: usize = 156;
const LINKNAME: std::ops::Range<usize> = 157..257;
const MAGIC: std::ops::Range<usize> = 257..265;
const UNAME: std::ops::Range<usize> = 265..297;
const GNAME: std::ops::Range<usize> = 297..329;
const DEVMAJOR: std::ops::Range<usize> = 329..337;
const DEVMINOR: std::ops::Range<usize> = 337..345;
const PREFIX: std::ops::Range<usize> = 345..500;

/// The type of an archive entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryType {
    /// A regular file. Typeflag `0` (or NUL in pre-POSIX archives).
    Regular,
    /// A directory. Typeflag `5`.
    Directory,
    /// A GNU long name record. Typeflag `L`.
    GnuLongName,
    /// Anything else. Not emitted by the writer.
    Other(u8),
}

impl EntryType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'0' | 0 => Self::Regular,
            b'5' => Self::Directory,
            b'L' => Self::GnuLongName,
            _ => Self::Other(b),
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Regular => b'0',
            Self::Directory => b'5',
            Self::GnuLongName => b'L',
            Self::Other(b) => *b,
        }
    }
}

/// Write an octal number as zero padded digits followed by a NUL.
fn write_octal(dest: &mut [u8], value: u64) -> TarResult<()> {
    let digits = dest.len() - 1;
    let s = format!("{:0width$o}", value, width = digits);

    if s.len() > digits {
        return Err(Error::FieldOverflow {
            value,
            width: dest.len(),
        });
    }

    dest[0..digits].copy_from_slice(s.as_bytes());
    dest[digits] = 0;

    Ok(())
}

fn parse_octal(data: &[u8], field: &'static str) -> TarResult<u64> {
    let s = std::str::from_utf8(data)
        .map_err(|_| Error::BadHeader(format!("{} field is not ASCII", field)))?
        .trim_matches(|c| c == ' ' || c == '\0');

    if s.is_empty() {
        return Ok(0);
    }

    u64::from_str_radix(s, 8)
        .map_err(|_| Error::BadHeader(format!("{} field is not octal: {:?}", field, s)))
}

fn write_string(dest: &mut [u8], value: &str, field: &'static str) -> TarResult<()> {
    if value.len() > dest.len() {
        return Err(Error::BadHeader(format!(
            "{} value too long: {}",
            field, value
        )));
    }

    dest[0..value.len()].copy_from_slice(value.as_bytes());

    Ok(())
}

fn parse_string(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());

    String::from_utf8_lossy(&data[0..end]).to_string()
}

/// Compute the header checksum: the unsigned sum of all bytes with the
/// checksum field itself counted as spaces.
pub(crate) fn checksum(block: &[u8; BLOCK_SIZE]) -> u32 {
    block
        .iter()
        .enumerate()
        .map(|(i, b)| {
            if CHECKSUM.contains(&i) {
                b' ' as u32
            } else {
                *b as u32
            }
        })
        .sum()
}

/// Split a path into the ustar `prefix` and `name` fields.
fn split_path(path: &str) -> TarResult<(&str, &str)> {
    if path.len() <= NAME.len() {
        return Ok(("", path));
    }

    // A trailing slash on directories stays with the name.
    let search = path.strip_suffix('/').unwrap_or(path);

    for (i, c) in search.char_indices().rev() {
        if c != '/' {
            continue;
        }

        let (prefix, name) = (&path[0..i], &path[i + 1..]);
        if prefix.len() <= PREFIX.len() && name.len() <= NAME.len() && !name.is_empty() {
            return Ok((prefix, name));
        }
    }

    Err(Error::PathTooLong(path.to_string()))
}

/// A ustar header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TarHeader {
    /// Path of the entry. Directories end in `/`.
    pub path: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Size in bytes of the entry content.
    pub size: u64,
    /// Modified time as seconds since UNIX epoch.
    pub mtime: u64,
    pub entry_type: EntryType,
    pub link_name: String,
    pub user_name: String,
    pub group_name: String,
}

impl TarHeader {
    /// Construct a header for a regular file owned by root.
    pub fn file(path: impl ToString, size: u64) -> Self {
        Self {
            path: path.to_string(),
            mode: 0o644,
            uid: 0,
            gid: 0,
            size,
            mtime: 0,
            entry_type: EntryType::Regular,
            link_name: String::new(),
            user_name: "root".into(),
            group_name: "root".into(),
        }
    }

    /// Construct a header for a directory owned by root.
    ///
    /// A trailing `/` is added to the path if missing.
    pub fn directory(path: impl ToString) -> Self {
        let mut path = path.to_string();
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }

        Self {
            mode: 0o755,
            entry_type: EntryType::Directory,
            ..Self::file(path, 0)
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Set numeric and symbolic ownership.
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

    /// Whether this header describes a directory.
    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Serialize to a 512 byte header block, computing the checksum.
    pub fn to_block(&self) -> TarResult<[u8; BLOCK_SIZE]> {
        let mut block = [0u8; BLOCK_SIZE];

        let (prefix, name) = split_path(&self.path)?;
        write_string(&mut block[NAME], name, "name")?;
        write_octal(&mut block[MODE], self.mode as u64)?;
        write_octal(&mut block[UID], self.uid as u64)?;
        write_octal(&mut block[GID], self.gid as u64)?;
        write_octal(&mut block[SIZE], self.size)?;
        write_octal(&mut block[MTIME], self.mtime)?;
        block[TYPEFLAG] = self.entry_type.as_byte();
        write_string(&mut block[LINKNAME], &self.link_name, "linkname")?;
        block[MAGIC].copy_from_slice(USTAR_MAGIC);
        write_string(&mut block[UNAME], &self.user_name, "uname")?;
        write_string(&mut block[GNAME], &self.group_name, "gname")?;
        write_octal(&mut block[DEVMAJOR], 0)?;
        write_octal(&mut block[DEVMINOR], 0)?;
        write_string(&mut block[PREFIX], prefix, "prefix")?;

        // 6 octal digits, NUL, space.
        let sum = checksum(&block);
        block[CHECKSUM].copy_from_slice(format!("{:06o}\0 ", sum).as_bytes());

        Ok(block)
    }

    /// Parse a header block, verifying its checksum.
    pub fn from_block(block: &[u8; BLOCK_SIZE]) -> TarResult<Self> {
        let expected = parse_octal(&block[CHECKSUM], "chksum")? as u32;
        let actual = checksum(block);

        if expected != actual {
            return Err(Error::BadChecksum { expected, actual });
        }

        let name = parse_string(&block[NAME]);
        let path = if &block[MAGIC.start..MAGIC.start + 5] == b"ustar" && block[PREFIX.start] != 0 {
            format!("{}/{}", parse_string(&block[PREFIX]), name)
        } else {
            name
        };

        Ok(Self {
            path,
            mode: parse_octal(&block[MODE], "mode")? as u32,
            uid: parse_octal(&block[UID], "uid")? as u32,
            gid: parse_octal(&block[GID], "gid")? as u32,
            size: parse_octal(&block[SIZE], "size")?,
            mtime: parse_octal(&block[MTIME], "mtime")?,
            entry_type: EntryType::from_byte(block[TYPEFLAG]),
            link_name: parse_string(&block[LINKNAME]),
            user_name: parse_string(&block[UNAME]),
            group_name: parse_string(&block[GNAME]),
        })
    }
}
