// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Unix `ar` archive reading and writing.

`ar` is the outer container of Debian `.deb` files. An archive is the global
magic `!<arch>\n` followed by members. Each member is a 60 byte ASCII header
followed by the member content, padded with a newline to an even length.

There is no archive terminator: the archive ends when the input ends.
*/

use {
    log::debug,
    std::io::{Read, Write},
};

/// Global archive magic.
pub const MAGIC: &[u8] = b"!<arch>\n";

/// Terminator of every member header.
pub const HEADER_TERMINATOR: &[u8] = &[0x60, 0x0a];

/// Size in bytes of a member header.
pub const HEADER_SIZE: usize = 60;

/// Maximum length of a member name. One byte of the 16 byte field is the `/` terminator.
pub const MAX_NAME_LENGTH: usize = 15;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic value encountered")]
    BadMagic,

    #[error("malformed member header: {0}")]
    BadHeader(String),

    #[error("archive ended in the middle of a member")]
    UnexpectedEnd,

    #[error("member name too long: {0}")]
    NameTooLong(String),

    #[error("value {value} does not fit in {width} byte header field")]
    FieldOverflow { value: u64, width: usize },

    #[error("member body size mismatch: header says {expected} bytes; got {actual}")]
    BodySizeMismatch { expected: u64, actual: u64 },

    #[error("no member header has been written")]
    NoCurrentMember,
}

/// Result type for this crate.
pub type ArResult<T> = Result<T, Error>;

fn write_field(dest: &mut [u8], value: &str) -> ArResult<()> {
    if value.len() > dest.len() {
        return Err(Error::FieldOverflow {
            value: value.parse().unwrap_or(u64::MAX),
            width: dest.len(),
        });
    }

    dest.fill(b' ');
    dest[0..value.len()].copy_from_slice(value.as_bytes());

    Ok(())
}

fn parse_field(data: &[u8], radix: u32, field: &'static str) -> ArResult<u64> {
    let s = std::str::from_utf8(data)
        .map_err(|_| Error::BadHeader(format!("{} field is not ASCII", field)))?
        .trim_end_matches(' ');

    if s.is_empty() {
        return Ok(0);
    }

    if !s.bytes().all(|c| c.is_ascii_digit() && ((c - b'0') as u32) < radix) {
        return Err(Error::BadHeader(format!(
            "{} field has non-digit characters: {:?}",
            field, s
        )));
    }

    u64::from_str_radix(s, radix)
        .map_err(|_| Error::BadHeader(format!("{} field out of range: {}", field, s)))
}

/// A member header in an `ar` archive.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArHeader {
    /// Member name. At most 15 bytes.
    pub name: String,
    /// Modified time as seconds since UNIX epoch.
    pub mtime: u64,
    /// User ID.
    pub uid: u32,
    /// Group ID.
    pub gid: u32,
    /// File mode. Written in octal.
    pub mode: u32,
    /// Size in bytes of the member body, excluding any pad byte.
    pub size: u64,
}

impl ArHeader {
    /// Construct a header for a member owned by root.
    pub fn new(name: impl ToString, size: u64) -> Self {
        Self {
            name: name.to_string(),
            mode: 0o100644,
            size,
            ..Default::default()
        }
    }

    /// Set the modified time.
    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Set the file mode.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Set the owning user and group IDs.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Serialize this header to its 60 byte representation.
    pub fn to_bytes(&self) -> ArResult<[u8; HEADER_SIZE]> {
        if self.name.len() > MAX_NAME_LENGTH || self.name.contains('/') {
            return Err(Error::NameTooLong(self.name.clone()));
        }

        let mut data = [b' '; HEADER_SIZE];

        write_field(&mut data[0..16], &format!("{}/", self.name))?;
        write_field(&mut data[16..28], &self.mtime.to_string())?;
        write_field(&mut data[28..34], &self.uid.to_string())?;
        write_field(&mut data[34..40], &self.gid.to_string())?;
        write_field(&mut data[40..48], &format!("{:o}", self.mode))?;
        write_field(&mut data[48..58], &self.size.to_string())?;
        data[58..60].copy_from_slice(HEADER_TERMINATOR);

        Ok(data)
    }

    /// Parse a header from its 60 byte representation.
    pub fn from_bytes(data: &[u8; HEADER_SIZE]) -> ArResult<Self> {
        if &data[58..60] != HEADER_TERMINATOR {
            return Err(Error::BadHeader("missing header terminator".into()));
        }

        let name = std::str::from_utf8(&data[0..16])
            .map_err(|_| Error::BadHeader("name is not ASCII".into()))?
            .trim_end_matches(' ');
        let name = name.strip_suffix('/').unwrap_or(name).to_string();

        Ok(Self {
            name,
            mtime: parse_field(&data[16..28], 10, "mtime")?,
            uid: parse_field(&data[28..34], 10, "uid")? as u32,
            gid: parse_field(&data[34..40], 10, "gid")? as u32,
            mode: parse_field(&data[40..48], 8, "mode")? as u32,
            size: parse_field(&data[48..58], 10, "size")?,
        })
    }
}

struct PendingMember {
    size: u64,
    remaining: u64,
}

/// A streaming writer of `ar` archives.
///
/// Call [Self::write_header] to start a member, then write exactly the number
/// of bytes declared in the header, either via [Self::write_body] or via the
/// [Write] trait. The pad byte for odd sized members is emitted automatically
/// when the next member starts or the archive is finished.
pub struct ArWriter<W: Write> {
    writer: W,
    current: Option<PendingMember>,
}

impl<W: Write> ArWriter<W> {
    /// Construct a new writer, emitting the global magic.
    pub fn new(mut writer: W) -> ArResult<Self> {
        writer.write_all(MAGIC)?;

        Ok(Self {
            writer,
            current: None,
        })
    }

    /// Begin a new member.
    pub fn write_header(&mut self, header: &ArHeader) -> ArResult<()> {
        self.finish_member()?;

        debug!("writing ar member {} ({} bytes)", header.name, header.size);
        self.writer.write_all(&header.to_bytes()?)?;
        self.current = Some(PendingMember {
            size: header.size,
            remaining: header.size,
        });

        Ok(())
    }

    /// Write the complete body of the current member.
    ///
    /// `data` must hold exactly the remaining bytes of the member.
    pub fn write_body(&mut self, data: &[u8]) -> ArResult<()> {
        let member = self.current.as_ref().ok_or(Error::NoCurrentMember)?;

        if data.len() as u64 != member.remaining {
            return Err(Error::BodySizeMismatch {
                expected: member.size,
                actual: member.size - member.remaining + data.len() as u64,
            });
        }

        self.write_all(data)?;
        self.finish_member()
    }

    /// Write a complete member from a header and a reader of its content.
    pub fn append(&mut self, header: &ArHeader, reader: &mut impl Read) -> ArResult<()> {
        self.write_header(header)?;
        std::io::copy(reader, self)?;
        self.finish_member()
    }

    fn finish_member(&mut self) -> ArResult<()> {
        if let Some(member) = self.current.take() {
            if member.remaining != 0 {
                return Err(Error::BodySizeMismatch {
                    expected: member.size,
                    actual: member.size - member.remaining,
                });
            }

            if member.size % 2 == 1 {
                self.writer.write_all(b"\n")?;
            }
        }

        Ok(())
    }

    /// Finish writing the archive, returning the inner writer.
    pub fn finish(mut self) -> ArResult<W> {
        self.finish_member()?;
        self.writer.flush()?;

        Ok(self.writer)
    }
}

impl<W: Write> Write for ArWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let member = self.current.as_mut().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                "no current archive member to write to",
            )
        })?;

        if buf.len() as u64 > member.remaining {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "write exceeds member size of {} bytes by {} bytes",
                    member.size,
                    buf.len() as u64 - member.remaining
                ),
            ));
        }

        let written = self.writer.write(buf)?;
        member.remaining -= written as u64;

        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// A reader of `ar` archives.
///
/// Instances behave like a cursor over members of the archive, in the same
/// manner as the cpio readers: [Self::read_next] advances to the next member
/// and the [Read] implementation reads content of the current member only.
pub struct ArReader<R: Read> {
    reader: R,
    remaining: u64,
    pad: bool,
    done: bool,
}

impl<R: Read> ArReader<R> {
    /// Construct a new reader, validating the global magic.
    pub fn new(mut reader: R) -> ArResult<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::BadMagic
            } else {
                e.into()
            }
        })?;

        if magic != MAGIC {
            return Err(Error::BadMagic);
        }

        Ok(Self {
            reader,
            remaining: 0,
            pad: false,
            done: false,
        })
    }

    /// Read the next member header.
    ///
    /// `None` is returned once fewer than 60 header bytes remain.
    pub fn read_next(&mut self) -> ArResult<Option<ArHeader>> {
        self.finish()?;

        if self.done {
            return Ok(None);
        }

        let mut data = [0u8; HEADER_SIZE];
        let mut filled = 0;

        while filled < HEADER_SIZE {
            let count = self.reader.read(&mut data[filled..])?;
            if count == 0 {
                break;
            }
            filled += count;
        }

        if filled < HEADER_SIZE {
            if filled > 0 {
                debug!("ignoring {} trailing bytes after last ar member", filled);
            }
            self.done = true;
            return Ok(None);
        }

        let header = ArHeader::from_bytes(&data)?;
        self.remaining = header.size;
        self.pad = header.size % 2 == 1;

        Ok(Some(header))
    }

    /// Finish reading the current member, skipping unread content and padding.
    pub fn finish(&mut self) -> ArResult<()> {
        if self.remaining > 0 {
            let copied = std::io::copy(
                &mut (&mut self.reader).take(self.remaining),
                &mut std::io::sink(),
            )?;
            if copied != self.remaining {
                return Err(Error::UnexpectedEnd);
            }
            self.remaining = 0;
        }

        if self.pad {
            self.pad = false;
            let mut pad = [0u8; 1];
            // The final pad byte is sometimes missing in the wild.
            if self.reader.read(&mut pad)? == 0 {
                self.done = true;
            }
        }

        Ok(())
    }

    /// Obtain the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for ArReader<R> {
    type Item = ArResult<ArHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(r)) => Some(Ok(r)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: Read> Read for ArReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }

        let max = std::cmp::min(buf.len() as u64, self.remaining) as usize;
        let count = self.reader.read(&mut buf[0..max])?;

        if count == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "archive ended in the middle of a member",
            ));
        }

        self.remaining -= count as u64;

        Ok(count)
    }
}
