// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! New ASCII format support.

use {
    crate::{pad4, CpioResult, Error},
    chrono::{DateTime, TimeZone, Utc},
    log::debug,
    std::{
        ffi::CStr,
        io::{Read, Take, Write},
    },
};

pub const MAGIC: &[u8] = b"070701";

/// Name of the entry terminating an archive.
pub const TRAILER_NAME: &str = "TRAILER!!!";

/// Size of the fixed portion of a header, including the magic.
pub const HEADER_SIZE: u64 = 110;

fn u32_from_hex(data: &[u8]) -> CpioResult<u32> {
    let s = std::str::from_utf8(data).map_err(|_| Error::BadHeaderString)?;
    u32::from_str_radix(s, 16).map_err(|_| Error::BadHeaderHex(s.to_string()))
}

fn write_hex(dest: &mut Vec<u8>, value: u64) -> CpioResult<()> {
    if value > u32::MAX as u64 {
        return Err(Error::FieldOverflow(value));
    }

    dest.extend_from_slice(format!("{:08X}", value).as_bytes());

    Ok(())
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NewcHeader {
    pub inode: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    pub file_size: u32,
    pub dev_major: u32,
    pub dev_minor: u32,
    pub rdev_major: u32,
    pub rdev_minor: u32,
    pub checksum: u32,
    pub name: String,
}

impl NewcHeader {
    /// Construct a header for a regular file with a single link.
    pub fn file(name: impl ToString, mode: u32, file_size: u32) -> Self {
        Self {
            mode: 0o100000 | mode,
            nlink: 1,
            file_size,
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Construct a header for a directory.
    pub fn directory(name: impl ToString, mode: u32) -> Self {
        Self {
            mode: 0o040000 | mode,
            nlink: 2,
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Construct the header of the `TRAILER!!!` entry.
    pub fn trailer() -> Self {
        Self {
            nlink: 1,
            name: TRAILER_NAME.to_string(),
            ..Default::default()
        }
    }

    pub fn with_inode(mut self, inode: u32) -> Self {
        self.inode = inode;
        self
    }

    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    /// Whether this is the archive terminating entry.
    pub fn is_trailer(&self) -> bool {
        self.name == TRAILER_NAME
    }

    /// Whether the mode describes a directory.
    pub fn is_directory(&self) -> bool {
        self.mode & 0o170000 == 0o040000
    }

    /// Modified time as a [DateTime].
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.mtime as i64, 0).single()
    }

    /// Parse a header from a reader positioned just after the magic.
    ///
    /// Consumes the NUL padding following the name.
    pub fn from_reader(reader: &mut impl Read) -> CpioResult<Self> {
        let mut block = [0u8; HEADER_SIZE as usize - 6];
        reader.read_exact(&mut block)?;

        let mut fields = [0u32; 13];
        for (field, chunk) in fields.iter_mut().zip(block.chunks_exact(8)) {
            *field = u32_from_hex(chunk)?;
        }
        let [
            inode,
            mode,
            uid,
            gid,
            nlink,
            mtime,
            file_size,
            dev_major,
            dev_minor,
            rdev_major,
            rdev_minor,
            name_length,
            checksum,
        ] = fields;

        let mut name_data = vec![];
        reader
            .by_ref()
            .take(name_length as u64)
            .read_to_end(&mut name_data)?;
        if name_data.len() as u64 != name_length as u64 {
            return Err(Error::UnexpectedEnd);
        }

        let name = CStr::from_bytes_with_nul(&name_data)
            .map_err(|_| Error::FilenameDecode)?
            .to_string_lossy()
            .to_string();

        // The header and name together are padded to a 4 byte boundary.
        let mut pad = vec![0u8; pad4(HEADER_SIZE + name_data.len() as u64) as usize];
        reader.read_exact(&mut pad)?;

        Ok(Self {
            inode,
            mode,
            uid,
            gid,
            nlink,
            mtime,
            file_size,
            dev_major,
            dev_minor,
            rdev_major,
            rdev_minor,
            checksum,
            name,
        })
    }

    /// Serialize the header, name and name padding.
    pub fn to_bytes(&self) -> CpioResult<Vec<u8>> {
        let name_size = self.name.len() as u64 + 1;

        let mut data = Vec::with_capacity((HEADER_SIZE + name_size + 3) as usize);
        data.extend_from_slice(MAGIC);
        for value in [
            self.inode,
            self.mode,
            self.uid,
            self.gid,
            self.nlink,
            self.mtime,
            self.file_size,
            self.dev_major,
            self.dev_minor,
            self.rdev_major,
            self.rdev_minor,
        ] {
            write_hex(&mut data, value as u64)?;
        }
        write_hex(&mut data, name_size)?;
        write_hex(&mut data, self.checksum as u64)?;

        data.extend_from_slice(self.name.as_bytes());
        data.push(0);
        data.resize(data.len() + pad4(HEADER_SIZE + name_size) as usize, 0);

        Ok(data)
    }
}

/// Reader of *New ASCII* archives.
///
/// [Self::read_next] moves to the next entry. Reading then yields the content
/// of that entry only, ending at its last byte.
pub struct NewcReader<T: Read + Sized> {
    archive_reader: Option<T>,
    entry_reader: Option<Take<T>>,
    entry_data_pad: usize,
    seen_trailer: bool,
}

impl<T: Read + Sized> NewcReader<T> {
    pub fn new(reader: T) -> Self {
        Self {
            archive_reader: Some(reader),
            entry_reader: None,
            entry_data_pad: 0,
            seen_trailer: false,
        }
    }

    /// Advance to the next entry, returning its header.
    ///
    /// Unread content of the current entry is skipped. `None` is returned once
    /// the `TRAILER!!!` entry or the end of input is reached.
    pub fn read_next(&mut self) -> CpioResult<Option<NewcHeader>> {
        self.finish()?;

        if self.seen_trailer {
            return Ok(None);
        }

        if let Some(mut reader) = self.archive_reader.take() {
            let mut magic = [0u8; 6];

            match reader.read_exact(&mut magic) {
                Ok(_) => {}
                Err(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(e) => {
                    return Err(e.into());
                }
            }

            if magic != MAGIC {
                return Err(Error::BadMagic);
            }

            let header = NewcHeader::from_reader(&mut reader)?;

            if header.is_trailer() {
                self.seen_trailer = true;
                self.archive_reader = Some(reader);
                Ok(None)
            } else {
                self.entry_reader = Some(reader.take(header.file_size as _));
                self.entry_data_pad = pad4(header.file_size as u64) as usize;
                Ok(Some(header))
            }
        } else {
            Ok(None)
        }
    }

    /// Skip what remains of the current entry and its padding.
    pub fn finish(&mut self) -> CpioResult<()> {
        if let Some(mut reader) = self.entry_reader.take() {
            let wanted = reader.limit();
            let skipped = std::io::copy(&mut reader, &mut std::io::sink())?;
            if skipped != wanted {
                return Err(Error::UnexpectedEnd);
            }

            let mut reader = reader.into_inner();

            let mut pad = vec![0u8; self.entry_data_pad];
            reader
                .read_exact(&mut pad)
                .map_err(|_| Error::UnexpectedEnd)?;
            self.entry_data_pad = 0;

            self.archive_reader = Some(reader);
        }

        Ok(())
    }

    /// Whether the `TRAILER!!!` entry has been read.
    pub fn seen_trailer(&self) -> bool {
        self.seen_trailer
    }

    /// Consume the instance, returning the archive reader.
    ///
    /// Returns `None` if called while positioned inside an entry.
    pub fn into_inner(self) -> Option<T> {
        self.archive_reader
    }
}

impl<T: Read + Sized> Iterator for NewcReader<T> {
    type Item = CpioResult<NewcHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

impl<T: Read + Sized> Read for NewcReader<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, std::io::Error> {
        if let Some(reader) = &mut self.entry_reader {
            reader.read(buf)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "reader is not positioned at an entry",
            ))
        }
    }
}

struct PendingEntry {
    size: u64,
    remaining: u64,
}

/// A streaming writer of *New ASCII format* archives.
///
/// Start an entry with [Self::append_header] and write its content through
/// the [Write] implementation. [Self::finish] writes the trailer.
pub struct NewcWriter<W: Write> {
    writer: W,
    current: Option<PendingEntry>,
    entry_count: usize,
}

impl<W: Write> NewcWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            current: None,
            entry_count: 0,
        }
    }

    fn finish_entry(&mut self) -> CpioResult<()> {
        if let Some(entry) = self.current.take() {
            if entry.remaining != 0 {
                return Err(Error::BodySizeMismatch {
                    expected: entry.size,
                    actual: entry.size - entry.remaining,
                });
            }

            self.writer
                .write_all(&[0u8; 3][0..pad4(entry.size) as usize])?;
        }

        Ok(())
    }

    /// Begin a new entry.
    pub fn append_header(&mut self, header: &NewcHeader) -> CpioResult<()> {
        self.finish_entry()?;

        self.writer.write_all(&header.to_bytes()?)?;
        self.current = Some(PendingEntry {
            size: header.file_size as u64,
            remaining: header.file_size as u64,
        });
        self.entry_count += 1;

        Ok(())
    }

    /// Write a complete entry from a header and a reader of its content.
    pub fn append(&mut self, header: &NewcHeader, reader: &mut impl Read) -> CpioResult<()> {
        self.append_header(header)?;
        std::io::copy(reader, self)?;
        self.finish_entry()
    }

    /// Write the trailer entry and return the inner writer.
    pub fn finish(mut self) -> CpioResult<W> {
        self.finish_entry()?;
        self.writer.write_all(&NewcHeader::trailer().to_bytes()?)?;
        self.writer.flush()?;

        debug!("wrote cpio archive with {} entries", self.entry_count);

        Ok(self.writer)
    }
}

impl<W: Write> Write for NewcWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let entry = self.current.as_mut().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                "no current archive entry to write to",
            )
        })?;

        if buf.len() as u64 > entry.remaining {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("write exceeds entry size of {} bytes", entry.size),
            ));
        }

        let written = self.writer.write(buf)?;
        entry.remaining -= written as u64;

        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
