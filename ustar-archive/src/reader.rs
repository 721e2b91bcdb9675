// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        block_padding,
        header::{EntryType, TarHeader},
        Error, TarResult, BLOCK_SIZE,
    },
    std::io::Read,
};

struct CurrentEntry {
    /// Bytes of content not yet consumed.
    remaining: u64,
    /// NUL padding following the content.
    padding: u64,
}

/// A streaming reader of ustar archives.
///
/// [Self::read_next] advances to the next entry, skipping any unread content of
/// the previous one. The [Read] implementation reads the content of the current
/// entry.
pub struct TarReader<R: Read> {
    reader: R,
    current: Option<CurrentEntry>,
    seen_trailer: bool,
}

impl<R: Read> TarReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            current: None,
            seen_trailer: false,
        }
    }

    /// Consume the instance, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read a full block. Returns `false` on a clean end of stream.
    fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> TarResult<bool> {
        let mut offset = 0;

        while offset < BLOCK_SIZE {
            match self.reader.read(&mut block[offset..])? {
                0 if offset == 0 => return Ok(false),
                0 => return Err(Error::UnexpectedEnd),
                n => offset += n,
            }
        }

        Ok(true)
    }

    /// Skip the remaining content and padding of the current entry.
    pub fn finish(&mut self) -> TarResult<()> {
        if let Some(entry) = self.current.take() {
            let wanted = entry.remaining + entry.padding;
            let skipped = std::io::copy(&mut (&mut self.reader).take(wanted), &mut std::io::sink())?;

            if skipped != wanted {
                return Err(Error::UnexpectedEnd);
            }
        }

        Ok(())
    }

    fn read_body(&mut self, size: u64) -> TarResult<Vec<u8>> {
        let mut data = vec![];
        (&mut self.reader).take(size).read_to_end(&mut data)?;
        if data.len() as u64 != size {
            return Err(Error::UnexpectedEnd);
        }

        let mut pad = [0u8; BLOCK_SIZE];
        self.reader
            .read_exact(&mut pad[0..block_padding(size) as usize])
            .map_err(|_| Error::UnexpectedEnd)?;

        Ok(data)
    }

    /// Advance to the next entry.
    ///
    /// Returns `None` at the terminating zero block or a clean end of stream.
    pub fn read_next(&mut self) -> TarResult<Option<TarHeader>> {
        self.finish()?;

        if self.seen_trailer {
            return Ok(None);
        }

        let mut long_name = None;

        loop {
            let mut block = [0u8; BLOCK_SIZE];

            if !self.read_block(&mut block)? || block.iter().all(|b| *b == 0) {
                self.seen_trailer = true;
                return Ok(None);
            }

            let mut header = TarHeader::from_block(&block)?;

            if header.entry_type == EntryType::GnuLongName {
                let data = self.read_body(header.size)?;
                let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
                long_name = Some(String::from_utf8_lossy(&data[0..end]).to_string());
                continue;
            }

            if let Some(name) = long_name.take() {
                header.path = name;
            }

            // Directory sizes carry no content.
            let size = if header.is_directory() { 0 } else { header.size };

            self.current = Some(CurrentEntry {
                remaining: size,
                padding: block_padding(size),
            });

            return Ok(Some(header));
        }
    }
}

impl<R: Read> Iterator for TarReader<R> {
    type Item = TarResult<TarHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

impl<R: Read> Read for TarReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let entry = match self.current.as_mut() {
            Some(entry) => entry,
            None => return Ok(0),
        };

        let limit = std::cmp::min(buf.len() as u64, entry.remaining) as usize;
        if limit == 0 {
            return Ok(0);
        }

        let count = self.reader.read(&mut buf[0..limit])?;
        if count == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "archive ended in the middle of an entry",
            ));
        }
        entry.remaining -= count as u64;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::TarWriter};

    #[test]
    fn empty_stream() -> TarResult<()> {
        let mut reader = TarReader::new(std::io::empty());
        assert!(reader.read_next()?.is_none());

        Ok(())
    }

    #[test]
    fn truncated_body() -> TarResult<()> {
        let mut writer = TarWriter::new(Vec::new());
        writer.append(&TarHeader::file("a", 100), &mut &[7u8; 100][..])?;
        let mut data = writer.finish()?;
        data.truncate(BLOCK_SIZE + 50);

        let mut reader = TarReader::new(std::io::Cursor::new(data));
        assert!(reader.read_next()?.is_some());
        assert!(matches!(reader.read_next(), Err(Error::UnexpectedEnd)));

        Ok(())
    }

    #[test]
    fn truncated_long_name() -> TarResult<()> {
        let mut long = TarHeader::file("././@LongLink", 1 << 32);
        long.entry_type = EntryType::GnuLongName;
        let mut data = long.to_block()?.to_vec();
        data.extend_from_slice(b"usr/bin/hello\0");

        let mut reader = TarReader::new(std::io::Cursor::new(data));
        assert!(matches!(reader.read_next(), Err(Error::UnexpectedEnd)));

        Ok(())
    }

    #[test]
    fn gnu_long_name() -> TarResult<()> {
        let name = format!("usr/share/{}", "n".repeat(150));

        let mut data = vec![];
        let mut long = TarHeader::file("././@LongLink", name.len() as u64 + 1);
        long.entry_type = EntryType::GnuLongName;
        data.extend_from_slice(&long.to_block()?);
        data.extend_from_slice(name.as_bytes());
        data.push(0);
        data.resize(2 * BLOCK_SIZE, 0);
        data.extend_from_slice(&TarHeader::file("truncated", 2).to_block()?);
        data.extend_from_slice(b"ok");
        data.resize(4 * BLOCK_SIZE, 0);
        data.extend_from_slice(&[0u8; 2 * BLOCK_SIZE]);

        let mut reader = TarReader::new(std::io::Cursor::new(data));
        let header = reader.read_next()?.expect("entry should be present");
        assert_eq!(header.path, name);

        let mut body = String::new();
        reader.read_to_string(&mut body)?;
        assert_eq!(body, "ok");
        assert!(reader.read_next()?.is_none());

        Ok(())
    }
}
