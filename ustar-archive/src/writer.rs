// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{block_padding, header::TarHeader, Error, TarResult, BLOCK_SIZE},
    log::debug,
    std::{
        collections::HashSet,
        io::{Read, Write},
    },
};

struct PendingEntry {
    size: u64,
    remaining: u64,
}

/// A streaming writer of ustar archives.
///
/// Entries are started with [Self::append_header]. The content of the entry is
/// then written through the [Write] implementation and must match the size
/// declared in the header. Block padding is emitted when the next entry starts
/// or the archive is finished.
pub struct TarWriter<W: Write> {
    writer: W,
    current: Option<PendingEntry>,
    directory_template: Option<TarHeader>,
    directories: HashSet<String>,
}

impl<W: Write> TarWriter<W> {
    /// Construct a new writer. Nothing is written until the first entry.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            current: None,
            directory_template: None,
            directories: HashSet::new(),
        }
    }

    /// Synthesize directory entries for the ancestors of every appended path.
    ///
    /// Each directory is emitted once, immediately before the first entry that
    /// needs it. The mode, owner and mtime of synthesized entries come from
    /// `template`.
    pub fn with_implicit_directories(mut self, template: TarHeader) -> Self {
        self.directory_template = Some(template);
        self
    }

    fn finish_entry(&mut self) -> TarResult<()> {
        if let Some(entry) = self.current.take() {
            if entry.remaining != 0 {
                return Err(Error::BodySizeMismatch {
                    expected: entry.size,
                    actual: entry.size - entry.remaining,
                });
            }

            let pad = block_padding(entry.size) as usize;
            self.writer.write_all(&[0u8; BLOCK_SIZE][0..pad])?;
        }

        Ok(())
    }

    fn write_directories(&mut self, path: &str) -> TarResult<()> {
        let template = if let Some(template) = &self.directory_template {
            template.clone()
        } else {
            return Ok(());
        };

        let path = path.trim_end_matches('/');
        let components = path.split('/').collect::<Vec<_>>();

        for i in 1..components.len() {
            let dir = components[0..i].join("/");

            if dir.is_empty() || !self.directories.insert(dir.clone()) {
                continue;
            }

            debug!("synthesizing directory entry {}/", dir);
            let header = TarHeader {
                path: format!("{}/", dir),
                ..template.clone()
            };
            self.writer.write_all(&header.to_block()?)?;
        }

        Ok(())
    }

    /// Begin a new entry.
    ///
    /// Directory headers for a path that was already emitted are skipped.
    pub fn append_header(&mut self, header: &TarHeader) -> TarResult<()> {
        self.finish_entry()?;
        self.write_directories(&header.path)?;

        if header.is_directory() {
            let dir = header.path.trim_end_matches('/').to_string();
            if !self.directories.insert(dir) {
                debug!("directory {} already present; skipping", header.path);
                return Ok(());
            }
        }

        self.writer.write_all(&header.to_block()?)?;
        self.current = Some(PendingEntry {
            size: header.size,
            remaining: header.size,
        });

        Ok(())
    }

    /// Write a complete entry from a header and a reader of its content.
    pub fn append(&mut self, header: &TarHeader, reader: &mut impl Read) -> TarResult<()> {
        self.append_header(header)?;
        std::io::copy(reader, self)?;
        self.finish_entry()
    }

    /// Finish the archive by writing the two terminating zero blocks.
    pub fn finish(mut self) -> TarResult<W> {
        self.finish_entry()?;
        self.writer.write_all(&[0u8; 2 * BLOCK_SIZE])?;
        self.writer.flush()?;

        Ok(self.writer)
    }
}

impl<W: Write> Write for TarWriter<W> {
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
                format!(
                    "write exceeds entry size of {} bytes by {} bytes",
                    entry.size,
                    buf.len() as u64 - entry.remaining
                ),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_not_duplicated() -> TarResult<()> {
        let mut writer =
            TarWriter::new(Vec::new()).with_implicit_directories(TarHeader::directory(""));

        writer.append(&TarHeader::file("etc/app/conf", 0), &mut std::io::empty())?;
        writer.append(&TarHeader::directory("etc/app"), &mut std::io::empty())?;
        writer.append(&TarHeader::directory("var/lib"), &mut std::io::empty())?;

        let data = writer.finish()?;
        // etc/, etc/app/, etc/app/conf, var/, var/lib/ and two zero blocks.
        assert_eq!(data.len(), 7 * BLOCK_SIZE);

        Ok(())
    }

    #[test]
    fn short_body_rejected() -> TarResult<()> {
        let mut writer = TarWriter::new(Vec::new());
        writer.append_header(&TarHeader::file("a", 10))?;
        writer.write_all(b"abc")?;

        assert!(matches!(
            writer.finish(),
            Err(Error::BodySizeMismatch {
                expected: 10,
                actual: 3
            })
        ));

        Ok(())
    }

    #[test]
    fn long_body_rejected() {
        let mut writer = TarWriter::new(Vec::new());
        writer
            .append_header(&TarHeader::file("a", 1))
            .expect("header should be written");

        assert!(writer.write_all(b"abc").is_err());
    }
}
