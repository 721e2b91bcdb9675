// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Intermediate storage for streams whose size must be known before emission. */

use {
    log::debug,
    std::{
        io::{Cursor, Read, Seek, SeekFrom, Write},
        path::Path,
    },
};

/// A seekable scratch buffer backed by memory or an anonymous temporary file.
///
/// The temporary file is unlinked at creation and released when the instance
/// is dropped.
#[derive(Debug)]
pub enum StagingBuffer {
    Memory(Cursor<Vec<u8>>),
    File(std::fs::File),
}

impl Default for StagingBuffer {
    fn default() -> Self {
        Self::Memory(Cursor::new(Vec::new()))
    }
}

impl StagingBuffer {
    /// Create a new instance, file backed if a directory is given.
    pub fn new(temp_dir: Option<&Path>) -> std::io::Result<Self> {
        Ok(match temp_dir {
            Some(dir) => {
                debug!("staging to temporary file in {}", dir.display());
                Self::File(tempfile::tempfile_in(dir)?)
            }
            None => Self::default(),
        })
    }

    /// Total number of bytes in the buffer.
    pub fn len(&self) -> std::io::Result<u64> {
        match self {
            Self::Memory(cursor) => Ok(cursor.get_ref().len() as u64),
            Self::File(file) => Ok(file.metadata()?.len()),
        }
    }

    pub fn is_empty(&self) -> std::io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy the full content of the buffer into a writer.
    ///
    /// The read position is reset before and after copying.
    pub fn copy_to(&mut self, dest: &mut impl Write) -> std::io::Result<u64> {
        self.seek(SeekFrom::Start(0))?;
        let count = std::io::copy(self, dest)?;
        self.seek(SeekFrom::Start(0))?;

        Ok(count)
    }

    /// Obtain the full content as a vector.
    pub fn to_vec(&mut self) -> std::io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.copy_to(&mut data)?;

        Ok(data)
    }
}

impl Read for StagingBuffer {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.read(buf),
            Self::File(file) => file.read(buf),
        }
    }
}

impl Write for StagingBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.write(buf),
            Self::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Memory(cursor) => cursor.flush(),
            Self::File(file) => file.flush(),
        }
    }
}

impl Seek for StagingBuffer {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            Self::Memory(cursor) => cursor.seek(pos),
            Self::File(file) => file.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_buffer() -> std::io::Result<()> {
        let mut buffer = StagingBuffer::new(None)?;
        assert!(buffer.is_empty()?);

        buffer.write_all(b"payload")?;
        assert_eq!(buffer.len()?, 7);
        assert_eq!(buffer.to_vec()?, b"payload");

        Ok(())
    }

    #[test]
    fn file_buffer() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;

        let mut buffer = StagingBuffer::new(Some(dir.path()))?;
        assert!(matches!(buffer, StagingBuffer::File(_)));

        buffer.write_all(b"abc")?;
        buffer.write_all(b"def")?;
        assert_eq!(buffer.len()?, 6);

        let mut out = vec![];
        assert_eq!(buffer.copy_to(&mut out)?, 6);
        assert_eq!(out, b"abcdef");

        Ok(())
    }
}
