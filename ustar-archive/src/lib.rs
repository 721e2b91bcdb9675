// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! POSIX `ustar` archive reading and writing.

Archives are a sequence of 512 byte blocks. Each entry is a header block
followed by the entry content, padded with NULs to the next block boundary.
Two zero blocks terminate the archive.

The writer emits regular files and
directories only, which is all Debian `control.tar` and `data.tar` members
need. The reader additionally understands GNU long name (`L`) records, which
`dpkg-deb` emits for paths exceeding the ustar limits.
*/

mod header;
pub use header::{EntryType, TarHeader};
mod reader;
pub use reader::TarReader;
mod writer;
pub use writer::TarWriter;

/// Size of a tar block.
pub const BLOCK_SIZE: usize = 512;

/// Magic value in the header of ustar archives, including the version.
pub const USTAR_MAGIC: &[u8] = b"ustar\x0000";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("header checksum mismatch: header records {expected}; computed {actual}")]
    BadChecksum { expected: u32, actual: u32 },

    #[error("malformed header: {0}")]
    BadHeader(String),

    #[error("path cannot be represented in a ustar header: {0}")]
    PathTooLong(String),

    #[error("value {value} does not fit in {width} byte header field")]
    FieldOverflow { value: u64, width: usize },

    #[error("entry body size mismatch: header says {expected} bytes; got {actual}")]
    BodySizeMismatch { expected: u64, actual: u64 },

    #[error("archive ended in the middle of an entry")]
    UnexpectedEnd,
}

/// Result type for this crate.
pub type TarResult<T> = Result<T, Error>;

/// Number of NUL bytes needed to pad `size` to a block boundary.
pub(crate) fn block_padding(size: u64) -> u64 {
    let remainder = size % BLOCK_SIZE as u64;

    if remainder == 0 {
        0
    } else {
        BLOCK_SIZE as u64 - remainder
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Read};

    fn sample_archive() -> TarResult<Vec<u8>> {
        let mut writer = TarWriter::new(Vec::new()).with_implicit_directories(
            TarHeader::directory("").with_mtime(1_700_000_000),
        );

        writer.append(
            &TarHeader::file("usr/bin/hello", 1)
                .with_mode(0o755)
                .with_mtime(1_700_000_000),
            &mut &b"X"[..],
        )?;
        writer.append(
            &TarHeader::file("usr/share/doc/hello/copyright", 4)
                .with_mtime(1_700_000_000),
            &mut &b"MIT\n"[..],
        )?;
        writer.append(
            &TarHeader::file("usr/bin/other", 0).with_mtime(1_700_000_000),
            &mut std::io::empty(),
        )?;

        writer.finish()
    }

    #[test]
    fn directories_emitted_once_in_prefix_order() -> TarResult<()> {
        let data = sample_archive()?;

        let paths = TarReader::new(std::io::Cursor::new(data))
            .map(|h| h.map(|h| h.path))
            .collect::<TarResult<Vec<_>>>()?;

        assert_eq!(
            paths,
            vec![
                "usr/",
                "usr/bin/",
                "usr/bin/hello",
                "usr/share/",
                "usr/share/doc/",
                "usr/share/doc/hello/",
                "usr/share/doc/hello/copyright",
                "usr/bin/other",
            ]
        );

        Ok(())
    }

    #[test]
    fn archive_is_block_aligned_and_terminated() -> TarResult<()> {
        let data = sample_archive()?;

        assert_eq!(data.len() % BLOCK_SIZE, 0);
        assert!(data[data.len() - 2 * BLOCK_SIZE..].iter().all(|b| *b == 0));

        Ok(())
    }

    #[test]
    fn round_trip_bodies() -> TarResult<()> {
        let data = sample_archive()?;
        let mut reader = TarReader::new(std::io::Cursor::new(data));

        let mut files = vec![];
        while let Some(header) = reader.read_next()? {
            if header.entry_type == EntryType::Regular {
                let mut body = vec![];
                reader.read_to_end(&mut body)?;
                assert_eq!(body.len() as u64, header.size);
                files.push((header.path, header.mode, body));
            }
        }

        assert_eq!(
            files,
            vec![
                ("usr/bin/hello".to_string(), 0o755, b"X".to_vec()),
                (
                    "usr/share/doc/hello/copyright".to_string(),
                    0o644,
                    b"MIT\n".to_vec()
                ),
                ("usr/bin/other".to_string(), 0o644, vec![]),
            ]
        );

        Ok(())
    }

    #[test]
    fn readable_by_tar_crate() -> TarResult<()> {
        let data = sample_archive()?;

        let mut archive = tar::Archive::new(std::io::Cursor::new(data));
        let mut seen = vec![];

        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = String::from_utf8_lossy(&entry.path_bytes()).to_string();
            let is_dir = entry.header().entry_type().is_dir();
            let mode = entry.header().mode()?;

            let mut body = vec![];
            entry.read_to_end(&mut body)?;

            seen.push((path, is_dir, mode, body.len()));
        }

        assert_eq!(seen.len(), 8);
        assert_eq!(seen[1], ("usr/bin/".to_string(), true, 0o755, 0));
        assert_eq!(seen[2], ("usr/bin/hello".to_string(), false, 0o755, 1));

        Ok(())
    }
}
