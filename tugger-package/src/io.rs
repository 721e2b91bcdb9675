// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! I/O helpers. */

use {
    digest::DynDigest,
    flate2::{read::GzDecoder, write::GzEncoder, Compression},
    std::{
        fmt::Formatter,
        io::{Read, Write},
    },
};

/// A content digest algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DigestType {
    Md5,
    Sha1,
    Sha256,
}

impl DigestType {
    /// Create a new hasher for this algorithm.
    pub fn new_hasher(&self) -> Box<dyn DynDigest + Send> {
        match self {
            Self::Md5 => Box::new(md5::Md5::default()),
            Self::Sha1 => Box::new(sha1::Sha1::default()),
            Self::Sha256 => Box::new(sha2::Sha256::default()),
        }
    }

    /// Compute the digest of a byte slice.
    pub fn digest(&self, data: &[u8]) -> ContentDigest {
        let mut hasher = self.new_hasher();
        hasher.update(data);

        ContentDigest::from_hasher(*self, hasher)
    }
}

/// Represents a content digest.
#[derive(Clone, Eq, PartialEq, PartialOrd)]
pub enum ContentDigest {
    /// An MD5 digest.
    Md5(Vec<u8>),
    /// A SHA-1 digest.
    Sha1(Vec<u8>),
    /// A SHA-256 digest.
    Sha256(Vec<u8>),
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5(data) => write!(f, "Md5({})", hex::encode(data)),
            Self::Sha1(data) => write!(f, "Sha1({})", hex::encode(data)),
            Self::Sha256(data) => write!(f, "Sha256({})", hex::encode(data)),
        }
    }
}

impl ContentDigest {
    fn from_hasher(digest_type: DigestType, hasher: Box<dyn DynDigest + Send>) -> Self {
        let data = hasher.finalize().to_vec();

        match digest_type {
            DigestType::Md5 => Self::Md5(data),
            DigestType::Sha1 => Self::Sha1(data),
            DigestType::Sha256 => Self::Sha256(data),
        }
    }

    /// Obtain an instance by parsing a hex string.
    pub fn from_hex_digest(
        digest_type: DigestType,
        digest: &str,
    ) -> Result<Self, hex::FromHexError> {
        let digest = hex::decode(digest)?;

        Ok(match digest_type {
            DigestType::Md5 => Self::Md5(digest),
            DigestType::Sha1 => Self::Sha1(digest),
            DigestType::Sha256 => Self::Sha256(digest),
        })
    }

    /// Obtain the digest bytes for this content digest.
    pub fn digest_bytes(&self) -> &[u8] {
        match self {
            Self::Md5(x) => x,
            Self::Sha1(x) => x,
            Self::Sha256(x) => x,
        }
    }

    /// Obtain the hex encoded content digest.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest_bytes())
    }

    /// Obtain the [DigestType] for this digest.
    pub fn digest_type(&self) -> DigestType {
        match self {
            Self::Md5(_) => DigestType::Md5,
            Self::Sha1(_) => DigestType::Sha1,
            Self::Sha256(_) => DigestType::Sha256,
        }
    }
}

/// Holds multiple flavors of content digests.
#[derive(Clone, Debug)]
pub struct MultiContentDigest {
    pub md5: ContentDigest,
    pub sha1: ContentDigest,
    pub sha256: ContentDigest,
}

impl MultiContentDigest {
    /// Whether this digest matches another one.
    pub fn matches_digest(&self, other: &ContentDigest) -> bool {
        self.digest(other.digest_type()) == other
    }

    /// Obtain the [ContentDigest] for a given [DigestType].
    pub fn digest(&self, digest_type: DigestType) -> &ContentDigest {
        match digest_type {
            DigestType::Md5 => &self.md5,
            DigestType::Sha1 => &self.sha1,
            DigestType::Sha256 => &self.sha256,
        }
    }
}

/// A content digester that simultaneously computes multiple digest types.
pub struct MultiDigester {
    md5: Box<dyn DynDigest + Send>,
    sha1: Box<dyn DynDigest + Send>,
    sha256: Box<dyn DynDigest + Send>,
}

impl Default for MultiDigester {
    fn default() -> Self {
        Self {
            md5: DigestType::Md5.new_hasher(),
            sha1: DigestType::Sha1.new_hasher(),
            sha256: DigestType::Sha256.new_hasher(),
        }
    }
}

impl MultiDigester {
    /// Write content into the digesters.
    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.sha1.update(data);
        self.sha256.update(data);
    }

    /// Finish digesting content.
    ///
    /// Consumes the instance and returns a [MultiContentDigest] holding all the digests.
    pub fn finish(self) -> MultiContentDigest {
        MultiContentDigest {
            md5: ContentDigest::from_hasher(DigestType::Md5, self.md5),
            sha1: ContentDigest::from_hasher(DigestType::Sha1, self.sha1),
            sha256: ContentDigest::from_hasher(DigestType::Sha256, self.sha256),
        }
    }
}

/// A [Write] adapter that computes digests of everything written to a destination.
///
/// Writes fan out to the destination and the digesters. Only bytes the
/// destination accepted are digested.
pub struct DigestingWriter<W> {
    digester: MultiDigester,
    dest: W,
    bytes_written: u64,
}

impl<W> DigestingWriter<W> {
    /// Construct a new instance from a destination writer.
    pub fn new(dest: W) -> Self {
        Self {
            digester: MultiDigester::default(),
            dest,
            bytes_written: 0,
        }
    }

    /// Number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Finish the stream.
    ///
    /// Returns the destination writer, the number of bytes written and a
    /// resolved [MultiContentDigest].
    pub fn finish(self) -> (W, u64, MultiContentDigest) {
        (self.dest, self.bytes_written, self.digester.finish())
    }
}

impl<W: Write> Write for DigestingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.dest.write(buf)?;

        if size > 0 {
            self.digester.update(&buf[0..size]);
            self.bytes_written += size as u64;
        }

        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.dest.flush()
    }
}

/// A [Read] adapter that computes digests of everything read from a source.
pub struct DigestingReader<R> {
    digester: MultiDigester,
    source: R,
    bytes_read: u64,
}

impl<R> DigestingReader<R> {
    /// Construct a new instance from a source reader.
    pub fn new(source: R) -> Self {
        Self {
            digester: MultiDigester::default(),
            source,
            bytes_read: 0,
        }
    }

    /// Finish the stream.
    ///
    /// Returns the source reader, the number of bytes read and a resolved
    /// [MultiContentDigest].
    pub fn finish(self) -> (R, u64, MultiContentDigest) {
        (self.source, self.bytes_read, self.digester.finish())
    }
}

impl<R: Read> Read for DigestingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let size = self.source.read(buf)?;

        if size > 0 {
            self.digester.update(&buf[0..size]);
            self.bytes_read += size as u64;
        }

        Ok(size)
    }
}

/// Drain a reader, returning its size and digests.
pub fn digest_reader(reader: impl Read) -> std::io::Result<(u64, MultiContentDigest)> {
    let mut reader = DigestingReader::new(reader);
    std::io::copy(&mut reader, &mut std::io::sink())?;

    let (_, size, digests) = reader.finish();

    Ok((size, digests))
}

/// Wrap a writer with gzip compression at the given level (0-9).
pub fn gzip_writer<W: Write>(dest: W, level: u32) -> GzEncoder<W> {
    GzEncoder::new(dest, Compression::new(level))
}

/// Wrap a reader with gzip decompression.
pub fn gunzip_reader<R: Read>(source: R) -> GzDecoder<R> {
    GzDecoder::new(source)
}

/// Gzip a buffer at the given level.
pub fn gzip(data: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = gzip_writer(Vec::new(), level);
    encoder.write_all(data)?;

    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(
            DigestType::Md5.digest(b"X").digest_hex(),
            "02129bb861061d1a052c592e2dc6b383"
        );
        assert_eq!(
            DigestType::Sha1.digest(b"").digest_hex(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn writer_fans_out() -> std::io::Result<()> {
        let mut writer = DigestingWriter::new(Vec::new());
        writer.write_all(b"hello ")?;
        writer.write_all(b"world")?;

        let (data, size, digests) = writer.finish();
        assert_eq!(data, b"hello world");
        assert_eq!(size, 11);
        assert!(digests.matches_digest(&DigestType::Sha256.digest(b"hello world")));
        assert_eq!(digests.md5, DigestType::Md5.digest(b"hello world"));

        Ok(())
    }

    #[test]
    fn reader_digests() -> std::io::Result<()> {
        let (size, digests) = digest_reader(&b"hello world"[..])?;
        assert_eq!(size, 11);
        assert_eq!(
            digests.md5.digest_hex(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );

        Ok(())
    }

    #[test]
    fn gzip_round_trip() -> std::io::Result<()> {
        let data = gzip(b"some text some text some text", 9)?;
        assert_eq!(&data[0..2], &[0x1f, 0x8b]);

        let mut out = String::new();
        gunzip_reader(&data[..]).read_to_string(&mut out)?;
        assert_eq!(out, "some text some text some text");

        Ok(())
    }

    #[test]
    fn hex_parse() -> Result<(), hex::FromHexError> {
        let digest =
            ContentDigest::from_hex_digest(DigestType::Md5, "02129bb861061d1a052c592e2dc6b383")?;
        assert_eq!(digest, DigestType::Md5.digest(b"X"));
        assert!(ContentDigest::from_hex_digest(DigestType::Md5, "zz").is_err());

        Ok(())
    }
}
