// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! RPM header sections.

A section is a 16 byte prefix, an index of 16 byte records and a store of
values the records point into:

```text
magic(8) count(4) size(4) index[count] store[size]
```

All integers are big-endian. The final index record is a region trailer
whose value in the store locates the start of the index.
*/

use {
    crate::{
        error::{Result, RpmError},
        tag::Tag,
    },
    log::debug,
    scroll::{IOread, IOwrite, Pread, Pwrite, SizeWith},
    std::{collections::BTreeMap, io::Read, marker::PhantomData},
};

/// Leading bytes of every header section.
pub const SECTION_MAGIC: [u8; 8] = [0x8e, 0xad, 0xe8, 0x01, 0, 0, 0, 0];

/// Size of a [SectionPrefix].
pub const SECTION_PREFIX_SIZE: usize = 16;

/// Size of an index record.
pub const INDEX_RECORD_SIZE: usize = 16;

/// The prefix of a header section.
#[derive(Clone, Copy, Debug, IOread, IOwrite, Pread, Pwrite, SizeWith)]
pub struct SectionPrefix {
    pub magic: [u8; 8],
    /// Number of index records, including the region trailer.
    pub count: u32,
    /// Size of the store in bytes.
    pub size: u32,
}

/// An index record locating a value in the store.
#[derive(Clone, Copy, Debug, Eq, IOread, IOwrite, PartialEq, Pread, Pwrite, SizeWith)]
pub struct IndexRecord {
    pub tag: u32,
    pub kind: u32,
    pub offset: i32,
    pub count: u32,
}

impl IndexRecord {
    fn to_bytes(self) -> Result<[u8; INDEX_RECORD_SIZE]> {
        let mut buf = [0u8; INDEX_RECORD_SIZE];
        buf.pwrite_with(self, 0, scroll::BE)?;

        Ok(buf)
    }
}

/// Number of NUL bytes following a signature section of `len` bytes.
pub fn section_padding(len: usize) -> usize {
    (8 - len % 8) % 8
}

/// Type of a value in a header store.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexType {
    Null = 0,
    Char = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    String = 6,
    Binary = 7,
    StringArray = 8,
    I18nString = 9,
}

impl IndexType {
    pub fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => Self::Null,
            1 => Self::Char,
            2 => Self::Int8,
            3 => Self::Int16,
            4 => Self::Int32,
            5 => Self::Int64,
            6 => Self::String,
            7 => Self::Binary,
            8 => Self::StringArray,
            9 => Self::I18nString,
            _ => return None,
        })
    }

    /// Store alignment of values of this type.
    pub fn alignment(&self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int32 => 4,
            Self::Int64 => 8,
            _ => 1,
        }
    }
}

/// A value held in a header section.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IndexData {
    Null,
    Char(Vec<u8>),
    Int8(Vec<u8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    String(String),
    Binary(Vec<u8>),
    StringArray(Vec<String>),
    /// Strings per locale of the `HeaderI18nTable`.
    I18nString(Vec<String>),
}

impl IndexData {
    pub fn index_type(&self) -> IndexType {
        match self {
            Self::Null => IndexType::Null,
            Self::Char(_) => IndexType::Char,
            Self::Int8(_) => IndexType::Int8,
            Self::Int16(_) => IndexType::Int16,
            Self::Int32(_) => IndexType::Int32,
            Self::Int64(_) => IndexType::Int64,
            Self::String(_) => IndexType::String,
            Self::Binary(_) => IndexType::Binary,
            Self::StringArray(_) => IndexType::StringArray,
            Self::I18nString(_) => IndexType::I18nString,
        }
    }

    /// The element count recorded in the index.
    pub fn count(&self) -> u32 {
        (match self {
            Self::Null => 0,
            Self::Char(v) | Self::Int8(v) | Self::Binary(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::String(_) => 1,
            Self::StringArray(v) | Self::I18nString(v) => v.len(),
        }) as u32
    }

    /// Whether the value carries nothing worth recording.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => s.is_empty(),
            _ => self.count() == 0,
        }
    }

    /// Append the value to a store, returning the offset it starts at.
    ///
    /// The store is padded with NULs to the alignment of the type first.
    pub fn append(&self, store: &mut Vec<u8>) -> usize {
        let alignment = self.index_type().alignment();
        while store.len() % alignment != 0 {
            store.push(0);
        }
        let offset = store.len();

        match self {
            Self::Null => {}
            Self::Char(v) | Self::Int8(v) | Self::Binary(v) => store.extend_from_slice(v),
            Self::Int16(v) => v.iter().for_each(|x| store.extend_from_slice(&x.to_be_bytes())),
            Self::Int32(v) => v.iter().for_each(|x| store.extend_from_slice(&x.to_be_bytes())),
            Self::Int64(v) => v.iter().for_each(|x| store.extend_from_slice(&x.to_be_bytes())),
            Self::String(s) => {
                store.extend_from_slice(s.as_bytes());
                store.push(0);
            }
            Self::StringArray(v) | Self::I18nString(v) => {
                for s in v {
                    store.extend_from_slice(s.as_bytes());
                    store.push(0);
                }
            }
        }

        offset
    }

    /// Decode a value from a store.
    ///
    /// `tag` names the value in errors.
    pub fn decode(
        kind: IndexType,
        count: u32,
        store: &[u8],
        offset: i32,
        tag: &str,
    ) -> Result<Self> {
        if offset < 0 || offset as usize > store.len() {
            return Err(RpmError::OffsetOutOfRange {
                tag: tag.to_string(),
                offset: offset as i64,
            });
        }
        let data = &store[offset as usize..];
        let count = count as usize;

        Ok(match kind {
            IndexType::Null => Self::Null,
            IndexType::Char => Self::Char(fixed(data, count)?.to_vec()),
            IndexType::Int8 => Self::Int8(fixed(data, count)?.to_vec()),
            IndexType::Binary => Self::Binary(fixed(data, count)?.to_vec()),
            IndexType::Int16 => Self::Int16(
                fixed(data, count.saturating_mul(2))?
                    .chunks_exact(2)
                    .map(|c| i16::from_be_bytes([c[0], c[1]]))
                    .collect(),
            ),
            IndexType::Int32 => Self::Int32(
                fixed(data, count.saturating_mul(4))?
                    .chunks_exact(4)
                    .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            IndexType::Int64 => Self::Int64(
                fixed(data, count.saturating_mul(8))?
                    .chunks_exact(8)
                    .map(|c| i64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            IndexType::String => Self::String(
                read_strings(data, 1, tag)?
                    .into_iter()
                    .next()
                    .unwrap_or_default(),
            ),
            IndexType::StringArray => Self::StringArray(read_strings(data, count, tag)?),
            IndexType::I18nString => Self::I18nString(read_strings(data, count, tag)?),
        })
    }

    /// The string of a `String`, or the first string of an `I18nString`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::I18nString(v) => v.first().map(|s| s.as_str()),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::StringArray(v) | Self::I18nString(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i16s(&self) -> Option<&[i16]> {
        match self {
            Self::Int16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32s(&self) -> Option<&[i32]> {
        match self {
            Self::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) | Self::Char(v) | Self::Int8(v) => Some(v),
            _ => None,
        }
    }
}

fn fixed(data: &[u8], len: usize) -> Result<&[u8]> {
    data.get(0..len).ok_or(RpmError::TruncatedStore)
}

fn read_strings(mut data: &[u8], count: usize, tag: &str) -> Result<Vec<String>> {
    let mut res = Vec::with_capacity(count.min(data.len()));

    for _ in 0..count {
        let end = data
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| RpmError::StringNotTerminated(tag.to_string()))?;
        res.push(String::from_utf8_lossy(&data[0..end]).to_string());
        data = &data[end + 1..];
    }

    Ok(res)
}

/// A header section: a mapping of tags to values.
///
/// Values are kept ordered by tag number, which is also the order they
/// are encoded in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header<T: Tag> {
    entries: BTreeMap<u32, IndexData>,
    _tag: PhantomData<T>,
}

impl<T: Tag> Default for Header<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            _tag: PhantomData,
        }
    }
}

impl<T: Tag> Header<T> {
    /// Set the value of a tag.
    ///
    /// Empty values are not recorded.
    pub fn set(&mut self, tag: T, data: IndexData) {
        if data.is_empty() {
            debug!("skipping empty value of {}", tag.name());
            self.entries.remove(&tag.number());
        } else {
            self.entries.insert(tag.number(), data);
        }
    }

    pub fn get(&self, tag: T) -> Option<&IndexData> {
        self.entries.get(&tag.number())
    }

    /// Obtain the value of a tag by number.
    ///
    /// This can address tags that have no [Tag] variant.
    pub fn get_number(&self, number: u32) -> Option<&IndexData> {
        self.entries.get(&number)
    }

    /// Iterate over `(tag number, value)` pairs in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &IndexData)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn typed<'a, V: ?Sized>(
        &'a self,
        tag: T,
        convert: impl Fn(&'a IndexData) -> Option<&'a V>,
    ) -> Result<&'a V> {
        let data = self
            .get(tag)
            .ok_or_else(|| RpmError::MissingTag(tag.name().to_string()))?;

        convert(data).ok_or_else(|| RpmError::WrongType(tag.name().to_string()))
    }

    pub fn string(&self, tag: T) -> Result<&str> {
        self.typed(tag, IndexData::as_str)
    }

    pub fn string_array(&self, tag: T) -> Result<&[String]> {
        self.typed(tag, IndexData::as_strings)
    }

    pub fn i16s(&self, tag: T) -> Result<&[i16]> {
        self.typed(tag, IndexData::as_i16s)
    }

    pub fn i32s(&self, tag: T) -> Result<&[i32]> {
        self.typed(tag, IndexData::as_i32s)
    }

    /// The first value of an `Int32` tag.
    pub fn i32(&self, tag: T) -> Result<i32> {
        self.i32s(tag)?
            .first()
            .copied()
            .ok_or_else(|| RpmError::MissingTag(tag.name().to_string()))
    }

    pub fn binary(&self, tag: T) -> Result<&[u8]> {
        self.typed(tag, IndexData::as_bytes)
    }

    /// A string value, or an empty string if the tag is absent.
    pub fn string_or_empty(&self, tag: T) -> &str {
        self.get(tag).and_then(IndexData::as_str).unwrap_or_default()
    }

    /// A string array value, or an empty slice if the tag is absent.
    pub fn strings_or_empty(&self, tag: T) -> &[String] {
        self.get(tag).and_then(IndexData::as_strings).unwrap_or_default()
    }

    /// Serialize to the binary section form, including the region trailer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut records = Vec::with_capacity(self.entries.len() + 1);
        let mut store = vec![];

        for (tag, data) in &self.entries {
            let offset = data.append(&mut store);
            records.push(IndexRecord {
                tag: *tag,
                kind: data.index_type() as u32,
                offset: offset as i32,
                count: data.count(),
            });
        }

        let count = records.len() + 1;
        let trailer = IndexRecord {
            tag: T::REGION,
            kind: IndexType::Binary as u32,
            offset: -((count * INDEX_RECORD_SIZE) as i32),
            count: INDEX_RECORD_SIZE as u32,
        };
        records.push(IndexRecord {
            offset: store.len() as i32,
            ..trailer
        });
        store.extend_from_slice(&trailer.to_bytes()?);

        let prefix = SectionPrefix {
            magic: SECTION_MAGIC,
            count: count as u32,
            size: store.len() as u32,
        };

        let mut res = Vec::with_capacity(
            SECTION_PREFIX_SIZE + count * INDEX_RECORD_SIZE + store.len(),
        );
        res.iowrite_with(prefix, scroll::BE)?;
        for record in records {
            res.extend_from_slice(&record.to_bytes()?);
        }
        res.extend_from_slice(&store);

        Ok(res)
    }

    /// Parse the binary section form.
    ///
    /// Region trailers are validated for type but not retained.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let prefix_size = SECTION_PREFIX_SIZE;
        if data.len() < prefix_size {
            return Err(RpmError::TruncatedStore);
        }

        let prefix = data.pread_with::<SectionPrefix>(0, scroll::BE)?;
        if prefix.magic != SECTION_MAGIC {
            return Err(RpmError::BadMagic);
        }

        let store_start = (prefix.count as usize)
            .checked_mul(INDEX_RECORD_SIZE)
            .and_then(|len| len.checked_add(prefix_size))
            .ok_or(RpmError::TruncatedStore)?;
        let store_end = store_start
            .checked_add(prefix.size as usize)
            .ok_or(RpmError::TruncatedStore)?;
        let store = data
            .get(store_start..store_end)
            .ok_or(RpmError::TruncatedStore)?;

        let mut header = Self::default();

        for i in 0..prefix.count as usize {
            let record = data
                .pread_with::<IndexRecord>(prefix_size + i * INDEX_RECORD_SIZE, scroll::BE)?;
            let name = T::describe(record.tag);

            let kind = IndexType::from_id(record.kind).ok_or_else(|| {
                RpmError::UnsupportedType {
                    tag: name.clone(),
                    kind: record.kind,
                }
            })?;

            if record.tag == T::REGION {
                if kind != IndexType::Binary {
                    return Err(RpmError::WrongType(name));
                }
                continue;
            }

            let value = IndexData::decode(kind, record.count, store, record.offset, &name)?;
            header.entries.insert(record.tag, value);
        }

        Ok(header)
    }

    /// Read the raw bytes of one section from a stream.
    ///
    /// The stream is left positioned after the store. Any padding is not
    /// consumed.
    pub fn read_section(reader: &mut impl Read) -> Result<Vec<u8>> {
        let mut data = vec![0u8; SECTION_PREFIX_SIZE];
        read_exact(reader, &mut data)?;

        let prefix = data.pread_with::<SectionPrefix>(0, scroll::BE)?;
        if prefix.magic != SECTION_MAGIC {
            return Err(RpmError::BadMagic);
        }

        // The prefix is untrusted; bound the read rather than preallocating.
        let len = prefix.count as u64 * INDEX_RECORD_SIZE as u64 + prefix.size as u64;
        let read = reader.take(len).read_to_end(&mut data)?;
        if (read as u64) < len {
            return Err(RpmError::TruncatedStore);
        }

        Ok(data)
    }

    /// Read and parse one section from a stream, returning it with its raw bytes.
    pub fn read(reader: &mut impl Read) -> Result<(Self, Vec<u8>)> {
        let data = Self::read_section(reader)?;

        Ok((Self::parse(&data)?, data))
    }
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            RpmError::TruncatedStore
        } else {
            RpmError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::tag::{IndexTag, SignatureTag},
        tugger_package::ErrorKind,
    };

    fn records(data: &[u8]) -> Result<Vec<IndexRecord>> {
        let prefix = data.pread_with::<SectionPrefix>(0, scroll::BE)?;

        let mut res = vec![];
        for i in 0..prefix.count as usize {
            res.push(data.pread_with::<IndexRecord>(16 + i * 16, scroll::BE)?);
        }

        Ok(res)
    }

    fn raw_section(records: &[IndexRecord], store: &[u8]) -> Result<Vec<u8>> {
        let mut data = SECTION_MAGIC.to_vec();
        data.extend_from_slice(&(records.len() as u32).to_be_bytes());
        data.extend_from_slice(&(store.len() as u32).to_be_bytes());
        for record in records {
            data.extend_from_slice(&record.to_bytes()?);
        }
        data.extend_from_slice(store);

        Ok(data)
    }

    fn sample() -> Header<IndexTag> {
        let mut header = Header::default();
        header.set(IndexTag::Name, IndexData::String("hello".into()));
        header.set(IndexTag::FileModes, IndexData::Int16(vec![0o100755u32 as i16]));
        header.set(IndexTag::Size, IndexData::Int32(vec![1]));
        header.set(
            IndexTag::Summary,
            IndexData::I18nString(vec!["caf\u{e9}".into()]),
        );
        header.set(
            IndexTag::BaseNames,
            IndexData::StringArray(vec!["a".into(), "bc".into()]),
        );
        header.set(IndexTag::FileInodes, IndexData::Int32(vec![1, 2]));
        header
    }

    #[test]
    fn round_trip() -> Result<()> {
        let header = sample();
        let data = header.encode()?;

        assert_eq!(&data[0..8], &SECTION_MAGIC);
        assert_eq!(Header::<IndexTag>::parse(&data)?, header);
        assert_eq!(header.string(IndexTag::Summary)?, "caf\u{e9}");
        assert_eq!(header.i32(IndexTag::Size)?, 1);

        Ok(())
    }

    #[test]
    fn numeric_alignment() -> Result<()> {
        let data = sample().encode()?;

        for record in records(&data)? {
            let alignment = IndexType::from_id(record.kind)
                .map(|t| t.alignment())
                .unwrap_or(1);
            assert_eq!(record.offset.max(0) as usize % alignment, 0, "{:?}", record);
        }

        Ok(())
    }

    #[test]
    fn region_trailer() -> Result<()> {
        let data = sample().encode()?;
        let records = records(&data)?;

        assert_eq!(records.len(), 7);
        let last = records[records.len() - 1];
        assert_eq!(last.tag, 63);
        assert_eq!(last.kind, IndexType::Binary as u32);
        assert_eq!(last.count, 16);

        let store_start = 16 + records.len() * 16;
        assert_eq!(store_start + last.offset as usize + 16, data.len());
        let value = data.pread_with::<IndexRecord>(store_start + last.offset as usize, scroll::BE)?;
        assert_eq!(value.tag, 63);
        assert_eq!(value.offset, -(7 * 16));

        Ok(())
    }

    #[test]
    fn empty_values_skipped() -> Result<()> {
        let mut header = Header::<IndexTag>::default();
        header.set(IndexTag::Vendor, IndexData::String("".into()));
        header.set(IndexTag::RequireName, IndexData::StringArray(vec![]));
        header.set(IndexTag::Name, IndexData::String("x".into()));

        assert_eq!(header.len(), 1);
        assert_eq!(records(&header.encode()?)?.len(), 2);
        assert!(matches!(
            header.string(IndexTag::Vendor),
            Err(RpmError::MissingTag(_))
        ));
        assert!(matches!(
            header.i32s(IndexTag::Name),
            Err(RpmError::WrongType(_))
        ));

        Ok(())
    }

    #[test]
    fn signature_section() -> Result<()> {
        let mut header = Header::<SignatureTag>::default();
        header.set(SignatureTag::HeaderSize, IndexData::Int32(vec![1234]));
        header.set(SignatureTag::Md5, IndexData::Binary(vec![7u8; 16]));

        let data = header.encode()?;
        assert_eq!(records(&data)?.last().map(|r| r.tag), Some(62));

        let (parsed, raw) = Header::<SignatureTag>::read(&mut &data[..])?;
        assert_eq!(raw, data);
        assert_eq!(parsed.binary(SignatureTag::Md5)?, &[7u8; 16]);
        assert_eq!(parsed.i32(SignatureTag::HeaderSize)?, 1234);

        Ok(())
    }

    #[test]
    fn padding() {
        assert_eq!(section_padding(16), 0);
        assert_eq!(section_padding(17), 7);
        assert_eq!(section_padding(23), 1);
    }

    #[test]
    fn malformed() -> Result<()> {
        let mut data = sample().encode()?;
        data[0] = 0;
        assert!(matches!(
            Header::<IndexTag>::parse(&data),
            Err(RpmError::BadMagic)
        ));

        let data = sample().encode()?;
        assert!(matches!(
            Header::<IndexTag>::parse(&data[0..data.len() - 1]),
            Err(RpmError::TruncatedStore)
        ));
        assert!(matches!(
            Header::<IndexTag>::read(&mut &data[0..20]),
            Err(RpmError::TruncatedStore)
        ));

        let record = |kind, offset, count| IndexRecord {
            tag: IndexTag::Name as u32,
            kind,
            offset,
            count,
        };

        let data = raw_section(&[record(6, 0, 1)], b"abc")?;
        match Header::<IndexTag>::parse(&data) {
            Err(RpmError::StringNotTerminated(tag)) => assert_eq!(tag, "Name"),
            other => panic!("unexpected result: {:?}", other),
        }

        let data = raw_section(&[record(12, 0, 1)], b"abc\0")?;
        assert!(matches!(
            Header::<IndexTag>::parse(&data),
            Err(RpmError::UnsupportedType { kind: 12, .. })
        ));

        let data = raw_section(&[record(6, 9, 1)], b"abc\0")?;
        assert!(matches!(
            Header::<IndexTag>::parse(&data),
            Err(RpmError::OffsetOutOfRange { offset: 9, .. })
        ));

        let data = raw_section(&[record(4, 0, 2)], b"abcd")?;
        assert!(matches!(
            Header::<IndexTag>::parse(&data),
            Err(RpmError::TruncatedStore)
        ));

        Ok(())
    }

    #[test]
    fn oversized_counts() -> Result<()> {
        let data = raw_section(
            &[IndexRecord {
                tag: IndexTag::BaseNames as u32,
                kind: IndexType::StringArray as u32,
                offset: 0,
                count: u32::MAX,
            }],
            b"a\0b\0",
        )?;
        match Header::<IndexTag>::parse(&data) {
            Err(e @ RpmError::StringNotTerminated(_)) => assert_eq!(e.kind(), ErrorKind::Format),
            other => panic!("unexpected result: {:?}", other),
        }

        let data = raw_section(
            &[IndexRecord {
                tag: IndexTag::FileSizes as u32,
                kind: IndexType::Int64 as u32,
                offset: 0,
                count: u32::MAX,
            }],
            &[0; 8],
        )?;
        assert!(matches!(
            Header::<IndexTag>::parse(&data),
            Err(RpmError::TruncatedStore)
        ));

        let mut data = SECTION_MAGIC.to_vec();
        data.extend_from_slice(&u32::MAX.to_be_bytes());
        data.extend_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            Header::<IndexTag>::parse(&data),
            Err(RpmError::TruncatedStore)
        ));
        match Header::<IndexTag>::read_section(&mut &data[..]) {
            Err(e @ RpmError::TruncatedStore) => assert_eq!(e.kind(), ErrorKind::Format),
            other => panic!("unexpected result: {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn unknown_tags_retained() -> Result<()> {
        let data = raw_section(
            &[IndexRecord {
                tag: 4242,
                kind: 4,
                offset: 0,
                count: 1,
            }],
            &[0, 0, 0, 5],
        )?;

        let header = Header::<IndexTag>::parse(&data)?;
        assert_eq!(header.get_number(4242), Some(&IndexData::Int32(vec![5])));

        Ok(())
    }
}
