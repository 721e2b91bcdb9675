// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The legacy 96 byte lead of RPM files. */

use {
    crate::error::{Result, RpmError},
    scroll::{IOread, IOwrite, Pread, Pwrite, SizeWith},
    std::io::{Read, Write},
};

/// Leading bytes of every RPM file.
pub const LEAD_MAGIC: [u8; 4] = [0xed, 0xab, 0xee, 0xdb];

/// Size of the `name` field.
pub const LEAD_NAME_SIZE: usize = 66;

/// The lead of an RPM file.
///
/// Modern tools only look at the magic. Everything of value lives in the
/// header sections that follow.
#[derive(Clone, Copy, Debug, IOread, IOwrite, Pread, Pwrite, SizeWith)]
pub struct Lead {
    pub magic: [u8; 4],
    pub major: u8,
    pub minor: u8,
    /// 0 for binary packages.
    pub kind: u16,
    pub arch: u16,
    /// `name-version` NUL padded.
    pub name: [u8; 66],
    pub os: u16,
    /// 5 for header-style signatures.
    pub signature_type: u16,
    pub reserved: [u8; 16],
}

impl Lead {
    /// Construct the lead of a binary package.
    ///
    /// `name` is truncated so the field stays NUL terminated.
    pub fn new(name: &str) -> Self {
        let mut field = [0u8; LEAD_NAME_SIZE];
        let len = name.len().min(LEAD_NAME_SIZE - 1);
        field[0..len].copy_from_slice(&name.as_bytes()[0..len]);

        Self {
            magic: LEAD_MAGIC,
            major: 3,
            minor: 0,
            kind: 0,
            arch: 0,
            name: field,
            os: 1,
            signature_type: 5,
            reserved: [0; 16],
        }
    }

    pub fn read(reader: &mut impl Read) -> Result<Self> {
        let lead = reader.ioread_with::<Self>(scroll::BE)?;

        if lead.magic != LEAD_MAGIC {
            return Err(RpmError::BadLeadMagic);
        }

        Ok(lead)
    }

    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.iowrite_with(*self, scroll::BE)?;

        Ok(())
    }

    /// The `name` field up to its first NUL.
    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(LEAD_NAME_SIZE);

        String::from_utf8_lossy(&self.name[0..end]).to_string()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, scroll::ctx::SizeWith};

    #[test]
    fn layout() -> Result<()> {
        assert_eq!(Lead::size_with(&scroll::BE), 96);
        assert_eq!(Lead::new("").name.len(), LEAD_NAME_SIZE);

        let mut data = vec![];
        Lead::new("hello-1.0").write(&mut data)?;

        assert_eq!(data.len(), 96);
        assert_eq!(&data[0..4], &LEAD_MAGIC);
        assert_eq!(&data[4..6], &[3, 0]);
        assert_eq!(&data[10..19], b"hello-1.0");
        assert!(data[19..76].iter().all(|b| *b == 0));
        assert_eq!(&data[76..80], &[0, 1, 0, 5]);

        let lead = Lead::read(&mut &data[..])?;
        assert_eq!(lead.name(), "hello-1.0");

        Ok(())
    }

    #[test]
    fn long_names_truncated() {
        let lead = Lead::new(&"x".repeat(100));
        assert_eq!(lead.name().len(), 65);
        assert_eq!(lead.name[65], 0);
    }

    #[test]
    fn bad_magic() {
        assert!(matches!(
            Lead::read(&mut &[0u8; 96][..]),
            Err(RpmError::BadLeadMagic)
        ));
    }
}
