// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! RPM header tags.

Tag numbers are defined by `rpmtag.h` in the rpm sources. Only the tags
this crate reads or writes are enumerated. Unknown tags survive parsing and
are addressed by number.
*/

/// Tag of the region trailer of the signature section.
pub const SIGNATURE_REGION: u32 = 62;

/// Tag of the region trailer of the immutable header section.
pub const IMMUTABLE_REGION: u32 = 63;

/// A set of tags addressing values of one header section.
pub trait Tag: Copy + Sized {
    /// Tag of the region trailer terminating sections of this kind.
    const REGION: u32;

    /// Numeric tag value.
    fn number(&self) -> u32;

    /// Resolve a numeric value to a known tag.
    fn from_number(number: u32) -> Option<Self>;

    /// Symbolic name of the tag.
    fn name(&self) -> &'static str;

    /// Name of a numeric tag, falling back to the number for unknown tags.
    fn describe(number: u32) -> String {
        match Self::from_number(number) {
            Some(tag) => tag.name().to_string(),
            None => format!("Tag({})", number),
        }
    }
}

macro_rules! rpm_tags {
    (
        $(#[$meta:meta])*
        $name:ident, region = $region:expr;
        $($variant:ident = $value:literal,)*
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub enum $name {
            $($variant = $value,)*
        }

        impl Tag for $name {
            const REGION: u32 = $region;

            fn number(&self) -> u32 {
                *self as u32
            }

            fn from_number(number: u32) -> Option<Self> {
                match number {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                }
            }
        }
    };
}

rpm_tags! {
    /// Tags of the immutable header section.
    IndexTag, region = IMMUTABLE_REGION;
    HeaderI18nTable = 100,
    Name = 1000,
    Version = 1001,
    Release = 1002,
    Summary = 1004,
    Description = 1005,
    BuildTime = 1006,
    BuildHost = 1007,
    Size = 1009,
    Distribution = 1010,
    Vendor = 1011,
    License = 1014,
    Packager = 1015,
    Group = 1016,
    Url = 1020,
    Os = 1021,
    Arch = 1022,
    PreIn = 1023,
    PostIn = 1024,
    PreUn = 1025,
    PostUn = 1026,
    FileSizes = 1028,
    FileModes = 1030,
    FileRDevs = 1033,
    FileMTimes = 1034,
    FileDigests = 1035,
    FileLinkTos = 1036,
    FileFlags = 1037,
    FileUserName = 1039,
    FileGroupName = 1040,
    ProvideName = 1047,
    RequireFlags = 1048,
    RequireName = 1049,
    RequireVersion = 1050,
    ConflictFlags = 1053,
    ConflictName = 1054,
    ConflictVersion = 1055,
    VerifyScript = 1079,
    ChangelogTime = 1080,
    ChangelogName = 1081,
    ChangelogText = 1082,
    PreInProg = 1085,
    PostInProg = 1086,
    PreUnProg = 1087,
    PostUnProg = 1088,
    ObsoleteName = 1090,
    VerifyScriptProg = 1091,
    FileDevices = 1095,
    FileInodes = 1096,
    FileLangs = 1097,
    ProvideFlags = 1112,
    ProvideVersion = 1113,
    ObsoleteFlags = 1114,
    ObsoleteVersion = 1115,
    DirIndexes = 1116,
    BaseNames = 1117,
    DirNames = 1118,
    PayloadFormat = 1124,
    PayloadCompressor = 1125,
    PayloadFlags = 1126,
    RecommendName = 5046,
    RecommendVersion = 5047,
    RecommendFlags = 5048,
    SuggestName = 5049,
    SuggestVersion = 5050,
    SuggestFlags = 5051,
    EnhanceName = 5055,
    EnhanceVersion = 5056,
    EnhanceFlags = 5057,
}

rpm_tags! {
    /// Tags of the signature section.
    SignatureTag, region = SIGNATURE_REGION;
    Sha1Header = 269,
    Sha256Header = 273,
    HeaderSize = 1000,
    Md5 = 1004,
    PayloadSize = 1007,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_resolve() {
        assert_eq!(IndexTag::Name.number(), 1000);
        assert_eq!(IndexTag::from_number(1117), Some(IndexTag::BaseNames));
        assert_eq!(IndexTag::from_number(1), None);
        assert_eq!(SignatureTag::from_number(1004), Some(SignatureTag::Md5));
        assert_eq!(IndexTag::REGION, 63);
        assert_eq!(SignatureTag::REGION, 62);
    }

    #[test]
    fn names() {
        assert_eq!(IndexTag::DirIndexes.name(), "DirIndexes");
        assert_eq!(IndexTag::describe(1126), "PayloadFlags");
        assert_eq!(IndexTag::describe(4242), "Tag(4242)");
        assert_eq!(SignatureTag::describe(269), "Sha1Header");
    }
}
