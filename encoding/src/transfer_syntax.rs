//! The transfer syntaxes supported by this implementation.
use crate::error::{Result, UnsupportedTransferSyntaxSnafu};
use byteordered::Endianness;

/// Description of a DICOM transfer syntax: its UID, the VR encoding form,
/// the byte order of the wire representation, and whether the data set
/// stream is deflated.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TransferSyntax {
    /// The transfer syntax UID.
    pub uid: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Byte order of tags, lengths and numeric values.
    pub endianness: Endianness,
    /// Whether element headers carry an explicit VR field.
    pub explicit_vr: bool,
    /// Whether the data set stream is DEFLATE compressed.
    pub deflated: bool,
}

/// **Default**: Implicit VR Little Endian.
pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
    uid: "1.2.840.10008.1.2",
    name: "Implicit VR Little Endian",
    endianness: Endianness::Little,
    explicit_vr: false,
    deflated: false,
};

/// Explicit VR Little Endian.
pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
    uid: "1.2.840.10008.1.2.1",
    name: "Explicit VR Little Endian",
    endianness: Endianness::Little,
    explicit_vr: true,
    deflated: false,
};

/// Explicit VR Big Endian. Retired by the standard,
/// still decoded and encoded for interoperability.
pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = TransferSyntax {
    uid: "1.2.840.10008.1.2.2",
    name: "Explicit VR Big Endian",
    endianness: Endianness::Big,
    explicit_vr: true,
    deflated: false,
};

/// Deflated Explicit VR Little Endian.
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
    uid: "1.2.840.10008.1.2.1.99",
    name: "Deflated Explicit VR Little Endian",
    endianness: Endianness::Little,
    explicit_vr: true,
    deflated: true,
};

static REGISTRY: [&TransferSyntax; 4] = [
    &IMPLICIT_VR_LITTLE_ENDIAN,
    &EXPLICIT_VR_LITTLE_ENDIAN,
    &EXPLICIT_VR_BIG_ENDIAN,
    &DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
];

/// Registry of the transfer syntaxes known to this implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransferSyntaxRegistry;

impl TransferSyntaxRegistry {
    /// Look up a transfer syntax by its UID.
    /// Trailing NUL padding in the UID is ignored.
    pub fn get(uid: &str) -> Option<&'static TransferSyntax> {
        let uid = uid.trim_end_matches('\0');
        REGISTRY.iter().find(|ts| ts.uid == uid).copied()
    }

    /// Look up a transfer syntax by UID, raising an error when absent.
    pub fn require(uid: &str) -> Result<&'static TransferSyntax> {
        Self::get(uid).ok_or_else(|| {
            UnsupportedTransferSyntaxSnafu {
                uid: uid.trim_end_matches('\0').to_string(),
            }
            .build()
        })
    }

    /// All registered transfer syntax UIDs, most preferred first.
    pub fn uids() -> impl Iterator<Item = &'static str> {
        REGISTRY.iter().map(|ts| ts.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_uid() {
        let ts = TransferSyntaxRegistry::get("1.2.840.10008.1.2.1").unwrap();
        assert!(ts.explicit_vr);
        assert_eq!(ts.endianness, Endianness::Little);
        assert!(!ts.deflated);
    }

    #[test]
    fn lookup_ignores_nul_padding() {
        let ts = TransferSyntaxRegistry::get("1.2.840.10008.1.2\0").unwrap();
        assert_eq!(ts.uid, IMPLICIT_VR_LITTLE_ENDIAN.uid);
    }

    #[test]
    fn unknown_uid_is_an_error() {
        assert!(TransferSyntaxRegistry::get("1.2.840.10008.1.2.4.50").is_none());
        assert!(TransferSyntaxRegistry::require("1.2.840.10008.1.2.4.50").is_err());
    }
}
