//! Value representations and their static encoding metadata.
//!
//! Each VR carries a maximum value length, a padding byte used to keep
//! encoded values at even length, and an optional fixed element size
//! which the byte length of a value must be a multiple of.
use std::fmt;
use std::str::{from_utf8, FromStr};

/// An enum type for a DICOM value representation.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub enum VR {
    /// Application Entity
    AE,
    /// Age String
    AS,
    /// Attribute Tag
    AT,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Floating Point Single
    FL,
    /// Floating Point Double
    FD,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Long Text
    LT,
    /// Other Byte
    OB,
    /// Other Double
    OD,
    /// Other Float
    OF,
    /// Other Long
    OL,
    /// Other Word
    OW,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Signed Long
    SL,
    /// Sequence of Items
    SQ,
    /// Signed Short
    SS,
    /// Short Text
    ST,
    /// Time
    TM,
    /// Unlimited Characters
    UC,
    /// Unique Identifier (UID)
    UI,
    /// Unsigned Long
    UL,
    /// Unknown
    UN,
    /// Universal Resource Identifier or Locator (URI/URL)
    UR,
    /// Unsigned Short
    US,
    /// Unlimited Text
    UT,
}

/// Static encoding metadata for a value representation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VrMeta {
    /// Maximum value length in bytes, `None` when unbounded.
    pub max_length: Option<u32>,
    /// Byte appended to values of odd length.
    pub padding: u8,
    /// Fixed element size which the value's byte length
    /// must be a multiple of, `None` for variable-size VRs.
    pub fixed_size: Option<u8>,
}

impl VR {
    /// All value representations, in alphabetical order.
    pub const ALL: [VR; 31] = [
        VR::AE,
        VR::AS,
        VR::AT,
        VR::CS,
        VR::DA,
        VR::DS,
        VR::DT,
        VR::FL,
        VR::FD,
        VR::IS,
        VR::LO,
        VR::LT,
        VR::OB,
        VR::OD,
        VR::OF,
        VR::OL,
        VR::OW,
        VR::PN,
        VR::SH,
        VR::SL,
        VR::SQ,
        VR::SS,
        VR::ST,
        VR::TM,
        VR::UC,
        VR::UI,
        VR::UL,
        VR::UN,
        VR::UR,
        VR::US,
        VR::UT,
    ];

    /// Obtain the value representation corresponding to the given two bytes.
    /// Each byte should represent an alphabetic character in upper case.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        from_utf8(chars.as_ref())
            .ok()
            .and_then(|s| VR::from_str(s).ok())
    }

    /// Retrieve a string representation of this VR.
    pub fn to_str(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
        }
    }

    /// Retrieve a copy of this VR's byte representation.
    /// The function returns two alphabetic characters in upper case.
    pub fn to_bytes(self) -> [u8; 2] {
        let bytes = self.to_str().as_bytes();
        [bytes[0], bytes[1]]
    }

    /// Retrieve this VR's static encoding metadata.
    pub fn meta(self) -> VrMeta {
        use VR::*;
        let (max_length, padding, fixed_size) = match self {
            AE => (Some(16), b' ', None),
            AS => (Some(4), b' ', Some(4)),
            AT => (None, 0, Some(4)),
            CS => (Some(16), b' ', None),
            DA => (Some(8), b' ', Some(8)),
            DS => (Some(16), b' ', None),
            DT => (Some(26), b' ', None),
            FL => (None, 0, Some(4)),
            FD => (None, 0, Some(8)),
            IS => (Some(12), b' ', None),
            LO => (Some(64), b' ', None),
            LT => (Some(10240), b' ', None),
            OB => (None, 0, None),
            OD => (None, 0, Some(8)),
            OF => (None, 0, Some(4)),
            OL => (None, 0, Some(4)),
            OW => (None, 0, Some(2)),
            PN => (Some(324), b' ', None),
            SH => (Some(16), b' ', None),
            SL => (None, 0, Some(4)),
            SQ => (None, 0, None),
            SS => (None, 0, Some(2)),
            ST => (Some(1024), b' ', None),
            TM => (Some(16), b' ', None),
            UC => (None, b' ', None),
            UI => (Some(64), 0, None),
            UL => (None, 0, Some(4)),
            UN => (None, 0, None),
            UR => (None, b' ', None),
            US => (None, 0, Some(2)),
            UT => (None, b' ', None),
        };
        VrMeta {
            max_length,
            padding,
            fixed_size,
        }
    }

    /// The byte appended to odd-length values of this VR.
    #[inline]
    pub fn padding(self) -> u8 {
        self.meta().padding
    }

    /// Whether the explicit VR wire form of this representation uses the
    /// extended 12-byte header (2 reserved bytes + 4-byte length).
    pub fn has_extended_length(self) -> bool {
        matches!(
            self,
            VR::OB | VR::OD | VR::OF | VR::OL | VR::OW | VR::SQ | VR::UC | VR::UN | VR::UR | VR::UT
        )
    }

    /// The width in bytes of the numeric unit a value of this VR is made
    /// of, for the purpose of endianness conversion. String VRs and
    /// byte-granular VRs report 1 (no swapping required).
    pub fn swap_width(self) -> usize {
        use VR::*;
        match self {
            US | SS | OW => 2,
            UL | SL | FL | OF | OL | AT => 4,
            FD | OD => 8,
            _ => 1,
        }
    }

    /// Whether values of this VR hold character data.
    pub fn is_string(self) -> bool {
        use VR::*;
        matches!(
            self,
            AE | AS | CS | DA | DS | DT | IS | LO | LT | PN | SH | ST | TM | UC | UI | UR | UT
        )
    }
}

/// Obtain the value representation corresponding to the given string.
/// The string should hold exactly two UTF-8 encoded alphabetic characters
/// in upper case, otherwise no match is made.
impl FromStr for VR {
    type Err = &'static str;

    fn from_str(string: &str) -> std::result::Result<Self, Self::Err> {
        use VR::*;
        match string {
            "AE" => Ok(AE),
            "AS" => Ok(AS),
            "AT" => Ok(AT),
            "CS" => Ok(CS),
            "DA" => Ok(DA),
            "DS" => Ok(DS),
            "DT" => Ok(DT),
            "FL" => Ok(FL),
            "FD" => Ok(FD),
            "IS" => Ok(IS),
            "LO" => Ok(LO),
            "LT" => Ok(LT),
            "OB" => Ok(OB),
            "OD" => Ok(OD),
            "OF" => Ok(OF),
            "OL" => Ok(OL),
            "OW" => Ok(OW),
            "PN" => Ok(PN),
            "SH" => Ok(SH),
            "SL" => Ok(SL),
            "SQ" => Ok(SQ),
            "SS" => Ok(SS),
            "ST" => Ok(ST),
            "TM" => Ok(TM),
            "UC" => Ok(UC),
            "UI" => Ok(UI),
            "UL" => Ok(UL),
            "UN" => Ok(UN),
            "UR" => Ok(UR),
            "US" => Ok(US),
            "UT" => Ok(UT),
            _ => Err("no such value representation"),
        }
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(VR::to_str(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vr_binary_round_trip() {
        for vr in VR::ALL {
            assert_eq!(VR::from_binary(vr.to_bytes()), Some(vr));
        }
        assert_eq!(VR::from_binary([b'Z', b'Z']), None);
        assert_eq!(VR::from_binary([0x00, 0xFF]), None);
    }

    #[test]
    fn fixed_sizes() {
        assert_eq!(VR::US.meta().fixed_size, Some(2));
        assert_eq!(VR::UL.meta().fixed_size, Some(4));
        assert_eq!(VR::FD.meta().fixed_size, Some(8));
        assert_eq!(VR::AS.meta().fixed_size, Some(4));
        assert_eq!(VR::DA.meta().fixed_size, Some(8));
        assert_eq!(VR::LO.meta().fixed_size, None);
    }

    #[test]
    fn padding_bytes() {
        assert_eq!(VR::PN.padding(), b' ');
        assert_eq!(VR::UI.padding(), 0);
        assert_eq!(VR::OB.padding(), 0);
    }

    #[test]
    fn extended_length_set() {
        for vr in [VR::OB, VR::OW, VR::SQ, VR::UN, VR::UT, VR::UC, VR::UR] {
            assert!(vr.has_extended_length());
        }
        for vr in [VR::PN, VR::US, VR::UI, VR::DA] {
            assert!(!vr.has_extended_length());
        }
    }

    #[test]
    fn swap_widths() {
        assert_eq!(VR::OW.swap_width(), 2);
        assert_eq!(VR::OL.swap_width(), 4);
        assert_eq!(VR::OD.swap_width(), 8);
        assert_eq!(VR::PN.swap_width(), 1);
        assert_eq!(VR::AT.swap_width(), 4);
    }
}
