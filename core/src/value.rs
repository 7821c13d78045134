//! Data element values and the owned data element type.
use crate::dataset::DataSet;
use crate::error::{
    InvalidNumericLengthSnafu, InvalidTextSnafu, Result, UnexpectedValueKindSnafu,
};
use crate::header::{Length, Tag};
use crate::vr::VR;
use snafu::ResultExt;
use std::fmt;

/// The value of a data element: either a raw byte string
/// or a sequence of nested data sets (VR `SQ`).
///
/// Primitive values are kept in the canonical in-memory form:
/// little endian byte order, padded to even length.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    /// A primitive value as raw bytes.
    Primitive(Vec<u8>),
    /// A sequence of items, each a full data set.
    Sequence(Vec<DataSet>),
}

impl Value {
    /// The byte length of a primitive value,
    /// or an undefined length for sequences.
    pub fn size(&self) -> Length {
        match self {
            Value::Primitive(bytes) => Length(bytes.len() as u32),
            Value::Sequence(_) => Length::UNDEFINED,
        }
    }

    /// Whether this value is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Primitive(bytes) => bytes.is_empty(),
            Value::Sequence(items) => items.is_empty(),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Primitive(bytes)
    }
}

impl From<Vec<DataSet>> for Value {
    fn from(items: Vec<DataSet>) -> Self {
        Value::Sequence(items)
    }
}

/// Append one VR-specific padding byte when the value has odd length.
pub fn pad_to_even(vr: VR, mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.len() % 2 != 0 {
        bytes.push(vr.padding());
    }
    bytes
}

/// Strip the VR's padding character from the right end of a string value.
/// Only trailing padding is removed; leading characters are preserved.
pub fn trim_padding(vr: VR, text: &str) -> &str {
    let pad = vr.padding() as char;
    // UI values are NUL padded, string VRs use trailing spaces
    text.trim_end_matches(pad)
}

/// An owned DICOM data element: a (tag, VR, value) triple.
#[derive(Debug, PartialEq, Clone)]
pub struct DataElement {
    /// DICOM tag
    pub tag: Tag,
    /// Value Representation
    pub vr: VR,
    /// The element's value
    pub value: Value,
}

impl DataElement {
    /// Create a data element from the given parts. Primitive values are
    /// padded to even length with the VR's padding byte.
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, value: Value) -> Self {
        let value = match value {
            Value::Primitive(bytes) => Value::Primitive(pad_to_even(vr, bytes)),
            seq => seq,
        };
        DataElement {
            tag: tag.into(),
            vr,
            value,
        }
    }

    /// Create an empty data element.
    pub fn empty<T: Into<Tag>>(tag: T, vr: VR) -> Self {
        DataElement {
            tag: tag.into(),
            vr,
            value: Value::Primitive(Vec::new()),
        }
    }

    /// Create a string-valued element, padding to even length.
    pub fn from_str<T: Into<Tag>>(tag: T, vr: VR, text: &str) -> Self {
        DataElement::new(tag, vr, Value::Primitive(text.as_bytes().to_vec()))
    }

    /// Create an element holding a single unsigned 16-bit value.
    pub fn from_u16<T: Into<Tag>>(tag: T, vr: VR, value: u16) -> Self {
        DataElement::new(tag, vr, Value::Primitive(value.to_le_bytes().to_vec()))
    }

    /// Create an element holding a single unsigned 32-bit value.
    pub fn from_u32<T: Into<Tag>>(tag: T, vr: VR, value: u32) -> Self {
        DataElement::new(tag, vr, Value::Primitive(value.to_le_bytes().to_vec()))
    }

    /// Create a sequence element from its items.
    pub fn sequence<T: Into<Tag>>(tag: T, items: Vec<DataSet>) -> Self {
        DataElement::new(tag, VR::SQ, Value::Sequence(items))
    }

    /// The length of the element's value in bytes,
    /// undefined for sequences.
    pub fn len(&self) -> Length {
        self.value.size()
    }

    /// Whether the element's value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Borrow the primitive value bytes.
    pub fn bytes(&self) -> Result<&[u8]> {
        match &self.value {
            Value::Primitive(bytes) => Ok(bytes),
            Value::Sequence(_) => UnexpectedValueKindSnafu { tag: self.tag }.fail(),
        }
    }

    /// Borrow the sequence items.
    pub fn items(&self) -> Result<&[DataSet]> {
        match &self.value {
            Value::Sequence(items) => Ok(items),
            Value::Primitive(_) => UnexpectedValueKindSnafu { tag: self.tag }.fail(),
        }
    }

    /// Interpret the value as text, with trailing padding removed.
    pub fn to_str(&self) -> Result<&str> {
        let bytes = self.bytes()?;
        let text = std::str::from_utf8(bytes).context(InvalidTextSnafu { tag: self.tag })?;
        Ok(trim_padding(self.vr, text))
    }

    /// Interpret the value as a backslash-separated multi-valued string.
    pub fn to_multi_str(&self) -> Result<Vec<String>> {
        let text = self.to_str()?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(text.split('\\').map(|s| s.trim().to_string()).collect())
    }

    /// Interpret the value as a single unsigned 16-bit integer.
    pub fn to_u16(&self) -> Result<u16> {
        let bytes = self.bytes()?;
        snafu::ensure!(
            bytes.len() >= 2,
            InvalidNumericLengthSnafu {
                tag: self.tag,
                len: bytes.len(),
                width: 2usize,
            }
        );
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Interpret the value as a single unsigned 32-bit integer.
    pub fn to_u32(&self) -> Result<u32> {
        let bytes = self.bytes()?;
        snafu::ensure!(
            bytes.len() >= 4,
            InvalidNumericLengthSnafu {
                tag: self.tag,
                len: bytes.len(),
                width: 4usize,
            }
        );
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl fmt::Display for DataElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.value {
            Value::Primitive(bytes) => {
                if self.vr.is_string() {
                    match self.to_str() {
                        Ok(s) => write!(f, "{} {} [{}]", self.tag, self.vr, s),
                        Err(_) => write!(f, "{} {} ({} bytes)", self.tag, self.vr, bytes.len()),
                    }
                } else {
                    write!(f, "{} {} ({} bytes)", self.tag, self.vr, bytes.len())
                }
            }
            Value::Sequence(items) => {
                write!(f, "{} SQ ({} items)", self.tag, items.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_values_are_padded() {
        let e = DataElement::from_str(Tag(0x0010, 0x0010), VR::PN, "DOE^J");
        assert_eq!(e.bytes().unwrap(), b"DOE^J ");
        let e = DataElement::from_str(Tag(0x0008, 0x0018), VR::UI, "1.2.3");
        assert_eq!(e.bytes().unwrap(), b"1.2.3\0");
    }

    #[test]
    fn pad_to_even_is_idempotent() {
        let once = pad_to_even(VR::PN, b"ABC".to_vec());
        let twice = pad_to_even(VR::PN, once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len() % 2, 0);
    }

    #[test]
    fn trim_padding_strips_right_only() {
        assert_eq!(trim_padding(VR::PN, " DOE "), " DOE");
        assert_eq!(trim_padding(VR::UI, "1.2.3\0"), "1.2.3");
    }

    #[test]
    fn string_round_trip() {
        let e = DataElement::from_str(Tag(0x0010, 0x0010), VR::PN, "DOE^JOHN");
        assert_eq!(e.to_str().unwrap(), "DOE^JOHN");
        assert_eq!(e.len(), crate::header::Length(8));
    }

    #[test]
    fn multi_valued_string() {
        let e = DataElement::from_str(Tag(0x0008, 0x0061), VR::CS, "CT\\MR");
        assert_eq!(e.to_multi_str().unwrap(), vec!["CT", "MR"]);
    }

    #[test]
    fn numeric_access_checks_length() {
        let e = DataElement::new(Tag(0x0028, 0x0010), VR::US, Value::Primitive(vec![0x01]));
        // padded to 2 bytes by the constructor
        assert!(e.to_u16().is_ok());
        let e = DataElement::empty(Tag(0x0028, 0x0010), VR::US);
        assert!(e.to_u16().is_err());
    }

    #[test]
    fn sequence_access() {
        let e = DataElement::sequence(Tag(0x0400, 0x0561), vec![DataSet::new()]);
        assert_eq!(e.items().unwrap().len(), 1);
        assert!(e.bytes().is_err());
        assert!(e.len().is_undefined());
    }
}
