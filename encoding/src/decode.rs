//! Data set and data element decoding for the uncompressed transfer
//! syntaxes. The deflated syntax is handled by inflating the stream and
//! delegating to the Explicit VR Little Endian decoder.
use crate::deflate;
use crate::error::{MalformedSnafu, Result, TruncatedSnafu, UnknownVrSnafu};
use crate::swap::swap_from_big_endian;
use crate::transfer_syntax::{TransferSyntax, EXPLICIT_VR_LITTLE_ENDIAN};
use byteordered::{ByteOrdered, Endianness};
use pacs_core::{dictionary, DataElement, DataSet, Length, Tag, Value, VR};
use snafu::ResultExt;
use std::io::{Cursor, Read};

/// Decode a whole data set in the given transfer syntax.
pub fn decode_data_set(bytes: &[u8], ts: &TransferSyntax) -> Result<DataSet> {
    if ts.deflated {
        let inflated = deflate::inflate(bytes)?;
        return decode_all(&inflated, &EXPLICIT_VR_LITTLE_ENDIAN);
    }
    decode_all(bytes, ts)
}

fn decode_all(bytes: &[u8], ts: &TransferSyntax) -> Result<DataSet> {
    let mut cursor = Cursor::new(bytes);
    let mut data_set = DataSet::new();
    while (cursor.position() as usize) < bytes.len() {
        data_set.put(decode_element(&mut cursor, ts)?);
    }
    Ok(data_set)
}

/// Decode a single data element, advancing the cursor past it.
/// On error the cursor is left at the start of the malformed element.
pub fn decode_element(cursor: &mut Cursor<&[u8]>, ts: &TransferSyntax) -> Result<DataElement> {
    let start = cursor.position();
    match decode_element_at(cursor, ts) {
        Ok(element) => Ok(element),
        Err(e) => {
            cursor.set_position(start);
            Err(e)
        }
    }
}

fn decode_element_at(cursor: &mut Cursor<&[u8]>, ts: &TransferSyntax) -> Result<DataElement> {
    let tag = read_tag(cursor, ts.endianness)?;
    let (vr, len) = if ts.explicit_vr {
        read_explicit_header(cursor, ts, tag)?
    } else {
        let len = read_u32(cursor, ts.endianness, "length")?;
        (dictionary::vr_of(tag), Length(len))
    };

    if len.is_undefined() {
        // only sequences may omit their length
        snafu::ensure!(
            vr == VR::SQ || vr == VR::UN,
            MalformedSnafu {
                position: cursor.position(),
                reason: format!("undefined length on non-sequence element {}", tag),
            }
        );
        let items = decode_items_undefined(cursor, ts)?;
        return Ok(DataElement::new(tag, VR::SQ, Value::Sequence(items)));
    }

    let len = len.get().unwrap_or(0) as usize;
    if vr == VR::SQ {
        let items = decode_items_defined(cursor, ts, len)?;
        return Ok(DataElement::new(tag, VR::SQ, Value::Sequence(items)));
    }

    let mut value = vec![0u8; len];
    cursor.read_exact(&mut value).context(TruncatedSnafu {
        position: cursor.position(),
        what: "element value",
    })?;
    if ts.endianness == Endianness::Big {
        swap_from_big_endian(vr, &mut value);
    }
    Ok(DataElement::new(tag, vr, Value::Primitive(value)))
}

fn read_explicit_header(
    cursor: &mut Cursor<&[u8]>,
    ts: &TransferSyntax,
    tag: Tag,
) -> Result<(VR, Length)> {
    let mut vr_bytes = [0u8; 2];
    cursor.read_exact(&mut vr_bytes).context(TruncatedSnafu {
        position: cursor.position(),
        what: "VR",
    })?;
    let vr = VR::from_binary(vr_bytes).ok_or_else(|| {
        UnknownVrSnafu {
            tag,
            bytes: vr_bytes,
            position: cursor.position(),
        }
        .build()
    })?;
    let len = if vr.has_extended_length() {
        let reserved = read_u16(cursor, ts.endianness, "reserved bytes")?;
        snafu::ensure!(
            reserved == 0,
            MalformedSnafu {
                position: cursor.position(),
                reason: format!("non-zero reserved bytes in header of {}", tag),
            }
        );
        Length(read_u32(cursor, ts.endianness, "length")?)
    } else {
        Length(u32::from(read_u16(cursor, ts.endianness, "length")?))
    };
    Ok((vr, len))
}

/// Decode the items of a defined-length sequence occupying the next
/// `len` bytes of the input.
fn decode_items_defined(
    cursor: &mut Cursor<&[u8]>,
    ts: &TransferSyntax,
    len: usize,
) -> Result<Vec<DataSet>> {
    let end = cursor.position() + len as u64;
    snafu::ensure!(
        end <= cursor.get_ref().len() as u64,
        MalformedSnafu {
            position: cursor.position(),
            reason: format!("sequence length {} exceeds input", len),
        }
    );
    let mut items = Vec::new();
    while cursor.position() < end {
        match decode_item(cursor, ts)? {
            Some(item) => items.push(item),
            None => {
                return MalformedSnafu {
                    position: cursor.position(),
                    reason: "sequence delimiter inside defined-length sequence".to_string(),
                }
                .fail()
            }
        }
    }
    snafu::ensure!(
        cursor.position() == end,
        MalformedSnafu {
            position: cursor.position(),
            reason: "sequence items overrun the declared length".to_string(),
        }
    );
    Ok(items)
}

/// Decode items until the sequence delimitation item (FFFE,E0DD).
fn decode_items_undefined(cursor: &mut Cursor<&[u8]>, ts: &TransferSyntax) -> Result<Vec<DataSet>> {
    let mut items = Vec::new();
    loop {
        match decode_item(cursor, ts)? {
            Some(item) => items.push(item),
            None => return Ok(items),
        }
    }
}

/// Decode one sequence item. Returns `None` when the next element is the
/// sequence delimitation item (which is consumed).
fn decode_item(cursor: &mut Cursor<&[u8]>, ts: &TransferSyntax) -> Result<Option<DataSet>> {
    let tag = read_tag(cursor, ts.endianness)?;
    let len = Length(read_u32(cursor, ts.endianness, "item length")?);
    if tag.is_sequence_delimiter() {
        return Ok(None);
    }
    snafu::ensure!(
        tag.is_item(),
        MalformedSnafu {
            position: cursor.position(),
            reason: format!("expected item tag, found {}", tag),
        }
    );
    if len.is_undefined() {
        return decode_item_undefined(cursor, ts).map(Some);
    }
    let len = len.get().unwrap_or(0) as usize;
    let end = cursor.position() + len as u64;
    snafu::ensure!(
        end <= cursor.get_ref().len() as u64,
        MalformedSnafu {
            position: cursor.position(),
            reason: format!("item length {} exceeds input", len),
        }
    );
    let mut item = DataSet::new();
    while cursor.position() < end {
        item.put(decode_element_at(cursor, ts)?);
    }
    Ok(Some(item))
}

/// Decode item elements until the item delimitation item (FFFE,E00D).
fn decode_item_undefined(cursor: &mut Cursor<&[u8]>, ts: &TransferSyntax) -> Result<DataSet> {
    let mut item = DataSet::new();
    loop {
        let mark = cursor.position();
        let tag = read_tag(cursor, ts.endianness)?;
        if tag.is_item_delimiter() {
            let len = read_u32(cursor, ts.endianness, "item delimiter length")?;
            snafu::ensure!(
                len == 0,
                MalformedSnafu {
                    position: cursor.position(),
                    reason: "item delimiter with non-zero length".to_string(),
                }
            );
            return Ok(item);
        }
        cursor.set_position(mark);
        item.put(decode_element_at(cursor, ts)?);
    }
}

fn read_tag(cursor: &mut Cursor<&[u8]>, endianness: Endianness) -> Result<Tag> {
    let group = read_u16(cursor, endianness, "tag group")?;
    let element = read_u16(cursor, endianness, "tag element")?;
    Ok(Tag(group, element))
}

fn read_u16(cursor: &mut Cursor<&[u8]>, endianness: Endianness, what: &'static str) -> Result<u16> {
    let position = cursor.position();
    ByteOrdered::runtime(cursor, endianness)
        .read_u16()
        .context(TruncatedSnafu { position, what })
}

fn read_u32(cursor: &mut Cursor<&[u8]>, endianness: Endianness, what: &'static str) -> Result<u32> {
    let position = cursor.position();
    ByteOrdered::runtime(cursor, endianness)
        .read_u32()
        .context(TruncatedSnafu { position, what })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transfer_syntax::{
        EXPLICIT_VR_BIG_ENDIAN, EXPLICIT_VR_LITTLE_ENDIAN, IMPLICIT_VR_LITTLE_ENDIAN,
    };
    use pacs_core::dictionary::tags;

    #[test]
    fn decode_explicit_le_patient_name() {
        // (0010,0010) PN, length 8, "DOE^JOHN"
        let bytes = [
            0x10, 0x00, 0x10, 0x00, 0x50, 0x4E, 0x08, 0x00, 0x44, 0x4F, 0x45, 0x5E, 0x4A, 0x4F,
            0x48, 0x4E,
        ];
        let ds = decode_data_set(&bytes, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let e = ds.element(tags::PATIENT_NAME).unwrap();
        assert_eq!(e.vr, VR::PN);
        assert_eq!(e.to_str().unwrap(), "DOE^JOHN");
        assert_eq!(e.len(), Length(8));
    }

    #[test]
    fn decode_implicit_le_uses_dictionary_vr() {
        // (0008,0060) len 2, "CT"
        let bytes = [
            0x08, 0x00, 0x60, 0x00, 0x02, 0x00, 0x00, 0x00, 0x43, 0x54,
        ];
        let ds = decode_data_set(&bytes, &IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let e = ds.element(tags::MODALITY).unwrap();
        assert_eq!(e.vr, VR::CS);
        assert_eq!(e.to_str().unwrap(), "CT");
    }

    #[test]
    fn decode_big_endian_numeric_value() {
        // (0028,0010) Rows US, length 2, value 0x0200 = 512
        let bytes = [0x00, 0x28, 0x00, 0x10, 0x55, 0x53, 0x00, 0x02, 0x02, 0x00];
        let ds = decode_data_set(&bytes, &EXPLICIT_VR_BIG_ENDIAN).unwrap();
        assert_eq!(ds.get_u16(tags::ROWS), Some(512));
    }

    #[test]
    fn truncated_value_reports_error_and_rewinds() {
        let bytes = [
            0x10, 0x00, 0x10, 0x00, 0x50, 0x4E, 0x08, 0x00, 0x44, 0x4F,
        ];
        let mut cursor = Cursor::new(&bytes[..]);
        let err = decode_element(&mut cursor, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn unknown_vr_is_rejected() {
        let bytes = [0x10, 0x00, 0x10, 0x00, 0x5A, 0x5A, 0x02, 0x00, 0x41, 0x42];
        let mut cursor = Cursor::new(&bytes[..]);
        let err = decode_element(&mut cursor, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap_err();
        assert!(matches!(err, Error::UnknownVr { .. }));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn nonzero_reserved_bytes_are_malformed() {
        let bytes = [
            0xE0, 0x7F, 0x10, 0x00, 0x4F, 0x57, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 1, 2, 3, 4,
        ];
        let mut cursor = Cursor::new(&bytes[..]);
        let err = decode_element(&mut cursor, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
    }

    #[test]
    fn undefined_length_sequence_with_delimiters() {
        let mut bytes: Vec<u8> = Vec::new();
        // (0008,1115) SQ, undefined length
        bytes.extend_from_slice(&[0x08, 0x00, 0x15, 0x11, 0x53, 0x51, 0x00, 0x00]);
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        // item, undefined length
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        // (0020,000E) UI len 2 "1\0"? use "12"
        bytes.extend_from_slice(&[0x20, 0x00, 0x0E, 0x00, 0x55, 0x49, 0x02, 0x00, 0x31, 0x32]);
        // item delimiter
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x0D, 0xE0, 0, 0, 0, 0]);
        // sequence delimiter
        bytes.extend_from_slice(&[0xFE, 0xFF, 0xDD, 0xE0, 0, 0, 0, 0]);

        let ds = decode_data_set(&bytes, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let items = ds.sequence_items(tags::REFERENCED_SERIES_SEQUENCE).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get_str(tags::SERIES_INSTANCE_UID).unwrap(), "12");
    }

    #[test]
    fn defined_length_sequence() {
        let mut bytes: Vec<u8> = Vec::new();
        // item content: (0020,000E) UI len 2
        let item_body = [0x20, 0x00, 0x0E, 0x00, 0x55, 0x49, 0x02, 0x00, 0x31, 0x32];
        // (0008,1115) SQ defined length = item header (8) + body
        bytes.extend_from_slice(&[0x08, 0x00, 0x15, 0x11, 0x53, 0x51, 0x00, 0x00]);
        bytes.extend_from_slice(&((8 + item_body.len()) as u32).to_le_bytes());
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&(item_body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&item_body);

        let ds = decode_data_set(&bytes, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let items = ds.sequence_items(tags::REFERENCED_SERIES_SEQUENCE).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn undefined_length_on_primitive_is_malformed() {
        // (0010,0010) has VR PN in the dictionary, which cannot carry
        // an undefined length
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        let err = decode_data_set(&bytes, &IMPLICIT_VR_LITTLE_ENDIAN).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
    }
}
