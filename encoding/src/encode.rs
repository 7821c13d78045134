//! Data set and data element encoding.
//!
//! Encoded output always satisfies the even-length invariant; primitive
//! values are held pre-padded by `pacs-core`. Sequences use the
//! canonical form: defined length when the item bytes fit in 64 KiB,
//! undefined length with delimitation items beyond that.
use crate::deflate;
use crate::error::{InvalidLengthSnafu, Result};
use crate::swap::swap_to_big_endian;
use crate::transfer_syntax::{TransferSyntax, EXPLICIT_VR_LITTLE_ENDIAN};
use byteordered::Endianness;
use pacs_core::{DataElement, DataSet, Tag, Value, VR};

/// Sequence bodies up to this size are encoded with a defined length.
const DEFINED_LENGTH_CEILING: usize = 64 * 1024;

const UNDEFINED: u32 = 0xFFFF_FFFF;

/// Encode a whole data set in the given transfer syntax.
pub fn encode_data_set(data_set: &DataSet, ts: &TransferSyntax) -> Result<Vec<u8>> {
    if ts.deflated {
        let plain = encode_all(data_set, &EXPLICIT_VR_LITTLE_ENDIAN)?;
        return deflate::deflate(&plain);
    }
    encode_all(data_set, ts)
}

fn encode_all(data_set: &DataSet, ts: &TransferSyntax) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for element in data_set.iter() {
        encode_element(&mut out, element, ts)?;
    }
    Ok(out)
}

/// Encode a single data element, appending its bytes to `out`.
pub fn encode_element(out: &mut Vec<u8>, element: &DataElement, ts: &TransferSyntax) -> Result<()> {
    match &element.value {
        Value::Primitive(bytes) => encode_primitive(out, element.tag, element.vr, bytes, ts),
        Value::Sequence(items) => encode_sequence(out, element.tag, items, ts),
    }
}

fn encode_primitive(
    out: &mut Vec<u8>,
    tag: Tag,
    vr: VR,
    bytes: &[u8],
    ts: &TransferSyntax,
) -> Result<()> {
    let mut value = bytes.to_vec();
    if ts.endianness == Endianness::Big {
        swap_to_big_endian(vr, &mut value);
    }
    write_header(out, tag, vr, value.len(), ts)?;
    out.extend_from_slice(&value);
    Ok(())
}

fn encode_sequence(
    out: &mut Vec<u8>,
    tag: Tag,
    items: &[DataSet],
    ts: &TransferSyntax,
) -> Result<()> {
    // encode every item with a defined length
    let mut body = Vec::new();
    for item in items {
        let item_bytes = encode_all(item, ts)?;
        write_tag(&mut body, Tag(0xFFFE, 0xE000), ts);
        write_u32(&mut body, item_bytes.len() as u32, ts);
        body.extend_from_slice(&item_bytes);
    }

    if body.len() <= DEFINED_LENGTH_CEILING {
        write_sequence_header(out, tag, body.len() as u32, ts)?;
        out.extend_from_slice(&body);
    } else {
        write_sequence_header(out, tag, UNDEFINED, ts)?;
        out.extend_from_slice(&body);
        write_tag(out, Tag(0xFFFE, 0xE0DD), ts);
        write_u32(out, 0, ts);
    }
    Ok(())
}

fn write_sequence_header(out: &mut Vec<u8>, tag: Tag, len: u32, ts: &TransferSyntax) -> Result<()> {
    write_tag(out, tag, ts);
    if ts.explicit_vr {
        out.extend_from_slice(&VR::SQ.to_bytes());
        write_u16(out, 0, ts);
    }
    write_u32(out, len, ts);
    Ok(())
}

fn write_header(out: &mut Vec<u8>, tag: Tag, vr: VR, len: usize, ts: &TransferSyntax) -> Result<()> {
    snafu::ensure!(
        len < UNDEFINED as usize,
        InvalidLengthSnafu {
            tag,
            vr,
            len: UNDEFINED,
        }
    );
    write_tag(out, tag, ts);
    if ts.explicit_vr {
        out.extend_from_slice(&vr.to_bytes());
        if vr.has_extended_length() {
            write_u16(out, 0, ts);
            write_u32(out, len as u32, ts);
        } else {
            // the short form carries a 16-bit length
            snafu::ensure!(
                len <= u16::MAX as usize,
                InvalidLengthSnafu {
                    tag,
                    vr,
                    len: len as u32,
                }
            );
            write_u16(out, len as u16, ts);
        }
    } else {
        write_u32(out, len as u32, ts);
    }
    Ok(())
}

fn write_tag(out: &mut Vec<u8>, tag: Tag, ts: &TransferSyntax) {
    write_u16(out, tag.group(), ts);
    write_u16(out, tag.element(), ts);
}

fn write_u16(out: &mut Vec<u8>, value: u16, ts: &TransferSyntax) {
    match ts.endianness {
        Endianness::Little => out.extend_from_slice(&value.to_le_bytes()),
        Endianness::Big => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn write_u32(out: &mut Vec<u8>, value: u32, ts: &TransferSyntax) {
    match ts.endianness {
        Endianness::Little => out.extend_from_slice(&value.to_le_bytes()),
        Endianness::Big => out.extend_from_slice(&value.to_be_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_data_set;
    use crate::transfer_syntax::{
        DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN, EXPLICIT_VR_BIG_ENDIAN, EXPLICIT_VR_LITTLE_ENDIAN,
        IMPLICIT_VR_LITTLE_ENDIAN,
    };
    use pacs_core::dictionary::tags;

    fn sample_data_set() -> DataSet {
        let mut ds = DataSet::new();
        ds.put_str(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.2");
        ds.put_str(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4.5");
        ds.put_str(tags::MODALITY, VR::CS, "CT");
        ds.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        ds.put_u16(tags::ROWS, VR::US, 512);
        ds.put_u16(tags::COLUMNS, VR::US, 512);
        let mut item = DataSet::new();
        item.put_str(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.4");
        ds.put(DataElement::sequence(
            tags::REFERENCED_SERIES_SEQUENCE,
            vec![item],
        ));
        ds
    }

    #[test]
    fn encode_explicit_le_patient_name() {
        let mut ds = DataSet::new();
        ds.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        let bytes = encode_data_set(&ds, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(
            bytes,
            vec![
                0x10, 0x00, 0x10, 0x00, 0x50, 0x4E, 0x08, 0x00, 0x44, 0x4F, 0x45, 0x5E, 0x4A,
                0x4F, 0x48, 0x4E,
            ]
        );
    }

    #[test]
    fn round_trip_all_transfer_syntaxes() {
        let ds = sample_data_set();
        for ts in [
            &IMPLICIT_VR_LITTLE_ENDIAN,
            &EXPLICIT_VR_LITTLE_ENDIAN,
            &EXPLICIT_VR_BIG_ENDIAN,
            &DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
        ] {
            let bytes = encode_data_set(&ds, ts).unwrap();
            let back = decode_data_set(&bytes, ts).unwrap();
            assert_eq!(back, ds, "round trip failed for {}", ts.name);
        }
    }

    #[test]
    fn re_encoding_is_byte_identical() {
        let ds = sample_data_set();
        let bytes = encode_data_set(&ds, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let back = decode_data_set(&bytes, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let again = encode_data_set(&back, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn big_endian_swaps_numeric_values_only() {
        let mut ds = DataSet::new();
        ds.put_u16(tags::ROWS, VR::US, 0x0102);
        ds.put_str(tags::MODALITY, VR::CS, "CT");
        let bytes = encode_data_set(&ds, &EXPLICIT_VR_BIG_ENDIAN).unwrap();
        // (0008,0060) comes first; value "CT" unswapped
        assert_eq!(&bytes[0..2], &[0x00, 0x08]);
        assert_eq!(&bytes[8..10], b"CT");
        // (0028,0010) Rows: value big endian
        assert_eq!(&bytes[bytes.len() - 2..], &[0x01, 0x02]);
    }

    #[test]
    fn oversized_short_form_value_is_rejected() {
        let mut ds = DataSet::new();
        ds.put(DataElement::new(
            tags::PATIENT_COMMENTS,
            VR::LT,
            Value::Primitive(vec![b' '; 70_000]),
        ));
        assert!(encode_data_set(&ds, &EXPLICIT_VR_LITTLE_ENDIAN).is_err());
        // implicit VR carries a 32-bit length and accepts it
        assert!(encode_data_set(&ds, &IMPLICIT_VR_LITTLE_ENDIAN).is_ok());
    }

    #[test]
    fn large_sequences_use_undefined_length() {
        let mut item = DataSet::new();
        item.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            Value::Primitive(vec![0u8; DEFINED_LENGTH_CEILING + 64]),
        ));
        let mut ds = DataSet::new();
        ds.put(DataElement::sequence(
            tags::REFERENCED_IMAGE_SEQUENCE,
            vec![item],
        ));
        let bytes = encode_data_set(&ds, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        // length field of the sequence header holds the undefined marker
        assert_eq!(&bytes[8..12], &0xFFFF_FFFFu32.to_le_bytes());
        // and the stream ends with the sequence delimitation item
        assert_eq!(
            &bytes[bytes.len() - 8..],
            &[0xFE, 0xFF, 0xDD, 0xE0, 0, 0, 0, 0]
        );
        let back = decode_data_set(&bytes, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(back, ds);
    }
}
