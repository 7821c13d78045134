//! DICOM Part 10 file format: preamble, magic, file meta information
//! group, and the enclosed data set.
use crate::decode::{decode_data_set, decode_element};
use crate::encode::encode_data_set;
use crate::error::{FileIoSnafu, InvalidFileSnafu, Result};
use crate::transfer_syntax::{TransferSyntax, TransferSyntaxRegistry, EXPLICIT_VR_LITTLE_ENDIAN};
use pacs_core::dictionary::tags;
use pacs_core::{DataElement, DataSet, Value, VR};
use snafu::{OptionExt, ResultExt};
use std::io::Cursor;
use std::path::Path;

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// The implementation class UID written into file meta groups
/// and association requests produced by this implementation.
pub const IMPLEMENTATION_CLASS_UID: &str = "1.2.826.0.1.3680043.10.1453.1";

/// The implementation version name that accompanies the class UID.
pub const IMPLEMENTATION_VERSION_NAME: &str = "PACSRS_010";

/// The file meta information (group 0002) of a Part 10 file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaTable {
    pub media_storage_sop_class_uid: String,
    pub media_storage_sop_instance_uid: String,
    pub transfer_syntax_uid: String,
    pub implementation_class_uid: String,
    pub implementation_version_name: Option<String>,
}

impl FileMetaTable {
    /// Build a meta table for storing the given SOP instance.
    pub fn new(
        sop_class_uid: impl Into<String>,
        sop_instance_uid: impl Into<String>,
        transfer_syntax_uid: impl Into<String>,
    ) -> Self {
        FileMetaTable {
            media_storage_sop_class_uid: sop_class_uid.into(),
            media_storage_sop_instance_uid: sop_instance_uid.into(),
            transfer_syntax_uid: transfer_syntax_uid.into(),
            implementation_class_uid: IMPLEMENTATION_CLASS_UID.to_string(),
            implementation_version_name: Some(IMPLEMENTATION_VERSION_NAME.to_string()),
        }
    }

    /// Resolve the data set transfer syntax named by this meta group.
    pub fn transfer_syntax(&self) -> Result<&'static TransferSyntax> {
        TransferSyntaxRegistry::require(&self.transfer_syntax_uid)
    }

    fn from_data_set(meta: &DataSet) -> Result<Self> {
        let require = |tag, what: &str| {
            meta.get_str(tag).context(InvalidFileSnafu {
                reason: format!("file meta group without {}", what),
            })
        };
        Ok(FileMetaTable {
            media_storage_sop_class_uid: require(
                tags::MEDIA_STORAGE_SOP_CLASS_UID,
                "MediaStorageSOPClassUID",
            )?,
            media_storage_sop_instance_uid: require(
                tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
                "MediaStorageSOPInstanceUID",
            )?,
            transfer_syntax_uid: require(tags::TRANSFER_SYNTAX_UID, "TransferSyntaxUID")?,
            implementation_class_uid: meta
                .get_str(tags::IMPLEMENTATION_CLASS_UID)
                .unwrap_or_default(),
            implementation_version_name: meta.get_str(tags::IMPLEMENTATION_VERSION_NAME),
        })
    }

    fn to_data_set(&self) -> DataSet {
        let mut meta = DataSet::new();
        meta.put(DataElement::new(
            tags::FILE_META_INFORMATION_VERSION,
            VR::OB,
            Value::Primitive(vec![0x00, 0x01]),
        ));
        meta.put_str(
            tags::MEDIA_STORAGE_SOP_CLASS_UID,
            VR::UI,
            &self.media_storage_sop_class_uid,
        );
        meta.put_str(
            tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
            VR::UI,
            &self.media_storage_sop_instance_uid,
        );
        meta.put_str(tags::TRANSFER_SYNTAX_UID, VR::UI, &self.transfer_syntax_uid);
        meta.put_str(
            tags::IMPLEMENTATION_CLASS_UID,
            VR::UI,
            &self.implementation_class_uid,
        );
        if let Some(name) = &self.implementation_version_name {
            meta.put_str(tags::IMPLEMENTATION_VERSION_NAME, VR::SH, name);
        }
        meta
    }
}

/// Serialize a data set into a complete Part 10 file image.
pub fn to_bytes(meta: &FileMetaTable, data_set: &DataSet) -> Result<Vec<u8>> {
    let ts = meta.transfer_syntax()?;
    let meta_bytes = encode_data_set(&meta.to_data_set(), &EXPLICIT_VR_LITTLE_ENDIAN)?;

    let mut out = Vec::with_capacity(PREAMBLE_LEN + 4 + meta_bytes.len());
    out.resize(PREAMBLE_LEN, 0);
    out.extend_from_slice(MAGIC);
    // (0002,0000) group length covers everything after itself
    let mut group_length = DataSet::new();
    group_length.put(DataElement::from_u32(
        tags::FILE_META_INFORMATION_GROUP_LENGTH,
        VR::UL,
        meta_bytes.len() as u32,
    ));
    out.extend_from_slice(&encode_data_set(&group_length, &EXPLICIT_VR_LITTLE_ENDIAN)?);
    out.extend_from_slice(&meta_bytes);
    out.extend_from_slice(&encode_data_set(data_set, ts)?);
    Ok(out)
}

/// Parse a complete Part 10 file image.
pub fn from_bytes(bytes: &[u8]) -> Result<(FileMetaTable, DataSet)> {
    snafu::ensure!(
        bytes.len() > PREAMBLE_LEN + 4,
        InvalidFileSnafu {
            reason: "shorter than preamble and magic".to_string(),
        }
    );
    snafu::ensure!(
        &bytes[PREAMBLE_LEN..PREAMBLE_LEN + 4] == MAGIC,
        InvalidFileSnafu {
            reason: "missing DICM magic".to_string(),
        }
    );

    let rest = &bytes[PREAMBLE_LEN + 4..];
    let mut cursor = Cursor::new(rest);
    let group_length_element = decode_element(&mut cursor, &EXPLICIT_VR_LITTLE_ENDIAN)?;
    snafu::ensure!(
        group_length_element.tag == tags::FILE_META_INFORMATION_GROUP_LENGTH,
        InvalidFileSnafu {
            reason: "file meta group does not start with its group length".to_string(),
        }
    );
    let group_length = group_length_element
        .to_u32()
        .ok()
        .context(InvalidFileSnafu {
            reason: "unreadable file meta group length".to_string(),
        })? as usize;

    let meta_start = cursor.position() as usize;
    snafu::ensure!(
        meta_start + group_length <= rest.len(),
        InvalidFileSnafu {
            reason: "file meta group length exceeds file size".to_string(),
        }
    );
    let meta_ds = decode_data_set(
        &rest[meta_start..meta_start + group_length],
        &EXPLICIT_VR_LITTLE_ENDIAN,
    )?;
    let meta = FileMetaTable::from_data_set(&meta_ds)?;

    let ts = meta.transfer_syntax()?;
    let data_set = decode_data_set(&rest[meta_start + group_length..], ts)?;
    Ok((meta, data_set))
}

/// Write a data set to a Part 10 file on disk.
pub fn write_file<P: AsRef<Path>>(
    path: P,
    meta: &FileMetaTable,
    data_set: &DataSet,
) -> Result<()> {
    let bytes = to_bytes(meta, data_set)?;
    std::fs::write(path, bytes).context(FileIoSnafu { operation: "write" })
}

/// Read a Part 10 file from disk.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<(FileMetaTable, DataSet)> {
    let bytes = std::fs::read(path).context(FileIoSnafu { operation: "read" })?;
    from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN;

    fn sample() -> (FileMetaTable, DataSet) {
        let mut ds = DataSet::new();
        ds.put_str(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.2");
        ds.put_str(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4.5");
        ds.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        let meta = FileMetaTable::new(
            "1.2.840.10008.5.1.4.1.1.2",
            "1.2.3.4.5",
            IMPLICIT_VR_LITTLE_ENDIAN.uid,
        );
        (meta, ds)
    }

    #[test]
    fn file_image_round_trip() {
        let (meta, ds) = sample();
        let bytes = to_bytes(&meta, &ds).unwrap();
        assert_eq!(&bytes[128..132], b"DICM");
        let (meta2, ds2) = from_bytes(&bytes).unwrap();
        assert_eq!(meta2, meta);
        assert_eq!(ds2, ds);
    }

    #[test]
    fn rejects_missing_magic() {
        let mut bytes = vec![0u8; 200];
        bytes[128..132].copy_from_slice(b"DICX");
        assert!(from_bytes(&bytes).is_err());
    }

    #[test]
    fn file_round_trip_on_disk() {
        let (meta, ds) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instance.dcm");
        write_file(&path, &meta, &ds).unwrap();
        let (meta2, ds2) = read_file(&path).unwrap();
        assert_eq!(meta2, meta);
        assert_eq!(ds2, ds);
    }
}
