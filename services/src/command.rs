//! DIMSE command sets: parsing, construction and status codes.
//!
//! Command sets are always encoded in Implicit VR Little Endian,
//! with the command group length (0000,0000) first.
use crate::error::{CodecSnafu, MissingCommandFieldSnafu, Result};
use pacs_core::dictionary::tags;
use pacs_core::{DataElement, DataSet, VR};
use pacs_encoding::transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN;
use pacs_encoding::{decode_data_set, encode_data_set};
use snafu::{OptionExt, ResultExt};

/// Command field values (PS3.7 table E.1-1).
pub mod command_field {
    pub const C_STORE_RQ: u16 = 0x0001;
    pub const C_STORE_RSP: u16 = 0x8001;
    pub const C_GET_RQ: u16 = 0x0010;
    pub const C_GET_RSP: u16 = 0x8010;
    pub const C_FIND_RQ: u16 = 0x0020;
    pub const C_FIND_RSP: u16 = 0x8020;
    pub const C_MOVE_RQ: u16 = 0x0021;
    pub const C_MOVE_RSP: u16 = 0x8021;
    pub const C_ECHO_RQ: u16 = 0x0030;
    pub const C_ECHO_RSP: u16 = 0x8030;
    pub const C_CANCEL_RQ: u16 = 0x0FFF;
}

/// DIMSE status codes used by this implementation.
pub mod status {
    pub const SUCCESS: u16 = 0x0000;
    pub const CANCEL: u16 = 0xFE00;
    pub const PENDING: u16 = 0xFF00;
    /// sub-operations completed with failures
    pub const WARNING_SUBOPS: u16 = 0xB000;
    pub const SOP_CLASS_NOT_SUPPORTED: u16 = 0x0122;
    pub const OUT_OF_RESOURCES: u16 = 0xA700;
    pub const MOVE_DESTINATION_UNKNOWN: u16 = 0xA801;
    pub const UNABLE_TO_PROCESS: u16 = 0xC000;
    /// identifier does not match the SOP class
    pub const IDENTIFIER_MISMATCH: u16 = 0xA900;
}

/// No data set follows the command set.
const NO_DATA_SET: u16 = 0x0101;

/// A parsed or under-construction DIMSE command set.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSet(pub DataSet);

impl CommandSet {
    /// Decode a command set from its Implicit VR LE bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        decode_data_set(bytes, &IMPLICIT_VR_LITTLE_ENDIAN)
            .map(CommandSet)
            .context(CodecSnafu { context: "command set" })
    }

    /// Encode the command set, prepending the computed group length.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut body = self.0.clone();
        body.remove(tags::COMMAND_GROUP_LENGTH);
        let body_bytes = encode_data_set(&body, &IMPLICIT_VR_LITTLE_ENDIAN)
            .context(CodecSnafu { context: "command set" })?;

        let mut head = DataSet::new();
        head.put(DataElement::from_u32(
            tags::COMMAND_GROUP_LENGTH,
            VR::UL,
            body_bytes.len() as u32,
        ));
        let mut bytes = encode_data_set(&head, &IMPLICIT_VR_LITTLE_ENDIAN)
            .context(CodecSnafu { context: "command set" })?;
        bytes.extend_from_slice(&body_bytes);
        Ok(bytes)
    }

    pub fn command_field(&self) -> Result<u16> {
        self.0
            .get_u16(tags::COMMAND_FIELD)
            .context(MissingCommandFieldSnafu { field: "CommandField" })
    }

    pub fn message_id(&self) -> Result<u16> {
        self.0
            .get_u16(tags::MESSAGE_ID)
            .context(MissingCommandFieldSnafu { field: "MessageID" })
    }

    pub fn status(&self) -> Option<u16> {
        self.0.get_u16(tags::STATUS)
    }

    pub fn affected_sop_class_uid(&self) -> Option<String> {
        self.0.get_str(tags::AFFECTED_SOP_CLASS_UID)
    }

    pub fn affected_sop_instance_uid(&self) -> Option<String> {
        self.0.get_str(tags::AFFECTED_SOP_INSTANCE_UID)
    }

    pub fn move_destination(&self) -> Option<String> {
        self.0.get_str(tags::MOVE_DESTINATION)
    }

    /// Whether the command announces an accompanying data set.
    pub fn has_data_set(&self) -> bool {
        self.0
            .get_u16(tags::COMMAND_DATA_SET_TYPE)
            .map_or(false, |v| v != NO_DATA_SET)
    }
}

fn base(command_field: u16, has_data: bool) -> DataSet {
    let mut ds = DataSet::new();
    ds.put(DataElement::from_u16(
        tags::COMMAND_FIELD,
        VR::US,
        command_field,
    ));
    ds.put(DataElement::from_u16(
        tags::COMMAND_DATA_SET_TYPE,
        VR::US,
        if has_data { 0x0000 } else { NO_DATA_SET },
    ));
    ds
}

fn with_message_id(mut ds: DataSet, message_id: u16) -> DataSet {
    ds.put(DataElement::from_u16(tags::MESSAGE_ID, VR::US, message_id));
    ds
}

fn with_responded_to(mut ds: DataSet, message_id: u16, status: u16) -> DataSet {
    ds.put(DataElement::from_u16(
        tags::MESSAGE_ID_BEING_RESPONDED_TO,
        VR::US,
        message_id,
    ));
    ds.put(DataElement::from_u16(tags::STATUS, VR::US, status));
    ds
}

/// C-ECHO-RQ.
pub fn echo_rq(message_id: u16) -> CommandSet {
    let mut ds = with_message_id(base(command_field::C_ECHO_RQ, false), message_id);
    ds.put_str(tags::AFFECTED_SOP_CLASS_UID, VR::UI, crate::uids::VERIFICATION);
    CommandSet(ds)
}

/// C-ECHO-RSP.
pub fn echo_rsp(message_id: u16, status: u16) -> CommandSet {
    let mut ds = with_responded_to(base(command_field::C_ECHO_RSP, false), message_id, status);
    ds.put_str(tags::AFFECTED_SOP_CLASS_UID, VR::UI, crate::uids::VERIFICATION);
    CommandSet(ds)
}

/// C-STORE-RQ for one SOP instance.
pub fn store_rq(message_id: u16, sop_class_uid: &str, sop_instance_uid: &str) -> CommandSet {
    let mut ds = with_message_id(base(command_field::C_STORE_RQ, true), message_id);
    ds.put_str(tags::AFFECTED_SOP_CLASS_UID, VR::UI, sop_class_uid);
    ds.put_str(tags::AFFECTED_SOP_INSTANCE_UID, VR::UI, sop_instance_uid);
    ds.put(DataElement::from_u16(tags::PRIORITY, VR::US, 0));
    CommandSet(ds)
}

/// C-STORE-RSP.
pub fn store_rsp(
    message_id: u16,
    sop_class_uid: &str,
    sop_instance_uid: &str,
    status: u16,
) -> CommandSet {
    let mut ds = with_responded_to(base(command_field::C_STORE_RSP, false), message_id, status);
    ds.put_str(tags::AFFECTED_SOP_CLASS_UID, VR::UI, sop_class_uid);
    ds.put_str(tags::AFFECTED_SOP_INSTANCE_UID, VR::UI, sop_instance_uid);
    CommandSet(ds)
}

/// C-FIND-RQ; the identifier travels as the data set.
pub fn find_rq(message_id: u16, sop_class_uid: &str) -> CommandSet {
    let mut ds = with_message_id(base(command_field::C_FIND_RQ, true), message_id);
    ds.put_str(tags::AFFECTED_SOP_CLASS_UID, VR::UI, sop_class_uid);
    ds.put(DataElement::from_u16(tags::PRIORITY, VR::US, 0));
    CommandSet(ds)
}

/// C-FIND-RSP; pending responses carry a data set.
pub fn find_rsp(message_id: u16, sop_class_uid: &str, status: u16, has_data: bool) -> CommandSet {
    let mut ds = with_responded_to(base(command_field::C_FIND_RSP, has_data), message_id, status);
    ds.put_str(tags::AFFECTED_SOP_CLASS_UID, VR::UI, sop_class_uid);
    CommandSet(ds)
}

/// C-MOVE-RQ naming the destination AE.
pub fn move_rq(message_id: u16, sop_class_uid: &str, destination_ae: &str) -> CommandSet {
    let mut ds = with_message_id(base(command_field::C_MOVE_RQ, true), message_id);
    ds.put_str(tags::AFFECTED_SOP_CLASS_UID, VR::UI, sop_class_uid);
    ds.put_str(tags::MOVE_DESTINATION, VR::AE, destination_ae);
    ds.put(DataElement::from_u16(tags::PRIORITY, VR::US, 0));
    CommandSet(ds)
}

/// C-CANCEL-RQ for an outstanding operation.
pub fn cancel_rq(message_id: u16) -> CommandSet {
    let mut ds = base(command_field::C_CANCEL_RQ, false);
    ds.put(DataElement::from_u16(
        tags::MESSAGE_ID_BEING_RESPONDED_TO,
        VR::US,
        message_id,
    ));
    CommandSet(ds)
}

/// Sub-operation progress carried by C-MOVE responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubOperations {
    pub remaining: u16,
    pub completed: u16,
    pub failed: u16,
    pub warning: u16,
}

/// C-MOVE-RSP with progress counts.
pub fn move_rsp(
    message_id: u16,
    sop_class_uid: &str,
    status: u16,
    progress: SubOperations,
) -> CommandSet {
    let mut ds = with_responded_to(base(command_field::C_MOVE_RSP, false), message_id, status);
    ds.put_str(tags::AFFECTED_SOP_CLASS_UID, VR::UI, sop_class_uid);
    ds.put(DataElement::from_u16(
        tags::NUMBER_OF_REMAINING_SUBOPERATIONS,
        VR::US,
        progress.remaining,
    ));
    ds.put(DataElement::from_u16(
        tags::NUMBER_OF_COMPLETED_SUBOPERATIONS,
        VR::US,
        progress.completed,
    ));
    ds.put(DataElement::from_u16(
        tags::NUMBER_OF_FAILED_SUBOPERATIONS,
        VR::US,
        progress.failed,
    ));
    ds.put(DataElement::from_u16(
        tags::NUMBER_OF_WARNING_SUBOPERATIONS,
        VR::US,
        progress.warning,
    ));
    CommandSet(ds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_round_trip_with_group_length() {
        let rq = echo_rq(7);
        let bytes = rq.to_bytes().unwrap();
        // group length element first: (0000,0000) UL
        assert_eq!(&bytes[0..4], &[0x00, 0x00, 0x00, 0x00]);
        let parsed = CommandSet::parse(&bytes).unwrap();
        assert_eq!(parsed.command_field().unwrap(), command_field::C_ECHO_RQ);
        assert_eq!(parsed.message_id().unwrap(), 7);
        assert!(!parsed.has_data_set());

        let group_length = parsed.0.get_u32(tags::COMMAND_GROUP_LENGTH).unwrap();
        assert_eq!(group_length as usize, bytes.len() - 12);
    }

    #[test]
    fn store_rq_announces_a_data_set() {
        let rq = store_rq(1, "1.2.840.10008.5.1.4.1.1.2", "1.2.3");
        assert!(rq.has_data_set());
        assert_eq!(
            rq.affected_sop_instance_uid().as_deref(),
            Some("1.2.3")
        );
    }

    #[test]
    fn move_rsp_carries_progress() {
        let rsp = move_rsp(
            3,
            crate::uids::STUDY_ROOT_QR_MOVE,
            status::PENDING,
            SubOperations {
                remaining: 5,
                completed: 2,
                failed: 1,
                warning: 0,
            },
        );
        let bytes = rsp.to_bytes().unwrap();
        let parsed = CommandSet::parse(&bytes).unwrap();
        assert_eq!(parsed.status(), Some(status::PENDING));
        assert_eq!(
            parsed.0.get_u16(tags::NUMBER_OF_REMAINING_SUBOPERATIONS),
            Some(5)
        );
        assert_eq!(
            parsed.0.get_u16(tags::NUMBER_OF_FAILED_SUBOPERATIONS),
            Some(1)
        );
    }

    #[test]
    fn cancel_is_recognized() {
        let mut ds = base(command_field::C_CANCEL_RQ, false);
        ds.put(DataElement::from_u16(
            tags::MESSAGE_ID_BEING_RESPONDED_TO,
            VR::US,
            9,
        ));
        let cmd = CommandSet(ds);
        let parsed = CommandSet::parse(&cmd.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.command_field().unwrap(), command_field::C_CANCEL_RQ);
    }
}
