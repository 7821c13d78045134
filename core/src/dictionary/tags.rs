//! Tag constants for the attributes used throughout this system.
use crate::header::Tag;

// group 0000: command set
pub const COMMAND_GROUP_LENGTH: Tag = Tag(0x0000, 0x0000);
pub const AFFECTED_SOP_CLASS_UID: Tag = Tag(0x0000, 0x0002);
pub const REQUESTED_SOP_CLASS_UID: Tag = Tag(0x0000, 0x0003);
pub const COMMAND_FIELD: Tag = Tag(0x0000, 0x0100);
pub const MESSAGE_ID: Tag = Tag(0x0000, 0x0110);
pub const MESSAGE_ID_BEING_RESPONDED_TO: Tag = Tag(0x0000, 0x0120);
pub const MOVE_DESTINATION: Tag = Tag(0x0000, 0x0600);
pub const PRIORITY: Tag = Tag(0x0000, 0x0700);
pub const COMMAND_DATA_SET_TYPE: Tag = Tag(0x0000, 0x0800);
pub const STATUS: Tag = Tag(0x0000, 0x0900);
pub const OFFENDING_ELEMENT: Tag = Tag(0x0000, 0x0901);
pub const ERROR_COMMENT: Tag = Tag(0x0000, 0x0902);
pub const AFFECTED_SOP_INSTANCE_UID: Tag = Tag(0x0000, 0x1000);
pub const REQUESTED_SOP_INSTANCE_UID: Tag = Tag(0x0000, 0x1001);
pub const NUMBER_OF_REMAINING_SUBOPERATIONS: Tag = Tag(0x0000, 0x1020);
pub const NUMBER_OF_COMPLETED_SUBOPERATIONS: Tag = Tag(0x0000, 0x1021);
pub const NUMBER_OF_FAILED_SUBOPERATIONS: Tag = Tag(0x0000, 0x1022);
pub const NUMBER_OF_WARNING_SUBOPERATIONS: Tag = Tag(0x0000, 0x1023);
pub const MOVE_ORIGINATOR_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0000, 0x1030);
pub const MOVE_ORIGINATOR_MESSAGE_ID: Tag = Tag(0x0000, 0x1031);

// group 0002: file meta information
pub const FILE_META_INFORMATION_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
pub const FILE_META_INFORMATION_VERSION: Tag = Tag(0x0002, 0x0001);
pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
pub const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
pub const IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
pub const IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);

// group 0008: identification
pub const SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008, 0x0005);
pub const IMAGE_TYPE: Tag = Tag(0x0008, 0x0008);
pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
pub const ACQUISITION_DATE: Tag = Tag(0x0008, 0x0022);
pub const CONTENT_DATE: Tag = Tag(0x0008, 0x0023);
pub const STUDY_TIME: Tag = Tag(0x0008, 0x0030);
pub const SERIES_TIME: Tag = Tag(0x0008, 0x0031);
pub const ACCESSION_NUMBER: Tag = Tag(0x0008, 0x0050);
pub const QUERY_RETRIEVE_LEVEL: Tag = Tag(0x0008, 0x0052);
pub const RETRIEVE_AE_TITLE: Tag = Tag(0x0008, 0x0054);
pub const INSTANCE_AVAILABILITY: Tag = Tag(0x0008, 0x0056);
pub const MODALITY: Tag = Tag(0x0008, 0x0060);
pub const MODALITIES_IN_STUDY: Tag = Tag(0x0008, 0x0061);
pub const MANUFACTURER: Tag = Tag(0x0008, 0x0070);
pub const INSTITUTION_NAME: Tag = Tag(0x0008, 0x0080);
pub const REFERRING_PHYSICIAN_NAME: Tag = Tag(0x0008, 0x0090);
pub const STUDY_DESCRIPTION: Tag = Tag(0x0008, 0x1030);
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
pub const PERFORMING_PHYSICIAN_NAME: Tag = Tag(0x0008, 0x1050);
pub const MANUFACTURER_MODEL_NAME: Tag = Tag(0x0008, 0x1090);
pub const REFERENCED_STUDY_SEQUENCE: Tag = Tag(0x0008, 0x1110);
pub const REFERENCED_SERIES_SEQUENCE: Tag = Tag(0x0008, 0x1115);
pub const REFERENCED_IMAGE_SEQUENCE: Tag = Tag(0x0008, 0x1140);

// group 0010: patient
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
pub const ISSUER_OF_PATIENT_ID: Tag = Tag(0x0010, 0x0021);
pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010, 0x0030);
pub const PATIENT_BIRTH_TIME: Tag = Tag(0x0010, 0x0032);
pub const PATIENT_SEX: Tag = Tag(0x0010, 0x0040);
pub const PATIENT_AGE: Tag = Tag(0x0010, 0x1010);
pub const PATIENT_SIZE: Tag = Tag(0x0010, 0x1020);
pub const PATIENT_WEIGHT: Tag = Tag(0x0010, 0x1030);
pub const ETHNIC_GROUP: Tag = Tag(0x0010, 0x2160);
pub const PATIENT_COMMENTS: Tag = Tag(0x0010, 0x4000);

// group 0018: acquisition
pub const BODY_PART_EXAMINED: Tag = Tag(0x0018, 0x0015);
pub const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);
pub const KVP: Tag = Tag(0x0018, 0x0060);
pub const PROTOCOL_NAME: Tag = Tag(0x0018, 0x1030);
pub const PATIENT_POSITION: Tag = Tag(0x0018, 0x5100);

// group 0020: relationship
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
pub const STUDY_ID: Tag = Tag(0x0020, 0x0010);
pub const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);
pub const PATIENT_ORIENTATION: Tag = Tag(0x0020, 0x0020);
pub const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);
pub const IMAGE_ORIENTATION_PATIENT: Tag = Tag(0x0020, 0x0037);
pub const FRAME_OF_REFERENCE_UID: Tag = Tag(0x0020, 0x0052);
pub const SLICE_LOCATION: Tag = Tag(0x0020, 0x1041);
pub const NUMBER_OF_STUDY_RELATED_SERIES: Tag = Tag(0x0020, 0x1206);
pub const NUMBER_OF_STUDY_RELATED_INSTANCES: Tag = Tag(0x0020, 0x1208);
pub const NUMBER_OF_SERIES_RELATED_INSTANCES: Tag = Tag(0x0020, 0x1209);
pub const IMAGE_COMMENTS: Tag = Tag(0x0020, 0x4000);

// group 0028: image pixel description
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
pub const ROWS: Tag = Tag(0x0028, 0x0010);
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
pub const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
pub const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
pub const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
pub const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
pub const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
pub const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);

// group 0032: study acquisition
pub const REQUESTING_PHYSICIAN: Tag = Tag(0x0032, 0x1032);
pub const REQUESTED_PROCEDURE_DESCRIPTION: Tag = Tag(0x0032, 0x1060);

// group 0038: visit
pub const ADMISSION_ID: Tag = Tag(0x0038, 0x0010);

// group 0040: scheduled procedure step / worklist
pub const SCHEDULED_STATION_AE_TITLE: Tag = Tag(0x0040, 0x0001);
pub const SCHEDULED_PROCEDURE_STEP_START_DATE: Tag = Tag(0x0040, 0x0002);
pub const SCHEDULED_PROCEDURE_STEP_START_TIME: Tag = Tag(0x0040, 0x0003);
pub const SCHEDULED_PERFORMING_PHYSICIAN_NAME: Tag = Tag(0x0040, 0x0006);
pub const SCHEDULED_PROCEDURE_STEP_DESCRIPTION: Tag = Tag(0x0040, 0x0007);
pub const SCHEDULED_PROCEDURE_STEP_ID: Tag = Tag(0x0040, 0x0009);
pub const SCHEDULED_STATION_NAME: Tag = Tag(0x0040, 0x0010);
pub const SCHEDULED_PROCEDURE_STEP_SEQUENCE: Tag = Tag(0x0040, 0x0100);
pub const REQUESTED_PROCEDURE_ID: Tag = Tag(0x0040, 0x1001);
pub const REQUESTED_PROCEDURE_PRIORITY: Tag = Tag(0x0040, 0x1003);

// group 0400: digital signatures
pub const MAC_ID_NUMBER: Tag = Tag(0x0400, 0x0005);
pub const MAC_CALCULATION_TRANSFER_SYNTAX_UID: Tag = Tag(0x0400, 0x0010);
pub const MAC_ALGORITHM: Tag = Tag(0x0400, 0x0015);
pub const DATA_ELEMENTS_SIGNED: Tag = Tag(0x0400, 0x0020);
pub const DIGITAL_SIGNATURE_UID: Tag = Tag(0x0400, 0x0100);
pub const DIGITAL_SIGNATURE_DATE_TIME: Tag = Tag(0x0400, 0x0105);
pub const CERTIFICATE_TYPE: Tag = Tag(0x0400, 0x0110);
pub const CERTIFICATE_OF_SIGNER: Tag = Tag(0x0400, 0x0115);
pub const SIGNATURE: Tag = Tag(0x0400, 0x0120);
pub const DIGITAL_SIGNATURES_SEQUENCE: Tag = Tag(0x0400, 0x0561);

// group 7FE0: pixel data
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

// group FFFE: sequence framing
pub const ITEM: Tag = Tag(0xFFFE, 0xE000);
pub const ITEM_DELIMITATION_ITEM: Tag = Tag(0xFFFE, 0xE00D);
pub const SEQUENCE_DELIMITATION_ITEM: Tag = Tag(0xFFFE, 0xE0DD);
