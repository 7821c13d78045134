//! The static dictionary table, sorted by tag for binary search.
use super::tags::*;
use super::TagInfo;
use crate::header::Tag;
use crate::vm::ValueMultiplicity;
use crate::vr::VR;

const fn e(
    tag: Tag,
    vr: VR,
    vm: ValueMultiplicity,
    keyword: &'static str,
    name: &'static str,
) -> TagInfo {
    TagInfo {
        tag,
        vr,
        vm,
        keyword,
        name,
        retired: false,
    }
}

const fn retired(
    tag: Tag,
    vr: VR,
    vm: ValueMultiplicity,
    keyword: &'static str,
    name: &'static str,
) -> TagInfo {
    TagInfo {
        tag,
        vr,
        vm,
        keyword,
        name,
        retired: true,
    }
}

const VM1: ValueMultiplicity = ValueMultiplicity::ONE;
const VM1N: ValueMultiplicity = ValueMultiplicity::ONE_N;

/// All dictionary entries, in ascending tag order.
#[rustfmt::skip]
pub static ENTRIES: &[TagInfo] = &[
    // command set (PS3.7)
    e(COMMAND_GROUP_LENGTH, VR::UL, VM1, "CommandGroupLength", "Command Group Length"),
    e(AFFECTED_SOP_CLASS_UID, VR::UI, VM1, "AffectedSOPClassUID", "Affected SOP Class UID"),
    e(REQUESTED_SOP_CLASS_UID, VR::UI, VM1, "RequestedSOPClassUID", "Requested SOP Class UID"),
    e(COMMAND_FIELD, VR::US, VM1, "CommandField", "Command Field"),
    e(MESSAGE_ID, VR::US, VM1, "MessageID", "Message ID"),
    e(MESSAGE_ID_BEING_RESPONDED_TO, VR::US, VM1, "MessageIDBeingRespondedTo", "Message ID Being Responded To"),
    e(MOVE_DESTINATION, VR::AE, VM1, "MoveDestination", "Move Destination"),
    e(PRIORITY, VR::US, VM1, "Priority", "Priority"),
    e(COMMAND_DATA_SET_TYPE, VR::US, VM1, "CommandDataSetType", "Command Data Set Type"),
    e(STATUS, VR::US, VM1, "Status", "Status"),
    e(OFFENDING_ELEMENT, VR::AT, VM1N, "OffendingElement", "Offending Element"),
    e(ERROR_COMMENT, VR::LO, VM1, "ErrorComment", "Error Comment"),
    e(AFFECTED_SOP_INSTANCE_UID, VR::UI, VM1, "AffectedSOPInstanceUID", "Affected SOP Instance UID"),
    e(REQUESTED_SOP_INSTANCE_UID, VR::UI, VM1, "RequestedSOPInstanceUID", "Requested SOP Instance UID"),
    e(NUMBER_OF_REMAINING_SUBOPERATIONS, VR::US, VM1, "NumberOfRemainingSuboperations", "Number of Remaining Sub-operations"),
    e(NUMBER_OF_COMPLETED_SUBOPERATIONS, VR::US, VM1, "NumberOfCompletedSuboperations", "Number of Completed Sub-operations"),
    e(NUMBER_OF_FAILED_SUBOPERATIONS, VR::US, VM1, "NumberOfFailedSuboperations", "Number of Failed Sub-operations"),
    e(NUMBER_OF_WARNING_SUBOPERATIONS, VR::US, VM1, "NumberOfWarningSuboperations", "Number of Warning Sub-operations"),
    e(MOVE_ORIGINATOR_APPLICATION_ENTITY_TITLE, VR::AE, VM1, "MoveOriginatorApplicationEntityTitle", "Move Originator Application Entity Title"),
    e(MOVE_ORIGINATOR_MESSAGE_ID, VR::US, VM1, "MoveOriginatorMessageID", "Move Originator Message ID"),
    // file meta information (PS3.10)
    e(FILE_META_INFORMATION_GROUP_LENGTH, VR::UL, VM1, "FileMetaInformationGroupLength", "File Meta Information Group Length"),
    e(FILE_META_INFORMATION_VERSION, VR::OB, VM1, "FileMetaInformationVersion", "File Meta Information Version"),
    e(MEDIA_STORAGE_SOP_CLASS_UID, VR::UI, VM1, "MediaStorageSOPClassUID", "Media Storage SOP Class UID"),
    e(MEDIA_STORAGE_SOP_INSTANCE_UID, VR::UI, VM1, "MediaStorageSOPInstanceUID", "Media Storage SOP Instance UID"),
    e(TRANSFER_SYNTAX_UID, VR::UI, VM1, "TransferSyntaxUID", "Transfer Syntax UID"),
    e(IMPLEMENTATION_CLASS_UID, VR::UI, VM1, "ImplementationClassUID", "Implementation Class UID"),
    e(IMPLEMENTATION_VERSION_NAME, VR::SH, VM1, "ImplementationVersionName", "Implementation Version Name"),
    // identification
    retired(Tag(0x0008, 0x0001), VR::UL, VM1, "LengthToEnd", "Length to End"),
    e(SPECIFIC_CHARACTER_SET, VR::CS, VM1N, "SpecificCharacterSet", "Specific Character Set"),
    e(IMAGE_TYPE, VR::CS, ValueMultiplicity { min: 2, max: None, multiplier: 1 }, "ImageType", "Image Type"),
    e(SOP_CLASS_UID, VR::UI, VM1, "SOPClassUID", "SOP Class UID"),
    e(SOP_INSTANCE_UID, VR::UI, VM1, "SOPInstanceUID", "SOP Instance UID"),
    e(STUDY_DATE, VR::DA, VM1, "StudyDate", "Study Date"),
    e(SERIES_DATE, VR::DA, VM1, "SeriesDate", "Series Date"),
    e(ACQUISITION_DATE, VR::DA, VM1, "AcquisitionDate", "Acquisition Date"),
    e(CONTENT_DATE, VR::DA, VM1, "ContentDate", "Content Date"),
    e(STUDY_TIME, VR::TM, VM1, "StudyTime", "Study Time"),
    e(SERIES_TIME, VR::TM, VM1, "SeriesTime", "Series Time"),
    e(ACCESSION_NUMBER, VR::SH, VM1, "AccessionNumber", "Accession Number"),
    e(QUERY_RETRIEVE_LEVEL, VR::CS, VM1, "QueryRetrieveLevel", "Query/Retrieve Level"),
    e(RETRIEVE_AE_TITLE, VR::AE, VM1N, "RetrieveAETitle", "Retrieve AE Title"),
    e(INSTANCE_AVAILABILITY, VR::CS, VM1, "InstanceAvailability", "Instance Availability"),
    e(MODALITY, VR::CS, VM1, "Modality", "Modality"),
    e(MODALITIES_IN_STUDY, VR::CS, VM1N, "ModalitiesInStudy", "Modalities in Study"),
    e(MANUFACTURER, VR::LO, VM1, "Manufacturer", "Manufacturer"),
    e(INSTITUTION_NAME, VR::LO, VM1, "InstitutionName", "Institution Name"),
    e(REFERRING_PHYSICIAN_NAME, VR::PN, VM1, "ReferringPhysicianName", "Referring Physician's Name"),
    e(STUDY_DESCRIPTION, VR::LO, VM1, "StudyDescription", "Study Description"),
    e(SERIES_DESCRIPTION, VR::LO, VM1, "SeriesDescription", "Series Description"),
    e(PERFORMING_PHYSICIAN_NAME, VR::PN, VM1N, "PerformingPhysicianName", "Performing Physician's Name"),
    e(MANUFACTURER_MODEL_NAME, VR::LO, VM1, "ManufacturerModelName", "Manufacturer's Model Name"),
    e(REFERENCED_STUDY_SEQUENCE, VR::SQ, VM1, "ReferencedStudySequence", "Referenced Study Sequence"),
    e(REFERENCED_SERIES_SEQUENCE, VR::SQ, VM1, "ReferencedSeriesSequence", "Referenced Series Sequence"),
    e(REFERENCED_IMAGE_SEQUENCE, VR::SQ, VM1, "ReferencedImageSequence", "Referenced Image Sequence"),
    // patient
    e(PATIENT_NAME, VR::PN, VM1, "PatientName", "Patient's Name"),
    e(PATIENT_ID, VR::LO, VM1, "PatientID", "Patient ID"),
    e(ISSUER_OF_PATIENT_ID, VR::LO, VM1, "IssuerOfPatientID", "Issuer of Patient ID"),
    e(PATIENT_BIRTH_DATE, VR::DA, VM1, "PatientBirthDate", "Patient's Birth Date"),
    e(PATIENT_BIRTH_TIME, VR::TM, VM1, "PatientBirthTime", "Patient's Birth Time"),
    e(PATIENT_SEX, VR::CS, VM1, "PatientSex", "Patient's Sex"),
    e(PATIENT_AGE, VR::AS, VM1, "PatientAge", "Patient's Age"),
    e(PATIENT_SIZE, VR::DS, VM1, "PatientSize", "Patient's Size"),
    e(PATIENT_WEIGHT, VR::DS, VM1, "PatientWeight", "Patient's Weight"),
    e(ETHNIC_GROUP, VR::SH, VM1, "EthnicGroup", "Ethnic Group"),
    e(PATIENT_COMMENTS, VR::LT, VM1, "PatientComments", "Patient Comments"),
    // acquisition
    e(BODY_PART_EXAMINED, VR::CS, VM1, "BodyPartExamined", "Body Part Examined"),
    e(SLICE_THICKNESS, VR::DS, VM1, "SliceThickness", "Slice Thickness"),
    e(KVP, VR::DS, VM1, "KVP", "KVP"),
    e(PROTOCOL_NAME, VR::LO, VM1, "ProtocolName", "Protocol Name"),
    e(PATIENT_POSITION, VR::CS, VM1, "PatientPosition", "Patient Position"),
    // relationship
    e(STUDY_INSTANCE_UID, VR::UI, VM1, "StudyInstanceUID", "Study Instance UID"),
    e(SERIES_INSTANCE_UID, VR::UI, VM1, "SeriesInstanceUID", "Series Instance UID"),
    e(STUDY_ID, VR::SH, VM1, "StudyID", "Study ID"),
    e(SERIES_NUMBER, VR::IS, VM1, "SeriesNumber", "Series Number"),
    e(INSTANCE_NUMBER, VR::IS, VM1, "InstanceNumber", "Instance Number"),
    e(PATIENT_ORIENTATION, VR::CS, ValueMultiplicity::fixed(2), "PatientOrientation", "Patient Orientation"),
    retired(Tag(0x0020, 0x0030), VR::DS, ValueMultiplicity::fixed(3), "ImagePosition", "Image Position"),
    e(IMAGE_POSITION_PATIENT, VR::DS, ValueMultiplicity::fixed(3), "ImagePositionPatient", "Image Position (Patient)"),
    e(IMAGE_ORIENTATION_PATIENT, VR::DS, ValueMultiplicity::fixed(6), "ImageOrientationPatient", "Image Orientation (Patient)"),
    e(FRAME_OF_REFERENCE_UID, VR::UI, VM1, "FrameOfReferenceUID", "Frame of Reference UID"),
    e(SLICE_LOCATION, VR::DS, VM1, "SliceLocation", "Slice Location"),
    e(NUMBER_OF_STUDY_RELATED_SERIES, VR::IS, VM1, "NumberOfStudyRelatedSeries", "Number of Study Related Series"),
    e(NUMBER_OF_STUDY_RELATED_INSTANCES, VR::IS, VM1, "NumberOfStudyRelatedInstances", "Number of Study Related Instances"),
    e(NUMBER_OF_SERIES_RELATED_INSTANCES, VR::IS, VM1, "NumberOfSeriesRelatedInstances", "Number of Series Related Instances"),
    e(IMAGE_COMMENTS, VR::LT, VM1, "ImageComments", "Image Comments"),
    // image pixel description
    e(SAMPLES_PER_PIXEL, VR::US, VM1, "SamplesPerPixel", "Samples per Pixel"),
    e(PHOTOMETRIC_INTERPRETATION, VR::CS, VM1, "PhotometricInterpretation", "Photometric Interpretation"),
    e(NUMBER_OF_FRAMES, VR::IS, VM1, "NumberOfFrames", "Number of Frames"),
    e(ROWS, VR::US, VM1, "Rows", "Rows"),
    e(COLUMNS, VR::US, VM1, "Columns", "Columns"),
    e(PIXEL_SPACING, VR::DS, ValueMultiplicity::fixed(2), "PixelSpacing", "Pixel Spacing"),
    e(BITS_ALLOCATED, VR::US, VM1, "BitsAllocated", "Bits Allocated"),
    e(BITS_STORED, VR::US, VM1, "BitsStored", "Bits Stored"),
    e(HIGH_BIT, VR::US, VM1, "HighBit", "High Bit"),
    e(PIXEL_REPRESENTATION, VR::US, VM1, "PixelRepresentation", "Pixel Representation"),
    e(WINDOW_CENTER, VR::DS, VM1N, "WindowCenter", "Window Center"),
    e(WINDOW_WIDTH, VR::DS, VM1N, "WindowWidth", "Window Width"),
    e(RESCALE_INTERCEPT, VR::DS, VM1, "RescaleIntercept", "Rescale Intercept"),
    e(RESCALE_SLOPE, VR::DS, VM1, "RescaleSlope", "Rescale Slope"),
    // study acquisition
    e(REQUESTING_PHYSICIAN, VR::PN, VM1, "RequestingPhysician", "Requesting Physician"),
    e(REQUESTED_PROCEDURE_DESCRIPTION, VR::LO, VM1, "RequestedProcedureDescription", "Requested Procedure Description"),
    // visit
    e(ADMISSION_ID, VR::LO, VM1, "AdmissionID", "Admission ID"),
    // scheduled procedure step
    e(SCHEDULED_STATION_AE_TITLE, VR::AE, VM1N, "ScheduledStationAETitle", "Scheduled Station AE Title"),
    e(SCHEDULED_PROCEDURE_STEP_START_DATE, VR::DA, VM1, "ScheduledProcedureStepStartDate", "Scheduled Procedure Step Start Date"),
    e(SCHEDULED_PROCEDURE_STEP_START_TIME, VR::TM, VM1, "ScheduledProcedureStepStartTime", "Scheduled Procedure Step Start Time"),
    e(SCHEDULED_PERFORMING_PHYSICIAN_NAME, VR::PN, VM1, "ScheduledPerformingPhysicianName", "Scheduled Performing Physician's Name"),
    e(SCHEDULED_PROCEDURE_STEP_DESCRIPTION, VR::LO, VM1, "ScheduledProcedureStepDescription", "Scheduled Procedure Step Description"),
    e(SCHEDULED_PROCEDURE_STEP_ID, VR::SH, VM1, "ScheduledProcedureStepID", "Scheduled Procedure Step ID"),
    e(SCHEDULED_STATION_NAME, VR::SH, VM1N, "ScheduledStationName", "Scheduled Station Name"),
    e(SCHEDULED_PROCEDURE_STEP_SEQUENCE, VR::SQ, VM1, "ScheduledProcedureStepSequence", "Scheduled Procedure Step Sequence"),
    e(REQUESTED_PROCEDURE_ID, VR::SH, VM1, "RequestedProcedureID", "Requested Procedure ID"),
    e(REQUESTED_PROCEDURE_PRIORITY, VR::CS, VM1, "RequestedProcedurePriority", "Requested Procedure Priority"),
    // digital signatures
    e(MAC_ID_NUMBER, VR::US, VM1, "MACIDNumber", "MAC ID Number"),
    e(MAC_CALCULATION_TRANSFER_SYNTAX_UID, VR::UI, VM1, "MACCalculationTransferSyntaxUID", "MAC Calculation Transfer Syntax UID"),
    e(MAC_ALGORITHM, VR::CS, VM1, "MACAlgorithm", "MAC Algorithm"),
    e(DATA_ELEMENTS_SIGNED, VR::AT, VM1N, "DataElementsSigned", "Data Elements Signed"),
    e(DIGITAL_SIGNATURE_UID, VR::UI, VM1, "DigitalSignatureUID", "Digital Signature UID"),
    e(DIGITAL_SIGNATURE_DATE_TIME, VR::DT, VM1, "DigitalSignatureDateTime", "Digital Signature DateTime"),
    e(CERTIFICATE_TYPE, VR::CS, VM1, "CertificateType", "Certificate Type"),
    e(CERTIFICATE_OF_SIGNER, VR::OB, VM1, "CertificateOfSigner", "Certificate of Signer"),
    e(SIGNATURE, VR::OB, VM1, "Signature", "Signature"),
    e(DIGITAL_SIGNATURES_SEQUENCE, VR::SQ, VM1, "DigitalSignaturesSequence", "Digital Signatures Sequence"),
    // pixel data
    e(PIXEL_DATA, VR::OW, VM1, "PixelData", "Pixel Data"),
    // sequence framing
    e(ITEM, VR::UN, VM1, "Item", "Item"),
    e(ITEM_DELIMITATION_ITEM, VR::UN, VM1, "ItemDelimitationItem", "Item Delimitation Item"),
    e(SEQUENCE_DELIMITATION_ITEM, VR::UN, VM1, "SequenceDelimitationItem", "Sequence Delimitation Item"),
];
