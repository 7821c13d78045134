//! SOP class and service UIDs used by the service layer.

/// Verification SOP class (C-ECHO).
pub const VERIFICATION: &str = "1.2.840.10008.1.1";

/// Study Root Query/Retrieve Information Model - FIND.
pub const STUDY_ROOT_QR_FIND: &str = "1.2.840.10008.5.1.4.1.2.2.1";
/// Study Root Query/Retrieve Information Model - MOVE.
pub const STUDY_ROOT_QR_MOVE: &str = "1.2.840.10008.5.1.4.1.2.2.2";
/// Patient Root Query/Retrieve Information Model - FIND.
pub const PATIENT_ROOT_QR_FIND: &str = "1.2.840.10008.5.1.4.1.2.1.1";
/// Patient Root Query/Retrieve Information Model - MOVE.
pub const PATIENT_ROOT_QR_MOVE: &str = "1.2.840.10008.5.1.4.1.2.1.2";

/// Modality Worklist Information Model - FIND.
pub const MODALITY_WORKLIST_FIND: &str = "1.2.840.10008.5.1.4.31";

/// The storage SOP classes this node serves.
pub const STORAGE_SOP_CLASSES: &[&str] = &[
    // CT Image Storage
    "1.2.840.10008.5.1.4.1.1.2",
    // Enhanced CT Image Storage
    "1.2.840.10008.5.1.4.1.1.2.1",
    // MR Image Storage
    "1.2.840.10008.5.1.4.1.1.4",
    // Enhanced MR Image Storage
    "1.2.840.10008.5.1.4.1.1.4.1",
    // Ultrasound Image Storage
    "1.2.840.10008.5.1.4.1.1.6.1",
    // Secondary Capture Image Storage
    "1.2.840.10008.5.1.4.1.1.7",
    // Digital X-Ray Image Storage - For Presentation
    "1.2.840.10008.5.1.4.1.1.1.1",
    // Computed Radiography Image Storage
    "1.2.840.10008.5.1.4.1.1.1",
    // Nuclear Medicine Image Storage
    "1.2.840.10008.5.1.4.1.1.20",
    // Positron Emission Tomography Image Storage
    "1.2.840.10008.5.1.4.1.1.128",
];

/// Whether the UID is one of the storage SOP classes served here.
pub fn is_storage_sop_class(uid: &str) -> bool {
    STORAGE_SOP_CLASSES.contains(&uid.trim_end_matches('\0'))
}
