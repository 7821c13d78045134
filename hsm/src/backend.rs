//! The tier backend capability set.
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A DICOM object handed to a backend for storage:
/// the hierarchy identifiers and the encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredInstance {
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub sop_instance_uid: String,
    pub bytes: Vec<u8>,
}

/// Search keys over the objects held by one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectQuery {
    pub study_instance_uid: Option<String>,
    pub series_instance_uid: Option<String>,
    pub sop_instance_uid: Option<String>,
}

/// Capacity and usage figures of one backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStatistics {
    pub object_count: u64,
    pub total_bytes: u64,
}

/// The result of a backend integrity sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub checked: u64,
    /// SOP instance UIDs whose stored object is missing or unreadable
    pub missing: Vec<String>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

/// The capability set every storage tier implements.
///
/// Concrete backends are a filesystem directory tree or an
/// S3-compatible/Azure blob container; the object store variants plug
/// in behind this same interface and are selected at construction.
pub trait TierBackend: Send + Sync {
    /// Store an object. Overwrites any previous object of the same SOP
    /// instance UID.
    fn store(&self, instance: &StoredInstance) -> Result<()>;

    /// Retrieve an object's bytes by SOP instance UID.
    fn retrieve(&self, sop_instance_uid: &str) -> Result<Vec<u8>>;

    /// Remove an object by SOP instance UID.
    fn remove(&self, sop_instance_uid: &str) -> Result<()>;

    /// Whether an object with this SOP instance UID is present.
    fn exists(&self, sop_instance_uid: &str) -> bool;

    /// The SOP instance UIDs matching the query.
    fn find(&self, query: &ObjectQuery) -> Vec<String>;

    /// Object count and byte usage.
    fn statistics(&self) -> TierStatistics;

    /// Sweep the backend for missing or unreadable objects.
    fn verify_integrity(&self) -> IntegrityReport;
}
