//! Per-instance tier metadata, the record driving migration decisions.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The storage tiers, ordered from fastest to coldest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StorageTier {
    Hot,
    Warm,
    Cold,
}

impl StorageTier {
    /// Probe order for transparent retrieval.
    pub const PROBE_ORDER: [StorageTier; 3] =
        [StorageTier::Hot, StorageTier::Warm, StorageTier::Cold];
}

impl std::fmt::Display for StorageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            StorageTier::Hot => "hot",
            StorageTier::Warm => "warm",
            StorageTier::Cold => "cold",
        };
        f.write_str(name)
    }
}

/// The tier bookkeeping of one stored instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMetadata {
    pub sop_instance_uid: String,
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub current_tier: StorageTier,
    pub stored_at: DateTime<Utc>,
    /// updated on retrieve when access tracking is enabled
    pub last_accessed: Option<DateTime<Utc>>,
    pub size_bytes: u64,
}

impl TierMetadata {
    /// The reference point for age-based policies:
    /// the last access, or the store time when never accessed.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_accessed.unwrap_or(self.stored_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_activity_prefers_access_time() {
        let stored = Utc::now() - chrono::Duration::days(40);
        let accessed = Utc::now() - chrono::Duration::days(2);
        let mut md = TierMetadata {
            sop_instance_uid: "1.2.3".to_string(),
            study_instance_uid: "1.2".to_string(),
            series_instance_uid: "1.2.1".to_string(),
            current_tier: StorageTier::Hot,
            stored_at: stored,
            last_accessed: None,
            size_bytes: 100,
        };
        assert_eq!(md.last_activity(), stored);
        md.last_accessed = Some(accessed);
        assert_eq!(md.last_activity(), accessed);
    }
}
