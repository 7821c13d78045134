//! Age-based tier migration policy.
use crate::metadata::{StorageTier, TierMetadata};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The migration policy: when objects move down the tiers and how much
/// a single cycle may move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// idle age after which a hot object moves to warm
    pub hot_to_warm_age: Duration,
    /// idle age after which a warm object moves to cold
    pub warm_to_cold_age: Duration,
    /// objects below this size stay in the hot tier
    pub min_migration_size: u64,
    /// cap on objects moved per cycle
    pub max_instances_per_cycle: u64,
    /// cap on bytes moved per cycle
    pub max_bytes_per_cycle: u64,
    /// whether the background service runs cycles on its own
    pub auto_migrate: bool,
}

impl Default for TierPolicy {
    fn default() -> Self {
        TierPolicy {
            hot_to_warm_age: Duration::from_secs(30 * 24 * 3600),
            warm_to_cold_age: Duration::from_secs(90 * 24 * 3600),
            min_migration_size: 0,
            max_instances_per_cycle: 1000,
            max_bytes_per_cycle: 10 * 1024 * 1024 * 1024,
            auto_migrate: true,
        }
    }
}

impl TierPolicy {
    /// Decide the destination tier for an object, if it is due to move.
    ///
    /// `warm_configured`/`cold_configured` describe the facade: a hot
    /// object skips straight to cold when no warm tier exists, which
    /// requires the sum of both age thresholds.
    pub fn destination(
        &self,
        metadata: &TierMetadata,
        warm_configured: bool,
        cold_configured: bool,
    ) -> Option<StorageTier> {
        let idle = (Utc::now() - metadata.last_activity())
            .to_std()
            .unwrap_or(Duration::ZERO);
        match metadata.current_tier {
            StorageTier::Hot => {
                if metadata.size_bytes < self.min_migration_size {
                    return None;
                }
                if warm_configured {
                    (idle >= self.hot_to_warm_age).then_some(StorageTier::Warm)
                } else if cold_configured {
                    (idle >= self.hot_to_warm_age + self.warm_to_cold_age)
                        .then_some(StorageTier::Cold)
                } else {
                    None
                }
            }
            StorageTier::Warm => {
                if cold_configured {
                    (idle >= self.warm_to_cold_age).then_some(StorageTier::Cold)
                } else {
                    None
                }
            }
            StorageTier::Cold => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(tier: StorageTier, idle_days: i64, size: u64) -> TierMetadata {
        let t = Utc::now() - chrono::Duration::days(idle_days);
        TierMetadata {
            sop_instance_uid: "1.2.3".to_string(),
            study_instance_uid: "1.2".to_string(),
            series_instance_uid: "1.2.1".to_string(),
            current_tier: tier,
            stored_at: t,
            last_accessed: Some(t),
            size_bytes: size,
        }
    }

    fn policy(hot_days: u64, warm_days: u64, min_size: u64) -> TierPolicy {
        TierPolicy {
            hot_to_warm_age: Duration::from_secs(hot_days * 24 * 3600),
            warm_to_cold_age: Duration::from_secs(warm_days * 24 * 3600),
            min_migration_size: min_size,
            ..Default::default()
        }
    }

    #[test]
    fn hot_objects_age_into_warm() {
        let p = policy(30, 90, 0);
        assert_eq!(
            p.destination(&metadata(StorageTier::Hot, 31, 10), true, true),
            Some(StorageTier::Warm)
        );
        assert_eq!(
            p.destination(&metadata(StorageTier::Hot, 29, 10), true, true),
            None
        );
    }

    #[test]
    fn small_objects_stay_hot() {
        let p = policy(30, 90, 1024);
        assert_eq!(
            p.destination(&metadata(StorageTier::Hot, 31, 512), true, true),
            None
        );
        assert_eq!(
            p.destination(&metadata(StorageTier::Hot, 31, 2048), true, true),
            Some(StorageTier::Warm)
        );
    }

    #[test]
    fn hot_skips_to_cold_without_a_warm_tier() {
        let p = policy(30, 90, 0);
        // needs the sum of both thresholds
        assert_eq!(
            p.destination(&metadata(StorageTier::Hot, 100, 10), false, true),
            None
        );
        assert_eq!(
            p.destination(&metadata(StorageTier::Hot, 121, 10), false, true),
            Some(StorageTier::Cold)
        );
    }

    #[test]
    fn warm_objects_age_into_cold() {
        let p = policy(30, 90, 0);
        assert_eq!(
            p.destination(&metadata(StorageTier::Warm, 91, 10), true, true),
            Some(StorageTier::Cold)
        );
        assert_eq!(
            p.destination(&metadata(StorageTier::Warm, 91, 10), true, false),
            None
        );
    }

    #[test]
    fn cold_objects_never_move() {
        let p = policy(1, 1, 0);
        assert_eq!(
            p.destination(&metadata(StorageTier::Cold, 1000, 10), true, true),
            None
        );
    }
}
