//! The unified storage facade over the configured tiers.
use crate::backend::{ObjectQuery, StoredInstance, TierBackend};
use crate::error::{
    IntegrityMismatchSnafu, NotFoundInAnyTierSnafu, Result, TierNotConfiguredSnafu,
};
use crate::metadata::{StorageTier, TierMetadata};
use crate::policy::TierPolicy;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

/// Behavior switches of the facade.
#[derive(Debug, Clone, Copy)]
pub struct HsmConfig {
    /// record `last_accessed` on every successful retrieve
    pub track_access_time: bool,
    /// re-read and compare after every migration copy
    pub verify_after_migration: bool,
    /// remove the source copy once the destination holds the object
    pub delete_after_migration: bool,
}

impl Default for HsmConfig {
    fn default() -> Self {
        HsmConfig {
            track_access_time: true,
            verify_after_migration: true,
            delete_after_migration: true,
        }
    }
}

/// Unified storage over hot (required), warm and cold (optional) tiers.
///
/// New objects land in the hot tier. Retrieval probes hot, warm, cold
/// and returns the first hit; the tier is never changed by a retrieve.
/// The metadata index takes shared locks on the read path and exclusive
/// locks for migration and removal.
pub struct HsmStorage {
    hot: Box<dyn TierBackend>,
    warm: Option<Box<dyn TierBackend>>,
    cold: Option<Box<dyn TierBackend>>,
    metadata: RwLock<HashMap<String, TierMetadata>>,
    config: HsmConfig,
}

impl HsmStorage {
    /// Build a facade from its tier backends.
    pub fn new(
        hot: Box<dyn TierBackend>,
        warm: Option<Box<dyn TierBackend>>,
        cold: Option<Box<dyn TierBackend>>,
        config: HsmConfig,
    ) -> Self {
        HsmStorage {
            hot,
            warm,
            cold,
            metadata: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Whether a tier has a configured backend.
    pub fn tier_configured(&self, tier: StorageTier) -> bool {
        match tier {
            StorageTier::Hot => true,
            StorageTier::Warm => self.warm.is_some(),
            StorageTier::Cold => self.cold.is_some(),
        }
    }

    fn backend(&self, tier: StorageTier) -> Result<&dyn TierBackend> {
        match tier {
            StorageTier::Hot => Ok(self.hot.as_ref()),
            StorageTier::Warm => self
                .warm
                .as_deref()
                .ok_or_else(|| TierNotConfiguredSnafu { tier }.build()),
            StorageTier::Cold => self
                .cold
                .as_deref()
                .ok_or_else(|| TierNotConfiguredSnafu { tier }.build()),
        }
    }

    /// Store a new object in the hot tier and register its metadata.
    pub fn store(&self, instance: StoredInstance) -> Result<()> {
        let size = instance.bytes.len() as u64;
        self.hot.store(&instance)?;
        let metadata = TierMetadata {
            sop_instance_uid: instance.sop_instance_uid.clone(),
            study_instance_uid: instance.study_instance_uid,
            series_instance_uid: instance.series_instance_uid,
            current_tier: StorageTier::Hot,
            stored_at: Utc::now(),
            last_accessed: None,
            size_bytes: size,
        };
        self.metadata
            .write()
            .insert(instance.sop_instance_uid, metadata);
        Ok(())
    }

    /// Retrieve an object's bytes, probing hot, warm, then cold.
    /// Updates the access time when tracking is enabled; the tier
    /// placement is never changed by a retrieve.
    pub fn retrieve(&self, sop_instance_uid: &str) -> Result<Vec<u8>> {
        let bytes = {
            // shared lock for the whole probe: a migration's tier flip
            // waits for us, so we read the source copy
            let _guard = self.metadata.read();
            self.probe(sop_instance_uid)?
        };
        if self.config.track_access_time {
            if let Some(md) = self.metadata.write().get_mut(sop_instance_uid) {
                md.last_accessed = Some(Utc::now());
            }
        }
        Ok(bytes)
    }

    fn probe(&self, sop_instance_uid: &str) -> Result<Vec<u8>> {
        for tier in StorageTier::PROBE_ORDER {
            let Ok(backend) = self.backend(tier) else {
                continue;
            };
            if backend.exists(sop_instance_uid) {
                return backend.retrieve(sop_instance_uid);
            }
        }
        NotFoundInAnyTierSnafu {
            sop_instance_uid: sop_instance_uid.to_string(),
        }
        .fail()
    }

    /// The tier currently holding the object, per the metadata index.
    pub fn get_tier(&self, sop_instance_uid: &str) -> Option<StorageTier> {
        self.metadata
            .read()
            .get(sop_instance_uid)
            .map(|md| md.current_tier)
    }

    /// A copy of an object's tier metadata.
    pub fn metadata_of(&self, sop_instance_uid: &str) -> Option<TierMetadata> {
        self.metadata.read().get(sop_instance_uid).cloned()
    }

    /// Whether the object exists in any configured tier.
    pub fn exists(&self, sop_instance_uid: &str) -> bool {
        StorageTier::PROBE_ORDER.iter().any(|&tier| {
            self.backend(tier)
                .map(|b| b.exists(sop_instance_uid))
                .unwrap_or(false)
        })
    }

    /// Remove an object from its tier and drop its metadata.
    pub fn remove(&self, sop_instance_uid: &str) -> Result<()> {
        let mut metadata = self.metadata.write();
        let Some(md) = metadata.remove(sop_instance_uid) else {
            return NotFoundInAnyTierSnafu {
                sop_instance_uid: sop_instance_uid.to_string(),
            }
            .fail();
        };
        self.backend(md.current_tier)?.remove(sop_instance_uid)
    }

    /// The SOP instance UIDs matching a query, across all tiers.
    pub fn find(&self, query: &ObjectQuery) -> Vec<String> {
        let mut uids: Vec<String> = StorageTier::PROBE_ORDER
            .iter()
            .filter_map(|&tier| self.backend(tier).ok())
            .flat_map(|backend| backend.find(query))
            .collect();
        uids.sort();
        uids.dedup();
        uids
    }

    /// Move one object to the destination tier:
    /// copy, optionally verify bit-exact, optionally delete the source,
    /// and flip the metadata tier under the exclusive lock.
    pub fn migrate_instance(
        &self,
        sop_instance_uid: &str,
        destination: StorageTier,
    ) -> Result<u64> {
        let md = self
            .metadata_of(sop_instance_uid)
            .ok_or_else(|| {
                NotFoundInAnyTierSnafu {
                    sop_instance_uid: sop_instance_uid.to_string(),
                }
                .build()
            })?;
        let source = md.current_tier;
        if source == destination {
            return Ok(0);
        }

        let source_backend = self.backend(source)?;
        let destination_backend = self.backend(destination)?;

        let bytes = source_backend.retrieve(sop_instance_uid)?;
        let size = bytes.len() as u64;
        destination_backend.store(&StoredInstance {
            study_instance_uid: md.study_instance_uid.clone(),
            series_instance_uid: md.series_instance_uid.clone(),
            sop_instance_uid: sop_instance_uid.to_string(),
            bytes: bytes.clone(),
        })?;

        if self.config.verify_after_migration {
            let copied = destination_backend.retrieve(sop_instance_uid)?;
            if copied != bytes {
                // abort: drop the bad copy, keep the source
                let _ = destination_backend.remove(sop_instance_uid);
                return IntegrityMismatchSnafu {
                    sop_instance_uid: sop_instance_uid.to_string(),
                    tier: destination,
                }
                .fail();
            }
        }

        if self.config.delete_after_migration {
            source_backend.remove(sop_instance_uid)?;
        }

        {
            let mut metadata = self.metadata.write();
            if let Some(md) = metadata.get_mut(sop_instance_uid) {
                md.current_tier = destination;
            }
        }
        debug!(
            "migrated {} from {} to {} ({} bytes)",
            sop_instance_uid, source, destination, size
        );
        Ok(size)
    }

    /// The objects due to move under the given policy, with their
    /// destination tier, in ascending last-activity order.
    pub fn eligible_migrations(&self, policy: &TierPolicy) -> Vec<(TierMetadata, StorageTier)> {
        let warm = self.tier_configured(StorageTier::Warm);
        let cold = self.tier_configured(StorageTier::Cold);
        let metadata = self.metadata.read();
        let mut due: Vec<(TierMetadata, StorageTier)> = metadata
            .values()
            .filter_map(|md| {
                policy
                    .destination(md, warm, cold)
                    .map(|dest| (md.clone(), dest))
            })
            .collect();
        due.sort_by_key(|(md, _)| md.last_activity());
        due
    }

    /// Number of objects tracked by the metadata index.
    pub fn object_count(&self) -> usize {
        self.metadata.read().len()
    }

    /// Overwrite an object's access time. Intended for administrative
    /// tooling and tests exercising age-based policies.
    pub fn set_last_accessed(
        &self,
        sop_instance_uid: &str,
        last_accessed: Option<DateTime<Utc>>,
    ) {
        if let Some(md) = self.metadata.write().get_mut(sop_instance_uid) {
            md.last_accessed = last_accessed;
            info!("backdated access time of {}", sop_instance_uid);
        }
    }

    /// Overwrite an object's store time, companion of
    /// [`set_last_accessed`][Self::set_last_accessed].
    pub fn set_stored_at(&self, sop_instance_uid: &str, stored_at: DateTime<Utc>) {
        if let Some(md) = self.metadata.write().get_mut(sop_instance_uid) {
            md.stored_at = stored_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::FileSystemBackend;

    fn three_tier_storage(dir: &std::path::Path) -> HsmStorage {
        HsmStorage::new(
            Box::new(FileSystemBackend::open(StorageTier::Hot, dir.join("hot")).unwrap()),
            Some(Box::new(
                FileSystemBackend::open(StorageTier::Warm, dir.join("warm")).unwrap(),
            )),
            Some(Box::new(
                FileSystemBackend::open(StorageTier::Cold, dir.join("cold")).unwrap(),
            )),
            HsmConfig::default(),
        )
    }

    fn sample(sop: &str) -> StoredInstance {
        StoredInstance {
            study_instance_uid: "1.2".to_string(),
            series_instance_uid: "1.2.1".to_string(),
            sop_instance_uid: sop.to_string(),
            bytes: format!("object-{}", sop).into_bytes(),
        }
    }

    #[test]
    fn store_lands_in_hot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = three_tier_storage(dir.path());
        storage.store(sample("1.2.3")).unwrap();
        assert_eq!(storage.get_tier("1.2.3"), Some(StorageTier::Hot));
        assert_eq!(storage.retrieve("1.2.3").unwrap(), b"object-1.2.3");
    }

    #[test]
    fn retrieve_probes_across_tiers_and_tracks_access() {
        let dir = tempfile::tempdir().unwrap();
        let storage = three_tier_storage(dir.path());
        storage.store(sample("1.2.3")).unwrap();
        storage
            .migrate_instance("1.2.3", StorageTier::Warm)
            .unwrap();

        assert_eq!(storage.get_tier("1.2.3"), Some(StorageTier::Warm));
        assert_eq!(storage.retrieve("1.2.3").unwrap(), b"object-1.2.3");
        assert!(storage.metadata_of("1.2.3").unwrap().last_accessed.is_some());
    }

    #[test]
    fn migration_preserves_tier_exclusivity() {
        let dir = tempfile::tempdir().unwrap();
        let storage = three_tier_storage(dir.path());
        storage.store(sample("1.2.3")).unwrap();
        let moved = storage
            .migrate_instance("1.2.3", StorageTier::Warm)
            .unwrap();
        assert_eq!(moved, b"object-1.2.3".len() as u64);

        // exactly one tier reports the object
        let holders: Vec<StorageTier> = StorageTier::PROBE_ORDER
            .iter()
            .copied()
            .filter(|&t| {
                storage
                    .backend(t)
                    .map(|b| b.exists("1.2.3"))
                    .unwrap_or(false)
            })
            .collect();
        assert_eq!(holders, vec![StorageTier::Warm]);
    }

    #[test]
    fn migrating_to_the_same_tier_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let storage = three_tier_storage(dir.path());
        storage.store(sample("1.2.3")).unwrap();
        assert_eq!(
            storage.migrate_instance("1.2.3", StorageTier::Hot).unwrap(),
            0
        );
    }

    #[test]
    fn remove_deletes_object_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let storage = three_tier_storage(dir.path());
        storage.store(sample("1.2.3")).unwrap();
        storage.remove("1.2.3").unwrap();
        assert!(!storage.exists("1.2.3"));
        assert!(storage.get_tier("1.2.3").is_none());
        assert!(storage.retrieve("1.2.3").is_err());
    }

    #[test]
    fn find_spans_all_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let storage = three_tier_storage(dir.path());
        storage.store(sample("1.2.3")).unwrap();
        storage.store(sample("1.2.4")).unwrap();
        storage
            .migrate_instance("1.2.4", StorageTier::Cold)
            .unwrap();

        let uids = storage.find(&ObjectQuery {
            study_instance_uid: Some("1.2".to_string()),
            ..Default::default()
        });
        assert_eq!(uids, vec!["1.2.3", "1.2.4"]);
    }
}
