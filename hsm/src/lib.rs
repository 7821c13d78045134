//! Hierarchical storage management for stored DICOM objects.
//!
//! A [`HsmStorage`] facade unifies up to three tier backends (hot
//! required, warm and cold optional): new objects land in the hot tier,
//! retrieval transparently probes hot, warm, then cold, and a
//! background [`MigrationService`] moves aging objects down the tiers
//! according to a [`TierPolicy`].
pub mod backend;
pub mod error;
pub mod filesystem;
pub mod metadata;
pub mod migration;
pub mod policy;
pub mod storage;

pub use crate::backend::{ObjectQuery, StoredInstance, TierBackend, TierStatistics};
pub use crate::error::{Error, Result};
pub use crate::filesystem::FileSystemBackend;
pub use crate::metadata::{StorageTier, TierMetadata};
pub use crate::migration::{MigrationConfig, MigrationResult, MigrationService};
pub use crate::policy::TierPolicy;
pub use crate::storage::{HsmConfig, HsmStorage};
