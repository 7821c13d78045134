//! Error taxonomy of the storage manager.
use crate::metadata::StorageTier;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The backend of a tier failed or is not reachable.
    #[snafu(display("{:?} tier unavailable during {}", tier, operation))]
    TierUnavailable {
        tier: StorageTier,
        operation: &'static str,
        source: std::io::Error,
    },

    /// The tier required by an operation is not configured.
    #[snafu(display("{:?} tier is not configured", tier))]
    TierNotConfigured { tier: StorageTier },

    /// The object is in none of the configured tiers.
    #[snafu(display("Instance `{}` not found in any tier", sop_instance_uid))]
    NotFoundInAnyTier { sop_instance_uid: String },

    /// A migration step failed; the source copy is retained.
    #[snafu(display("Migration of `{}` failed: {}", sop_instance_uid, reason))]
    MigrationFailed {
        sop_instance_uid: String,
        reason: String,
    },

    /// Post-migration verification found differing bytes.
    #[snafu(display(
        "Integrity mismatch for `{}` after copying to {:?}",
        sop_instance_uid,
        tier
    ))]
    IntegrityMismatch {
        sop_instance_uid: String,
        tier: StorageTier,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
