//! C-MOVE: destination resolution and sub-operation forwarding.
use crate::command::{move_rsp, status, SubOperations};
use crate::error::{
    AssociationSnafu, CatalogSnafu, Result, UnknownMoveDestinationSnafu,
};
use crate::scu::StoreScu;
use pacs_catalog::{Catalog, InstanceRecord};
use pacs_core::dictionary::tags;
use pacs_core::DataSet;
use pacs_hsm::HsmStorage;
use pacs_ul::association::Association;
use parking_lot::RwLock;
use snafu::ResultExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// The configured AE-title-to-address table for move destinations.
#[derive(Debug, Default)]
pub struct MoveDestinations {
    table: RwLock<HashMap<String, String>>,
}

impl MoveDestinations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a destination AE title with its `host:port` address.
    pub fn insert(&self, ae_title: impl Into<String>, address: impl Into<String>) {
        self.table.write().insert(ae_title.into(), address.into());
    }

    /// Resolve a destination AE title.
    pub fn resolve(&self, ae_title: &str) -> Result<String> {
        self.table
            .read()
            .get(ae_title)
            .cloned()
            .ok_or_else(|| {
                UnknownMoveDestinationSnafu {
                    ae_title: ae_title.to_string(),
                }
                .build()
            })
    }
}

/// Resolve the instances a C-MOVE identifier addresses, by its
/// query/retrieve level.
pub fn collect_instances(catalog: &Catalog, identifier: &DataSet) -> Result<Vec<InstanceRecord>> {
    if let Some(sop_uid) = identifier
        .get_str(tags::SOP_INSTANCE_UID)
        .filter(|s| !s.is_empty())
    {
        return Ok(vec![catalog.find_instance(&sop_uid).context(CatalogSnafu)?]);
    }
    if let Some(series_uid) = identifier
        .get_str(tags::SERIES_INSTANCE_UID)
        .filter(|s| !s.is_empty())
    {
        return catalog.list_instances(&series_uid).context(CatalogSnafu);
    }
    if let Some(study_uid) = identifier
        .get_str(tags::STUDY_INSTANCE_UID)
        .filter(|s| !s.is_empty())
    {
        let mut instances = Vec::new();
        for series in catalog.list_series(&study_uid).context(CatalogSnafu)? {
            instances.extend(
                catalog
                    .list_instances(&series.series_instance_uid)
                    .context(CatalogSnafu)?,
            );
        }
        return Ok(instances);
    }
    Ok(Vec::new())
}

/// Execute the sub-operations of one C-MOVE: for every matched
/// instance, retrieve the stored object and forward it over an
/// outbound C-STORE association, emitting a pending progress response
/// after each sub-operation and a final status at the end.
#[allow(clippy::too_many_arguments)]
pub fn execute_move(
    assoc: &mut Association,
    presentation_context_id: u8,
    message_id: u16,
    sop_class_uid: &str,
    instances: Vec<InstanceRecord>,
    destination_address: &str,
    our_ae_title: &str,
    destination_ae_title: &str,
    hsm: &Arc<HsmStorage>,
) -> Result<()> {
    let total = instances.len() as u16;
    let mut progress = SubOperations {
        remaining: total,
        ..Default::default()
    };

    let mut scu = match StoreScu::connect(
        destination_address,
        our_ae_title,
        destination_ae_title,
        &[],
    ) {
        Ok(scu) => scu,
        Err(e) => {
            warn!("could not reach move destination: {}", e);
            let rsp = move_rsp(
                message_id,
                sop_class_uid,
                status::MOVE_DESTINATION_UNKNOWN,
                progress,
            );
            assoc
                .send_command(presentation_context_id, &rsp.to_bytes()?)
                .context(AssociationSnafu)?;
            return Ok(());
        }
    };

    for instance in instances {
        let sub_result = forward_one(&mut scu, &instance, hsm);
        progress.remaining = progress.remaining.saturating_sub(1);
        match sub_result {
            Ok(()) => progress.completed += 1,
            Err(e) => {
                warn!("sub-operation for {} failed: {}", instance.sop_instance_uid, e);
                progress.failed += 1;
            }
        }
        if progress.remaining > 0 {
            let rsp = move_rsp(message_id, sop_class_uid, status::PENDING, progress);
            assoc
                .send_command(presentation_context_id, &rsp.to_bytes()?)
                .context(AssociationSnafu)?;
        }
    }
    let _ = scu.release();

    let final_status = if progress.failed > 0 {
        status::WARNING_SUBOPS
    } else {
        status::SUCCESS
    };
    let rsp = move_rsp(message_id, sop_class_uid, final_status, progress);
    assoc
        .send_command(presentation_context_id, &rsp.to_bytes()?)
        .context(AssociationSnafu)?;
    info!(
        completed = progress.completed,
        failed = progress.failed,
        "C-MOVE finished"
    );
    Ok(())
}

/// One sub-operation: stored object to destination AE.
fn forward_one(scu: &mut StoreScu, instance: &InstanceRecord, hsm: &Arc<HsmStorage>) -> Result<()> {
    use crate::error::{CodecSnafu, PeerStatusSnafu, StorageSnafu};

    let file_bytes = hsm
        .retrieve(&instance.sop_instance_uid)
        .context(StorageSnafu)?;
    let (_, data_set) = pacs_encoding::part10::from_bytes(&file_bytes)
        .context(CodecSnafu { context: "stored object" })?;
    let rsp_status = scu.store(
        &instance.sop_class_uid,
        &instance.sop_instance_uid,
        &data_set,
    )?;
    if rsp_status != status::SUCCESS {
        return PeerStatusSnafu { status: rsp_status }.fail();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn destinations_resolve_known_ae_titles() {
        let destinations = MoveDestinations::new();
        destinations.insert("WORKSTATION", "10.0.0.5:11112");
        assert_eq!(
            destinations.resolve("WORKSTATION").unwrap(),
            "10.0.0.5:11112"
        );
        assert!(matches!(
            destinations.resolve("NOWHERE").unwrap_err(),
            Error::UnknownMoveDestination { .. }
        ));
    }
}
