//! The ingest pipeline behind C-STORE: decode, index, store.
use crate::error::{CatalogSnafu, CodecSnafu, Result, StorageSnafu};
use pacs_catalog::{
    Catalog, InstanceAttributes, InstanceRecord, PatientAttributes, SeriesAttributes,
    StudyAttributes,
};
use pacs_core::dictionary::tags;
use pacs_core::DataSet;
use pacs_encoding::part10::{self, FileMetaTable};
use pacs_encoding::transfer_syntax::TransferSyntax;
use pacs_hsm::{HsmStorage, StoredInstance};
use snafu::ResultExt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Decodes incoming objects, indexes the hierarchy and lands the bytes
/// in the hot tier as Part 10 files.
#[derive(Clone)]
pub struct IngestPipeline {
    catalog: Catalog,
    hsm: Arc<HsmStorage>,
}

impl IngestPipeline {
    pub fn new(catalog: Catalog, hsm: Arc<HsmStorage>) -> Self {
        IngestPipeline { catalog, hsm }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn hsm(&self) -> &Arc<HsmStorage> {
        &self.hsm
    }

    /// Ingest one object from its data set bytes in the given transfer
    /// syntax. The catalog rows are written first; the object is then
    /// committed to the hot tier as a Part 10 file.
    #[instrument(skip_all, fields(ts = ts.uid))]
    pub fn ingest(&self, data_set_bytes: &[u8], ts: &TransferSyntax) -> Result<InstanceRecord> {
        let data_set = pacs_encoding::decode_data_set(data_set_bytes, ts)
            .context(CodecSnafu { context: "instance data set" })?;
        self.ingest_data_set(&data_set, ts)
    }

    /// Ingest an already decoded data set.
    pub fn ingest_data_set(
        &self,
        data_set: &DataSet,
        ts: &TransferSyntax,
    ) -> Result<InstanceRecord> {
        let ids = HierarchyIds::from_data_set(data_set);

        let patient_pk = self
            .catalog
            .upsert_patient(&PatientAttributes {
                patient_id: ids.patient_id.clone(),
                patient_name: data_set.get_str(tags::PATIENT_NAME),
                birth_date: data_set.get_str(tags::PATIENT_BIRTH_DATE),
                sex: data_set.get_str(tags::PATIENT_SEX),
            })
            .context(CatalogSnafu)?;
        let study_pk = self
            .catalog
            .upsert_study(
                patient_pk,
                &StudyAttributes {
                    study_instance_uid: ids.study_instance_uid.clone(),
                    study_id: data_set.get_str(tags::STUDY_ID),
                    accession_number: data_set.get_str(tags::ACCESSION_NUMBER),
                    study_date: data_set.get_str(tags::STUDY_DATE),
                    study_time: data_set.get_str(tags::STUDY_TIME),
                    description: data_set.get_str(tags::STUDY_DESCRIPTION),
                    referring_physician: data_set.get_str(tags::REFERRING_PHYSICIAN_NAME),
                },
            )
            .context(CatalogSnafu)?;
        let series_pk = self
            .catalog
            .upsert_series(
                study_pk,
                &SeriesAttributes {
                    series_instance_uid: ids.series_instance_uid.clone(),
                    modality: data_set.get_str(tags::MODALITY),
                    series_number: parse_int(data_set, tags::SERIES_NUMBER),
                    description: data_set.get_str(tags::SERIES_DESCRIPTION),
                    body_part_examined: data_set.get_str(tags::BODY_PART_EXAMINED),
                },
            )
            .context(CatalogSnafu)?;

        // commit the object as a Part 10 file image in the hot tier
        let meta = FileMetaTable::new(
            ids.sop_class_uid.clone(),
            ids.sop_instance_uid.clone(),
            ts.uid,
        );
        let file_bytes = part10::to_bytes(&meta, data_set)
            .context(CodecSnafu { context: "part 10 image" })?;
        let size_bytes = file_bytes.len() as i64;
        self.hsm
            .store(StoredInstance {
                study_instance_uid: ids.study_instance_uid.clone(),
                series_instance_uid: ids.series_instance_uid.clone(),
                sop_instance_uid: ids.sop_instance_uid.clone(),
                bytes: file_bytes,
            })
            .context(StorageSnafu)?;

        self.catalog
            .upsert_instance(
                series_pk,
                &InstanceAttributes {
                    sop_instance_uid: ids.sop_instance_uid.clone(),
                    sop_class_uid: ids.sop_class_uid,
                    instance_number: parse_int(data_set, tags::INSTANCE_NUMBER),
                    file_path: None,
                    size_bytes,
                },
            )
            .context(CatalogSnafu)?;

        let record = self
            .catalog
            .find_instance(&ids.sop_instance_uid)
            .context(CatalogSnafu)?;
        info!(
            sop = %record.sop_instance_uid,
            series = %record.series_instance_uid,
            "ingested instance"
        );
        Ok(record)
    }

    /// Remove a whole study: catalog rows and stored objects.
    pub fn delete_study(&self, study_instance_uid: &str) -> Result<Vec<String>> {
        let removed = self
            .catalog
            .delete_study(study_instance_uid)
            .context(CatalogSnafu)?;
        for sop in &removed {
            if let Err(e) = self.hsm.remove(sop) {
                tracing::warn!("stored object {} not removed: {}", sop, e);
            }
        }
        Ok(removed)
    }
}

/// The identifiers that place an instance in the hierarchy.
struct HierarchyIds {
    patient_id: String,
    study_instance_uid: String,
    series_instance_uid: String,
    sop_instance_uid: String,
    sop_class_uid: String,
}

impl HierarchyIds {
    fn from_data_set(data_set: &DataSet) -> Self {
        // objects without a patient ID are filed under a well-known
        // placeholder so the hierarchy stays navigable
        HierarchyIds {
            patient_id: data_set
                .get_str(tags::PATIENT_ID)
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            study_instance_uid: data_set
                .get_str(tags::STUDY_INSTANCE_UID)
                .unwrap_or_default(),
            series_instance_uid: data_set
                .get_str(tags::SERIES_INSTANCE_UID)
                .unwrap_or_default(),
            sop_instance_uid: data_set
                .get_str(tags::SOP_INSTANCE_UID)
                .unwrap_or_default(),
            sop_class_uid: data_set.get_str(tags::SOP_CLASS_UID).unwrap_or_default(),
        }
    }
}

fn parse_int(data_set: &DataSet, tag: pacs_core::Tag) -> Option<i64> {
    data_set.get_str(tag).and_then(|s| s.trim().parse().ok())
}
