//! The semantic REST surface over the catalog and the object store.
//!
//! Transport plumbing (routing, JSON framing) lives outside this
//! crate; these endpoint methods define the contracts: resource
//! lookups, paginated listings with a `{data, pagination}` envelope,
//! cascade deletion, and raw object access with WADO-RS semantics.
use crate::store::IngestPipeline;
use pacs_catalog::query::{InstanceQuery, Page as QueryPage, SeriesQuery, StudyQuery};
use pacs_catalog::{
    Catalog, CatalogStatistics, InstanceRecord, SeriesRecord, StudyRecord,
};
use pacs_hsm::HsmStorage;
use serde::Serialize;
use std::sync::Arc;

/// Pagination figures of a listing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// matches before pagination
    pub total: u64,
    /// records in this page
    pub count: u64,
}

/// The listing envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    fn of(records: Vec<T>, total: u64) -> Self {
        let count = records.len() as u64;
        Page {
            data: records,
            pagination: Pagination { total, count },
        }
    }
}

/// A REST-level error with its HTTP-equivalent status code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestError {
    pub error_code: u16,
    pub message: String,
}

impl RestError {
    fn not_found(message: String) -> Self {
        RestError {
            error_code: 404,
            message,
        }
    }

    fn internal(message: String) -> Self {
        RestError {
            error_code: 500,
            message,
        }
    }

    fn from_catalog(error: pacs_catalog::Error) -> Self {
        match error {
            e @ pacs_catalog::Error::NotFound { .. } => Self::not_found(e.to_string()),
            e => Self::internal(e.to_string()),
        }
    }
}

impl std::fmt::Display for RestError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.error_code)
    }
}

pub type RestResult<T> = std::result::Result<T, RestError>;

/// The endpoint implementations behind the REST routes.
pub struct RestApi {
    ingest: IngestPipeline,
}

impl RestApi {
    pub fn new(catalog: Catalog, hsm: Arc<HsmStorage>) -> Self {
        RestApi {
            ingest: IngestPipeline::new(catalog, hsm),
        }
    }

    fn catalog(&self) -> &Catalog {
        self.ingest.catalog()
    }

    /// `GET /studies?query` — paginated study search.
    pub fn list_studies(&self, query: &StudyQuery) -> RestResult<Page<StudyRecord>> {
        let result = self
            .catalog()
            .search_studies(query)
            .map_err(RestError::from_catalog)?;
        Ok(Page::of(result.records, result.total))
    }

    /// `GET /studies/{uid}` — one study record.
    pub fn get_study(&self, study_instance_uid: &str) -> RestResult<StudyRecord> {
        self.catalog()
            .find_study(study_instance_uid)
            .map_err(RestError::from_catalog)
    }

    /// `GET /studies/{uid}/series` — the series of a study.
    pub fn list_series(
        &self,
        study_instance_uid: &str,
        page: QueryPage,
    ) -> RestResult<Page<SeriesRecord>> {
        // a listing under a missing study is a 404, not an empty page
        self.get_study(study_instance_uid)?;
        let result = self
            .catalog()
            .search_series(&SeriesQuery {
                study_instance_uid: Some(study_instance_uid.to_string()),
                page,
                ..Default::default()
            })
            .map_err(RestError::from_catalog)?;
        Ok(Page::of(result.records, result.total))
    }

    /// `GET /series/{uid}/instances` — the instances of a series.
    pub fn list_instances(
        &self,
        series_instance_uid: &str,
        page: QueryPage,
    ) -> RestResult<Page<InstanceRecord>> {
        self.catalog()
            .find_series(series_instance_uid)
            .map_err(RestError::from_catalog)?;
        let result = self
            .catalog()
            .search_instances(&InstanceQuery {
                series_instance_uid: Some(series_instance_uid.to_string()),
                page,
                ..Default::default()
            })
            .map_err(RestError::from_catalog)?;
        Ok(Page::of(result.records, result.total))
    }

    /// `DELETE /studies/{uid}` — cascade delete of catalog rows and
    /// stored objects.
    pub fn delete_study(&self, study_instance_uid: &str) -> RestResult<u64> {
        let removed = self
            .ingest
            .delete_study(study_instance_uid)
            .map_err(|e| match e {
                crate::Error::Catalog { source } => RestError::from_catalog(source),
                other => RestError::internal(other.to_string()),
            })?;
        Ok(removed.len() as u64)
    }

    /// `GET /instances/{uid}` — the raw stored DICOM bytes
    /// (WADO-RS semantics).
    pub fn instance_bytes(&self, sop_instance_uid: &str) -> RestResult<Vec<u8>> {
        // confirm the instance is indexed before touching storage
        self.catalog()
            .find_instance(sop_instance_uid)
            .map_err(RestError::from_catalog)?;
        self.ingest
            .hsm()
            .retrieve(sop_instance_uid)
            .map_err(|e| RestError::not_found(e.to_string()))
    }

    /// `GET /statistics` — row counts per hierarchy level.
    pub fn statistics(&self) -> RestResult<CatalogStatistics> {
        self.catalog()
            .statistics()
            .map_err(RestError::from_catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacs_core::dictionary::tags;
    use pacs_core::{DataSet, VR};
    use pacs_encoding::transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN;
    use pacs_hsm::{FileSystemBackend, HsmConfig, StorageTier};

    fn api_with_data(dir: &std::path::Path, studies: usize) -> RestApi {
        let hsm = Arc::new(HsmStorage::new(
            Box::new(FileSystemBackend::open(StorageTier::Hot, dir.join("hot")).unwrap()),
            None,
            None,
            HsmConfig::default(),
        ));
        let catalog = Catalog::in_memory().unwrap();
        let pipeline = IngestPipeline::new(catalog.clone(), Arc::clone(&hsm));
        for s in 0..studies {
            let mut ds = DataSet::new();
            ds.put_str(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.2");
            ds.put_str(tags::SOP_INSTANCE_UID, VR::UI, &format!("1.2.{}.1.1", s));
            ds.put_str(tags::STUDY_INSTANCE_UID, VR::UI, &format!("1.2.{}", s));
            ds.put_str(tags::SERIES_INSTANCE_UID, VR::UI, &format!("1.2.{}.1", s));
            ds.put_str(tags::PATIENT_ID, VR::LO, "P001");
            ds.put_str(tags::MODALITY, VR::CS, "CT");
            pipeline
                .ingest_data_set(&ds, &EXPLICIT_VR_LITTLE_ENDIAN)
                .unwrap();
        }
        RestApi::new(catalog, hsm)
    }

    #[test]
    fn study_listing_uses_the_pagination_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_with_data(dir.path(), 25);
        let page = api
            .list_studies(&StudyQuery {
                patient_id: Some("P001".to_string()),
                ..Default::default()
            })
            .unwrap();
        // default page size 20 out of 25 matches
        assert_eq!(page.pagination.count, 20);
        assert_eq!(page.pagination.total, 25);
        assert_eq!(page.data.len(), 20);
    }

    #[test]
    fn missing_resources_are_404() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_with_data(dir.path(), 1);
        assert_eq!(api.get_study("9.9.9").unwrap_err().error_code, 404);
        assert_eq!(
            api.list_series("9.9.9", QueryPage::default())
                .unwrap_err()
                .error_code,
            404
        );
        assert_eq!(api.instance_bytes("9.9.9").unwrap_err().error_code, 404);
    }

    #[test]
    fn wado_bytes_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_with_data(dir.path(), 1);
        let bytes = api.instance_bytes("1.2.0.1.1").unwrap();
        let (meta, _) = pacs_encoding::part10::from_bytes(&bytes).unwrap();
        assert_eq!(meta.media_storage_sop_instance_uid, "1.2.0.1.1");
    }

    #[test]
    fn delete_study_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_with_data(dir.path(), 2);
        assert_eq!(api.delete_study("1.2.0").unwrap(), 1);
        assert_eq!(api.get_study("1.2.0").unwrap_err().error_code, 404);
        assert!(api.get_study("1.2.1").is_ok());
        assert_eq!(api.statistics().unwrap().num_studies, 1);
    }
}
