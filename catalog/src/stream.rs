//! Streaming of query results as DICOM data sets.
use crate::cursor::{DatabaseCursor, ResumeToken};
use crate::db::Catalog;
use crate::error::Result;
use crate::query::CatalogQuery;
use pacs_core::DataSet;

/// A paging wrapper over a [`DatabaseCursor`] that materializes each
/// batch of records as data sets, mapping indexed columns back to
/// their DICOM attributes.
#[derive(Debug)]
pub struct QueryResultStream {
    cursor: DatabaseCursor,
    page_size: usize,
}

impl QueryResultStream {
    /// Open a stream over a query.
    pub fn open(catalog: &Catalog, query: CatalogQuery, page_size: usize) -> Result<Self> {
        let cursor = catalog.open_cursor(query)?;
        Ok(QueryResultStream { cursor, page_size })
    }

    /// Resume a stream from a token produced by [`suspend`][Self::suspend]
    /// (or by serializing the inner cursor).
    pub fn resume(catalog: &Catalog, token: &str, page_size: usize) -> Result<Self> {
        let token = ResumeToken::decode(token)?;
        let mut cursor = catalog.open_cursor(token.query)?;
        cursor.seek(token.position);
        Ok(QueryResultStream { cursor, page_size })
    }

    /// The next page of data sets, or `None` once exhausted.
    pub fn next_batch(&mut self) -> Option<Vec<DataSet>> {
        if !self.cursor.has_more() {
            return None;
        }
        let batch = self.cursor.fetch_batch(self.page_size);
        Some(batch.iter().map(|record| record.to_data_set()).collect())
    }

    /// Whether more pages remain.
    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }

    /// Serialize the stream position into an opaque resume token.
    pub fn suspend(&self) -> Result<String> {
        self.cursor.serialize()
    }

    /// Access the underlying cursor.
    pub fn cursor(&mut self) -> &mut DatabaseCursor {
        &mut self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PatientAttributes, StudyAttributes};
    use crate::query::{Page, StudyQuery};
    use pacs_core::dictionary::tags;

    fn seeded_catalog(n: usize) -> Catalog {
        let catalog = Catalog::in_memory().unwrap();
        let patient_pk = catalog
            .upsert_patient(&PatientAttributes {
                patient_id: "P001".to_string(),
                patient_name: Some("DOE^JOHN".to_string()),
                ..Default::default()
            })
            .unwrap();
        for i in 0..n {
            catalog
                .upsert_study(
                    patient_pk,
                    &StudyAttributes {
                        study_instance_uid: format!("1.2.3.{}", i),
                        study_date: Some("20240110".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
        }
        catalog
    }

    fn all_studies_query() -> CatalogQuery {
        CatalogQuery::Study(StudyQuery {
            patient_id: Some("P001".to_string()),
            page: Page {
                limit: Some(100),
                offset: None,
            },
            ..Default::default()
        })
    }

    #[test]
    fn batches_map_records_to_data_sets() {
        let catalog = seeded_catalog(5);
        let mut stream = QueryResultStream::open(&catalog, all_studies_query(), 2).unwrap();
        let first = stream.next_batch().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].get_str(tags::PATIENT_ID).unwrap(), "P001");
        assert!(first[0].get_str(tags::STUDY_INSTANCE_UID).is_some());

        let mut total = first.len();
        while let Some(batch) = stream.next_batch() {
            total += batch.len();
        }
        assert_eq!(total, 5);
    }

    #[test]
    fn suspend_and_resume_continue_where_left_off() {
        let catalog = seeded_catalog(6);
        let mut stream = QueryResultStream::open(&catalog, all_studies_query(), 2).unwrap();
        let first = stream.next_batch().unwrap();
        let token = stream.suspend().unwrap();

        let mut resumed = QueryResultStream::resume(&catalog, &token, 2).unwrap();
        let mut rest = Vec::new();
        while let Some(batch) = resumed.next_batch() {
            rest.extend(batch);
        }
        assert_eq!(first.len() + rest.len(), 6);
        // no overlap between the consumed page and the resumed pages
        let first_uid = first[0].get_str(tags::STUDY_INSTANCE_UID).unwrap();
        assert!(rest
            .iter()
            .all(|ds| ds.get_str(tags::STUDY_INSTANCE_UID).unwrap() != first_uid));
    }
}
