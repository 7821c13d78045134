//! The catalog database: idempotent upserts, lookups, wildcard
//! searches and cascade deletion over SQLite.
use crate::cursor::DatabaseCursor;
use crate::error::{
    BackendUnavailableSnafu, DuplicateUidSnafu, Error, NotFoundSnafu, Result,
};
use crate::query::{
    translate_wildcard, CatalogQuery, DateRange, InstanceQuery, Match, PatientQuery, SeriesQuery,
    StudyQuery,
};
use crate::records::{
    CatalogRecord, InstanceRecord, PatientRecord, SeriesRecord, StudyRecord,
};
use crate::schema::SCHEMA;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Attributes accepted by [`Catalog::upsert_patient`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientAttributes {
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
}

/// Attributes accepted by [`Catalog::upsert_study`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyAttributes {
    pub study_instance_uid: String,
    pub study_id: Option<String>,
    pub accession_number: Option<String>,
    pub study_date: Option<String>,
    pub study_time: Option<String>,
    pub description: Option<String>,
    pub referring_physician: Option<String>,
}

/// Attributes accepted by [`Catalog::upsert_series`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesAttributes {
    pub series_instance_uid: String,
    pub modality: Option<String>,
    pub series_number: Option<i64>,
    pub description: Option<String>,
    pub body_part_examined: Option<String>,
}

/// Attributes accepted by [`Catalog::upsert_instance`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceAttributes {
    pub sop_instance_uid: String,
    pub sop_class_uid: String,
    pub instance_number: Option<i64>,
    pub file_path: Option<String>,
    pub size_bytes: i64,
}

/// A page of search results with the un-paginated total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    pub records: Vec<T>,
    pub total: u64,
}

/// Row counts per hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStatistics {
    pub num_patients: u64,
    pub num_studies: u64,
    pub num_series: u64,
    pub num_instances: u64,
}

/// Handle to the catalog database.
///
/// The handle is cheap to clone and safe to share across threads; all
/// statements go through one serialized connection, with WAL journaling
/// so readers of a file-backed catalog are not starved by writers.
#[derive(Debug, Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    /// Open (and create if needed) a catalog at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).context(BackendUnavailableSnafu { operation: "open" })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context(BackendUnavailableSnafu { operation: "open" })?;
        Self::init(conn)
    }

    /// Open an in-memory catalog, for tests and ephemeral use.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context(BackendUnavailableSnafu { operation: "open" })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .context(BackendUnavailableSnafu { operation: "open" })?;
        conn.execute_batch(SCHEMA)
            .context(BackendUnavailableSnafu { operation: "create schema" })?;
        Ok(Catalog {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ------------------------------------------------------------------
    // upserts

    /// Register or refresh a patient, idempotent by patient ID.
    pub fn upsert_patient(&self, attrs: &PatientAttributes) -> Result<i64> {
        let conn = self.conn.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO patients (patient_id, patient_name, birth_date, sex, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT (patient_id) DO UPDATE SET
                patient_name = excluded.patient_name,
                birth_date = excluded.birth_date,
                sex = excluded.sex,
                updated_at = excluded.updated_at",
            rusqlite::params![
                attrs.patient_id,
                attrs.patient_name,
                attrs.birth_date,
                attrs.sex,
                now
            ],
        )
        .context(BackendUnavailableSnafu { operation: "upsert patient" })?;
        let pk = conn
            .query_row(
                "SELECT pk FROM patients WHERE patient_id = ?1",
                [&attrs.patient_id],
                |row| row.get(0),
            )
            .context(BackendUnavailableSnafu { operation: "upsert patient" })?;
        Ok(pk)
    }

    /// Register or refresh a study under a patient,
    /// idempotent by study instance UID.
    pub fn upsert_study(&self, patient_pk: i64, attrs: &StudyAttributes) -> Result<i64> {
        let conn = self.conn.lock();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT patient_pk FROM studies WHERE study_instance_uid = ?1",
                [&attrs.study_instance_uid],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(none_when_missing)
            .context(BackendUnavailableSnafu { operation: "upsert study" })?;
        if let Some(owner) = existing {
            snafu::ensure!(
                owner == patient_pk,
                DuplicateUidSnafu {
                    uid: attrs.study_instance_uid.clone(),
                    parent: "patient",
                }
            );
        }
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO studies (study_instance_uid, patient_pk, study_id, accession_number,
                                  study_date, study_time, description, referring_physician,
                                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT (study_instance_uid) DO UPDATE SET
                study_id = excluded.study_id,
                accession_number = excluded.accession_number,
                study_date = excluded.study_date,
                study_time = excluded.study_time,
                description = excluded.description,
                referring_physician = excluded.referring_physician,
                updated_at = excluded.updated_at",
            rusqlite::params![
                attrs.study_instance_uid,
                patient_pk,
                attrs.study_id,
                attrs.accession_number,
                attrs.study_date,
                attrs.study_time,
                attrs.description,
                attrs.referring_physician,
                now
            ],
        )
        .context(BackendUnavailableSnafu { operation: "upsert study" })?;
        let pk = conn
            .query_row(
                "SELECT pk FROM studies WHERE study_instance_uid = ?1",
                [&attrs.study_instance_uid],
                |row| row.get(0),
            )
            .context(BackendUnavailableSnafu { operation: "upsert study" })?;
        Ok(pk)
    }

    /// Register or refresh a series under a study,
    /// idempotent by series instance UID. Recomputes the study's
    /// series count and modality roll-up.
    pub fn upsert_series(&self, study_pk: i64, attrs: &SeriesAttributes) -> Result<i64> {
        let pk = {
            let conn = self.conn.lock();
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT study_pk FROM series WHERE series_instance_uid = ?1",
                    [&attrs.series_instance_uid],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(none_when_missing)
                .context(BackendUnavailableSnafu { operation: "upsert series" })?;
            if let Some(owner) = existing {
                snafu::ensure!(
                    owner == study_pk,
                    DuplicateUidSnafu {
                        uid: attrs.series_instance_uid.clone(),
                        parent: "study",
                    }
                );
            }
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO series (series_instance_uid, study_pk, modality, series_number,
                                     description, body_part_examined, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT (series_instance_uid) DO UPDATE SET
                    modality = excluded.modality,
                    series_number = excluded.series_number,
                    description = excluded.description,
                    body_part_examined = excluded.body_part_examined,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    attrs.series_instance_uid,
                    study_pk,
                    attrs.modality,
                    attrs.series_number,
                    attrs.description,
                    attrs.body_part_examined,
                    now
                ],
            )
            .context(BackendUnavailableSnafu { operation: "upsert series" })?;
            conn.query_row(
                "SELECT pk FROM series WHERE series_instance_uid = ?1",
                [&attrs.series_instance_uid],
                |row| row.get(0),
            )
            .context(BackendUnavailableSnafu { operation: "upsert series" })?
        };
        self.refresh_study_counts(study_pk)?;
        Ok(pk)
    }

    /// Register or refresh an instance under a series,
    /// idempotent by SOP instance UID. Recomputes the series and study
    /// instance counts.
    pub fn upsert_instance(&self, series_pk: i64, attrs: &InstanceAttributes) -> Result<i64> {
        let (pk, study_pk) = {
            let conn = self.conn.lock();
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT series_pk FROM instances WHERE sop_instance_uid = ?1",
                    [&attrs.sop_instance_uid],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(none_when_missing)
                .context(BackendUnavailableSnafu { operation: "upsert instance" })?;
            if let Some(owner) = existing {
                snafu::ensure!(
                    owner == series_pk,
                    DuplicateUidSnafu {
                        uid: attrs.sop_instance_uid.clone(),
                        parent: "series",
                    }
                );
            }
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO instances (sop_instance_uid, series_pk, sop_class_uid,
                                        instance_number, file_path, size_bytes,
                                        created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT (sop_instance_uid) DO UPDATE SET
                    sop_class_uid = excluded.sop_class_uid,
                    instance_number = excluded.instance_number,
                    file_path = excluded.file_path,
                    size_bytes = excluded.size_bytes,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    attrs.sop_instance_uid,
                    series_pk,
                    attrs.sop_class_uid,
                    attrs.instance_number,
                    attrs.file_path,
                    attrs.size_bytes,
                    now
                ],
            )
            .context(BackendUnavailableSnafu { operation: "upsert instance" })?;
            let pk: i64 = conn
                .query_row(
                    "SELECT pk FROM instances WHERE sop_instance_uid = ?1",
                    [&attrs.sop_instance_uid],
                    |row| row.get(0),
                )
                .context(BackendUnavailableSnafu { operation: "upsert instance" })?;
            let study_pk: i64 = conn
                .query_row(
                    "SELECT study_pk FROM series WHERE pk = ?1",
                    [series_pk],
                    |row| row.get(0),
                )
                .context(BackendUnavailableSnafu { operation: "upsert instance" })?;
            let now2 = Utc::now().to_rfc3339();
            conn.execute(
                "UPDATE series SET
                    num_instances = (SELECT COUNT(*) FROM instances WHERE series_pk = ?1),
                    updated_at = ?2
                 WHERE pk = ?1",
                rusqlite::params![series_pk, now2],
            )
            .context(BackendUnavailableSnafu { operation: "upsert instance" })?;
            (pk, study_pk)
        };
        self.refresh_study_counts(study_pk)?;
        Ok(pk)
    }

    /// Recompute a study's denormalized series/instance counts and its
    /// sorted unique modality roll-up.
    fn refresh_study_counts(&self, study_pk: i64) -> Result<()> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT modality FROM series
                 WHERE study_pk = ?1 AND modality IS NOT NULL
                 ORDER BY modality",
            )
            .context(BackendUnavailableSnafu { operation: "refresh counts" })?;
        let modalities: Vec<String> = stmt
            .query_map([study_pk], |row| row.get(0))
            .context(BackendUnavailableSnafu { operation: "refresh counts" })?
            .collect::<rusqlite::Result<_>>()
            .context(BackendUnavailableSnafu { operation: "refresh counts" })?;
        let roll_up = if modalities.is_empty() {
            None
        } else {
            Some(modalities.join("\\"))
        };
        conn.execute(
            "UPDATE studies SET
                num_series = (SELECT COUNT(*) FROM series WHERE study_pk = ?1),
                num_instances = (SELECT COUNT(*) FROM instances
                                 JOIN series ON instances.series_pk = series.pk
                                 WHERE series.study_pk = ?1),
                modalities_in_study = ?2,
                updated_at = ?3
             WHERE pk = ?1",
            rusqlite::params![study_pk, roll_up, Utc::now().to_rfc3339()],
        )
        .context(BackendUnavailableSnafu { operation: "refresh counts" })?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // lookups

    /// Find a patient by patient ID.
    pub fn find_patient(&self, patient_id: &str) -> Result<PatientRecord> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("{} WHERE patient_id = ?1", PATIENT_SELECT),
            [patient_id],
            map_patient,
        )
        .or_else(|e| missing_as_not_found(e, "patient", patient_id))
    }

    /// Find a study by study instance UID.
    pub fn find_study(&self, study_instance_uid: &str) -> Result<StudyRecord> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("{} WHERE s.study_instance_uid = ?1", STUDY_SELECT),
            [study_instance_uid],
            map_study,
        )
        .or_else(|e| missing_as_not_found(e, "study", study_instance_uid))
    }

    /// Find a series by series instance UID.
    pub fn find_series(&self, series_instance_uid: &str) -> Result<SeriesRecord> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("{} WHERE se.series_instance_uid = ?1", SERIES_SELECT),
            [series_instance_uid],
            map_series,
        )
        .or_else(|e| missing_as_not_found(e, "series", series_instance_uid))
    }

    /// Find an instance by SOP instance UID.
    pub fn find_instance(&self, sop_instance_uid: &str) -> Result<InstanceRecord> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("{} WHERE i.sop_instance_uid = ?1", INSTANCE_SELECT),
            [sop_instance_uid],
            map_instance,
        )
        .or_else(|e| missing_as_not_found(e, "instance", sop_instance_uid))
    }

    /// List the studies of a patient, ascending by primary key.
    pub fn list_studies_for_patient(&self, patient_id: &str) -> Result<Vec<StudyRecord>> {
        let conn = self.conn.lock();
        collect_rows(
            &conn,
            &format!("{} WHERE p.patient_id = ?1 ORDER BY s.pk", STUDY_SELECT),
            [Value::from(patient_id.to_string())],
            map_study,
        )
    }

    /// List the series of a study, ascending by primary key.
    pub fn list_series(&self, study_instance_uid: &str) -> Result<Vec<SeriesRecord>> {
        let conn = self.conn.lock();
        collect_rows(
            &conn,
            &format!(
                "{} WHERE st.study_instance_uid = ?1 ORDER BY se.pk",
                SERIES_SELECT_JOINED
            ),
            [Value::from(study_instance_uid.to_string())],
            map_series,
        )
    }

    /// List the instances of a series, ascending by primary key.
    pub fn list_instances(&self, series_instance_uid: &str) -> Result<Vec<InstanceRecord>> {
        let conn = self.conn.lock();
        collect_rows(
            &conn,
            &format!(
                "{} WHERE se.series_instance_uid = ?1 ORDER BY i.pk",
                INSTANCE_SELECT
            ),
            [Value::from(series_instance_uid.to_string())],
            map_instance,
        )
    }

    // ------------------------------------------------------------------
    // searches

    /// Search patients with DICOM wildcard semantics.
    pub fn search_patients(&self, query: &PatientQuery) -> Result<SearchResult<PatientRecord>> {
        let mut filter = Filter::default();
        filter.push_match("patient_id", &query.patient_id);
        filter.push_match("patient_name", &query.patient_name);
        filter.push_date_range("birth_date", &query.birth_date);
        filter.push_match("sex", &query.sex);
        self.paged_search(
            PATIENT_SELECT,
            "SELECT COUNT(*) FROM patients",
            filter,
            &query.page,
            "pk",
            map_patient,
        )
    }

    /// Search studies with DICOM wildcard semantics.
    pub fn search_studies(&self, query: &StudyQuery) -> Result<SearchResult<StudyRecord>> {
        let mut filter = Filter::default();
        filter.push_match("s.study_instance_uid", &query.study_instance_uid);
        filter.push_match("p.patient_id", &query.patient_id);
        filter.push_match("p.patient_name", &query.patient_name);
        filter.push_match("s.accession_number", &query.accession_number);
        filter.push_date_range("s.study_date", &query.study_date);
        filter.push_match("s.description", &query.description);
        if let Some(modality) = &query.modality {
            filter.push_subquery_match(
                "EXISTS (SELECT 1 FROM series se WHERE se.study_pk = s.pk AND se.modality",
                modality,
            );
        }
        self.paged_search(
            STUDY_SELECT,
            "SELECT COUNT(*) FROM studies s JOIN patients p ON p.pk = s.patient_pk",
            filter,
            &query.page,
            "s.pk",
            map_study,
        )
    }

    /// Search series with DICOM wildcard semantics.
    pub fn search_series(&self, query: &SeriesQuery) -> Result<SearchResult<SeriesRecord>> {
        let mut filter = Filter::default();
        filter.push_match("st.study_instance_uid", &query.study_instance_uid);
        filter.push_match("se.series_instance_uid", &query.series_instance_uid);
        filter.push_match("se.modality", &query.modality);
        filter.push_match("se.body_part_examined", &query.body_part_examined);
        self.paged_search(
            SERIES_SELECT_JOINED,
            "SELECT COUNT(*) FROM series se JOIN studies st ON st.pk = se.study_pk",
            filter,
            &query.page,
            "se.pk",
            map_series,
        )
    }

    /// Search instances with DICOM wildcard semantics.
    pub fn search_instances(&self, query: &InstanceQuery) -> Result<SearchResult<InstanceRecord>> {
        let mut filter = Filter::default();
        filter.push_match("se.series_instance_uid", &query.series_instance_uid);
        filter.push_match("i.sop_instance_uid", &query.sop_instance_uid);
        filter.push_match("i.sop_class_uid", &query.sop_class_uid);
        self.paged_search(
            INSTANCE_SELECT,
            "SELECT COUNT(*) FROM instances i JOIN series se ON se.pk = i.series_pk",
            filter,
            &query.page,
            "i.pk",
            map_instance,
        )
    }

    /// Run a query of any level, yielding level-tagged records.
    pub fn run(&self, query: &CatalogQuery) -> Result<Vec<CatalogRecord>> {
        Ok(match query {
            CatalogQuery::Patient(q) => self
                .search_patients(q)?
                .records
                .into_iter()
                .map(CatalogRecord::Patient)
                .collect(),
            CatalogQuery::Study(q) => self
                .search_studies(q)?
                .records
                .into_iter()
                .map(CatalogRecord::Study)
                .collect(),
            CatalogQuery::Series(q) => self
                .search_series(q)?
                .records
                .into_iter()
                .map(CatalogRecord::Series)
                .collect(),
            CatalogQuery::Instance(q) => self
                .search_instances(q)?
                .records
                .into_iter()
                .map(CatalogRecord::Instance)
                .collect(),
        })
    }

    /// Open a forward-only cursor over a query's full result set.
    ///
    /// Unlike the paginated `search_*` operations, a cursor pages
    /// through the backend internally until the result set is
    /// exhausted, so response streams see every match.
    pub fn open_cursor(&self, query: CatalogQuery) -> Result<DatabaseCursor> {
        use crate::query::{Page, MAX_LIMIT};
        let mut records = Vec::new();
        let mut offset = query.page().effective_offset();
        loop {
            let mut batch_query = query.clone();
            batch_query.set_page(Page {
                limit: Some(MAX_LIMIT),
                offset: Some(offset),
            });
            let batch = self.run(&batch_query)?;
            let got = batch.len() as u32;
            records.extend(batch);
            if got < MAX_LIMIT {
                break;
            }
            offset += got;
        }
        Ok(DatabaseCursor::new(query, records))
    }

    // ------------------------------------------------------------------
    // deletion

    /// Delete a study and everything below it.
    /// Returns the SOP instance UIDs that were removed, so storage
    /// tiers can be cleaned up alongside.
    pub fn delete_study(&self, study_instance_uid: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let sop_uids = collect_rows(
            &conn,
            "SELECT i.sop_instance_uid FROM instances i
             JOIN series se ON se.pk = i.series_pk
             JOIN studies st ON st.pk = se.study_pk
             WHERE st.study_instance_uid = ?1",
            [Value::from(study_instance_uid.to_string())],
            |row| row.get(0),
        )?;
        let deleted = conn
            .execute(
                "DELETE FROM studies WHERE study_instance_uid = ?1",
                [study_instance_uid],
            )
            .context(BackendUnavailableSnafu { operation: "delete study" })?;
        snafu::ensure!(
            deleted > 0,
            NotFoundSnafu {
                level: "study",
                key: study_instance_uid,
            }
        );
        debug!(
            "deleted study {} with {} instances",
            study_instance_uid,
            sop_uids.len()
        );
        Ok(sop_uids)
    }

    /// Row counts per hierarchy level.
    pub fn statistics(&self) -> Result<CatalogStatistics> {
        let conn = self.conn.lock();
        let count = |table: &str| -> Result<u64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .context(BackendUnavailableSnafu { operation: "statistics" })
        };
        Ok(CatalogStatistics {
            num_patients: count("patients")?,
            num_studies: count("studies")?,
            num_series: count("series")?,
            num_instances: count("instances")?,
        })
    }

    fn paged_search<T, F>(
        &self,
        select: &str,
        count_select: &str,
        filter: Filter,
        page: &crate::query::Page,
        order_column: &str,
        map: F,
    ) -> Result<SearchResult<T>>
    where
        F: Fn(&Row) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock();
        let where_clause = filter.where_clause();
        let total: i64 = conn
            .query_row(
                &format!("{} {}", count_select, where_clause),
                rusqlite::params_from_iter(filter.params.iter()),
                |row| row.get(0),
            )
            .context(BackendUnavailableSnafu { operation: "search" })?;
        let sql = format!(
            "{} {} ORDER BY {} LIMIT {} OFFSET {}",
            select,
            where_clause,
            order_column,
            page.effective_limit(),
            page.effective_offset(),
        );
        let records = collect_rows(
            &conn,
            &sql,
            filter.params.clone(),
            map,
        )?;
        Ok(SearchResult {
            records,
            total: total as u64,
        })
    }
}

/// Dynamic WHERE clause builder for the search operations.
#[derive(Debug, Default)]
struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    /// Add a wildcard-aware match on a column.
    fn push_match(&mut self, column: &str, key: &Option<String>) {
        let Some(key) = key else { return };
        match translate_wildcard(key) {
            Match::Exact(value) => {
                self.clauses.push(format!("{} = ?", column));
                self.params.push(Value::from(value));
            }
            Match::Like(pattern) => {
                self.clauses
                    .push(format!("{} LIKE ? ESCAPE '\\'", column));
                self.params.push(Value::from(pattern));
            }
        }
    }

    /// Add a wildcard-aware match whose clause prefix is an open
    /// subquery (closed with a parenthesis here).
    fn push_subquery_match(&mut self, prefix: &str, key: &str) {
        match translate_wildcard(key) {
            Match::Exact(value) => {
                self.clauses.push(format!("{} = ?)", prefix));
                self.params.push(Value::from(value));
            }
            Match::Like(pattern) => {
                self.clauses
                    .push(format!("{} LIKE ? ESCAPE '\\')", prefix));
                self.params.push(Value::from(pattern));
            }
        }
    }

    /// Add an inclusive date range on a column.
    fn push_date_range(&mut self, column: &str, range: &Option<DateRange>) {
        let Some(range) = range else { return };
        if let Some(from) = &range.from {
            self.clauses.push(format!("{} >= ?", column));
            self.params.push(Value::from(from.clone()));
        }
        if let Some(to) = &range.to {
            self.clauses.push(format!("{} <= ?", column));
            self.params.push(Value::from(to.clone()));
        }
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

const PATIENT_SELECT: &str = "SELECT pk, patient_id, patient_name, birth_date, sex,
    created_at, updated_at FROM patients";

const STUDY_SELECT: &str = "SELECT s.pk, s.patient_pk, s.study_instance_uid,
    p.patient_id, p.patient_name, s.study_id, s.accession_number, s.study_date,
    s.study_time, s.description, s.referring_physician, s.modalities_in_study,
    s.num_series, s.num_instances, s.created_at, s.updated_at
    FROM studies s JOIN patients p ON p.pk = s.patient_pk";

const SERIES_SELECT: &str = "SELECT se.pk, se.study_pk, se.series_instance_uid,
    st.study_instance_uid, se.modality, se.series_number, se.description,
    se.body_part_examined, se.num_instances, se.created_at, se.updated_at
    FROM series se JOIN studies st ON st.pk = se.study_pk";

// the same projection, named for call sites that add study filters
const SERIES_SELECT_JOINED: &str = SERIES_SELECT;

const INSTANCE_SELECT: &str = "SELECT i.pk, i.series_pk, i.sop_instance_uid,
    se.series_instance_uid, i.sop_class_uid, i.instance_number, i.file_path,
    i.size_bytes, i.created_at, i.updated_at
    FROM instances i JOIN series se ON se.pk = i.series_pk";

fn map_patient(row: &Row) -> rusqlite::Result<PatientRecord> {
    Ok(PatientRecord {
        pk: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        birth_date: row.get(3)?,
        sex: row.get(4)?,
        created_at: timestamp(row, 5)?,
        updated_at: timestamp(row, 6)?,
    })
}

fn map_study(row: &Row) -> rusqlite::Result<StudyRecord> {
    Ok(StudyRecord {
        pk: row.get(0)?,
        patient_pk: row.get(1)?,
        study_instance_uid: row.get(2)?,
        patient_id: row.get(3)?,
        patient_name: row.get(4)?,
        study_id: row.get(5)?,
        accession_number: row.get(6)?,
        study_date: row.get(7)?,
        study_time: row.get(8)?,
        description: row.get(9)?,
        referring_physician: row.get(10)?,
        modalities_in_study: row.get(11)?,
        num_series: row.get(12)?,
        num_instances: row.get(13)?,
        created_at: timestamp(row, 14)?,
        updated_at: timestamp(row, 15)?,
    })
}

fn map_series(row: &Row) -> rusqlite::Result<SeriesRecord> {
    Ok(SeriesRecord {
        pk: row.get(0)?,
        study_pk: row.get(1)?,
        series_instance_uid: row.get(2)?,
        study_instance_uid: row.get(3)?,
        modality: row.get(4)?,
        series_number: row.get(5)?,
        description: row.get(6)?,
        body_part_examined: row.get(7)?,
        num_instances: row.get(8)?,
        created_at: timestamp(row, 9)?,
        updated_at: timestamp(row, 10)?,
    })
}

fn map_instance(row: &Row) -> rusqlite::Result<InstanceRecord> {
    Ok(InstanceRecord {
        pk: row.get(0)?,
        series_pk: row.get(1)?,
        sop_instance_uid: row.get(2)?,
        series_instance_uid: row.get(3)?,
        sop_class_uid: row.get(4)?,
        instance_number: row.get(5)?,
        file_path: row.get(6)?,
        size_bytes: row.get(7)?,
        created_at: timestamp(row, 8)?,
        updated_at: timestamp(row, 9)?,
    })
}

fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn collect_rows<T, F, P>(conn: &Connection, sql: &str, params: P, map: F) -> Result<Vec<T>>
where
    F: Fn(&Row) -> rusqlite::Result<T>,
    P: IntoIterator<Item = Value>,
{
    let mut stmt = conn
        .prepare(sql)
        .context(BackendUnavailableSnafu { operation: "query" })?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), |row| map(row))
        .context(BackendUnavailableSnafu { operation: "query" })?;
    rows.collect::<rusqlite::Result<Vec<T>>>()
        .context(BackendUnavailableSnafu { operation: "query" })
}

fn none_when_missing<T>(e: rusqlite::Error) -> rusqlite::Result<Option<T>> {
    match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    }
}

fn missing_as_not_found<T>(
    e: rusqlite::Error,
    level: &'static str,
    key: &str,
) -> Result<T> {
    match e {
        rusqlite::Error::QueryReturnedNoRows => NotFoundSnafu {
            level,
            key: key.to_string(),
        }
        .fail(),
        other => Err(Error::BackendUnavailable {
            operation: "find",
            source: other,
        }),
    }
}
