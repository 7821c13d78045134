//! The persistent catalog of the DICOM hierarchy.
//!
//! Four relational levels (patient, study, series, instance) are kept in
//! a SQLite database with unique UID indexes and secondary indexes on
//! the query-filter columns. The crate offers idempotent upserts,
//! DICOM-wildcard searches with pagination, forward-only cursors that
//! can be serialized and resumed, data-set mapping streams for C-FIND,
//! and a parallel query executor with prioritization, timeouts and
//! cancellation.
pub mod cursor;
pub mod db;
pub mod error;
pub mod executor;
pub mod query;
pub mod records;
pub mod schema;
pub mod stream;

pub use crate::cursor::{DatabaseCursor, ResumeToken};
pub use crate::db::{
    Catalog, CatalogStatistics, InstanceAttributes, PatientAttributes, SearchResult,
    SeriesAttributes, StudyAttributes,
};
pub use crate::error::{Error, Result};
pub use crate::executor::{ExecutorStatistics, ParallelQueryExecutor, QueryOutcome, QueryRequest};
pub use crate::query::{
    CatalogQuery, DateRange, InstanceQuery, PatientQuery, QueryLevel, SeriesQuery, StudyQuery,
};
pub use crate::records::{
    CatalogRecord, InstanceRecord, PatientRecord, SeriesRecord, StudyRecord,
};
pub use crate::stream::QueryResultStream;
