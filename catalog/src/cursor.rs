//! Forward-only result cursors with serializable resumption state.
use crate::error::{InvalidResumeTokenSnafu, Result};
use crate::query::{CatalogQuery, QueryLevel};
use crate::records::CatalogRecord;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

/// A forward-only cursor over one query's materialized result rows.
///
/// The cursor owns its rows and its position; it may be moved freely
/// between threads but must not be shared between them (`Send`, not
/// `Sync`-oriented in use). `serialize` produces an opaque token from
/// which a fresh cursor over the same query can be resumed.
#[derive(Debug, Clone)]
pub struct DatabaseCursor {
    query: CatalogQuery,
    records: Vec<CatalogRecord>,
    position: usize,
}

/// The serialized resumption state of a cursor:
/// the originating query and the absolute row position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeToken {
    pub query: CatalogQuery,
    pub position: usize,
}

impl ResumeToken {
    /// Encode the token as an opaque string.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).context(InvalidResumeTokenSnafu)
    }

    /// Decode a token previously produced by [`encode`][Self::encode].
    pub fn decode(token: &str) -> Result<Self> {
        serde_json::from_str(token).context(InvalidResumeTokenSnafu)
    }
}

impl DatabaseCursor {
    pub(crate) fn new(query: CatalogQuery, records: Vec<CatalogRecord>) -> Self {
        DatabaseCursor {
            query,
            records,
            position: 0,
        }
    }

    /// The hierarchy level of the records this cursor yields.
    pub fn record_type(&self) -> QueryLevel {
        self.query.level()
    }

    /// The query this cursor was opened for.
    pub fn query(&self) -> &CatalogQuery {
        &self.query
    }

    /// Whether more rows remain.
    pub fn has_more(&self) -> bool {
        self.position < self.records.len()
    }

    /// The number of rows remaining.
    pub fn remaining(&self) -> usize {
        self.records.len() - self.position
    }

    /// Fetch the next row, advancing the cursor.
    pub fn fetch_next(&mut self) -> Option<CatalogRecord> {
        let record = self.records.get(self.position).cloned()?;
        self.position += 1;
        Some(record)
    }

    /// Fetch up to `n` rows, advancing the cursor.
    pub fn fetch_batch(&mut self, n: usize) -> Vec<CatalogRecord> {
        let end = (self.position + n).min(self.records.len());
        let batch = self.records[self.position..end].to_vec();
        self.position = end;
        batch
    }

    /// Rewind to the first row.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Produce the opaque resumption token for the current position.
    pub fn serialize(&self) -> Result<String> {
        ResumeToken {
            query: self.query.clone(),
            position: self.position,
        }
        .encode()
    }

    /// Restore the position recorded in a resume token.
    /// Positions beyond the end leave the cursor exhausted.
    pub(crate) fn seek(&mut self, position: usize) {
        self.position = position.min(self.records.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PatientQuery, StudyQuery};
    use crate::records::PatientRecord;
    use chrono::Utc;

    fn patient(pk: i64) -> CatalogRecord {
        CatalogRecord::Patient(PatientRecord {
            pk,
            patient_id: format!("P{:03}", pk),
            patient_name: None,
            birth_date: None,
            sex: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn cursor_over(n: i64) -> DatabaseCursor {
        DatabaseCursor::new(
            CatalogQuery::Patient(PatientQuery::default()),
            (1..=n).map(patient).collect(),
        )
    }

    #[test]
    fn split_batches_equal_one_batch() {
        let mut split = cursor_over(10);
        let mut first = split.fetch_batch(4);
        first.extend(split.fetch_batch(6));

        let mut whole = cursor_over(10);
        let all = whole.fetch_batch(10);
        assert_eq!(first, all);
        assert!(!split.has_more());
    }

    #[test]
    fn fetch_next_advances_one_row() {
        let mut cursor = cursor_over(2);
        assert!(cursor.has_more());
        assert!(cursor.fetch_next().is_some());
        assert_eq!(cursor.remaining(), 1);
        assert!(cursor.fetch_next().is_some());
        assert!(cursor.fetch_next().is_none());
        assert!(!cursor.has_more());
    }

    #[test]
    fn reset_rewinds() {
        let mut cursor = cursor_over(3);
        cursor.fetch_batch(3);
        assert!(!cursor.has_more());
        cursor.reset();
        assert_eq!(cursor.remaining(), 3);
    }

    #[test]
    fn resume_token_round_trip() {
        let mut cursor = cursor_over(5);
        cursor.fetch_batch(2);
        let token = cursor.serialize().unwrap();
        let decoded = ResumeToken::decode(&token).unwrap();
        assert_eq!(decoded.position, 2);
        assert!(matches!(decoded.query, CatalogQuery::Patient(_)));
    }

    #[test]
    fn record_type_follows_query_level() {
        let cursor = DatabaseCursor::new(CatalogQuery::Study(StudyQuery::default()), Vec::new());
        assert_eq!(cursor.record_type(), QueryLevel::Study);
    }
}
