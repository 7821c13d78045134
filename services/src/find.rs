//! C-FIND over the query/retrieve information models: translation
//! between C-FIND identifiers and typed catalog queries, and the
//! pending-response stream.
use crate::command::{find_rsp, status};
use crate::error::{AssociationSnafu, CatalogSnafu, Result};
use pacs_catalog::query::{
    CatalogQuery, DateRange, InstanceQuery, Page, PatientQuery, QueryLevel, SeriesQuery,
    StudyQuery,
};
use pacs_catalog::{Catalog, QueryResultStream};
use pacs_core::dictionary::tags;
use pacs_core::{DataSet, Tag, VR};
use pacs_encoding::encode_data_set;
use pacs_encoding::transfer_syntax::TransferSyntax;
use pacs_ul::association::{Association, AssociationEvent, PDataSegment};
use snafu::ResultExt;
use std::time::Duration;
use tracing::{debug, warn};

/// Page size of the response stream; also the cancel-check granularity.
const STREAM_PAGE: usize = 16;

/// How long to poll for a C-CANCEL between pending responses.
const CANCEL_POLL: Duration = Duration::from_millis(1);

/// A present, non-empty key; an empty or absent element is a
/// universal match.
fn key(identifier: &DataSet, tag: Tag) -> Option<String> {
    identifier.get_str(tag).filter(|s| !s.is_empty())
}

fn date_key(identifier: &DataSet, tag: Tag) -> Option<DateRange> {
    key(identifier, tag)
        .map(|s| DateRange::parse(&s))
        .filter(|r| !r.is_empty())
}

/// Translate a C-FIND identifier into a typed catalog query.
/// The Query/Retrieve Level element selects the hierarchy level;
/// a missing level queries studies.
pub fn query_from_identifier(identifier: &DataSet) -> CatalogQuery {
    let level = identifier
        .get_str(tags::QUERY_RETRIEVE_LEVEL)
        .and_then(|s| s.parse::<QueryLevel>().ok())
        .unwrap_or(QueryLevel::Study);
    // C-FIND result sets are not client-paginated
    let page = Page {
        limit: Some(pacs_catalog::query::MAX_LIMIT),
        offset: None,
    };
    match level {
        QueryLevel::Patient => CatalogQuery::Patient(PatientQuery {
            patient_id: key(identifier, tags::PATIENT_ID),
            patient_name: key(identifier, tags::PATIENT_NAME),
            birth_date: date_key(identifier, tags::PATIENT_BIRTH_DATE),
            sex: key(identifier, tags::PATIENT_SEX),
            page,
        }),
        QueryLevel::Study => CatalogQuery::Study(StudyQuery {
            study_instance_uid: key(identifier, tags::STUDY_INSTANCE_UID),
            patient_id: key(identifier, tags::PATIENT_ID),
            patient_name: key(identifier, tags::PATIENT_NAME),
            accession_number: key(identifier, tags::ACCESSION_NUMBER),
            study_date: date_key(identifier, tags::STUDY_DATE),
            description: key(identifier, tags::STUDY_DESCRIPTION),
            modality: key(identifier, tags::MODALITIES_IN_STUDY),
            page,
        }),
        QueryLevel::Series => CatalogQuery::Series(SeriesQuery {
            study_instance_uid: key(identifier, tags::STUDY_INSTANCE_UID),
            series_instance_uid: key(identifier, tags::SERIES_INSTANCE_UID),
            modality: key(identifier, tags::MODALITY),
            body_part_examined: key(identifier, tags::BODY_PART_EXAMINED),
            page,
        }),
        QueryLevel::Instance => CatalogQuery::Instance(InstanceQuery {
            series_instance_uid: key(identifier, tags::SERIES_INSTANCE_UID),
            sop_instance_uid: key(identifier, tags::SOP_INSTANCE_UID),
            sop_class_uid: key(identifier, tags::SOP_CLASS_UID),
            page,
        }),
    }
}

/// The level string echoed into every response identifier.
fn level_of(query: &CatalogQuery) -> QueryLevel {
    query.level()
}

/// Stream the matches of a query as pending C-FIND responses.
///
/// Every response carries one matched record as its identifier. A
/// C-CANCEL arriving between responses stops the stream with a Cancel
/// status; exhaustion ends it with Success. Records that fail to
/// encode are skipped with a warning and the stream continues.
pub fn respond(
    assoc: &mut Association,
    presentation_context_id: u8,
    message_id: u16,
    sop_class_uid: &str,
    identifier: &DataSet,
    catalog: &Catalog,
    ts: &TransferSyntax,
) -> Result<()> {
    let query = query_from_identifier(identifier);
    let level = level_of(&query);
    let mut stream = QueryResultStream::open(catalog, query, STREAM_PAGE)
        .context(CatalogSnafu)?;

    let mut sent = 0usize;
    while let Some(batch) = stream.next_batch() {
        for mut match_ds in batch {
            // a cancel may arrive between any two pending responses
            if let Some(event) = assoc.try_next_event(CANCEL_POLL).context(AssociationSnafu)? {
                match event {
                    AssociationEvent::Segment(PDataSegment::Command { data, .. })
                        if is_cancel(&data) =>
                    {
                        debug!("C-FIND cancelled by peer after {} responses", sent);
                        let rsp = find_rsp(message_id, sop_class_uid, status::CANCEL, false);
                        assoc
                            .send_command(presentation_context_id, &rsp.to_bytes()?)
                            .context(AssociationSnafu)?;
                        return Ok(());
                    }
                    AssociationEvent::Aborted(_) => return Ok(()),
                    other => {
                        debug!("ignoring event during C-FIND stream: {:?}", other);
                    }
                }
            }

            match_ds.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, &level.to_string());
            let identifier_bytes = match encode_data_set(&match_ds, ts) {
                Ok(bytes) => bytes,
                Err(e) => {
                    // skip the record, keep the stream alive
                    warn!("skipping unencodable match: {}", e);
                    continue;
                }
            };
            let rsp = find_rsp(message_id, sop_class_uid, status::PENDING, true);
            assoc
                .send_command(presentation_context_id, &rsp.to_bytes()?)
                .context(AssociationSnafu)?;
            assoc
                .send_data(presentation_context_id, &identifier_bytes)
                .context(AssociationSnafu)?;
            sent += 1;
        }
    }

    let rsp = find_rsp(message_id, sop_class_uid, status::SUCCESS, false);
    assoc
        .send_command(presentation_context_id, &rsp.to_bytes()?)
        .context(AssociationSnafu)?;
    debug!("C-FIND complete with {} matches", sent);
    Ok(())
}

/// Whether raw command bytes are a C-CANCEL.
pub fn is_cancel(command_bytes: &[u8]) -> bool {
    crate::command::CommandSet::parse(command_bytes)
        .ok()
        .and_then(|cmd| cmd.command_field().ok())
        .map_or(false, |field| field == crate::command::command_field::C_CANCEL_RQ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_level_selects_the_query_type() {
        let mut identifier = DataSet::new();
        identifier.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, "SERIES");
        identifier.put_str(tags::STUDY_INSTANCE_UID, VR::UI, "1.2.3");
        identifier.put_str(tags::MODALITY, VR::CS, "CT");
        match query_from_identifier(&identifier) {
            CatalogQuery::Series(q) => {
                assert_eq!(q.study_instance_uid.as_deref(), Some("1.2.3"));
                assert_eq!(q.modality.as_deref(), Some("CT"));
            }
            other => panic!("wrong level: {:?}", other),
        }
    }

    #[test]
    fn empty_keys_are_universal_matches() {
        let mut identifier = DataSet::new();
        identifier.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, "STUDY");
        identifier.put_str(tags::PATIENT_NAME, VR::PN, "");
        identifier.put_str(tags::PATIENT_ID, VR::LO, "P001");
        match query_from_identifier(&identifier) {
            CatalogQuery::Study(q) => {
                assert!(q.patient_name.is_none());
                assert_eq!(q.patient_id.as_deref(), Some("P001"));
            }
            other => panic!("wrong level: {:?}", other),
        }
    }

    #[test]
    fn date_ranges_parse_from_identifier_values() {
        let mut identifier = DataSet::new();
        identifier.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, "STUDY");
        identifier.put_str(tags::STUDY_DATE, VR::DA, "20240101-20240301");
        match query_from_identifier(&identifier) {
            CatalogQuery::Study(q) => {
                let range = q.study_date.unwrap();
                assert_eq!(range.from.as_deref(), Some("20240101"));
                assert_eq!(range.to.as_deref(), Some("20240301"));
            }
            other => panic!("wrong level: {:?}", other),
        }
    }

    #[test]
    fn missing_level_defaults_to_study() {
        let identifier = DataSet::new();
        assert!(matches!(
            query_from_identifier(&identifier),
            CatalogQuery::Study(_)
        ));
    }

    #[test]
    fn cancel_detection() {
        let mut ds = DataSet::new();
        ds.put(pacs_core::DataElement::from_u16(
            tags::COMMAND_FIELD,
            VR::US,
            crate::command::command_field::C_CANCEL_RQ,
        ));
        ds.put(pacs_core::DataElement::from_u16(
            tags::COMMAND_DATA_SET_TYPE,
            VR::US,
            0x0101,
        ));
        let bytes = crate::command::CommandSet(ds).to_bytes().unwrap();
        assert!(is_cancel(&bytes));
        assert!(!is_cancel(&[1, 2, 3]));
    }
}
