//! The modality worklist: scheduled procedure steps keyed by accession
//! number, matched with DICOM wildcard rules and served over C-FIND.
use crate::error::{Result, WorklistFormatSnafu, WorklistIoSnafu};
use pacs_core::dictionary::tags;
use pacs_core::{DataElement, DataSet, VR};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// One scheduled procedure step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorklistItem {
    pub accession_number: String,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub patient_birth_date: Option<String>,
    pub patient_sex: Option<String>,
    pub modality: Option<String>,
    pub scheduled_station_ae_title: Option<String>,
    pub scheduled_start_date: Option<String>,
    pub scheduled_start_time: Option<String>,
    pub performing_physician: Option<String>,
    pub procedure_description: Option<String>,
    pub procedure_step_id: Option<String>,
    pub requested_procedure_id: Option<String>,
}

impl WorklistItem {
    /// Render the item as a worklist C-FIND response data set, with
    /// the scheduled attributes inside the procedure step sequence.
    pub fn to_data_set(&self) -> DataSet {
        let mut sps = DataSet::new();
        put_opt(&mut sps, tags::MODALITY, VR::CS, &self.modality);
        put_opt(
            &mut sps,
            tags::SCHEDULED_STATION_AE_TITLE,
            VR::AE,
            &self.scheduled_station_ae_title,
        );
        put_opt(
            &mut sps,
            tags::SCHEDULED_PROCEDURE_STEP_START_DATE,
            VR::DA,
            &self.scheduled_start_date,
        );
        put_opt(
            &mut sps,
            tags::SCHEDULED_PROCEDURE_STEP_START_TIME,
            VR::TM,
            &self.scheduled_start_time,
        );
        put_opt(
            &mut sps,
            tags::SCHEDULED_PERFORMING_PHYSICIAN_NAME,
            VR::PN,
            &self.performing_physician,
        );
        put_opt(
            &mut sps,
            tags::SCHEDULED_PROCEDURE_STEP_DESCRIPTION,
            VR::LO,
            &self.procedure_description,
        );
        put_opt(
            &mut sps,
            tags::SCHEDULED_PROCEDURE_STEP_ID,
            VR::SH,
            &self.procedure_step_id,
        );

        let mut ds = DataSet::new();
        ds.put_str(tags::ACCESSION_NUMBER, VR::SH, &self.accession_number);
        ds.put_str(tags::PATIENT_ID, VR::LO, &self.patient_id);
        put_opt(&mut ds, tags::PATIENT_NAME, VR::PN, &self.patient_name);
        put_opt(
            &mut ds,
            tags::PATIENT_BIRTH_DATE,
            VR::DA,
            &self.patient_birth_date,
        );
        put_opt(&mut ds, tags::PATIENT_SEX, VR::CS, &self.patient_sex);
        put_opt(
            &mut ds,
            tags::REQUESTED_PROCEDURE_ID,
            VR::SH,
            &self.requested_procedure_id,
        );
        ds.put(DataElement::sequence(
            tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE,
            vec![sps],
        ));
        ds
    }

    /// Match the item against a worklist C-FIND identifier.
    fn matches(&self, identifier: &WorklistKeys) -> bool {
        wildcard_opt(&identifier.accession_number, Some(&self.accession_number))
            && wildcard_opt(&identifier.patient_id, Some(&self.patient_id))
            && wildcard_opt(&identifier.patient_name, self.patient_name.as_deref())
            && wildcard_opt(&identifier.modality, self.modality.as_deref())
            && wildcard_opt(
                &identifier.station_ae_title,
                self.scheduled_station_ae_title.as_deref(),
            )
            && date_in_range(&identifier.start_date, self.scheduled_start_date.as_deref())
    }
}

fn put_opt(ds: &mut DataSet, tag: pacs_core::Tag, vr: VR, value: &Option<String>) {
    if let Some(value) = value {
        ds.put_str(tag, vr, value);
    }
}

/// The match keys pulled out of a worklist identifier.
#[derive(Debug, Default, Clone)]
struct WorklistKeys {
    accession_number: Option<String>,
    patient_id: Option<String>,
    patient_name: Option<String>,
    modality: Option<String>,
    station_ae_title: Option<String>,
    start_date: Option<String>,
}

impl WorklistKeys {
    fn from_identifier(identifier: &DataSet) -> Self {
        let key = |tag| identifier.get_str(tag).filter(|s: &String| !s.is_empty());
        // scheduled attributes may come wrapped in the SPS sequence
        let sps = identifier
            .sequence_items(tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE)
            .and_then(|items| items.first());
        let sps_key = |tag| {
            sps.and_then(|item| item.get_str(tag))
                .filter(|s| !s.is_empty())
        };
        WorklistKeys {
            accession_number: key(tags::ACCESSION_NUMBER),
            patient_id: key(tags::PATIENT_ID),
            patient_name: key(tags::PATIENT_NAME),
            modality: sps_key(tags::MODALITY).or_else(|| key(tags::MODALITY)),
            station_ae_title: sps_key(tags::SCHEDULED_STATION_AE_TITLE),
            start_date: sps_key(tags::SCHEDULED_PROCEDURE_STEP_START_DATE),
        }
    }
}

/// DICOM wildcard match: `*` any run, `?` one character.
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    fn inner(p: &[u8], v: &[u8]) -> bool {
        match (p.first(), v.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                inner(&p[1..], v) || (!v.is_empty() && inner(p, &v[1..]))
            }
            (Some(b'?'), Some(_)) => inner(&p[1..], &v[1..]),
            (Some(a), Some(b)) if a == b => inner(&p[1..], &v[1..]),
            _ => false,
        }
    }
    inner(pattern.as_bytes(), value.as_bytes())
}

fn wildcard_opt(pattern: &Option<String>, value: Option<&str>) -> bool {
    match pattern {
        None => true,
        Some(pattern) => match value {
            Some(value) => wildcard_match(pattern, value),
            None => false,
        },
    }
}

/// Inclusive date or date-range match on a `YYYYMMDD` value.
fn date_in_range(pattern: &Option<String>, value: Option<&str>) -> bool {
    let Some(pattern) = pattern else { return true };
    let Some(value) = value else { return false };
    match pattern.split_once('-') {
        None => pattern == value,
        Some((from, to)) => {
            (from.is_empty() || value >= from) && (to.is_empty() || value <= to)
        }
    }
}

/// The worklist store: an accession-keyed map under one mutex, with
/// JSON persistence written under the same lock.
pub struct WorklistStore {
    items: Mutex<HashMap<String, WorklistItem>>,
    path: Option<PathBuf>,
}

impl WorklistStore {
    /// An in-memory store without persistence.
    pub fn in_memory() -> Self {
        WorklistStore {
            items: Mutex::new(HashMap::new()),
            path: None,
        }
    }

    /// Open a file-backed store, loading any persisted items.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let items = if path.is_file() {
            let text = std::fs::read_to_string(&path)
                .context(WorklistIoSnafu { operation: "read" })?;
            let list: Vec<WorklistItem> =
                serde_json::from_str(&text).context(WorklistFormatSnafu)?;
            list.into_iter()
                .map(|item| (item.accession_number.clone(), item))
                .collect()
        } else {
            HashMap::new()
        };
        Ok(WorklistStore {
            items: Mutex::new(items),
            path: Some(path),
        })
    }

    /// Add or update an item, keyed by accession number.
    pub fn upsert(&self, item: WorklistItem) -> Result<()> {
        let mut items = self.items.lock();
        items.insert(item.accession_number.clone(), item);
        self.persist(&items)
    }

    /// Remove an item. Returns whether it existed.
    pub fn remove(&self, accession_number: &str) -> Result<bool> {
        let mut items = self.items.lock();
        let existed = items.remove(accession_number).is_some();
        self.persist(&items)?;
        Ok(existed)
    }

    /// Fetch one item by accession number.
    pub fn get(&self, accession_number: &str) -> Option<WorklistItem> {
        self.items.lock().get(accession_number).cloned()
    }

    /// The number of scheduled items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// The items matching a worklist C-FIND identifier,
    /// ordered by accession number.
    pub fn query(&self, identifier: &DataSet) -> Vec<WorklistItem> {
        let keys = WorklistKeys::from_identifier(identifier);
        let items = self.items.lock();
        let mut matches: Vec<WorklistItem> = items
            .values()
            .filter(|item| item.matches(&keys))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.accession_number.cmp(&b.accession_number));
        debug!("worklist query matched {} of {}", matches.len(), items.len());
        matches
    }

    /// Write the item list to disk; a no-op for in-memory stores.
    fn persist(&self, items: &HashMap<String, WorklistItem>) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        let mut list: Vec<&WorklistItem> = items.values().collect();
        list.sort_by(|a, b| a.accession_number.cmp(&b.accession_number));
        let text = serde_json::to_string_pretty(&list).context(WorklistFormatSnafu)?;
        std::fs::write(path, text).context(WorklistIoSnafu { operation: "write" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(accession: &str, patient: &str, modality: &str, date: &str) -> WorklistItem {
        WorklistItem {
            accession_number: accession.to_string(),
            patient_id: "P001".to_string(),
            patient_name: Some(patient.to_string()),
            modality: Some(modality.to_string()),
            scheduled_start_date: Some(date.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn wildcard_semantics() {
        assert!(wildcard_match("DOE*", "DOE^JOHN"));
        assert!(wildcard_match("*JOHN", "DOE^JOHN"));
        assert!(wildcard_match("D?E*", "DOE^JOHN"));
        assert!(!wildcard_match("DOE", "DOE^JOHN"));
        assert!(wildcard_match("*", ""));
        assert!(!wildcard_match("?", ""));
    }

    #[test]
    fn query_matches_by_sps_fields() {
        let store = WorklistStore::in_memory();
        store.upsert(item("ACC1", "DOE^JOHN", "CT", "20240110")).unwrap();
        store.upsert(item("ACC2", "ROE^JANE", "MR", "20240111")).unwrap();

        let mut sps = DataSet::new();
        sps.put_str(tags::MODALITY, VR::CS, "CT");
        let mut identifier = DataSet::new();
        identifier.put(DataElement::sequence(
            tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE,
            vec![sps],
        ));

        let matches = store.query(&identifier);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].accession_number, "ACC1");
    }

    #[test]
    fn query_matches_date_ranges() {
        let store = WorklistStore::in_memory();
        store.upsert(item("ACC1", "A", "CT", "20240110")).unwrap();
        store.upsert(item("ACC2", "B", "CT", "20240120")).unwrap();

        let mut sps = DataSet::new();
        sps.put_str(
            tags::SCHEDULED_PROCEDURE_STEP_START_DATE,
            VR::DA,
            "20240115-20240131",
        );
        let mut identifier = DataSet::new();
        identifier.put(DataElement::sequence(
            tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE,
            vec![sps],
        ));
        let matches = store.query(&identifier);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].accession_number, "ACC2");
    }

    #[test]
    fn upsert_replaces_by_accession() {
        let store = WorklistStore::in_memory();
        store.upsert(item("ACC1", "DOE^JOHN", "CT", "20240110")).unwrap();
        store.upsert(item("ACC1", "DOE^JOHN", "MR", "20240110")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("ACC1").unwrap().modality.as_deref(), Some("MR"));
    }

    #[test]
    fn persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worklist.json");
        {
            let store = WorklistStore::open(&path).unwrap();
            store.upsert(item("ACC1", "DOE^JOHN", "CT", "20240110")).unwrap();
            store.upsert(item("ACC2", "ROE^JANE", "MR", "20240111")).unwrap();
            assert!(store.remove("ACC2").unwrap());
            assert!(!store.remove("ACC2").unwrap());
        }
        let store = WorklistStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("ACC1").is_some());
    }

    #[test]
    fn response_data_set_carries_the_sps_sequence() {
        let ds = item("ACC1", "DOE^JOHN", "CT", "20240110").to_data_set();
        assert_eq!(ds.get_str(tags::ACCESSION_NUMBER).unwrap(), "ACC1");
        let sps = ds
            .sequence_items(tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE)
            .unwrap();
        assert_eq!(sps[0].get_str(tags::MODALITY).unwrap(), "CT");
        assert_eq!(
            sps[0]
                .get_str(tags::SCHEDULED_PROCEDURE_STEP_START_DATE)
                .unwrap(),
            "20240110"
        );
    }
}
