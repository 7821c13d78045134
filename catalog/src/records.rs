//! The record types of the four hierarchy levels.
//!
//! Optional attributes are `Option<String>` throughout; an empty string
//! is a distinct stored value and never stands in for "absent".
use chrono::{DateTime, Utc};
use pacs_core::dictionary::tags;
use pacs_core::{DataSet, VR};
use serde::{Deserialize, Serialize};

/// A patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub pk: i64,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A study record, carrying the patient identification it was
/// registered under for query responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyRecord {
    pub pk: i64,
    pub patient_pk: i64,
    pub study_instance_uid: String,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub study_id: Option<String>,
    pub accession_number: Option<String>,
    pub study_date: Option<String>,
    pub study_time: Option<String>,
    pub description: Option<String>,
    pub referring_physician: Option<String>,
    /// sorted unique modalities of the child series, backslash separated
    pub modalities_in_study: Option<String>,
    pub num_series: i64,
    pub num_instances: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A series record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub pk: i64,
    pub study_pk: i64,
    pub series_instance_uid: String,
    pub study_instance_uid: String,
    pub modality: Option<String>,
    pub series_number: Option<i64>,
    pub description: Option<String>,
    pub body_part_examined: Option<String>,
    pub num_instances: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An instance record, pointing at the stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub pk: i64,
    pub series_pk: i64,
    pub sop_instance_uid: String,
    pub series_instance_uid: String,
    pub sop_class_uid: String,
    pub instance_number: Option<i64>,
    pub file_path: Option<String>,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record of any hierarchy level, as yielded by cursors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogRecord {
    Patient(PatientRecord),
    Study(StudyRecord),
    Series(SeriesRecord),
    Instance(InstanceRecord),
}

impl CatalogRecord {
    /// Map the record's indexed columns back to DICOM attributes.
    pub fn to_data_set(&self) -> DataSet {
        match self {
            CatalogRecord::Patient(p) => p.to_data_set(),
            CatalogRecord::Study(s) => s.to_data_set(),
            CatalogRecord::Series(s) => s.to_data_set(),
            CatalogRecord::Instance(i) => i.to_data_set(),
        }
    }
}

fn put_opt(ds: &mut DataSet, tag: pacs_core::Tag, vr: VR, value: &Option<String>) {
    if let Some(value) = value {
        ds.put_str(tag, vr, value);
    }
}

impl PatientRecord {
    pub fn to_data_set(&self) -> DataSet {
        let mut ds = DataSet::new();
        ds.put_str(tags::PATIENT_ID, VR::LO, &self.patient_id);
        put_opt(&mut ds, tags::PATIENT_NAME, VR::PN, &self.patient_name);
        put_opt(&mut ds, tags::PATIENT_BIRTH_DATE, VR::DA, &self.birth_date);
        put_opt(&mut ds, tags::PATIENT_SEX, VR::CS, &self.sex);
        ds
    }
}

impl StudyRecord {
    pub fn to_data_set(&self) -> DataSet {
        let mut ds = DataSet::new();
        ds.put_str(tags::STUDY_INSTANCE_UID, VR::UI, &self.study_instance_uid);
        ds.put_str(tags::PATIENT_ID, VR::LO, &self.patient_id);
        put_opt(&mut ds, tags::PATIENT_NAME, VR::PN, &self.patient_name);
        put_opt(&mut ds, tags::STUDY_ID, VR::SH, &self.study_id);
        put_opt(&mut ds, tags::ACCESSION_NUMBER, VR::SH, &self.accession_number);
        put_opt(&mut ds, tags::STUDY_DATE, VR::DA, &self.study_date);
        put_opt(&mut ds, tags::STUDY_TIME, VR::TM, &self.study_time);
        put_opt(&mut ds, tags::STUDY_DESCRIPTION, VR::LO, &self.description);
        put_opt(
            &mut ds,
            tags::REFERRING_PHYSICIAN_NAME,
            VR::PN,
            &self.referring_physician,
        );
        put_opt(
            &mut ds,
            tags::MODALITIES_IN_STUDY,
            VR::CS,
            &self.modalities_in_study,
        );
        ds.put_str(
            tags::NUMBER_OF_STUDY_RELATED_SERIES,
            VR::IS,
            &self.num_series.to_string(),
        );
        ds.put_str(
            tags::NUMBER_OF_STUDY_RELATED_INSTANCES,
            VR::IS,
            &self.num_instances.to_string(),
        );
        ds
    }
}

impl SeriesRecord {
    pub fn to_data_set(&self) -> DataSet {
        let mut ds = DataSet::new();
        ds.put_str(tags::SERIES_INSTANCE_UID, VR::UI, &self.series_instance_uid);
        ds.put_str(tags::STUDY_INSTANCE_UID, VR::UI, &self.study_instance_uid);
        put_opt(&mut ds, tags::MODALITY, VR::CS, &self.modality);
        if let Some(number) = self.series_number {
            ds.put_str(tags::SERIES_NUMBER, VR::IS, &number.to_string());
        }
        put_opt(&mut ds, tags::SERIES_DESCRIPTION, VR::LO, &self.description);
        put_opt(
            &mut ds,
            tags::BODY_PART_EXAMINED,
            VR::CS,
            &self.body_part_examined,
        );
        ds.put_str(
            tags::NUMBER_OF_SERIES_RELATED_INSTANCES,
            VR::IS,
            &self.num_instances.to_string(),
        );
        ds
    }
}

impl InstanceRecord {
    pub fn to_data_set(&self) -> DataSet {
        let mut ds = DataSet::new();
        ds.put_str(tags::SOP_INSTANCE_UID, VR::UI, &self.sop_instance_uid);
        ds.put_str(tags::SERIES_INSTANCE_UID, VR::UI, &self.series_instance_uid);
        ds.put_str(tags::SOP_CLASS_UID, VR::UI, &self.sop_class_uid);
        if let Some(number) = self.instance_number {
            ds.put_str(tags::INSTANCE_NUMBER, VR::IS, &number.to_string());
        }
        ds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn study_record_maps_to_query_attributes() {
        let record = StudyRecord {
            pk: 1,
            patient_pk: 1,
            study_instance_uid: "1.2.3".to_string(),
            patient_id: "P001".to_string(),
            patient_name: Some("DOE^JOHN".to_string()),
            study_id: None,
            accession_number: Some("ACC42".to_string()),
            study_date: Some("20240110".to_string()),
            study_time: None,
            description: None,
            referring_physician: None,
            modalities_in_study: Some("CT\\MR".to_string()),
            num_series: 2,
            num_instances: 40,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let ds = record.to_data_set();
        assert_eq!(ds.get_str(tags::STUDY_INSTANCE_UID).unwrap(), "1.2.3");
        assert_eq!(ds.get_str(tags::ACCESSION_NUMBER).unwrap(), "ACC42");
        assert_eq!(
            ds.get_strs(tags::MODALITIES_IN_STUDY),
            vec!["CT".to_string(), "MR".to_string()]
        );
        assert_eq!(
            ds.get_str(tags::NUMBER_OF_STUDY_RELATED_INSTANCES).unwrap(),
            "40"
        );
        // absent optional attributes stay absent
        assert!(ds.get_str(tags::STUDY_ID).is_none());
    }
}
