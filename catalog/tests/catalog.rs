//! Integration tests over the whole catalog surface.
use pacs_catalog::{
    Catalog, CatalogQuery, InstanceAttributes, PatientAttributes, SeriesAttributes,
    StudyAttributes, StudyQuery,
};
use pacs_catalog::query::{DateRange, Page};
use pacs_catalog::Error;

fn attrs(study_uid: &str) -> StudyAttributes {
    StudyAttributes {
        study_instance_uid: study_uid.to_string(),
        ..Default::default()
    }
}

/// Build a patient with one study, series and instance.
fn seed_one(catalog: &Catalog, patient: &str, study: &str, series: &str, sop: &str) {
    let patient_pk = catalog
        .upsert_patient(&PatientAttributes {
            patient_id: patient.to_string(),
            patient_name: Some(format!("NAME^{}", patient)),
            ..Default::default()
        })
        .unwrap();
    let study_pk = catalog.upsert_study(patient_pk, &attrs(study)).unwrap();
    let series_pk = catalog
        .upsert_series(
            study_pk,
            &SeriesAttributes {
                series_instance_uid: series.to_string(),
                modality: Some("CT".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    catalog
        .upsert_instance(
            series_pk,
            &InstanceAttributes {
                sop_instance_uid: sop.to_string(),
                sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".to_string(),
                size_bytes: 1024,
                ..Default::default()
            },
        )
        .unwrap();
}

#[test]
fn upserts_are_idempotent() {
    let catalog = Catalog::in_memory().unwrap();
    seed_one(&catalog, "P001", "1.2.3", "1.2.3.1", "1.2.3.1.1");
    seed_one(&catalog, "P001", "1.2.3", "1.2.3.1", "1.2.3.1.1");

    let stats = catalog.statistics().unwrap();
    assert_eq!(stats.num_patients, 1);
    assert_eq!(stats.num_studies, 1);
    assert_eq!(stats.num_series, 1);
    assert_eq!(stats.num_instances, 1);

    // find returns the last written values
    let patient_pk = catalog
        .upsert_patient(&PatientAttributes {
            patient_id: "P001".to_string(),
            patient_name: Some("RENAMED^PATIENT".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(catalog.find_patient("P001").unwrap().pk, patient_pk);
    assert_eq!(
        catalog.find_patient("P001").unwrap().patient_name.unwrap(),
        "RENAMED^PATIENT"
    );
}

#[test]
fn denormalized_counts_follow_the_hierarchy() {
    let catalog = Catalog::in_memory().unwrap();
    let patient_pk = catalog
        .upsert_patient(&PatientAttributes {
            patient_id: "P001".to_string(),
            ..Default::default()
        })
        .unwrap();
    let study_pk = catalog.upsert_study(patient_pk, &attrs("1.2.3")).unwrap();
    for s in 0..2 {
        let series_pk = catalog
            .upsert_series(
                study_pk,
                &SeriesAttributes {
                    series_instance_uid: format!("1.2.3.{}", s),
                    modality: Some(if s == 0 { "CT" } else { "MR" }.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        for i in 0..3 {
            catalog
                .upsert_instance(
                    series_pk,
                    &InstanceAttributes {
                        sop_instance_uid: format!("1.2.3.{}.{}", s, i),
                        sop_class_uid: "1.2.840.10008.5.1.4.1.1.4".to_string(),
                        ..Default::default()
                    },
                )
                .unwrap();
        }
    }

    let study = catalog.find_study("1.2.3").unwrap();
    assert_eq!(study.num_series, 2);
    assert_eq!(study.num_instances, 6);
    assert_eq!(study.modalities_in_study.unwrap(), "CT\\MR");
    let series = catalog.find_series("1.2.3.0").unwrap();
    assert_eq!(series.num_instances, 3);
}

#[test]
fn sop_uid_reindex_conflicts_are_rejected() {
    let catalog = Catalog::in_memory().unwrap();
    seed_one(&catalog, "P001", "1.2.3", "1.2.3.1", "1.2.3.1.1");
    seed_one(&catalog, "P002", "1.2.4", "1.2.4.1", "1.2.4.1.1");

    // the same SOP UID under a different series is a conflict
    let series_pk = catalog.find_series("1.2.4.1").unwrap().pk;
    let err = catalog
        .upsert_instance(
            series_pk,
            &InstanceAttributes {
                sop_instance_uid: "1.2.3.1.1".to_string(),
                sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateUid { .. }));

    // and the same study UID under a different patient likewise
    let patient_pk = catalog.find_patient("P002").unwrap().pk;
    let err = catalog.upsert_study(patient_pk, &attrs("1.2.3")).unwrap_err();
    assert!(matches!(err, Error::DuplicateUid { .. }));
}

#[test]
fn paginated_study_search_partitions_without_duplicates() {
    let catalog = Catalog::in_memory().unwrap();
    let patient_pk = catalog
        .upsert_patient(&PatientAttributes {
            patient_id: "P001".to_string(),
            ..Default::default()
        })
        .unwrap();
    for i in 0..10 {
        catalog
            .upsert_study(patient_pk, &attrs(&format!("1.2.3.{}", i)))
            .unwrap();
    }

    let page = |offset| {
        catalog
            .search_studies(&StudyQuery {
                patient_id: Some("P001".to_string()),
                page: Page {
                    limit: Some(5),
                    offset: Some(offset),
                },
                ..Default::default()
            })
            .unwrap()
    };
    let first = page(0);
    let second = page(5);
    assert_eq!(first.records.len(), 5);
    assert_eq!(second.records.len(), 5);
    assert_eq!(first.total, 10);
    assert_eq!(second.total, 10);

    let mut uids: Vec<String> = first
        .records
        .iter()
        .chain(second.records.iter())
        .map(|r| r.study_instance_uid.clone())
        .collect();
    uids.sort();
    uids.dedup();
    assert_eq!(uids.len(), 10);
}

#[test]
fn wildcard_queries_match_prefixes_and_single_characters() {
    let catalog = Catalog::in_memory().unwrap();
    for (i, name) in ["DOE^JOHN", "DOE^JANE", "ROE^RICHARD"].iter().enumerate() {
        let pk = catalog
            .upsert_patient(&PatientAttributes {
                patient_id: format!("P{:03}", i),
                patient_name: Some(name.to_string()),
                ..Default::default()
            })
            .unwrap();
        catalog.upsert_study(pk, &attrs(&format!("1.2.{}", i))).unwrap();
    }

    let result = catalog
        .search_studies(&StudyQuery {
            patient_name: Some("Doe*".to_string().to_uppercase()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(result.records.len(), 2);
    assert!(result
        .records
        .iter()
        .all(|r| r.patient_name.as_deref().unwrap().starts_with("DOE")));

    let result = catalog
        .search_studies(&StudyQuery {
            patient_name: Some("DOE^J?NE".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].patient_name.as_deref(), Some("DOE^JANE"));

    // no metacharacters: exact matching, no implicit substring match
    let result = catalog
        .search_studies(&StudyQuery {
            patient_name: Some("DOE".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert!(result.records.is_empty());
}

#[test]
fn date_range_query_is_inclusive() {
    let catalog = Catalog::in_memory().unwrap();
    let pk = catalog
        .upsert_patient(&PatientAttributes {
            patient_id: "P001".to_string(),
            ..Default::default()
        })
        .unwrap();
    for (i, date) in ["20240101", "20240215", "20240301"].iter().enumerate() {
        catalog
            .upsert_study(
                pk,
                &StudyAttributes {
                    study_instance_uid: format!("1.2.{}", i),
                    study_date: Some(date.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let result = catalog
        .search_studies(&StudyQuery {
            study_date: Some(DateRange {
                from: Some("20240101".to_string()),
                to: Some("20240215".to_string()),
            }),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(result.records.len(), 2);
}

#[test]
fn delete_study_cascades_and_reports_instances() {
    let catalog = Catalog::in_memory().unwrap();
    seed_one(&catalog, "P001", "1.2.3", "1.2.3.1", "1.2.3.1.1");
    seed_one(&catalog, "P001", "1.2.4", "1.2.4.1", "1.2.4.1.1");

    let removed = catalog.delete_study("1.2.3").unwrap();
    assert_eq!(removed, vec!["1.2.3.1.1".to_string()]);

    assert!(matches!(
        catalog.find_study("1.2.3").unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(matches!(
        catalog.find_series("1.2.3.1").unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(matches!(
        catalog.find_instance("1.2.3.1.1").unwrap_err(),
        Error::NotFound { .. }
    ));
    // the sibling study is untouched
    assert!(catalog.find_study("1.2.4").is_ok());
    // deleting again reports not found
    assert!(matches!(
        catalog.delete_study("1.2.3").unwrap_err(),
        Error::NotFound { .. }
    ));
}

#[test]
fn listing_follows_parent_uids() {
    let catalog = Catalog::in_memory().unwrap();
    seed_one(&catalog, "P001", "1.2.3", "1.2.3.1", "1.2.3.1.1");
    seed_one(&catalog, "P001", "1.2.3", "1.2.3.2", "1.2.3.2.1");

    assert_eq!(catalog.list_studies_for_patient("P001").unwrap().len(), 1);
    assert_eq!(catalog.list_series("1.2.3").unwrap().len(), 2);
    assert_eq!(catalog.list_instances("1.2.3.1").unwrap().len(), 1);
}

#[test]
fn cursor_over_generic_query() {
    let catalog = Catalog::in_memory().unwrap();
    for i in 0..4 {
        seed_one(
            &catalog,
            "P001",
            &format!("1.2.{}", i),
            &format!("1.2.{}.1", i),
            &format!("1.2.{}.1.1", i),
        );
    }
    let mut cursor = catalog
        .open_cursor(CatalogQuery::Study(StudyQuery {
            patient_id: Some("P001".to_string()),
            ..Default::default()
        }))
        .unwrap();
    assert_eq!(cursor.remaining(), 4);
    let batch = cursor.fetch_batch(3);
    assert_eq!(batch.len(), 3);
    assert!(cursor.has_more());
}
