//! Schema of the catalog database.

/// DDL executed on every open. All statements are idempotent.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS patients (
    pk            INTEGER PRIMARY KEY,
    patient_id    TEXT NOT NULL UNIQUE,
    patient_name  TEXT,
    birth_date    TEXT,
    sex           TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_patients_name ON patients (patient_name);

CREATE TABLE IF NOT EXISTS studies (
    pk                  INTEGER PRIMARY KEY,
    study_instance_uid  TEXT NOT NULL UNIQUE,
    patient_pk          INTEGER NOT NULL REFERENCES patients (pk) ON DELETE CASCADE,
    study_id            TEXT,
    accession_number    TEXT,
    study_date          TEXT,
    study_time          TEXT,
    description         TEXT,
    referring_physician TEXT,
    modalities_in_study TEXT,
    num_series          INTEGER NOT NULL DEFAULT 0,
    num_instances       INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_studies_patient ON studies (patient_pk);
CREATE INDEX IF NOT EXISTS idx_studies_date ON studies (study_date);
CREATE INDEX IF NOT EXISTS idx_studies_accession ON studies (accession_number);

CREATE TABLE IF NOT EXISTS series (
    pk                  INTEGER PRIMARY KEY,
    series_instance_uid TEXT NOT NULL UNIQUE,
    study_pk            INTEGER NOT NULL REFERENCES studies (pk) ON DELETE CASCADE,
    modality            TEXT,
    series_number       INTEGER,
    description         TEXT,
    body_part_examined  TEXT,
    num_instances       INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_series_study ON series (study_pk);
CREATE INDEX IF NOT EXISTS idx_series_modality ON series (modality);

CREATE TABLE IF NOT EXISTS instances (
    pk                INTEGER PRIMARY KEY,
    sop_instance_uid  TEXT NOT NULL UNIQUE,
    series_pk         INTEGER NOT NULL REFERENCES series (pk) ON DELETE CASCADE,
    sop_class_uid     TEXT NOT NULL,
    instance_number   INTEGER,
    file_path         TEXT,
    size_bytes        INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_instances_series ON instances (series_pk);
CREATE INDEX IF NOT EXISTS idx_instances_sop_class ON instances (sop_class_uid);
";
