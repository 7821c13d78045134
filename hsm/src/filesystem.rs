//! A tier backend over a local directory tree.
//!
//! Objects live at `root/<study_uid>/<series_uid>/<sop_uid>.dcm`, with
//! UIDs sanitized for filesystem use. An in-memory index from SOP
//! instance UID to path is seeded by walking the tree at construction
//! and maintained on every store/remove.
use crate::backend::{IntegrityReport, ObjectQuery, StoredInstance, TierBackend, TierStatistics};
use crate::error::{Result, TierUnavailableSnafu};
use crate::metadata::StorageTier;
use parking_lot::RwLock;
use snafu::ResultExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    study_instance_uid: String,
    series_instance_uid: String,
    size_bytes: u64,
}

/// Filesystem-backed storage tier.
pub struct FileSystemBackend {
    tier: StorageTier,
    root: PathBuf,
    index: RwLock<HashMap<String, Entry>>,
}

/// Keep only characters that are safe in a path component.
/// UIDs are digits and dots; anything else becomes `_`.
pub fn sanitize_uid(uid: &str) -> String {
    uid.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl FileSystemBackend {
    /// Open a backend rooted at the given directory, creating it if
    /// needed and indexing any objects already present.
    pub fn open<P: AsRef<Path>>(tier: StorageTier, root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).context(TierUnavailableSnafu {
            tier,
            operation: "open",
        })?;
        let backend = FileSystemBackend {
            tier,
            root,
            index: RwLock::new(HashMap::new()),
        };
        backend.reindex();
        Ok(backend)
    }

    /// The directory this backend stores into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and rebuild the SOP UID index.
    fn reindex(&self) {
        let mut index = HashMap::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(3)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let Some(sop) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
            else {
                continue;
            };
            let series = component_name(path.parent());
            let study = component_name(path.parent().and_then(Path::parent));
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            index.insert(
                sop,
                Entry {
                    path: path.to_path_buf(),
                    study_instance_uid: study,
                    series_instance_uid: series,
                    size_bytes: size,
                },
            );
        }
        *self.index.write() = index;
    }

    fn object_path(&self, instance: &StoredInstance) -> PathBuf {
        self.root
            .join(sanitize_uid(&instance.study_instance_uid))
            .join(sanitize_uid(&instance.series_instance_uid))
            .join(format!("{}.dcm", sanitize_uid(&instance.sop_instance_uid)))
    }
}

fn component_name(path: Option<&Path>) -> String {
    path.and_then(Path::file_name)
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

impl TierBackend for FileSystemBackend {
    fn store(&self, instance: &StoredInstance) -> Result<()> {
        let path = self.object_path(instance);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(TierUnavailableSnafu {
                tier: self.tier,
                operation: "store",
            })?;
        }
        std::fs::write(&path, &instance.bytes).context(TierUnavailableSnafu {
            tier: self.tier,
            operation: "store",
        })?;
        self.index.write().insert(
            instance.sop_instance_uid.clone(),
            Entry {
                path,
                study_instance_uid: sanitize_uid(&instance.study_instance_uid),
                series_instance_uid: sanitize_uid(&instance.series_instance_uid),
                size_bytes: instance.bytes.len() as u64,
            },
        );
        Ok(())
    }

    fn retrieve(&self, sop_instance_uid: &str) -> Result<Vec<u8>> {
        let path = {
            let index = self.index.read();
            index.get(sop_instance_uid).map(|e| e.path.clone())
        };
        let Some(path) = path else {
            return crate::error::NotFoundInAnyTierSnafu {
                sop_instance_uid: sop_instance_uid.to_string(),
            }
            .fail();
        };
        std::fs::read(&path).context(TierUnavailableSnafu {
            tier: self.tier,
            operation: "retrieve",
        })
    }

    fn remove(&self, sop_instance_uid: &str) -> Result<()> {
        let removed = self.index.write().remove(sop_instance_uid);
        if let Some(entry) = removed {
            std::fs::remove_file(&entry.path).context(TierUnavailableSnafu {
                tier: self.tier,
                operation: "remove",
            })?;
            // prune now-empty series and study directories
            if let Some(series_dir) = entry.path.parent() {
                let _ = std::fs::remove_dir(series_dir);
                if let Some(study_dir) = series_dir.parent() {
                    let _ = std::fs::remove_dir(study_dir);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, sop_instance_uid: &str) -> bool {
        self.index.read().contains_key(sop_instance_uid)
    }

    fn find(&self, query: &ObjectQuery) -> Vec<String> {
        let index = self.index.read();
        let mut matches: Vec<String> = index
            .iter()
            .filter(|(sop, entry)| {
                query
                    .sop_instance_uid
                    .as_ref()
                    .map_or(true, |q| *sop == q)
                    && query
                        .study_instance_uid
                        .as_ref()
                        .map_or(true, |q| entry.study_instance_uid == sanitize_uid(q))
                    && query
                        .series_instance_uid
                        .as_ref()
                        .map_or(true, |q| entry.series_instance_uid == sanitize_uid(q))
            })
            .map(|(sop, _)| sop.clone())
            .collect();
        matches.sort();
        matches
    }

    fn statistics(&self) -> TierStatistics {
        let index = self.index.read();
        TierStatistics {
            object_count: index.len() as u64,
            total_bytes: index.values().map(|e| e.size_bytes).sum(),
        }
    }

    fn verify_integrity(&self) -> IntegrityReport {
        let index = self.index.read();
        let mut report = IntegrityReport::default();
        for (sop, entry) in index.iter() {
            report.checked += 1;
            if !entry.path.is_file() {
                warn!("missing object file for {}", sop);
                report.missing.push(sop.clone());
            }
        }
        report.missing.sort();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(study: &str, series: &str, sop: &str, bytes: &[u8]) -> StoredInstance {
        StoredInstance {
            study_instance_uid: study.to_string(),
            series_instance_uid: series.to_string(),
            sop_instance_uid: sop.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn store_retrieve_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSystemBackend::open(StorageTier::Hot, dir.path()).unwrap();
        let obj = instance("1.2", "1.2.1", "1.2.1.1", b"DICM-bytes");
        backend.store(&obj).unwrap();

        assert!(backend.exists("1.2.1.1"));
        assert_eq!(backend.retrieve("1.2.1.1").unwrap(), b"DICM-bytes");
        assert!(dir.path().join("1.2/1.2.1/1.2.1.1.dcm").is_file());

        backend.remove("1.2.1.1").unwrap();
        assert!(!backend.exists("1.2.1.1"));
        assert!(backend.retrieve("1.2.1.1").is_err());
    }

    #[test]
    fn reopening_reindexes_existing_objects() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = FileSystemBackend::open(StorageTier::Warm, dir.path()).unwrap();
            backend
                .store(&instance("1.2", "1.2.1", "1.2.1.1", b"aa"))
                .unwrap();
            backend
                .store(&instance("1.2", "1.2.2", "1.2.2.1", b"bbbb"))
                .unwrap();
        }
        let backend = FileSystemBackend::open(StorageTier::Warm, dir.path()).unwrap();
        assert!(backend.exists("1.2.1.1"));
        assert!(backend.exists("1.2.2.1"));
        let stats = backend.statistics();
        assert_eq!(stats.object_count, 2);
        assert_eq!(stats.total_bytes, 6);
    }

    #[test]
    fn find_filters_by_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSystemBackend::open(StorageTier::Hot, dir.path()).unwrap();
        backend
            .store(&instance("1.2", "1.2.1", "1.2.1.1", b"aa"))
            .unwrap();
        backend
            .store(&instance("1.2", "1.2.2", "1.2.2.1", b"bb"))
            .unwrap();
        backend
            .store(&instance("9.9", "9.9.1", "9.9.1.1", b"cc"))
            .unwrap();

        let all = backend.find(&ObjectQuery::default());
        assert_eq!(all.len(), 3);
        let by_study = backend.find(&ObjectQuery {
            study_instance_uid: Some("1.2".to_string()),
            ..Default::default()
        });
        assert_eq!(by_study, vec!["1.2.1.1", "1.2.2.1"]);
        let by_series = backend.find(&ObjectQuery {
            series_instance_uid: Some("1.2.2".to_string()),
            ..Default::default()
        });
        assert_eq!(by_series, vec!["1.2.2.1"]);
    }

    #[test]
    fn uids_are_sanitized_for_paths() {
        assert_eq!(sanitize_uid("1.2.840"), "1.2.840");
        assert_eq!(sanitize_uid("../evil"), ".._evil");
        assert_eq!(sanitize_uid("a/b\\c"), "a_b_c");
    }

    #[test]
    fn integrity_sweep_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSystemBackend::open(StorageTier::Hot, dir.path()).unwrap();
        backend
            .store(&instance("1.2", "1.2.1", "1.2.1.1", b"aa"))
            .unwrap();
        assert!(backend.verify_integrity().is_clean());

        std::fs::remove_file(dir.path().join("1.2/1.2.1/1.2.1.1.dcm")).unwrap();
        let report = backend.verify_integrity();
        assert_eq!(report.checked, 1);
        assert_eq!(report.missing, vec!["1.2.1.1"]);
    }
}
