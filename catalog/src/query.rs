//! Typed query structures and DICOM wildcard translation.
use serde::{Deserialize, Serialize};

/// Default page size for searches.
pub const DEFAULT_LIMIT: u32 = 20;
/// Hard cap on the page size of any search.
pub const MAX_LIMIT: u32 = 100;

/// The hierarchy level a query addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryLevel {
    Patient,
    Study,
    Series,
    Instance,
}

impl std::fmt::Display for QueryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            QueryLevel::Patient => "PATIENT",
            QueryLevel::Study => "STUDY",
            QueryLevel::Series => "SERIES",
            QueryLevel::Instance => "IMAGE",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for QueryLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PATIENT" => Ok(QueryLevel::Patient),
            "STUDY" => Ok(QueryLevel::Study),
            "SERIES" => Ok(QueryLevel::Series),
            "IMAGE" | "INSTANCE" => Ok(QueryLevel::Instance),
            _ => Err(()),
        }
    }
}

/// An inclusive `YYYYMMDD` date range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl DateRange {
    /// Parse a DICOM date or date-range value:
    /// `DATE`, `DATE-`, `-DATE` or `DATE-DATE`.
    pub fn parse(value: &str) -> Self {
        match value.split_once('-') {
            None => DateRange {
                from: Some(value.to_string()),
                to: Some(value.to_string()),
            },
            Some((from, to)) => DateRange {
                from: (!from.is_empty()).then(|| from.to_string()),
                to: (!to.is_empty()).then(|| to.to_string()),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Common pagination parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    /// The effective page size: default 20, capped at 100.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// Patient-level search keys. String keys accept DICOM wildcards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientQuery {
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub birth_date: Option<DateRange>,
    pub sex: Option<String>,
    #[serde(default)]
    pub page: Page,
}

/// Study-level search keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyQuery {
    pub study_instance_uid: Option<String>,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub accession_number: Option<String>,
    pub study_date: Option<DateRange>,
    pub description: Option<String>,
    /// matches studies containing this modality among their series
    pub modality: Option<String>,
    #[serde(default)]
    pub page: Page,
}

/// Series-level search keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesQuery {
    pub study_instance_uid: Option<String>,
    pub series_instance_uid: Option<String>,
    pub modality: Option<String>,
    pub body_part_examined: Option<String>,
    #[serde(default)]
    pub page: Page,
}

/// Instance-level search keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceQuery {
    pub series_instance_uid: Option<String>,
    pub sop_instance_uid: Option<String>,
    pub sop_class_uid: Option<String>,
    #[serde(default)]
    pub page: Page,
}

/// A query of any level, as carried by cursors, resume tokens
/// and the parallel executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogQuery {
    Patient(PatientQuery),
    Study(StudyQuery),
    Series(SeriesQuery),
    Instance(InstanceQuery),
}

impl CatalogQuery {
    pub fn level(&self) -> QueryLevel {
        match self {
            CatalogQuery::Patient(_) => QueryLevel::Patient,
            CatalogQuery::Study(_) => QueryLevel::Study,
            CatalogQuery::Series(_) => QueryLevel::Series,
            CatalogQuery::Instance(_) => QueryLevel::Instance,
        }
    }

    pub(crate) fn page(&self) -> &Page {
        match self {
            CatalogQuery::Patient(q) => &q.page,
            CatalogQuery::Study(q) => &q.page,
            CatalogQuery::Series(q) => &q.page,
            CatalogQuery::Instance(q) => &q.page,
        }
    }

    pub(crate) fn set_page(&mut self, page: Page) {
        match self {
            CatalogQuery::Patient(q) => q.page = page,
            CatalogQuery::Study(q) => q.page = page,
            CatalogQuery::Series(q) => q.page = page,
            CatalogQuery::Instance(q) => q.page = page,
        }
    }
}

/// How a query key translates into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// no metacharacters: an indexable equality match
    Exact(String),
    /// `*`/`?` translated to a `LIKE` pattern with `\` escaping
    Like(String),
}

/// Translate a DICOM wildcard key into its SQL match form.
/// `*` matches any sequence, `?` one character; literal `%` and `_`
/// in the key are escaped.
pub fn translate_wildcard(key: &str) -> Match {
    if !key.contains('*') && !key.contains('?') {
        return Match::Exact(key.to_string());
    }
    let mut pattern = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        match c {
            '*' => pattern.push('%'),
            '?' => pattern.push('_'),
            '%' => pattern.push_str("\\%"),
            '_' => pattern.push_str("\\_"),
            '\\' => pattern.push_str("\\\\"),
            other => pattern.push(other),
        }
    }
    Match::Like(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_keys_match_exactly() {
        assert_eq!(
            translate_wildcard("DOE^JOHN"),
            Match::Exact("DOE^JOHN".to_string())
        );
    }

    #[test]
    fn wildcards_translate_to_like() {
        assert_eq!(translate_wildcard("Doe*"), Match::Like("Doe%".to_string()));
        assert_eq!(translate_wildcard("D?e"), Match::Like("D_e".to_string()));
    }

    #[test]
    fn sql_metacharacters_are_escaped() {
        assert_eq!(
            translate_wildcard("100%*"),
            Match::Like("100\\%%".to_string())
        );
        assert_eq!(
            translate_wildcard("a_b*"),
            Match::Like("a\\_b%".to_string())
        );
    }

    #[test]
    fn date_range_forms() {
        assert_eq!(
            DateRange::parse("20240101"),
            DateRange {
                from: Some("20240101".to_string()),
                to: Some("20240101".to_string())
            }
        );
        assert_eq!(
            DateRange::parse("20240101-20240301"),
            DateRange {
                from: Some("20240101".to_string()),
                to: Some("20240301".to_string())
            }
        );
        assert_eq!(
            DateRange::parse("-20240301"),
            DateRange {
                from: None,
                to: Some("20240301".to_string())
            }
        );
        assert_eq!(
            DateRange::parse("20240101-"),
            DateRange {
                from: Some("20240101".to_string()),
                to: None
            }
        );
    }

    #[test]
    fn page_limits_are_capped() {
        let page = Page {
            limit: Some(500),
            offset: None,
        };
        assert_eq!(page.effective_limit(), MAX_LIMIT);
        assert_eq!(Page::default().effective_limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn query_level_round_trip() {
        for level in [
            QueryLevel::Patient,
            QueryLevel::Study,
            QueryLevel::Series,
            QueryLevel::Instance,
        ] {
            let parsed: QueryLevel = level.to_string().parse().unwrap();
            assert_eq!(parsed, level);
        }
        assert!("BOGUS".parse::<QueryLevel>().is_err());
    }
}
