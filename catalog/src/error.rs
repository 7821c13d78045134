//! Error taxonomy of the catalog.
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// No record matches the given key.
    #[snafu(display("No {} record for `{}`", level, key))]
    NotFound { level: &'static str, key: String },

    /// A UID is already registered under a different parent.
    #[snafu(display("UID `{}` already exists under a different {}", uid, parent))]
    DuplicateUid { uid: String, parent: &'static str },

    /// A relational constraint was violated.
    #[snafu(display("Constraint violation: {}", detail))]
    ConstraintViolation { detail: String },

    /// The database could not be opened or executed against.
    #[snafu(display("Catalog backend unavailable during {}", operation))]
    BackendUnavailable {
        operation: &'static str,
        source: rusqlite::Error,
    },

    /// A cursor resume token could not be decoded.
    #[snafu(display("Invalid cursor resume token"))]
    InvalidResumeToken { source: serde_json::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
