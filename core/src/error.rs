//! Crate-level error types for data element and data set access.
use crate::header::Tag;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The data set does not contain the requested element.
    #[snafu(display("No such data element {}", tag))]
    MissingElement { tag: Tag },

    /// The element exists but holds a value of an incompatible kind
    /// (e.g. a sequence where a primitive was requested).
    #[snafu(display("Unexpected value kind in element {}", tag))]
    UnexpectedValueKind { tag: Tag },

    /// The element's bytes could not be interpreted as text.
    #[snafu(display("Invalid text value in element {}", tag))]
    InvalidText {
        tag: Tag,
        source: std::str::Utf8Error,
    },

    /// The element's byte length does not fit the requested numeric type.
    #[snafu(display(
        "Invalid value length {} in element {} (expected a multiple of {})",
        len,
        tag,
        width
    ))]
    InvalidNumericLength { tag: Tag, len: usize, width: usize },

    /// A value multiplicity pattern could not be parsed.
    #[snafu(display("Invalid value multiplicity pattern `{}`", pattern))]
    InvalidMultiplicity { pattern: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
