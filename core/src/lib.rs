//! This crate contains the foundational types for handling DICOM data:
//! attribute tags, value representations and their encoding metadata,
//! data elements and data sets, the standard data dictionary,
//! and unique identifier generation.
//!
//! The types here are transport-agnostic. Encoding and decoding for
//! concrete transfer syntaxes live in `pacs-encoding`.
pub mod dataset;
pub mod dictionary;
pub mod error;
pub mod header;
pub mod uid;
pub mod value;
pub mod vm;
pub mod vr;

pub use crate::dataset::DataSet;
pub use crate::dictionary::{lookup, tags, TagInfo};
pub use crate::error::{Error, Result};
pub use crate::header::{DataElementHeader, Length, Tag};
pub use crate::uid::generate_uid;
pub use crate::value::{DataElement, Value};
pub use crate::vm::ValueMultiplicity;
pub use crate::vr::VR;
