//! DICOM encoding and decoding primitives for this PACS:
//! transfer syntax selection, bit-exact data set codecs for the
//! uncompressed transfer syntaxes, the deflated variant, VR-directed
//! endianness conversion, value validation, and Part 10 file support.
pub mod decode;
pub mod deflate;
pub mod encode;
pub mod error;
pub mod part10;
pub mod swap;
pub mod text;
pub mod transfer_syntax;

pub use crate::decode::{decode_data_set, decode_element};
pub use crate::encode::{encode_data_set, encode_element};
pub use crate::error::{Error, Result};
pub use crate::swap::{swap_from_big_endian, swap_to_big_endian};
pub use crate::text::validate_value;
pub use crate::transfer_syntax::{TransferSyntax, TransferSyntaxRegistry};
