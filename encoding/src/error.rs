//! Structured errors for the codec layer.
use pacs_core::{Tag, VR};
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The input violates the wire format in a way that is not a mere
    /// truncation (bad magic, non-zero reserved bytes, stray delimiter).
    #[snafu(display("Malformed data at position {}: {}", position, reason))]
    Malformed { position: u64, reason: String },

    /// The input ended in the middle of an element.
    #[snafu(display("Truncated input at position {} while reading {}", position, what))]
    Truncated {
        position: u64,
        what: &'static str,
        source: std::io::Error,
    },

    /// The two VR bytes are not a known value representation.
    #[snafu(display(
        "Unknown VR {:?} for tag {} at position {}",
        String::from_utf8_lossy(bytes),
        tag,
        position
    ))]
    UnknownVr {
        tag: Tag,
        bytes: [u8; 2],
        position: u64,
    },

    /// A value length that cannot be honored: odd, over the VR maximum,
    /// not a multiple of the VR's fixed size, or an undefined length on
    /// a non-sequence element.
    #[snafu(display("Invalid length {} for VR {} of tag {}", len, vr, tag))]
    InvalidLength { tag: Tag, vr: VR, len: u32 },

    /// A string value contains bytes outside the VR's repertoire.
    #[snafu(display("Invalid character {:#04x} for VR {}", byte, vr))]
    CharsetViolation { vr: VR, byte: u8 },

    /// Failure writing encoded output.
    #[snafu(display("Could not write encoded data"))]
    WriteOutput { source: std::io::Error },

    /// Failure inflating or deflating a compressed data set.
    #[snafu(display("Could not {} data set stream", operation))]
    Compression {
        operation: &'static str,
        source: std::io::Error,
    },

    /// The transfer syntax is not in the registry.
    #[snafu(display("Unsupported transfer syntax `{}`", uid))]
    UnsupportedTransferSyntax { uid: String },

    /// Part 10 file level problem.
    #[snafu(display("Invalid DICOM file: {}", reason))]
    InvalidFile { reason: String },

    /// I/O failure reading or writing a Part 10 file.
    #[snafu(display("Could not {} DICOM file", operation))]
    FileIo {
        operation: &'static str,
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
