//! Service-layer errors, converting the component errors at the
//! boundary.
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Association-level failure.
    #[snafu(display("Association error"))]
    Association {
        #[snafu(backtrace)]
        source: pacs_ul::association::Error,
    },

    /// Codec failure on a command or data set.
    #[snafu(display("Codec error during {}", context))]
    Codec {
        context: &'static str,
        source: pacs_encoding::Error,
    },

    /// Catalog failure.
    #[snafu(display("Catalog error"))]
    Catalog { source: pacs_catalog::Error },

    /// Storage failure.
    #[snafu(display("Storage error"))]
    Storage { source: pacs_hsm::Error },

    /// The peer violated the DIMSE exchange rules.
    #[snafu(display("Protocol error: {}", detail))]
    Protocol { detail: String },

    /// A command set lacks a mandatory field.
    #[snafu(display("Command set is missing `{}`", field))]
    MissingCommandField { field: &'static str },

    /// The peer answered a request with a failure status.
    #[snafu(display("Peer answered with status {:#06x}", status))]
    PeerStatus { status: u16 },

    /// A move destination AE title has no configured address.
    #[snafu(display("Unknown move destination `{}`", ae_title))]
    UnknownMoveDestination { ae_title: String },

    /// Worklist persistence failure.
    #[snafu(display("Could not {} worklist file", operation))]
    WorklistIo {
        operation: &'static str,
        source: std::io::Error,
    },

    /// Worklist (de)serialization failure.
    #[snafu(display("Could not decode worklist file"))]
    WorklistFormat { source: serde_json::Error },

    /// Server socket failure.
    #[snafu(display("Could not {} server socket", operation))]
    ServerSocket {
        operation: &'static str,
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
