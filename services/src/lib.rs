//! DIMSE service classes and the query surfaces of the PACS.
//!
//! The crate glues the lower layers together: associations from
//! `pacs-ul`, the codec from `pacs-encoding`, the index from
//! `pacs-catalog` and the object store from `pacs-hsm`. It provides
//! the SCP handlers (C-ECHO, C-STORE, C-FIND with query/retrieve and
//! worklist models, C-MOVE), the matching SCU clients, the modality
//! worklist store, the thread-per-association TCP server, and the
//! transport-free REST endpoint contracts.
pub mod api;
pub mod command;
pub mod error;
pub mod find;
pub mod retrieve;
pub mod scu;
pub mod server;
pub mod store;
pub mod uids;
pub mod worklist;

pub use crate::api::{Page, Pagination, RestApi, RestError};
pub use crate::command::{command_field, status, CommandSet};
pub use crate::error::{Error, Result};
pub use crate::retrieve::MoveDestinations;
pub use crate::server::{DicomServer, PacsContext, ServerConfig};
pub use crate::worklist::{WorklistItem, WorklistStore};
