//! DICOM Upper Layer Protocol for this PACS.
//!
//! This crate implements the PDU layer of PS3.8 (types 01 through 07)
//! and the association state machines for both the requesting side
//! (SCU) and the accepting side (SCP), including presentation context
//! negotiation and P-DATA fragmentation and reassembly.
pub mod association;
pub mod pdu;

pub use crate::association::client::{ClientAssociation, ClientAssociationOptions};
pub use crate::association::server::{ServerAssociation, ServerAssociationOptions};
pub use crate::association::{AssociationState, DimseMessage};
pub use crate::pdu::Pdu;

/// The application context name of the DICOM application context,
/// the only one defined by the standard.
pub const DICOM_APPLICATION_CONTEXT_NAME: &str = "1.2.840.10008.3.1.1.1";
