//! Protocol data unit model for the upper layer protocol of PS3.8.
use std::fmt;

pub mod reader;
pub mod writer;

/// A presentation context as proposed in an A-ASSOCIATE-RQ:
/// one abstract syntax with the transfer syntaxes the requester
/// is able to use for it.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub struct PresentationContextProposed {
    /// context identifier, an odd number in 1..=255
    pub id: u8,
    pub abstract_syntax: String,
    pub transfer_syntaxes: Vec<String>,
}

/// A presentation context as answered in an A-ASSOCIATE-AC.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub struct PresentationContextResult {
    pub id: u8,
    pub reason: PresentationContextResultReason,
    /// the single transfer syntax chosen by the acceptor
    pub transfer_syntax: String,
}

/// The result/reason field of an answered presentation context.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum PresentationContextResultReason {
    Acceptance = 0,
    UserRejection = 1,
    NoReason = 2,
    AbstractSyntaxNotSupported = 3,
    TransferSyntaxesNotSupported = 4,
}

impl PresentationContextResultReason {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PresentationContextResultReason::Acceptance),
            1 => Some(PresentationContextResultReason::UserRejection),
            2 => Some(PresentationContextResultReason::NoReason),
            3 => Some(PresentationContextResultReason::AbstractSyntaxNotSupported),
            4 => Some(PresentationContextResultReason::TransferSyntaxesNotSupported),
            _ => None,
        }
    }
}

/// Whether an association rejection is permanent or transient.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AssociationRjResult {
    Permanent,
    Transient,
}

/// The source and reason of an A-ASSOCIATE-RJ.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AssociationRjSource {
    /// rejected by the service user (reason code per PS3.8 table 9-21)
    ServiceUser(u8),
    /// rejected by the service provider, ACSE related
    ServiceProviderAcse(u8),
    /// rejected by the service provider, presentation related
    ServiceProviderPresentation(u8),
}

/// The source of an A-ABORT.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum AbortSource {
    ServiceUser,
    ServiceProvider(u8),
}

/// One presentation data value inside a P-DATA-TF PDU.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub struct PDataValue {
    pub presentation_context_id: u8,
    pub value_type: PDataValueType,
    pub is_last: bool,
    pub data: Vec<u8>,
}

/// Whether a presentation data value carries command or data set bytes.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum PDataValueType {
    Command,
    Data,
}

/// A user information sub-item of an association negotiation PDU.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum UserVariableItem {
    MaxLength(u32),
    ImplementationClassUid(String),
    ImplementationVersionName(String),
    Unknown(u8, Vec<u8>),
}

/// A protocol data unit of the upper layer protocol.
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug)]
pub enum Pdu {
    /// A-ASSOCIATE-RQ (PDU type 01)
    AssociationRq {
        protocol_version: u16,
        calling_ae_title: String,
        called_ae_title: String,
        application_context_name: String,
        presentation_contexts: Vec<PresentationContextProposed>,
        user_variables: Vec<UserVariableItem>,
    },
    /// A-ASSOCIATE-AC (PDU type 02)
    AssociationAc {
        protocol_version: u16,
        application_context_name: String,
        presentation_contexts: Vec<PresentationContextResult>,
        user_variables: Vec<UserVariableItem>,
    },
    /// A-ASSOCIATE-RJ (PDU type 03)
    AssociationRj {
        result: AssociationRjResult,
        source: AssociationRjSource,
    },
    /// P-DATA-TF (PDU type 04)
    PData { data: Vec<PDataValue> },
    /// A-RELEASE-RQ (PDU type 05)
    ReleaseRq,
    /// A-RELEASE-RP (PDU type 06)
    ReleaseRp,
    /// A-ABORT (PDU type 07)
    AbortRq { source: AbortSource },
}

impl Pdu {
    /// A terse description for association traces.
    pub fn short_description(&self) -> String {
        match self {
            Pdu::AssociationRq {
                calling_ae_title,
                called_ae_title,
                presentation_contexts,
                ..
            } => format!(
                "A-ASSOCIATE-RQ {} -> {} ({} contexts)",
                calling_ae_title,
                called_ae_title,
                presentation_contexts.len()
            ),
            Pdu::AssociationAc {
                presentation_contexts,
                ..
            } => format!("A-ASSOCIATE-AC ({} contexts)", presentation_contexts.len()),
            Pdu::AssociationRj { result, source } => {
                format!("A-ASSOCIATE-RJ ({:?}, {:?})", result, source)
            }
            Pdu::PData { data } => {
                let bytes: usize = data.iter().map(|pdv| pdv.data.len()).sum();
                format!("P-DATA-TF ({} PDVs, {} bytes)", data.len(), bytes)
            }
            Pdu::ReleaseRq => "A-RELEASE-RQ".to_string(),
            Pdu::ReleaseRp => "A-RELEASE-RP".to_string(),
            Pdu::AbortRq { source } => format!("A-ABORT ({:?})", source),
        }
    }
}

impl fmt::Display for Pdu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.short_description())
    }
}
