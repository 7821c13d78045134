//! Association acceptor (SCP side).
use crate::association::{
    Association, PresentationContext, ReceiveSnafu, RejectedSnafu, Result, SendSnafu,
    UnexpectedPduSnafu,
};
use crate::pdu::reader::{read_pdu, DEFAULT_MAX_PDU};
use crate::pdu::writer::write_pdu;
use crate::pdu::{
    AssociationRjResult, AssociationRjSource, Pdu, PresentationContextResult,
    PresentationContextResultReason, UserVariableItem,
};
use pacs_encoding::transfer_syntax::TransferSyntaxRegistry;
use snafu::ResultExt;
use std::borrow::Cow;
use std::net::TcpStream;
use tracing::debug;

/// Reject reason: called AE title not recognized (PS3.8 table 9-21).
const REASON_CALLED_AE_NOT_RECOGNIZED: u8 = 7;

/// A builder for accepting an association on an incoming connection.
///
/// An acceptor answers each proposed presentation context with the
/// first proposed transfer syntax it supports, or a rejection when the
/// abstract syntax is not served or no transfer syntax is usable.
#[derive(Debug, Clone)]
pub struct ServerAssociationOptions {
    ae_title: Cow<'static, str>,
    /// abstract syntaxes served; empty means any
    accepted_abstract_syntaxes: Vec<Cow<'static, str>>,
    max_pdu_length: u32,
    /// accept any called AE title
    promiscuous: bool,
}

impl Default for ServerAssociationOptions {
    fn default() -> Self {
        ServerAssociationOptions {
            ae_title: "THIS-SCP".into(),
            accepted_abstract_syntaxes: Vec::new(),
            max_pdu_length: DEFAULT_MAX_PDU,
            promiscuous: false,
        }
    }
}

impl ServerAssociationOptions {
    /// Create a new set of options for accepting associations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define this node's application entity title.
    pub fn ae_title<T>(mut self, ae_title: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.ae_title = ae_title.into();
        self
    }

    /// Serve the given abstract syntax. When none is declared,
    /// every proposed abstract syntax is admitted.
    pub fn with_abstract_syntax<T>(mut self, abstract_syntax_uid: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.accepted_abstract_syntaxes
            .push(abstract_syntax_uid.into());
        self
    }

    /// Override the maximum PDU length this node is willing to receive.
    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value;
        self
    }

    /// Accept associations regardless of the called AE title.
    pub fn promiscuous(mut self, value: bool) -> Self {
        self.promiscuous = value;
        self
    }

    /// Negotiate an association on an accepted TCP connection.
    pub fn accept(&self, mut socket: TcpStream) -> Result<ServerAssociation> {
        let request = read_pdu(&mut socket, self.max_pdu_length).context(ReceiveSnafu)?;
        let (protocol_version, calling_ae_title, called_ae_title, presentation_contexts, user_variables) =
            match request {
                Pdu::AssociationRq {
                    protocol_version,
                    calling_ae_title,
                    called_ae_title,
                    presentation_contexts,
                    user_variables,
                    ..
                } => (
                    protocol_version,
                    calling_ae_title,
                    called_ae_title,
                    presentation_contexts,
                    user_variables,
                ),
                pdu => {
                    return UnexpectedPduSnafu {
                        pdu: Box::new(pdu),
                        state: super::AssociationState::AwaitAc,
                    }
                    .fail()
                }
            };

        if !self.promiscuous && called_ae_title != self.ae_title {
            let rejection = Pdu::AssociationRj {
                result: AssociationRjResult::Permanent,
                source: AssociationRjSource::ServiceUser(REASON_CALLED_AE_NOT_RECOGNIZED),
            };
            write_pdu(&mut socket, &rejection).context(SendSnafu)?;
            return RejectedSnafu {
                result: AssociationRjResult::Permanent,
                source: AssociationRjSource::ServiceUser(REASON_CALLED_AE_NOT_RECOGNIZED),
            }
            .fail();
        }

        let mut results = Vec::with_capacity(presentation_contexts.len());
        let mut accepted = Vec::new();
        for pc in &presentation_contexts {
            let syntax_served = self.accepted_abstract_syntaxes.is_empty()
                || self
                    .accepted_abstract_syntaxes
                    .iter()
                    .any(|s| s == &pc.abstract_syntax);
            if !syntax_served {
                results.push(PresentationContextResult {
                    id: pc.id,
                    reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
                    transfer_syntax: "1.2.840.10008.1.2".to_string(),
                });
                continue;
            }
            // choose the first proposed transfer syntax we can decode
            match pc
                .transfer_syntaxes
                .iter()
                .find(|ts| TransferSyntaxRegistry::get(ts).is_some())
            {
                Some(ts) => {
                    results.push(PresentationContextResult {
                        id: pc.id,
                        reason: PresentationContextResultReason::Acceptance,
                        transfer_syntax: ts.clone(),
                    });
                    accepted.push(PresentationContext {
                        id: pc.id,
                        abstract_syntax: pc.abstract_syntax.clone(),
                        transfer_syntax: ts.clone(),
                    });
                }
                None => {
                    results.push(PresentationContextResult {
                        id: pc.id,
                        reason: PresentationContextResultReason::TransferSyntaxesNotSupported,
                        transfer_syntax: "1.2.840.10008.1.2".to_string(),
                    });
                }
            }
        }

        let max_pdu_snd = user_variables
            .iter()
            .find_map(|uv| match uv {
                UserVariableItem::MaxLength(max) => Some(*max),
                _ => None,
            })
            .unwrap_or(DEFAULT_MAX_PDU);

        let response = Pdu::AssociationAc {
            protocol_version,
            application_context_name: crate::DICOM_APPLICATION_CONTEXT_NAME.to_string(),
            presentation_contexts: results,
            user_variables: vec![
                UserVariableItem::MaxLength(self.max_pdu_length),
                UserVariableItem::ImplementationClassUid(
                    pacs_encoding::part10::IMPLEMENTATION_CLASS_UID.to_string(),
                ),
                UserVariableItem::ImplementationVersionName(
                    pacs_encoding::part10::IMPLEMENTATION_VERSION_NAME.to_string(),
                ),
            ],
        };
        write_pdu(&mut socket, &response).context(SendSnafu)?;
        debug!(
            "accepted association from {} ({} of {} contexts)",
            calling_ae_title,
            accepted.len(),
            presentation_contexts.len()
        );

        Ok(ServerAssociation {
            inner: Association::new(
                socket,
                accepted,
                self.max_pdu_length,
                max_pdu_snd,
                calling_ae_title,
            ),
        })
    }
}

/// An association from the perspective of the accepting node.
#[derive(Debug)]
pub struct ServerAssociation {
    inner: Association,
}

impl ServerAssociation {
    /// Access the negotiated association.
    pub fn association(&mut self) -> &mut Association {
        &mut self.inner
    }
}

impl std::ops::Deref for ServerAssociation {
    type Target = Association;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::DerefMut for ServerAssociation {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
