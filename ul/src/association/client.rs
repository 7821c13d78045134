//! Association requester (SCU side).
use crate::association::{
    Association, ConnectSnafu, MissingAbstractSyntaxSnafu, NoAcceptedPresentationContextsSnafu,
    PresentationContext, ProtocolVersionMismatchSnafu, ReceiveSnafu, RejectedSnafu, Result,
    SendSnafu, UnexpectedPduSnafu,
};
use crate::pdu::reader::{read_pdu, DEFAULT_MAX_PDU};
use crate::pdu::writer::write_pdu;
use crate::pdu::{Pdu, PresentationContextProposed, PresentationContextResultReason, UserVariableItem};
use crate::DICOM_APPLICATION_CONTEXT_NAME;
use snafu::{ensure, ResultExt};
use std::borrow::Cow;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// A builder for requesting and establishing an association
/// with another DICOM node, which usually takes the role of a
/// service class provider.
///
/// By default the transfer syntaxes Explicit VR Little Endian and
/// Implicit VR Little Endian are proposed for every abstract syntax;
/// others can be added with [`with_transfer_syntax`][Self::with_transfer_syntax].
#[derive(Debug, Clone)]
pub struct ClientAssociationOptions {
    calling_ae_title: Cow<'static, str>,
    called_ae_title: Cow<'static, str>,
    abstract_syntax_uids: Vec<Cow<'static, str>>,
    transfer_syntax_uids: Vec<Cow<'static, str>>,
    protocol_version: u16,
    max_pdu_length: u32,
    read_timeout: Option<Duration>,
}

impl Default for ClientAssociationOptions {
    fn default() -> Self {
        ClientAssociationOptions {
            calling_ae_title: "THIS-SCU".into(),
            called_ae_title: "ANY-SCP".into(),
            abstract_syntax_uids: Vec::new(),
            transfer_syntax_uids: Vec::new(),
            protocol_version: 1,
            max_pdu_length: DEFAULT_MAX_PDU,
            read_timeout: None,
        }
    }
}

impl ClientAssociationOptions {
    /// Create a new set of options for establishing an association.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the calling application entity title,
    /// which refers to this DICOM node.
    pub fn calling_ae_title<T>(mut self, calling_ae_title: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.calling_ae_title = calling_ae_title.into();
        self
    }

    /// Define the called application entity title,
    /// which refers to the target DICOM node.
    pub fn called_ae_title<T>(mut self, called_ae_title: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.called_ae_title = called_ae_title.into();
        self
    }

    /// Propose one more abstract syntax. Each abstract syntax becomes
    /// one presentation context in the request.
    pub fn with_abstract_syntax<T>(mut self, abstract_syntax_uid: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.abstract_syntax_uids.push(abstract_syntax_uid.into());
        self
    }

    /// Propose this transfer syntax in every presentation context.
    pub fn with_transfer_syntax<T>(mut self, transfer_syntax_uid: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.transfer_syntax_uids.push(transfer_syntax_uid.into());
        self
    }

    /// Override the maximum PDU length this node is willing to receive.
    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value;
        self
    }

    /// Set a read timeout on the underlying socket.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Connect to the peer and negotiate the association.
    pub fn establish<A: ToSocketAddrs>(self, address: A) -> Result<ClientAssociation> {
        let ClientAssociationOptions {
            calling_ae_title,
            called_ae_title,
            abstract_syntax_uids,
            mut transfer_syntax_uids,
            protocol_version,
            max_pdu_length,
            read_timeout,
        } = self;

        ensure!(!abstract_syntax_uids.is_empty(), MissingAbstractSyntaxSnafu);

        if transfer_syntax_uids.is_empty() {
            transfer_syntax_uids.push("1.2.840.10008.1.2.1".into());
            transfer_syntax_uids.push("1.2.840.10008.1.2".into());
        }

        let proposed: Vec<PresentationContextProposed> = abstract_syntax_uids
            .iter()
            .enumerate()
            .map(|(i, abstract_syntax)| PresentationContextProposed {
                // odd identifiers, one per abstract syntax
                id: (i * 2 + 1) as u8,
                abstract_syntax: abstract_syntax.to_string(),
                transfer_syntaxes: transfer_syntax_uids.iter().map(|ts| ts.to_string()).collect(),
            })
            .collect();

        let request = Pdu::AssociationRq {
            protocol_version,
            calling_ae_title: calling_ae_title.to_string(),
            called_ae_title: called_ae_title.to_string(),
            application_context_name: DICOM_APPLICATION_CONTEXT_NAME.to_string(),
            presentation_contexts: proposed.clone(),
            user_variables: vec![
                UserVariableItem::MaxLength(max_pdu_length),
                UserVariableItem::ImplementationClassUid(
                    pacs_encoding::part10::IMPLEMENTATION_CLASS_UID.to_string(),
                ),
                UserVariableItem::ImplementationVersionName(
                    pacs_encoding::part10::IMPLEMENTATION_VERSION_NAME.to_string(),
                ),
            ],
        };

        let mut socket = TcpStream::connect(address).context(ConnectSnafu)?;
        socket
            .set_read_timeout(read_timeout)
            .context(ConnectSnafu)?;
        write_pdu(&mut socket, &request).context(SendSnafu)?;
        debug!("{}", request.short_description());

        let response = read_pdu(&mut socket, max_pdu_length).context(ReceiveSnafu)?;
        match response {
            Pdu::AssociationAc {
                protocol_version: protocol_version_scp,
                presentation_contexts: results,
                user_variables,
                ..
            } => {
                ensure!(
                    protocol_version == protocol_version_scp,
                    ProtocolVersionMismatchSnafu {
                        expected: protocol_version,
                        got: protocol_version_scp,
                    }
                );

                let accepted: Vec<PresentationContext> = results
                    .iter()
                    .filter(|r| r.reason == PresentationContextResultReason::Acceptance)
                    .filter_map(|r| {
                        proposed.iter().find(|p| p.id == r.id).map(|p| {
                            PresentationContext {
                                id: r.id,
                                abstract_syntax: p.abstract_syntax.clone(),
                                transfer_syntax: r.transfer_syntax.clone(),
                            }
                        })
                    })
                    .collect();
                ensure!(!accepted.is_empty(), NoAcceptedPresentationContextsSnafu);

                let max_pdu_snd = user_variables
                    .iter()
                    .find_map(|uv| match uv {
                        UserVariableItem::MaxLength(max) => Some(*max),
                        _ => None,
                    })
                    .unwrap_or(DEFAULT_MAX_PDU);

                Ok(ClientAssociation {
                    inner: Association::new(
                        socket,
                        accepted,
                        max_pdu_length,
                        max_pdu_snd,
                        called_ae_title.to_string(),
                    ),
                })
            }
            Pdu::AssociationRj { result, source } => RejectedSnafu { result, source }.fail(),
            pdu => UnexpectedPduSnafu {
                pdu: Box::new(pdu),
                state: super::AssociationState::AwaitAc,
            }
            .fail(),
        }
    }
}

/// An association from the perspective of the requesting node.
#[derive(Debug)]
pub struct ClientAssociation {
    inner: Association,
}

impl ClientAssociation {
    /// Access the negotiated association.
    pub fn association(&mut self) -> &mut Association {
        &mut self.inner
    }

    /// Gracefully release the association.
    pub fn release(mut self) -> Result<()> {
        self.inner.release()
    }

    /// Abort the association immediately.
    pub fn abort(mut self) -> Result<()> {
        self.inner.abort()
    }
}

impl std::ops::Deref for ClientAssociation {
    type Target = Association;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::DerefMut for ClientAssociation {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
