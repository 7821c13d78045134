//! Association state machines for the upper layer protocol.
//!
//! Both peers hold an [`Association`] after negotiation succeeds:
//! the requesting side builds one through
//! [`client::ClientAssociationOptions`] and the accepting side through
//! [`server::ServerAssociationOptions`]. The association owns the
//! socket, the negotiated presentation contexts and the PDU size
//! limits, and moves through the states of PS3.8 section 9.2.
pub mod client;
pub mod server;

use crate::pdu::reader::read_pdu;
use crate::pdu::writer::write_pdu;
use crate::pdu::{
    AbortSource, AssociationRjResult, AssociationRjSource, PDataValue, PDataValueType, Pdu,
};
use bytes::BytesMut;
use snafu::{Backtrace, ResultExt, Snafu};
use std::net::TcpStream;
use tracing::{debug, warn};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// could not connect to the peer node
    Connect {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// missing abstract syntax to begin negotiation
    MissingAbstractSyntax { backtrace: Backtrace },

    /// failed to send a PDU
    Send {
        #[snafu(backtrace)]
        source: crate::pdu::writer::Error,
    },

    /// failed to receive a PDU
    Receive {
        #[snafu(backtrace)]
        source: crate::pdu::reader::Error,
    },

    #[snafu(display("association rejected by the peer ({:?}, {:?})", result, source))]
    Rejected {
        result: AssociationRjResult,
        #[snafu(source(false))]
        source: AssociationRjSource,
    },

    /// no presentation context was accepted
    NoAcceptedPresentationContexts { backtrace: Backtrace },

    #[snafu(display("unexpected PDU `{}` in state {:?}", pdu.short_description(), state))]
    UnexpectedPdu { pdu: Box<Pdu>, state: AssociationState },

    #[snafu(display("protocol version mismatch: expected {}, got {}", expected, got))]
    ProtocolVersionMismatch { expected: u16, got: u16 },

    #[snafu(display("presentation context {} was not accepted", id))]
    ContextNotAccepted { id: u8 },

    #[snafu(display("the peer aborted the association ({:?})", source_info))]
    PeerAborted { source_info: AbortSource },

    #[snafu(display("the association is {:?}", state))]
    NotEstablished { state: AssociationState },

    #[snafu(display("unexpected message flow: {}", detail))]
    UnexpectedMessageFlow { detail: &'static str },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The states of an association, per the PS3.8 state machine
/// (collapsed to the states meaningful after socket-level setup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationState {
    /// A-ASSOCIATE-RQ sent, waiting for the answer (requester only).
    AwaitAc,
    /// Data transfer is possible.
    Established,
    /// A-RELEASE-RQ sent, waiting for A-RELEASE-RP.
    AwaitReleaseRp,
    /// The association ended (released, rejected or aborted).
    Closed,
}

/// A negotiated presentation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationContext {
    pub id: u8,
    pub abstract_syntax: String,
    pub transfer_syntax: String,
}

/// A fully reassembled DIMSE message: the command set bytes and,
/// when the command announces one, the data set bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimseMessage {
    pub presentation_context_id: u8,
    pub command: Vec<u8>,
    pub data: Option<Vec<u8>>,
}

/// One reassembled stream of P-DATA fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PDataSegment {
    Command {
        presentation_context_id: u8,
        data: Vec<u8>,
    },
    Data {
        presentation_context_id: u8,
        data: Vec<u8>,
    },
}

/// What the peer did while we were waiting for data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociationEvent {
    /// A complete command or data stream arrived.
    Segment(PDataSegment),
    /// The peer asked to release the association.
    ReleaseRequested,
    /// The peer aborted the association.
    Aborted(AbortSource),
}

/// A negotiated DICOM association, either side of the conversation.
#[derive(Debug)]
pub struct Association {
    socket: TcpStream,
    state: AssociationState,
    presentation_contexts: Vec<PresentationContext>,
    /// maximum PDU length accepted by this node
    max_pdu_rcv: u32,
    /// maximum PDU length announced by the peer
    max_pdu_snd: u32,
    peer_ae_title: String,
}

// PDV item header: 4-byte length, context id, message control header
const PDV_OVERHEAD: u32 = 6;

impl Association {
    pub(crate) fn new(
        socket: TcpStream,
        presentation_contexts: Vec<PresentationContext>,
        max_pdu_rcv: u32,
        max_pdu_snd: u32,
        peer_ae_title: String,
    ) -> Self {
        Association {
            socket,
            state: AssociationState::Established,
            presentation_contexts,
            max_pdu_rcv,
            // guard against absurd announcements below the standard floor
            max_pdu_snd: max_pdu_snd.max(crate::pdu::reader::MINIMUM_PDU_SIZE),
            peer_ae_title,
        }
    }

    /// The presentation contexts accepted for this association.
    pub fn presentation_contexts(&self) -> &[PresentationContext] {
        &self.presentation_contexts
    }

    /// Find the accepted context with the given identifier.
    pub fn context(&self, id: u8) -> Option<&PresentationContext> {
        self.presentation_contexts.iter().find(|pc| pc.id == id)
    }

    /// Find an accepted context for the given abstract syntax.
    pub fn context_for(&self, abstract_syntax: &str) -> Option<&PresentationContext> {
        self.presentation_contexts
            .iter()
            .find(|pc| pc.abstract_syntax == abstract_syntax)
    }

    /// The AE title of the peer node.
    pub fn peer_ae_title(&self) -> &str {
        &self.peer_ae_title
    }

    /// The current state of the association.
    pub fn state(&self) -> AssociationState {
        self.state
    }

    /// Send a raw PDU.
    pub fn send(&mut self, pdu: &Pdu) -> Result<()> {
        write_pdu(&mut self.socket, pdu).context(SendSnafu)
    }

    /// Receive a raw PDU.
    pub fn receive(&mut self) -> Result<Pdu> {
        read_pdu(&mut self.socket, self.max_pdu_rcv).context(ReceiveSnafu)
    }

    /// Send a command set over the given presentation context,
    /// fragmenting it to the peer's maximum PDU length.
    pub fn send_command(&mut self, presentation_context_id: u8, command: &[u8]) -> Result<()> {
        self.send_fragments(presentation_context_id, PDataValueType::Command, command)
    }

    /// Send data set bytes over the given presentation context.
    pub fn send_data(&mut self, presentation_context_id: u8, data: &[u8]) -> Result<()> {
        self.send_fragments(presentation_context_id, PDataValueType::Data, data)
    }

    /// Send a whole DIMSE message: the command set and, if present,
    /// the data set.
    pub fn send_message(&mut self, message: &DimseMessage) -> Result<()> {
        self.send_command(message.presentation_context_id, &message.command)?;
        if let Some(data) = &message.data {
            self.send_data(message.presentation_context_id, data)?;
        }
        Ok(())
    }

    fn send_fragments(
        &mut self,
        presentation_context_id: u8,
        value_type: PDataValueType,
        payload: &[u8],
    ) -> Result<()> {
        self.ensure_established()?;
        if self.context(presentation_context_id).is_none() {
            self.abort_for_protocol_error();
            return ContextNotAcceptedSnafu {
                id: presentation_context_id,
            }
            .fail();
        }
        let chunk_size = (self.max_pdu_snd - PDV_OVERHEAD) as usize;
        let mut offset = 0;
        loop {
            let end = (offset + chunk_size).min(payload.len());
            let is_last = end == payload.len();
            self.send(&Pdu::PData {
                data: vec![PDataValue {
                    presentation_context_id,
                    value_type,
                    is_last,
                    data: payload[offset..end].to_vec(),
                }],
            })?;
            if is_last {
                return Ok(());
            }
            offset = end;
        }
    }

    /// Wait for the next complete command or data stream,
    /// or for the peer to release or abort.
    pub fn next_event(&mut self) -> Result<AssociationEvent> {
        self.ensure_established()?;
        let mut buffer = BytesMut::new();
        let mut current: Option<(u8, PDataValueType)> = None;

        loop {
            let pdu = self.receive()?;
            match pdu {
                Pdu::PData { data } => {
                    for pdv in data {
                        if self.context(pdv.presentation_context_id).is_none() {
                            self.abort_for_protocol_error();
                            return ContextNotAcceptedSnafu {
                                id: pdv.presentation_context_id,
                            }
                            .fail();
                        }
                        match current {
                            None => current = Some((pdv.presentation_context_id, pdv.value_type)),
                            Some((id, value_type)) => {
                                // fragments of one stream may not interleave
                                if id != pdv.presentation_context_id
                                    || value_type != pdv.value_type
                                {
                                    self.abort_for_protocol_error();
                                    return ContextNotAcceptedSnafu {
                                        id: pdv.presentation_context_id,
                                    }
                                    .fail();
                                }
                            }
                        }
                        buffer.extend_from_slice(&pdv.data);
                        if pdv.is_last {
                            let (presentation_context_id, value_type) =
                                current.take().unwrap_or((
                                    pdv.presentation_context_id,
                                    pdv.value_type,
                                ));
                            let data = buffer.freeze().to_vec();
                            let segment = match value_type {
                                PDataValueType::Command => PDataSegment::Command {
                                    presentation_context_id,
                                    data,
                                },
                                PDataValueType::Data => PDataSegment::Data {
                                    presentation_context_id,
                                    data,
                                },
                            };
                            return Ok(AssociationEvent::Segment(segment));
                        }
                    }
                }
                Pdu::ReleaseRq => {
                    debug!("peer requested release");
                    return Ok(AssociationEvent::ReleaseRequested);
                }
                Pdu::AbortRq { source } => {
                    warn!("peer aborted the association: {:?}", source);
                    self.state = AssociationState::Closed;
                    return Ok(AssociationEvent::Aborted(source));
                }
                pdu => {
                    let state = self.state;
                    self.abort_for_protocol_error();
                    return UnexpectedPduSnafu {
                        pdu: Box::new(pdu),
                        state,
                    }
                    .fail();
                }
            }
        }
    }

    /// Receive a complete DIMSE message. `expect_data` tells whether the
    /// command set announced an accompanying data set (the ul layer does
    /// not parse command sets).
    pub fn receive_message(&mut self, expect_data: bool) -> Result<DimseMessage> {
        let (presentation_context_id, command) = match self.next_event()? {
            AssociationEvent::Segment(PDataSegment::Command {
                presentation_context_id,
                data,
            }) => (presentation_context_id, data),
            AssociationEvent::Aborted(source) => {
                return PeerAbortedSnafu { source_info: source }.fail()
            }
            AssociationEvent::Segment(PDataSegment::Data { .. }) => {
                return UnexpectedMessageFlowSnafu {
                    detail: "data stream before a command set",
                }
                .fail()
            }
            AssociationEvent::ReleaseRequested => {
                return UnexpectedMessageFlowSnafu {
                    detail: "release request in the middle of a message",
                }
                .fail()
            }
        };
        let data = if expect_data {
            match self.next_event()? {
                AssociationEvent::Segment(PDataSegment::Data { data, .. }) => Some(data),
                AssociationEvent::Aborted(source) => {
                    return PeerAbortedSnafu { source_info: source }.fail()
                }
                _ => {
                    return UnexpectedMessageFlowSnafu {
                        detail: "command set without its announced data set",
                    }
                    .fail()
                }
            }
        } else {
            None
        };
        Ok(DimseMessage {
            presentation_context_id,
            command,
            data,
        })
    }

    /// Wait for the next event for at most `timeout`.
    /// Returns `None` when nothing arrived in time. Used by response
    /// streams to poll for a C-CANCEL between messages.
    pub fn try_next_event(&mut self, timeout: std::time::Duration) -> Result<Option<AssociationEvent>> {
        let _ = self.socket.set_read_timeout(Some(timeout));
        let result = self.next_event();
        let _ = self.socket.set_read_timeout(None);
        match result {
            Ok(event) => Ok(Some(event)),
            Err(Error::Receive { source }) if is_read_timeout(&source) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Gracefully release the association from the requesting side.
    pub fn release(&mut self) -> Result<()> {
        if self.state != AssociationState::Established {
            return Ok(());
        }
        self.send(&Pdu::ReleaseRq)?;
        self.state = AssociationState::AwaitReleaseRp;
        let pdu = self.receive()?;
        self.state = AssociationState::Closed;
        match pdu {
            Pdu::ReleaseRp => {
                let _ = self.socket.shutdown(std::net::Shutdown::Both);
                Ok(())
            }
            pdu => UnexpectedPduSnafu {
                pdu: Box::new(pdu),
                state: AssociationState::AwaitReleaseRp,
            }
            .fail(),
        }
    }

    /// Answer a release request from the peer and close.
    pub fn confirm_release(&mut self) -> Result<()> {
        self.send(&Pdu::ReleaseRp)?;
        self.state = AssociationState::Closed;
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        Ok(())
    }

    /// Abort the association immediately.
    pub fn abort(&mut self) -> Result<()> {
        let result = self.send(&Pdu::AbortRq {
            source: AbortSource::ServiceUser,
        });
        self.state = AssociationState::Closed;
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        result
    }

    fn abort_for_protocol_error(&mut self) {
        let _ = self.send(&Pdu::AbortRq {
            source: AbortSource::ServiceProvider(2),
        });
        self.state = AssociationState::Closed;
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
    }

    fn ensure_established(&self) -> Result<()> {
        snafu::ensure!(
            self.state == AssociationState::Established,
            NotEstablishedSnafu { state: self.state }
        );
        Ok(())
    }
}

/// Whether a receive failure is a mere read timeout on the first byte
/// of a PDU (no data consumed).
fn is_read_timeout(error: &crate::pdu::reader::Error) -> bool {
    match error {
        crate::pdu::reader::Error::ReadPduField {
            field: "type",
            source,
            ..
        } => matches!(
            source.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ),
        _ => false,
    }
}

impl Drop for Association {
    fn drop(&mut self) {
        if self.state == AssociationState::Established {
            let _ = self.release();
        }
    }
}
