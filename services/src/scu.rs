//! Service class user clients: C-ECHO, C-STORE and C-FIND requesters.
use crate::command::{self, command_field, status, CommandSet};
use crate::error::{AssociationSnafu, CodecSnafu, PeerStatusSnafu, ProtocolSnafu, Result};
use crate::uids;
use pacs_core::DataSet;
use pacs_encoding::transfer_syntax::TransferSyntaxRegistry;
use pacs_encoding::{decode_data_set, encode_data_set};
use pacs_ul::{ClientAssociation, ClientAssociationOptions};
use snafu::ResultExt;
use std::net::ToSocketAddrs;
use tracing::debug;

fn options(calling_ae: &str, called_ae: &str) -> ClientAssociationOptions {
    ClientAssociationOptions::new()
        .calling_ae_title(calling_ae.to_string())
        .called_ae_title(called_ae.to_string())
}

/// Issue one C-ECHO and release.
pub fn echo<A: ToSocketAddrs>(address: A, calling_ae: &str, called_ae: &str) -> Result<()> {
    let mut assoc = options(calling_ae, called_ae)
        .with_abstract_syntax(uids::VERIFICATION)
        .establish(address)
        .context(AssociationSnafu)?;
    let ctx = assoc
        .context_for(uids::VERIFICATION)
        .ok_or_else(|| {
            ProtocolSnafu {
                detail: "verification context not accepted".to_string(),
            }
            .build()
        })?
        .clone();

    assoc
        .send_command(ctx.id, &command::echo_rq(1).to_bytes()?)
        .context(AssociationSnafu)?;
    let message = assoc
        .association()
        .receive_message(false)
        .context(AssociationSnafu)?;
    let rsp = CommandSet::parse(&message.command)?;
    match rsp.status() {
        Some(status::SUCCESS) => {
            assoc.release().context(AssociationSnafu)?;
            Ok(())
        }
        other => PeerStatusSnafu {
            status: other.unwrap_or(0xFFFF),
        }
        .fail(),
    }
}

/// A C-STORE requester holding one association open across sends.
pub struct StoreScu {
    assoc: ClientAssociation,
    next_message_id: u16,
}

impl StoreScu {
    /// Connect, proposing the given storage SOP classes
    /// (all served storage classes when empty).
    pub fn connect<A: ToSocketAddrs>(
        address: A,
        calling_ae: &str,
        called_ae: &str,
        sop_classes: &[&str],
    ) -> Result<Self> {
        let mut opts = options(calling_ae, called_ae);
        let classes: Vec<&str> = if sop_classes.is_empty() {
            uids::STORAGE_SOP_CLASSES.to_vec()
        } else {
            sop_classes.to_vec()
        };
        for sop_class in classes {
            opts = opts.with_abstract_syntax(sop_class.to_string());
        }
        let assoc = opts.establish(address).context(AssociationSnafu)?;
        Ok(StoreScu {
            assoc,
            next_message_id: 1,
        })
    }

    /// Send one instance; the data set is re-encoded to the transfer
    /// syntax accepted for the SOP class's presentation context.
    /// Returns the peer's status code.
    pub fn store(
        &mut self,
        sop_class_uid: &str,
        sop_instance_uid: &str,
        data_set: &DataSet,
    ) -> Result<u16> {
        let ctx = self
            .assoc
            .context_for(sop_class_uid)
            .ok_or_else(|| {
                ProtocolSnafu {
                    detail: format!("no accepted context for SOP class {}", sop_class_uid),
                }
                .build()
            })?
            .clone();
        let ts = TransferSyntaxRegistry::require(&ctx.transfer_syntax)
            .context(CodecSnafu { context: "negotiated transfer syntax" })?;
        let payload =
            encode_data_set(data_set, ts).context(CodecSnafu { context: "outbound instance" })?;

        let message_id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);
        let rq = command::store_rq(message_id, sop_class_uid, sop_instance_uid);
        self.assoc
            .send_command(ctx.id, &rq.to_bytes()?)
            .context(AssociationSnafu)?;
        self.assoc
            .send_data(ctx.id, &payload)
            .context(AssociationSnafu)?;

        let message = self
            .assoc
            .association()
            .receive_message(false)
            .context(AssociationSnafu)?;
        let rsp = CommandSet::parse(&message.command)?;
        let rsp_status = rsp.status().unwrap_or(status::UNABLE_TO_PROCESS);
        debug!(
            "C-STORE of {} answered with {:#06x}",
            sop_instance_uid, rsp_status
        );
        Ok(rsp_status)
    }

    /// Release the association.
    pub fn release(self) -> Result<()> {
        self.assoc.release().context(AssociationSnafu)
    }
}

/// Issue one C-FIND and collect every pending identifier.
pub fn find<A: ToSocketAddrs>(
    address: A,
    calling_ae: &str,
    called_ae: &str,
    sop_class_uid: &str,
    identifier: &DataSet,
) -> Result<Vec<DataSet>> {
    let mut assoc = options(calling_ae, called_ae)
        .with_abstract_syntax(sop_class_uid.to_string())
        .establish(address)
        .context(AssociationSnafu)?;
    let ctx = assoc
        .context_for(sop_class_uid)
        .ok_or_else(|| {
            ProtocolSnafu {
                detail: format!("no accepted context for {}", sop_class_uid),
            }
            .build()
        })?
        .clone();
    let ts = TransferSyntaxRegistry::require(&ctx.transfer_syntax)
        .context(CodecSnafu { context: "negotiated transfer syntax" })?;

    let rq = command::find_rq(1, sop_class_uid);
    assoc
        .send_command(ctx.id, &rq.to_bytes()?)
        .context(AssociationSnafu)?;
    let identifier_bytes =
        encode_data_set(identifier, ts).context(CodecSnafu { context: "query identifier" })?;
    assoc
        .send_data(ctx.id, &identifier_bytes)
        .context(AssociationSnafu)?;

    let mut matches = Vec::new();
    loop {
        let rsp_command = assoc
            .association()
            .receive_message(false)
            .context(AssociationSnafu)?;
        let rsp = CommandSet::parse(&rsp_command.command)?;
        let rsp_status = rsp.status().unwrap_or(status::UNABLE_TO_PROCESS);
        match rsp_status {
            status::PENDING | 0xFF01 => {
                if rsp.has_data_set() {
                    let message = assoc
                        .association()
                        .next_event()
                        .context(AssociationSnafu)?;
                    if let pacs_ul::association::AssociationEvent::Segment(
                        pacs_ul::association::PDataSegment::Data { data, .. },
                    ) = message
                    {
                        let ds = decode_data_set(&data, ts)
                            .context(CodecSnafu { context: "matched identifier" })?;
                        matches.push(ds);
                    }
                }
            }
            status::SUCCESS => break,
            status::CANCEL => break,
            failure => {
                return PeerStatusSnafu { status: failure }.fail();
            }
        }
        // the command field stays C-FIND-RSP throughout the stream
        debug_assert_eq!(
            rsp.command_field().ok(),
            Some(command_field::C_FIND_RSP)
        );
    }
    assoc.release().context(AssociationSnafu)?;
    Ok(matches)
}
