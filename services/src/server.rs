//! The DIMSE server: a single-threaded accept loop dispatching each
//! association to its own worker thread.
use crate::command::{self, command_field, status, CommandSet};
use crate::error::{AssociationSnafu, ProtocolSnafu, Result, ServerSocketSnafu};
use crate::retrieve::{collect_instances, execute_move, MoveDestinations};
use crate::store::IngestPipeline;
use crate::worklist::WorklistStore;
use crate::{find, uids};
use pacs_catalog::Catalog;
use pacs_encoding::transfer_syntax::{TransferSyntax, TransferSyntaxRegistry};
use pacs_hsm::HsmStorage;
use pacs_ul::association::{Association, AssociationEvent, PDataSegment};
use pacs_ul::{ServerAssociation, ServerAssociationOptions};
use snafu::ResultExt;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn};

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ae_title: String,
    pub listen_addr: String,
    pub max_pdu_length: u32,
    /// accept associations regardless of the called AE title
    pub promiscuous: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            ae_title: "PACS-SCP".to_string(),
            listen_addr: "0.0.0.0:11112".to_string(),
            max_pdu_length: pacs_ul::pdu::reader::DEFAULT_MAX_PDU,
            promiscuous: false,
        }
    }
}

/// The shared state every association worker sees.
pub struct PacsContext {
    pub ingest: IngestPipeline,
    pub worklist: Arc<WorklistStore>,
    pub move_destinations: Arc<MoveDestinations>,
    pub ae_title: String,
}

impl PacsContext {
    pub fn new(
        catalog: Catalog,
        hsm: Arc<HsmStorage>,
        worklist: Arc<WorklistStore>,
        move_destinations: Arc<MoveDestinations>,
        ae_title: impl Into<String>,
    ) -> Self {
        PacsContext {
            ingest: IngestPipeline::new(catalog, hsm),
            worklist,
            move_destinations,
            ae_title: ae_title.into(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.ingest.catalog()
    }

    pub fn hsm(&self) -> &Arc<HsmStorage> {
        self.ingest.hsm()
    }
}

/// The DIMSE SCP: owns the listen socket, accepts associations and
/// hands each one to a worker thread.
pub struct DicomServer {
    config: ServerConfig,
    context: Arc<PacsContext>,
    stop: Arc<AtomicBool>,
}

impl DicomServer {
    pub fn new(config: ServerConfig, context: Arc<PacsContext>) -> Self {
        DicomServer {
            config,
            context,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle that unblocks [`run`][Self::run] on the next poll.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Bind the configured address and serve until stopped.
    pub fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .context(ServerSocketSnafu { operation: "bind" })?;
        info!(
            "listening on {} as {}",
            self.config.listen_addr, self.config.ae_title
        );
        self.run_on(listener)
    }

    /// Serve on an already bound listener.
    pub fn run_on(&self, listener: TcpListener) -> Result<()> {
        listener
            .set_nonblocking(true)
            .context(ServerSocketSnafu { operation: "configure" })?;
        loop {
            if self.stop.load(Ordering::SeqCst) {
                info!("server stopping");
                return Ok(());
            }
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!("connection from {}", peer);
                    let _ = stream.set_nonblocking(false);
                    let options = self.association_options();
                    let context = Arc::clone(&self.context);
                    std::thread::spawn(move || {
                        let span = info_span!("association", %peer);
                        let _entered = span.enter();
                        match options.accept(stream) {
                            Ok(assoc) => {
                                if let Err(e) = serve_association(assoc, &context) {
                                    warn!("association ended with error: {}", e);
                                }
                            }
                            Err(e) => debug!("association not established: {}", e),
                        }
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    error!("accept failed: {}", e);
                    std::thread::sleep(Duration::from_millis(200));
                }
            }
        }
    }

    fn association_options(&self) -> ServerAssociationOptions {
        let mut options = ServerAssociationOptions::new()
            .ae_title(self.config.ae_title.clone())
            .max_pdu_length(self.config.max_pdu_length)
            .promiscuous(self.config.promiscuous)
            .with_abstract_syntax(uids::VERIFICATION)
            .with_abstract_syntax(uids::STUDY_ROOT_QR_FIND)
            .with_abstract_syntax(uids::STUDY_ROOT_QR_MOVE)
            .with_abstract_syntax(uids::PATIENT_ROOT_QR_FIND)
            .with_abstract_syntax(uids::PATIENT_ROOT_QR_MOVE)
            .with_abstract_syntax(uids::MODALITY_WORKLIST_FIND);
        for sop_class in uids::STORAGE_SOP_CLASSES {
            options = options.with_abstract_syntax(*sop_class);
        }
        options
    }
}

/// Serve one association until release or abort.
fn serve_association(mut assoc: ServerAssociation, context: &PacsContext) -> Result<()> {
    loop {
        let event = assoc
            .association()
            .next_event()
            .context(AssociationSnafu)?;
        match event {
            AssociationEvent::Segment(PDataSegment::Command {
                presentation_context_id,
                data,
            }) => {
                let cmd = CommandSet::parse(&data)?;
                dispatch(&mut assoc, presentation_context_id, cmd, context)?;
            }
            AssociationEvent::Segment(PDataSegment::Data { .. }) => {
                return ProtocolSnafu {
                    detail: "data stream without a preceding command".to_string(),
                }
                .fail();
            }
            AssociationEvent::ReleaseRequested => {
                assoc
                    .association()
                    .confirm_release()
                    .context(AssociationSnafu)?;
                return Ok(());
            }
            AssociationEvent::Aborted(_) => return Ok(()),
        }
    }
}

/// Read the data set that a command announced.
fn read_announced_data(assoc: &mut ServerAssociation, cmd: &CommandSet) -> Result<Option<Vec<u8>>> {
    if !cmd.has_data_set() {
        return Ok(None);
    }
    match assoc
        .association()
        .next_event()
        .context(AssociationSnafu)?
    {
        AssociationEvent::Segment(PDataSegment::Data { data, .. }) => Ok(Some(data)),
        _ => ProtocolSnafu {
            detail: "announced data set never arrived".to_string(),
        }
        .fail(),
    }
}

/// The negotiated transfer syntax of a presentation context.
fn negotiated_ts(
    assoc: &Association,
    presentation_context_id: u8,
) -> Result<&'static TransferSyntax> {
    let ctx = assoc.context(presentation_context_id).ok_or_else(|| {
        ProtocolSnafu {
            detail: format!("unknown presentation context {}", presentation_context_id),
        }
        .build()
    })?;
    TransferSyntaxRegistry::require(&ctx.transfer_syntax).map_err(|_| {
        ProtocolSnafu {
            detail: format!("unsupported transfer syntax {}", ctx.transfer_syntax),
        }
        .build()
    })
}

fn dispatch(
    assoc: &mut ServerAssociation,
    presentation_context_id: u8,
    cmd: CommandSet,
    context: &PacsContext,
) -> Result<()> {
    let field = cmd.command_field()?;
    match field {
        command_field::C_ECHO_RQ => handle_echo(assoc, presentation_context_id, &cmd),
        command_field::C_STORE_RQ => handle_store(assoc, presentation_context_id, cmd, context),
        command_field::C_FIND_RQ => handle_find(assoc, presentation_context_id, cmd, context),
        command_field::C_MOVE_RQ => handle_move(assoc, presentation_context_id, cmd, context),
        command_field::C_GET_RQ => {
            // retrieval is served through C-MOVE
            let _ = read_announced_data(assoc, &cmd)?;
            let message_id = cmd.message_id()?;
            let sop_class = cmd.affected_sop_class_uid().unwrap_or_default();
            let rsp = command::move_rsp(
                message_id,
                &sop_class,
                status::SOP_CLASS_NOT_SUPPORTED,
                Default::default(),
            );
            assoc
                .send_command(presentation_context_id, &rsp.to_bytes()?)
                .context(AssociationSnafu)
        }
        command_field::C_CANCEL_RQ => {
            // a cancel outside a response stream has nothing to stop
            debug!("stray C-CANCEL ignored");
            Ok(())
        }
        other => ProtocolSnafu {
            detail: format!("unsupported command field {:#06x}", other),
        }
        .fail(),
    }
}

fn handle_echo(
    assoc: &mut ServerAssociation,
    presentation_context_id: u8,
    cmd: &CommandSet,
) -> Result<()> {
    let message_id = cmd.message_id()?;
    let rsp = command::echo_rsp(message_id, status::SUCCESS);
    assoc
        .send_command(presentation_context_id, &rsp.to_bytes()?)
        .context(AssociationSnafu)
}

fn handle_store(
    assoc: &mut ServerAssociation,
    presentation_context_id: u8,
    cmd: CommandSet,
    context: &PacsContext,
) -> Result<()> {
    let message_id = cmd.message_id()?;
    let sop_class = cmd.affected_sop_class_uid().unwrap_or_default();
    let sop_instance = cmd.affected_sop_instance_uid().unwrap_or_default();
    let data = read_announced_data(assoc, &cmd)?;

    // the SOP class must be the abstract syntax this context was
    // negotiated for
    let context_matches = assoc
        .context(presentation_context_id)
        .map_or(false, |ctx| ctx.abstract_syntax == sop_class);

    let rsp_status = if !context_matches {
        warn!(
            "C-STORE SOP class {} does not match its presentation context",
            sop_class
        );
        status::SOP_CLASS_NOT_SUPPORTED
    } else {
        match data {
            None => status::UNABLE_TO_PROCESS,
            Some(bytes) => {
                let ts = negotiated_ts(assoc, presentation_context_id)?;
                match context.ingest.ingest(&bytes, ts) {
                    Ok(_) => status::SUCCESS,
                    Err(crate::Error::Storage { .. }) => status::OUT_OF_RESOURCES,
                    Err(e) => {
                        warn!("ingest failed: {}", e);
                        status::UNABLE_TO_PROCESS
                    }
                }
            }
        }
    };

    let rsp = command::store_rsp(message_id, &sop_class, &sop_instance, rsp_status);
    assoc
        .send_command(presentation_context_id, &rsp.to_bytes()?)
        .context(AssociationSnafu)
}

fn handle_find(
    assoc: &mut ServerAssociation,
    presentation_context_id: u8,
    cmd: CommandSet,
    context: &PacsContext,
) -> Result<()> {
    let message_id = cmd.message_id()?;
    let sop_class = cmd.affected_sop_class_uid().unwrap_or_default();
    let Some(identifier_bytes) = read_announced_data(assoc, &cmd)? else {
        let rsp = command::find_rsp(message_id, &sop_class, status::IDENTIFIER_MISMATCH, false);
        return assoc
            .send_command(presentation_context_id, &rsp.to_bytes()?)
            .context(AssociationSnafu);
    };
    let ts = negotiated_ts(assoc, presentation_context_id)?;
    let identifier = match pacs_encoding::decode_data_set(&identifier_bytes, ts) {
        Ok(ds) => ds,
        Err(e) => {
            warn!("unreadable C-FIND identifier: {}", e);
            let rsp =
                command::find_rsp(message_id, &sop_class, status::UNABLE_TO_PROCESS, false);
            return assoc
                .send_command(presentation_context_id, &rsp.to_bytes()?)
                .context(AssociationSnafu);
        }
    };

    if sop_class == uids::MODALITY_WORKLIST_FIND {
        return handle_worklist_find(
            assoc,
            presentation_context_id,
            message_id,
            &sop_class,
            &identifier,
            context,
            ts,
        );
    }

    find::respond(
        assoc.association(),
        presentation_context_id,
        message_id,
        &sop_class,
        &identifier,
        context.catalog(),
        ts,
    )
}

#[allow(clippy::too_many_arguments)]
fn handle_worklist_find(
    assoc: &mut ServerAssociation,
    presentation_context_id: u8,
    message_id: u16,
    sop_class: &str,
    identifier: &pacs_core::DataSet,
    context: &PacsContext,
    ts: &TransferSyntax,
) -> Result<()> {
    use pacs_ul::association::{AssociationEvent, PDataSegment};
    let matches = context.worklist.query(identifier);
    for item in matches {
        // honor a cancel between scheduled items
        if let Some(event) = assoc
            .association()
            .try_next_event(Duration::from_millis(1))
            .context(AssociationSnafu)?
        {
            if let AssociationEvent::Segment(PDataSegment::Command { data, .. }) = event {
                if find::is_cancel(&data) {
                    let rsp = command::find_rsp(message_id, sop_class, status::CANCEL, false);
                    return assoc
                        .send_command(presentation_context_id, &rsp.to_bytes()?)
                        .context(AssociationSnafu);
                }
            }
        }
        let payload = pacs_encoding::encode_data_set(&item.to_data_set(), ts)
            .map_err(|e| {
                ProtocolSnafu {
                    detail: format!("unencodable worklist item: {}", e),
                }
                .build()
            })?;
        let rsp = command::find_rsp(message_id, sop_class, status::PENDING, true);
        assoc
            .send_command(presentation_context_id, &rsp.to_bytes()?)
            .context(AssociationSnafu)?;
        assoc
            .send_data(presentation_context_id, &payload)
            .context(AssociationSnafu)?;
    }
    let rsp = command::find_rsp(message_id, sop_class, status::SUCCESS, false);
    assoc
        .send_command(presentation_context_id, &rsp.to_bytes()?)
        .context(AssociationSnafu)
}

fn handle_move(
    assoc: &mut ServerAssociation,
    presentation_context_id: u8,
    cmd: CommandSet,
    context: &PacsContext,
) -> Result<()> {
    let message_id = cmd.message_id()?;
    let sop_class = cmd.affected_sop_class_uid().unwrap_or_default();
    let destination_ae = cmd.move_destination().unwrap_or_default();
    let Some(identifier_bytes) = read_announced_data(assoc, &cmd)? else {
        let rsp = command::move_rsp(
            message_id,
            &sop_class,
            status::IDENTIFIER_MISMATCH,
            Default::default(),
        );
        return assoc
            .send_command(presentation_context_id, &rsp.to_bytes()?)
            .context(AssociationSnafu);
    };
    let ts = negotiated_ts(assoc, presentation_context_id)?;
    let identifier = pacs_encoding::decode_data_set(&identifier_bytes, ts).map_err(|e| {
        ProtocolSnafu {
            detail: format!("unreadable C-MOVE identifier: {}", e),
        }
        .build()
    })?;

    let destination = match context.move_destinations.resolve(&destination_ae) {
        Ok(address) => address,
        Err(_) => {
            warn!("unknown move destination `{}`", destination_ae);
            let rsp = command::move_rsp(
                message_id,
                &sop_class,
                status::MOVE_DESTINATION_UNKNOWN,
                Default::default(),
            );
            return assoc
                .send_command(presentation_context_id, &rsp.to_bytes()?)
                .context(AssociationSnafu);
        }
    };

    // an identifier that matches nothing yields an empty, successful move
    let instances = collect_instances(context.catalog(), &identifier).unwrap_or_default();
    execute_move(
        assoc.association(),
        presentation_context_id,
        message_id,
        &sop_class,
        instances,
        &destination,
        &context.ae_title,
        &destination_ae,
        context.hsm(),
    )
}
