//! Decoding of protocol data units from a byte stream.
use crate::pdu::*;
use byteordered::byteorder::{BigEndian, ReadBytesExt};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::io::{Cursor, ErrorKind, Read};

/// The default maximum PDU size.
pub const DEFAULT_MAX_PDU: u32 = 16_384;

/// The minimum PDU size, as specified by the standard.
pub const MINIMUM_PDU_SIZE: u32 = 4_096;

/// The maximum PDU size, as specified by the standard.
pub const MAXIMUM_PDU_SIZE: u32 = 131_072;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Invalid max PDU length {}", max_pdu_length))]
    InvalidMaxPdu {
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    /// The stream closed cleanly before a PDU began.
    #[snafu(display("No PDU available"))]
    NoPduAvailable { backtrace: Backtrace },

    #[snafu(display("Could not read PDU field `{}`", field))]
    ReadPduField {
        field: &'static str,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Incoming PDU of length {} exceeds the maximum of {}", pdu_length, max_pdu_length))]
    PduTooLarge {
        pdu_length: u32,
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Unrecognized PDU type {:#04x}", pdu_type))]
    UnrecognizedPduType { pdu_type: u8, backtrace: Backtrace },

    #[snafu(display("Unexpected item type {:#04x} at position {}", item_type, position))]
    UnexpectedItem {
        item_type: u8,
        position: u64,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid reject/abort code {}", code))]
    InvalidCode { code: u8, backtrace: Backtrace },

    #[snafu(display("Invalid PDV item length {} (must be >= 2)", length))]
    InvalidPdvLength { length: u32, backtrace: Backtrace },

    #[snafu(display("Field `{}` is not valid ASCII text", field))]
    DecodeText {
        field: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Missing mandatory item `{}`", item))]
    MissingItem {
        item: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid presentation context result reason {}", reason))]
    InvalidResultReason { reason: u8, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Read one PDU from the stream.
///
/// `max_pdu_length` bounds the incoming PDU length; an oversized PDU is
/// rejected without consuming its payload being parsed.
pub fn read_pdu<R>(reader: &mut R, max_pdu_length: u32) -> Result<Pdu>
where
    R: Read,
{
    ensure!(
        (MINIMUM_PDU_SIZE..=MAXIMUM_PDU_SIZE).contains(&max_pdu_length),
        InvalidMaxPduSnafu { max_pdu_length }
    );

    // Distinguish "no PDU at all" from a truncated PDU: a clean EOF on
    // the first two bytes means the peer closed the stream between PDUs.
    let mut head = [0u8; 2];
    if let Err(e) = reader.read_exact(&mut head) {
        ensure!(e.kind() != ErrorKind::UnexpectedEof, NoPduAvailableSnafu);
        return Err(e).context(ReadPduFieldSnafu { field: "type" });
    }
    let pdu_type = head[0];

    let pdu_length = reader
        .read_u32::<BigEndian>()
        .context(ReadPduFieldSnafu { field: "length" })?;
    ensure!(
        pdu_length <= max_pdu_length.max(MAXIMUM_PDU_SIZE),
        PduTooLargeSnafu {
            pdu_length,
            max_pdu_length
        }
    );

    let mut body = vec![0u8; pdu_length as usize];
    reader
        .read_exact(&mut body)
        .context(ReadPduFieldSnafu { field: "body" })?;
    let mut cursor = Cursor::new(body.as_slice());

    match pdu_type {
        0x01 => read_association_rq(&mut cursor),
        0x02 => read_association_ac(&mut cursor),
        0x03 => read_association_rj(&mut cursor),
        0x04 => read_p_data(&mut cursor, pdu_length),
        0x05 => {
            // A-RELEASE-RQ: 4 reserved bytes
            Ok(Pdu::ReleaseRq)
        }
        0x06 => Ok(Pdu::ReleaseRp),
        0x07 => read_abort(&mut cursor),
        other => UnrecognizedPduTypeSnafu { pdu_type: other }.fail(),
    }
}

fn read_association_rq(cursor: &mut Cursor<&[u8]>) -> Result<Pdu> {
    let protocol_version = cursor
        .read_u16::<BigEndian>()
        .context(ReadPduFieldSnafu { field: "Protocol-version" })?;
    cursor
        .read_u16::<BigEndian>()
        .context(ReadPduFieldSnafu { field: "reserved" })?;
    let called_ae_title = read_ae_title(cursor, "Called-AE-title")?;
    let calling_ae_title = read_ae_title(cursor, "Calling-AE-title")?;
    let mut reserved = [0u8; 32];
    cursor
        .read_exact(&mut reserved)
        .context(ReadPduFieldSnafu { field: "reserved" })?;

    let mut application_context_name = None;
    let mut presentation_contexts = Vec::new();
    let mut user_variables = Vec::new();

    while let Some((item_type, item_body)) = read_item(cursor)? {
        match item_type {
            0x10 => application_context_name = Some(decode_text(&item_body, "Application-context-name")?),
            0x20 => presentation_contexts.push(read_presentation_context_rq(&item_body)?),
            0x50 => user_variables = read_user_variables(&item_body)?,
            other => {
                return UnexpectedItemSnafu {
                    item_type: other,
                    position: cursor.position(),
                }
                .fail()
            }
        }
    }

    Ok(Pdu::AssociationRq {
        protocol_version,
        calling_ae_title,
        called_ae_title,
        application_context_name: application_context_name
            .ok_or_else(|| MissingItemSnafu { item: "Application Context" }.build())?,
        presentation_contexts,
        user_variables,
    })
}

fn read_association_ac(cursor: &mut Cursor<&[u8]>) -> Result<Pdu> {
    let protocol_version = cursor
        .read_u16::<BigEndian>()
        .context(ReadPduFieldSnafu { field: "Protocol-version" })?;
    cursor
        .read_u16::<BigEndian>()
        .context(ReadPduFieldSnafu { field: "reserved" })?;
    // the AE title fields are echoed but not significant in the AC
    read_ae_title(cursor, "Called-AE-title")?;
    read_ae_title(cursor, "Calling-AE-title")?;
    let mut reserved = [0u8; 32];
    cursor
        .read_exact(&mut reserved)
        .context(ReadPduFieldSnafu { field: "reserved" })?;

    let mut application_context_name = None;
    let mut presentation_contexts = Vec::new();
    let mut user_variables = Vec::new();

    while let Some((item_type, item_body)) = read_item(cursor)? {
        match item_type {
            0x10 => application_context_name = Some(decode_text(&item_body, "Application-context-name")?),
            0x21 => presentation_contexts.push(read_presentation_context_ac(&item_body)?),
            0x50 => user_variables = read_user_variables(&item_body)?,
            other => {
                return UnexpectedItemSnafu {
                    item_type: other,
                    position: cursor.position(),
                }
                .fail()
            }
        }
    }

    Ok(Pdu::AssociationAc {
        protocol_version,
        application_context_name: application_context_name
            .ok_or_else(|| MissingItemSnafu { item: "Application Context" }.build())?,
        presentation_contexts,
        user_variables,
    })
}

fn read_association_rj(cursor: &mut Cursor<&[u8]>) -> Result<Pdu> {
    let mut fields = [0u8; 4];
    cursor
        .read_exact(&mut fields)
        .context(ReadPduFieldSnafu { field: "reject fields" })?;
    let result = match fields[1] {
        1 => AssociationRjResult::Permanent,
        2 => AssociationRjResult::Transient,
        other => return InvalidCodeSnafu { code: other }.fail(),
    };
    let source = match fields[2] {
        1 => AssociationRjSource::ServiceUser(fields[3]),
        2 => AssociationRjSource::ServiceProviderAcse(fields[3]),
        3 => AssociationRjSource::ServiceProviderPresentation(fields[3]),
        other => return InvalidCodeSnafu { code: other }.fail(),
    };
    Ok(Pdu::AssociationRj { result, source })
}

fn read_abort(cursor: &mut Cursor<&[u8]>) -> Result<Pdu> {
    let mut fields = [0u8; 4];
    cursor
        .read_exact(&mut fields)
        .context(ReadPduFieldSnafu { field: "abort fields" })?;
    let source = match fields[2] {
        0 => AbortSource::ServiceUser,
        2 => AbortSource::ServiceProvider(fields[3]),
        other => return InvalidCodeSnafu { code: other }.fail(),
    };
    Ok(Pdu::AbortRq { source })
}

fn read_p_data(cursor: &mut Cursor<&[u8]>, pdu_length: u32) -> Result<Pdu> {
    let mut data = Vec::new();
    while cursor.position() < u64::from(pdu_length) {
        let item_length = cursor
            .read_u32::<BigEndian>()
            .context(ReadPduFieldSnafu { field: "PDV item length" })?;
        ensure!(item_length >= 2, InvalidPdvLengthSnafu { length: item_length });
        let presentation_context_id = cursor
            .read_u8()
            .context(ReadPduFieldSnafu { field: "presentation context id" })?;
        let header = cursor
            .read_u8()
            .context(ReadPduFieldSnafu { field: "message control header" })?;
        let mut value = vec![0u8; item_length as usize - 2];
        cursor
            .read_exact(&mut value)
            .context(ReadPduFieldSnafu { field: "PDV data" })?;
        data.push(PDataValue {
            presentation_context_id,
            value_type: if header & 0b01 != 0 {
                PDataValueType::Command
            } else {
                PDataValueType::Data
            },
            is_last: header & 0b10 != 0,
            data: value,
        });
    }
    Ok(Pdu::PData { data })
}

/// Read one variable item header and body.
/// Returns `None` at the end of the PDU body.
fn read_item(cursor: &mut Cursor<&[u8]>) -> Result<Option<(u8, Vec<u8>)>> {
    if cursor.position() >= cursor.get_ref().len() as u64 {
        return Ok(None);
    }
    let item_type = cursor
        .read_u8()
        .context(ReadPduFieldSnafu { field: "item type" })?;
    cursor
        .read_u8()
        .context(ReadPduFieldSnafu { field: "item reserved" })?;
    let length = cursor
        .read_u16::<BigEndian>()
        .context(ReadPduFieldSnafu { field: "item length" })?;
    let mut body = vec![0u8; length as usize];
    cursor
        .read_exact(&mut body)
        .context(ReadPduFieldSnafu { field: "item body" })?;
    Ok(Some((item_type, body)))
}

fn read_presentation_context_rq(body: &[u8]) -> Result<PresentationContextProposed> {
    let mut cursor = Cursor::new(body);
    let id = cursor
        .read_u8()
        .context(ReadPduFieldSnafu { field: "presentation context id" })?;
    let mut reserved = [0u8; 3];
    cursor
        .read_exact(&mut reserved)
        .context(ReadPduFieldSnafu { field: "reserved" })?;

    let mut abstract_syntax = None;
    let mut transfer_syntaxes = Vec::new();
    while let Some((item_type, item_body)) = read_item(&mut cursor)? {
        match item_type {
            0x30 => abstract_syntax = Some(decode_text(&item_body, "Abstract-syntax")?),
            0x40 => transfer_syntaxes.push(decode_text(&item_body, "Transfer-syntax")?),
            other => {
                return UnexpectedItemSnafu {
                    item_type: other,
                    position: cursor.position(),
                }
                .fail()
            }
        }
    }
    ensure!(
        !transfer_syntaxes.is_empty(),
        MissingItemSnafu { item: "Transfer Syntax" }
    );
    Ok(PresentationContextProposed {
        id,
        abstract_syntax: abstract_syntax
            .ok_or_else(|| MissingItemSnafu { item: "Abstract Syntax" }.build())?,
        transfer_syntaxes,
    })
}

fn read_presentation_context_ac(body: &[u8]) -> Result<PresentationContextResult> {
    let mut cursor = Cursor::new(body);
    let mut head = [0u8; 4];
    cursor
        .read_exact(&mut head)
        .context(ReadPduFieldSnafu { field: "presentation context header" })?;
    let id = head[0];
    let reason = PresentationContextResultReason::from_u8(head[2])
        .ok_or_else(|| InvalidResultReasonSnafu { reason: head[2] }.build())?;

    let mut transfer_syntax = None;
    while let Some((item_type, item_body)) = read_item(&mut cursor)? {
        match item_type {
            0x40 => transfer_syntax = Some(decode_text(&item_body, "Transfer-syntax")?),
            other => {
                return UnexpectedItemSnafu {
                    item_type: other,
                    position: cursor.position(),
                }
                .fail()
            }
        }
    }
    Ok(PresentationContextResult {
        id,
        reason,
        transfer_syntax: transfer_syntax
            .ok_or_else(|| MissingItemSnafu { item: "Transfer Syntax" }.build())?,
    })
}

fn read_user_variables(body: &[u8]) -> Result<Vec<UserVariableItem>> {
    let mut cursor = Cursor::new(body);
    let mut variables = Vec::new();
    while let Some((item_type, item_body)) = read_item(&mut cursor)? {
        let variable = match item_type {
            0x51 => {
                let mut c = Cursor::new(item_body.as_slice());
                UserVariableItem::MaxLength(
                    c.read_u32::<BigEndian>()
                        .context(ReadPduFieldSnafu { field: "Maximum-length" })?,
                )
            }
            0x52 => UserVariableItem::ImplementationClassUid(decode_text(
                &item_body,
                "Implementation-class-uid",
            )?),
            0x55 => UserVariableItem::ImplementationVersionName(decode_text(
                &item_body,
                "Implementation-version-name",
            )?),
            other => UserVariableItem::Unknown(other, item_body),
        };
        variables.push(variable);
    }
    Ok(variables)
}

fn read_ae_title(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<String> {
    let mut bytes = [0u8; 16];
    cursor
        .read_exact(&mut bytes)
        .context(ReadPduFieldSnafu { field })?;
    decode_text(&bytes, field).map(|s| s.trim().to_string())
}

fn decode_text(bytes: &[u8], field: &'static str) -> Result<String> {
    let text = std::str::from_utf8(bytes)
        .ok()
        .filter(|s| s.is_ascii())
        .ok_or_else(|| DecodeTextSnafu { field }.build())?;
    Ok(text.trim_end_matches(['\0', ' ']).to_string())
}
