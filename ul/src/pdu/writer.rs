//! Encoding of protocol data units onto a byte stream.
use crate::pdu::*;
use byteordered::byteorder::{BigEndian, WriteBytesExt};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not write PDU field `{}`", field))]
    WritePduField {
        field: &'static str,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("AE title `{}` is longer than 16 characters", ae_title))]
    AeTitleTooLong {
        ae_title: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Item of {} bytes does not fit the 16-bit item length", length))]
    ItemTooLong { length: usize, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Write one PDU to the stream.
pub fn write_pdu<W>(writer: &mut W, pdu: &Pdu) -> Result<()>
where
    W: Write,
{
    let (pdu_type, body) = match pdu {
        Pdu::AssociationRq {
            protocol_version,
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            user_variables,
        } => {
            let mut body = Vec::new();
            body.write_u16::<BigEndian>(*protocol_version)
                .context(WritePduFieldSnafu { field: "Protocol-version" })?;
            body.write_u16::<BigEndian>(0)
                .context(WritePduFieldSnafu { field: "reserved" })?;
            write_ae_title(&mut body, called_ae_title)?;
            write_ae_title(&mut body, calling_ae_title)?;
            body.extend_from_slice(&[0u8; 32]);
            write_item(&mut body, 0x10, application_context_name.as_bytes())?;
            for pc in presentation_contexts {
                let mut pc_body = vec![pc.id, 0, 0, 0];
                write_item(&mut pc_body, 0x30, pc.abstract_syntax.as_bytes())?;
                for ts in &pc.transfer_syntaxes {
                    write_item(&mut pc_body, 0x40, ts.as_bytes())?;
                }
                write_item(&mut body, 0x20, &pc_body)?;
            }
            write_user_information(&mut body, user_variables)?;
            (0x01u8, body)
        }
        Pdu::AssociationAc {
            protocol_version,
            application_context_name,
            presentation_contexts,
            user_variables,
        } => {
            let mut body = Vec::new();
            body.write_u16::<BigEndian>(*protocol_version)
                .context(WritePduFieldSnafu { field: "Protocol-version" })?;
            body.write_u16::<BigEndian>(0)
                .context(WritePduFieldSnafu { field: "reserved" })?;
            // the two AE title fields are reserved in the AC;
            // fill them with spaces
            body.extend_from_slice(&[b' '; 32]);
            body.extend_from_slice(&[0u8; 32]);
            write_item(&mut body, 0x10, application_context_name.as_bytes())?;
            for pc in presentation_contexts {
                let mut pc_body = vec![pc.id, 0, pc.reason as u8, 0];
                write_item(&mut pc_body, 0x40, pc.transfer_syntax.as_bytes())?;
                write_item(&mut body, 0x21, &pc_body)?;
            }
            write_user_information(&mut body, user_variables)?;
            (0x02u8, body)
        }
        Pdu::AssociationRj { result, source } => {
            let (source_code, reason) = match source {
                AssociationRjSource::ServiceUser(reason) => (1u8, *reason),
                AssociationRjSource::ServiceProviderAcse(reason) => (2, *reason),
                AssociationRjSource::ServiceProviderPresentation(reason) => (3, *reason),
            };
            let result_code = match result {
                AssociationRjResult::Permanent => 1u8,
                AssociationRjResult::Transient => 2,
            };
            (0x03, vec![0, result_code, source_code, reason])
        }
        Pdu::PData { data } => {
            let mut body = Vec::new();
            for pdv in data {
                body.write_u32::<BigEndian>(pdv.data.len() as u32 + 2)
                    .context(WritePduFieldSnafu { field: "PDV item length" })?;
                body.push(pdv.presentation_context_id);
                let mut header = 0u8;
                if pdv.value_type == PDataValueType::Command {
                    header |= 0b01;
                }
                if pdv.is_last {
                    header |= 0b10;
                }
                body.push(header);
                body.extend_from_slice(&pdv.data);
            }
            (0x04, body)
        }
        Pdu::ReleaseRq => (0x05, vec![0u8; 4]),
        Pdu::ReleaseRp => (0x06, vec![0u8; 4]),
        Pdu::AbortRq { source } => {
            let (source_code, reason) = match source {
                AbortSource::ServiceUser => (0u8, 0u8),
                AbortSource::ServiceProvider(reason) => (2, *reason),
            };
            (0x07, vec![0, 0, source_code, reason])
        }
    };

    writer
        .write_u8(pdu_type)
        .context(WritePduFieldSnafu { field: "type" })?;
    writer
        .write_u8(0)
        .context(WritePduFieldSnafu { field: "reserved" })?;
    writer
        .write_u32::<BigEndian>(body.len() as u32)
        .context(WritePduFieldSnafu { field: "length" })?;
    writer
        .write_all(&body)
        .context(WritePduFieldSnafu { field: "body" })
}

fn write_item(out: &mut Vec<u8>, item_type: u8, body: &[u8]) -> Result<()> {
    ensure!(
        body.len() <= u16::MAX as usize,
        ItemTooLongSnafu { length: body.len() }
    );
    out.push(item_type);
    out.push(0);
    out.write_u16::<BigEndian>(body.len() as u16)
        .context(WritePduFieldSnafu { field: "item length" })?;
    out.extend_from_slice(body);
    Ok(())
}

fn write_user_information(out: &mut Vec<u8>, variables: &[UserVariableItem]) -> Result<()> {
    let mut body = Vec::new();
    for variable in variables {
        match variable {
            UserVariableItem::MaxLength(max) => {
                write_item(&mut body, 0x51, &max.to_be_bytes())?;
            }
            UserVariableItem::ImplementationClassUid(uid) => {
                write_item(&mut body, 0x52, uid.as_bytes())?;
            }
            UserVariableItem::ImplementationVersionName(name) => {
                write_item(&mut body, 0x55, name.as_bytes())?;
            }
            UserVariableItem::Unknown(item_type, data) => {
                write_item(&mut body, *item_type, data)?;
            }
        }
    }
    write_item(out, 0x50, &body)
}

fn write_ae_title(out: &mut Vec<u8>, ae_title: &str) -> Result<()> {
    ensure!(
        ae_title.len() <= 16,
        AeTitleTooLongSnafu { ae_title }
    );
    let mut field = [b' '; 16];
    field[..ae_title.len()].copy_from_slice(ae_title.as_bytes());
    out.extend_from_slice(&field);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::reader::{read_pdu, DEFAULT_MAX_PDU};
    use std::io::Cursor;

    fn round_trip(pdu: Pdu) {
        let mut buffer = Vec::new();
        write_pdu(&mut buffer, &pdu).unwrap();
        let mut cursor = Cursor::new(buffer.as_slice());
        let back = read_pdu(&mut cursor, DEFAULT_MAX_PDU).unwrap();
        assert_eq!(back, pdu);
    }

    #[test]
    fn association_rq_round_trip() {
        round_trip(Pdu::AssociationRq {
            protocol_version: 1,
            calling_ae_title: "STORE-SCU".to_string(),
            called_ae_title: "MAIN-PACS".to_string(),
            application_context_name: crate::DICOM_APPLICATION_CONTEXT_NAME.to_string(),
            presentation_contexts: vec![PresentationContextProposed {
                id: 1,
                abstract_syntax: "1.2.840.10008.5.1.4.1.1.2".to_string(),
                transfer_syntaxes: vec![
                    "1.2.840.10008.1.2.1".to_string(),
                    "1.2.840.10008.1.2".to_string(),
                ],
            }],
            user_variables: vec![
                UserVariableItem::MaxLength(16384),
                UserVariableItem::ImplementationClassUid("1.2.3.4".to_string()),
                UserVariableItem::ImplementationVersionName("PACSRS_010".to_string()),
            ],
        });
    }

    #[test]
    fn association_ac_round_trip() {
        round_trip(Pdu::AssociationAc {
            protocol_version: 1,
            application_context_name: crate::DICOM_APPLICATION_CONTEXT_NAME.to_string(),
            presentation_contexts: vec![
                PresentationContextResult {
                    id: 1,
                    reason: PresentationContextResultReason::Acceptance,
                    transfer_syntax: "1.2.840.10008.1.2".to_string(),
                },
                PresentationContextResult {
                    id: 3,
                    reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
                    transfer_syntax: "1.2.840.10008.1.2".to_string(),
                },
            ],
            user_variables: vec![UserVariableItem::MaxLength(32768)],
        });
    }

    #[test]
    fn association_rj_round_trip() {
        round_trip(Pdu::AssociationRj {
            result: AssociationRjResult::Permanent,
            source: AssociationRjSource::ServiceUser(7),
        });
    }

    #[test]
    fn p_data_round_trip() {
        round_trip(Pdu::PData {
            data: vec![
                PDataValue {
                    presentation_context_id: 1,
                    value_type: PDataValueType::Command,
                    is_last: true,
                    data: vec![1, 2, 3, 4],
                },
                PDataValue {
                    presentation_context_id: 1,
                    value_type: PDataValueType::Data,
                    is_last: false,
                    data: vec![5, 6, 7, 8, 9, 10],
                },
            ],
        });
    }

    #[test]
    fn release_and_abort_round_trip() {
        round_trip(Pdu::ReleaseRq);
        round_trip(Pdu::ReleaseRp);
        round_trip(Pdu::AbortRq {
            source: AbortSource::ServiceProvider(2),
        });
    }

    #[test]
    fn long_ae_title_is_rejected() {
        let mut buffer = Vec::new();
        let err = write_pdu(
            &mut buffer,
            &Pdu::AssociationRq {
                protocol_version: 1,
                calling_ae_title: "A-MUCH-TOO-LONG-AE-TITLE".to_string(),
                called_ae_title: "SCP".to_string(),
                application_context_name: crate::DICOM_APPLICATION_CONTEXT_NAME.to_string(),
                presentation_contexts: vec![],
                user_variables: vec![],
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::AeTitleTooLong { .. }));
    }
}
