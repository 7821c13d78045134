//! End-to-end association negotiation and data transfer over loopback.
use pacs_ul::association::{AssociationEvent, PDataSegment};
use pacs_ul::{ClientAssociationOptions, ServerAssociationOptions};
use std::net::TcpListener;
use std::thread;

const VERIFICATION_SOP_CLASS: &str = "1.2.840.10008.1.1";
const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

#[test]
fn negotiate_exchange_and_release() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut assoc = ServerAssociationOptions::new()
            .ae_title("TEST-SCP")
            .with_abstract_syntax(VERIFICATION_SOP_CLASS)
            .accept(stream)
            .unwrap();
        assert_eq!(assoc.presentation_contexts().len(), 1);

        // receive one command stream and echo it back
        match assoc.next_event().unwrap() {
            AssociationEvent::Segment(PDataSegment::Command {
                presentation_context_id,
                data,
            }) => {
                assoc.send_command(presentation_context_id, &data).unwrap();
            }
            other => panic!("unexpected event: {:?}", other),
        }

        // then the peer releases
        match assoc.next_event().unwrap() {
            AssociationEvent::ReleaseRequested => assoc.confirm_release().unwrap(),
            other => panic!("unexpected event: {:?}", other),
        }
    });

    let mut assoc = ClientAssociationOptions::new()
        .calling_ae_title("TEST-SCU")
        .called_ae_title("TEST-SCP")
        .with_abstract_syntax(VERIFICATION_SOP_CLASS)
        .establish(addr)
        .unwrap();

    let ctx = assoc.presentation_contexts()[0].clone();
    let payload: Vec<u8> = (0u16..6000).flat_map(|v| v.to_le_bytes()).collect();
    assoc.send_command(ctx.id, &payload).unwrap();

    match assoc.association().next_event().unwrap() {
        AssociationEvent::Segment(PDataSegment::Command { data, .. }) => {
            assert_eq!(data, payload);
        }
        other => panic!("unexpected event: {:?}", other),
    }

    assoc.release().unwrap();
    server.join().unwrap();
}

#[test]
fn unserved_abstract_syntax_is_rejected_per_context() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        // only verification is served; the CT storage context is refused
        let assoc = ServerAssociationOptions::new()
            .ae_title("TEST-SCP")
            .with_abstract_syntax(VERIFICATION_SOP_CLASS)
            .accept(stream)
            .unwrap();
        assert_eq!(assoc.presentation_contexts().len(), 1);
        assert_eq!(
            assoc.presentation_contexts()[0].abstract_syntax,
            VERIFICATION_SOP_CLASS
        );
    });

    let assoc = ClientAssociationOptions::new()
        .called_ae_title("TEST-SCP")
        .with_abstract_syntax(VERIFICATION_SOP_CLASS)
        .with_abstract_syntax(CT_IMAGE_STORAGE)
        .establish(addr)
        .unwrap();

    assert_eq!(assoc.presentation_contexts().len(), 1);
    assert!(assoc.context_for(CT_IMAGE_STORAGE).is_none());
    assert!(assoc.context_for(VERIFICATION_SOP_CLASS).is_some());
    server.join().unwrap();
}

#[test]
fn wrong_called_ae_title_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let result = ServerAssociationOptions::new()
            .ae_title("REAL-SCP")
            .accept(stream);
        assert!(result.is_err());
    });

    let result = ClientAssociationOptions::new()
        .called_ae_title("WRONG-SCP")
        .with_abstract_syntax(VERIFICATION_SOP_CLASS)
        .establish(addr);
    assert!(result.is_err());
    server.join().unwrap();
}
