//! End-to-end signature creation and verification.
use pacs_core::dictionary::tags;
use pacs_core::{DataSet, VR};
use pacs_signature::sign::remove_signatures;
use pacs_signature::{
    generate_self_signed_rsa, sign_data_set, thumbprint, verify_data_set, MacAlgorithm,
    SignerIdentity, SigningKey, VerificationOptions, VerificationStatus,
};

fn sample_data_set() -> DataSet {
    let mut ds = DataSet::new();
    ds.put_str(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.2");
    ds.put_str(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4.5");
    ds.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
    ds.put_str(tags::PATIENT_ID, VR::LO, "P001");
    ds
}

fn rsa_signer() -> SignerIdentity {
    let mut rng = rand::thread_rng();
    let key = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let certificate_der =
        generate_self_signed_rsa(&key, "CN=Test Signer,O=PACS", 30).unwrap();
    SignerIdentity {
        key: SigningKey::Rsa(key),
        certificate_der,
        mac_algorithm: MacAlgorithm::Sha256,
    }
}

#[test]
fn sign_then_verify_is_valid() {
    let signer = rsa_signer();
    let mut ds = sample_data_set();
    let info = sign_data_set(&mut ds, &signer, None).unwrap();

    assert!(ds.contains(tags::DIGITAL_SIGNATURES_SEQUENCE));
    assert_eq!(info.signed_tags.len(), 4);
    assert_eq!(info.certificate_thumbprint, thumbprint(&signer.certificate_der));

    let report = verify_data_set(&ds, &VerificationOptions::default()).unwrap();
    assert_eq!(report.status, VerificationStatus::Valid);
    let verified = report.info.unwrap();
    assert_eq!(verified.signature_uid, info.signature_uid);
    assert!(verified.signer.contains("Test Signer"));
}

#[test]
fn tampering_with_a_signed_element_invalidates() {
    let signer = rsa_signer();
    let mut ds = sample_data_set();
    sign_data_set(&mut ds, &signer, None).unwrap();

    ds.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JANE");
    let report = verify_data_set(&ds, &VerificationOptions::default()).unwrap();
    assert_eq!(report.status, VerificationStatus::Invalid);
}

#[test]
fn removing_a_signed_element_invalidates() {
    let signer = rsa_signer();
    let mut ds = sample_data_set();
    sign_data_set(&mut ds, &signer, None).unwrap();

    ds.remove(tags::PATIENT_ID);
    let report = verify_data_set(&ds, &VerificationOptions::default()).unwrap();
    assert_eq!(report.status, VerificationStatus::Invalid);
}

#[test]
fn unsigned_data_set_reports_no_signature() {
    let report =
        verify_data_set(&sample_data_set(), &VerificationOptions::default()).unwrap();
    assert_eq!(report.status, VerificationStatus::NoSignature);
    assert!(report.info.is_none());
}

#[test]
fn revoked_certificates_are_reported() {
    let signer = rsa_signer();
    let mut ds = sample_data_set();
    sign_data_set(&mut ds, &signer, None).unwrap();

    let mut options = VerificationOptions::default();
    options
        .revoked_thumbprints
        .insert(thumbprint(&signer.certificate_der));
    let report = verify_data_set(&ds, &options).unwrap();
    assert_eq!(report.status, VerificationStatus::Revoked);
}

#[test]
fn re_signing_replaces_the_sequence() {
    let signer = rsa_signer();
    let mut ds = sample_data_set();
    let first = sign_data_set(&mut ds, &signer, None).unwrap();
    let second = sign_data_set(&mut ds, &signer, None).unwrap();
    assert_ne!(first.signature_uid, second.signature_uid);

    let items = ds
        .sequence_items(tags::DIGITAL_SIGNATURES_SEQUENCE)
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(
        verify_data_set(&ds, &VerificationOptions::default())
            .unwrap()
            .status,
        VerificationStatus::Valid
    );
}

#[test]
fn explicit_tag_selection_signs_a_subset() {
    let signer = rsa_signer();
    let mut ds = sample_data_set();
    sign_data_set(
        &mut ds,
        &signer,
        Some(vec![tags::SOP_INSTANCE_UID, tags::SOP_CLASS_UID]),
    )
    .unwrap();

    // an unsigned element may change freely
    ds.put_str(tags::PATIENT_NAME, VR::PN, "SOMEONE^ELSE");
    assert_eq!(
        verify_data_set(&ds, &VerificationOptions::default())
            .unwrap()
            .status,
        VerificationStatus::Valid
    );
    // a signed one may not
    ds.put_str(tags::SOP_INSTANCE_UID, VR::UI, "9.9.9");
    assert_eq!(
        verify_data_set(&ds, &VerificationOptions::default())
            .unwrap()
            .status,
        VerificationStatus::Invalid
    );
}

#[test]
fn ecdsa_signatures_over_the_mac_verify() {
    // certificates for ECDSA signers come from external PKI tooling;
    // exercise the ECDSA signing path at the MAC level
    use pacs_signature::sign::{default_signed_tags, mac_of, serialize_elements};
    use rsa::signature::hazmat::{PrehashSigner, PrehashVerifier};

    let ds = sample_data_set();
    let selected = default_signed_tags(&ds);
    let serialized = serialize_elements(&ds, &selected).unwrap();
    let mac = mac_of(MacAlgorithm::Sha256, &serialized);

    let signing_key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
    let signature: p256::ecdsa::Signature = signing_key.sign_prehash(&mac).unwrap();
    let verifying_key = p256::ecdsa::VerifyingKey::from(&signing_key);
    assert!(verifying_key.verify_prehash(&mac, &signature).is_ok());
}

#[test]
fn every_mac_algorithm_signs_and_verifies() {
    let mut rng = rand::thread_rng();
    let key = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let certificate_der = generate_self_signed_rsa(&key, "CN=Algo Signer,O=PACS", 30).unwrap();

    for mac_algorithm in [
        MacAlgorithm::Sha256,
        MacAlgorithm::Sha384,
        MacAlgorithm::Sha512,
    ] {
        let signer = SignerIdentity {
            key: SigningKey::Rsa(key.clone()),
            certificate_der: certificate_der.clone(),
            mac_algorithm,
        };
        let mut ds = sample_data_set();
        sign_data_set(&mut ds, &signer, None).unwrap();

        let report = verify_data_set(&ds, &VerificationOptions::default()).unwrap();
        assert_eq!(
            report.status,
            VerificationStatus::Valid,
            "round trip failed for {:?}",
            mac_algorithm
        );
        assert_eq!(report.info.unwrap().mac_algorithm, mac_algorithm);

        // tampering is detected under every algorithm
        ds.put_str(tags::PATIENT_ID, VR::LO, "P999");
        assert_eq!(
            verify_data_set(&ds, &VerificationOptions::default())
                .unwrap()
                .status,
            VerificationStatus::Invalid
        );
    }
}

#[test]
fn remove_signatures_strips_the_sequence() {
    let signer = rsa_signer();
    let mut ds = sample_data_set();
    sign_data_set(&mut ds, &signer, None).unwrap();
    assert!(remove_signatures(&mut ds));
    assert!(!remove_signatures(&mut ds));
    assert_eq!(
        verify_data_set(&ds, &VerificationOptions::default())
            .unwrap()
            .status,
        VerificationStatus::NoSignature
    );
}

#[test]
fn signature_survives_codec_round_trip() {
    use pacs_encoding::{decode_data_set, encode_data_set};
    use pacs_encoding::transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN;

    let signer = rsa_signer();
    let mut ds = sample_data_set();
    sign_data_set(&mut ds, &signer, None).unwrap();

    let bytes = encode_data_set(&ds, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
    let decoded = decode_data_set(&bytes, &EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
    assert_eq!(
        verify_data_set(&decoded, &VerificationOptions::default())
            .unwrap()
            .status,
        VerificationStatus::Valid
    );
}
