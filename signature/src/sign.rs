//! Signature creation and the canonical signed-element serialization.
use crate::error::{MissingElementSnafu, Result, SigningFailedSnafu};
use crate::{MacAlgorithm, SignatureInfo};
use chrono::Utc;
use pacs_core::dictionary::tags;
use pacs_core::{generate_uid, uid::UID_ROOT, DataElement, DataSet, Tag, Value, VR};
use rsa::signature::hazmat::PrehashSigner;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// The private key material of a signer.
pub enum SigningKey {
    /// RSA with PKCS#1 v1.5 padding.
    Rsa(rsa::RsaPrivateKey),
    /// ECDSA over P-256, DER-encoded signatures.
    EcdsaP256(p256::ecdsa::SigningKey),
}

/// A signer: key material, the certificate to embed, and the MAC
/// algorithm to apply.
pub struct SignerIdentity {
    pub key: SigningKey,
    /// DER-encoded X.509 certificate of the signer
    pub certificate_der: Vec<u8>,
    pub mac_algorithm: MacAlgorithm,
}

/// Serialize the selected elements in ascending tag order:
/// `group(2 LE) | element(2 LE) | raw value bytes` per element.
/// Sequence values contribute their items' elements recursively.
pub fn serialize_elements(data_set: &DataSet, selected: &[Tag]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for &tag in selected {
        let element = data_set
            .get(tag)
            .ok_or_else(|| MissingElementSnafu { tag }.build())?;
        serialize_element(element, &mut out);
    }
    Ok(out)
}

fn serialize_element(element: &DataElement, out: &mut Vec<u8>) {
    out.extend_from_slice(&element.tag.group().to_le_bytes());
    out.extend_from_slice(&element.tag.element().to_le_bytes());
    match &element.value {
        Value::Primitive(bytes) => out.extend_from_slice(bytes),
        Value::Sequence(items) => {
            for item in items {
                for nested in item.iter() {
                    serialize_element(nested, out);
                }
            }
        }
    }
}

/// The default selection: every element outside the signature group
/// (0400,xxxx), ascending by tag.
pub fn default_signed_tags(data_set: &DataSet) -> Vec<Tag> {
    data_set
        .tags()
        .filter(|tag| tag.group() != 0x0400)
        .collect()
}

/// Compute the MAC over a serialization.
pub fn mac_of(algorithm: MacAlgorithm, serialized: &[u8]) -> Vec<u8> {
    match algorithm {
        MacAlgorithm::Sha256 => Sha256::digest(serialized).to_vec(),
        MacAlgorithm::Sha384 => Sha384::digest(serialized).to_vec(),
        MacAlgorithm::Sha512 => Sha512::digest(serialized).to_vec(),
    }
}

/// Sign a data set and replace its digital signature sequence.
///
/// `selected` defaults to every non-signature element. The new
/// signature supersedes any previous signature sequence; re-signing
/// never appends to the existing one.
pub fn sign_data_set(
    data_set: &mut DataSet,
    signer: &SignerIdentity,
    selected: Option<Vec<Tag>>,
) -> Result<SignatureInfo> {
    let mut signed_tags = selected.unwrap_or_else(|| default_signed_tags(data_set));
    signed_tags.sort();
    signed_tags.dedup();

    let serialized = serialize_elements(data_set, &signed_tags)?;
    let mac = mac_of(signer.mac_algorithm, &serialized);
    let signature_bytes = sign_mac(&signer.key, signer.mac_algorithm, &mac)?;

    let signature_uid = generate_uid(UID_ROOT);
    let signed_at = Utc::now();

    let mut item = DataSet::new();
    item.put(DataElement::from_u16(tags::MAC_ID_NUMBER, VR::US, 1));
    item.put_str(tags::MAC_ALGORITHM, VR::CS, signer.mac_algorithm.code());
    item.put(DataElement::new(
        tags::DATA_ELEMENTS_SIGNED,
        VR::AT,
        Value::Primitive(encode_tag_list(&signed_tags)),
    ));
    item.put_str(tags::DIGITAL_SIGNATURE_UID, VR::UI, &signature_uid);
    item.put_str(
        tags::DIGITAL_SIGNATURE_DATE_TIME,
        VR::DT,
        &signed_at.format("%Y%m%d%H%M%S").to_string(),
    );
    item.put_str(tags::CERTIFICATE_TYPE, VR::CS, "X509_1993_SIG");
    item.put(DataElement::new(
        tags::CERTIFICATE_OF_SIGNER,
        VR::OB,
        Value::Primitive(signer.certificate_der.clone()),
    ));
    item.put(DataElement::new(
        tags::SIGNATURE,
        VR::OB,
        Value::Primitive(signature_bytes),
    ));

    data_set.put(DataElement::sequence(
        tags::DIGITAL_SIGNATURES_SEQUENCE,
        vec![item],
    ));

    Ok(SignatureInfo {
        signature_uid,
        signer: crate::cert::subject_of(&signer.certificate_der).unwrap_or_default(),
        signed_at: Some(signed_at),
        mac_algorithm: signer.mac_algorithm,
        signed_tags,
        certificate_thumbprint: crate::thumbprint(&signer.certificate_der),
    })
}

/// Remove any digital signature sequence from the data set.
pub fn remove_signatures(data_set: &mut DataSet) -> bool {
    data_set.remove(tags::DIGITAL_SIGNATURES_SEQUENCE).is_some()
}

/// The PKCS#1 v1.5 scheme whose digest algorithm matches the MAC.
pub(crate) fn pkcs1v15_scheme(mac_algorithm: MacAlgorithm) -> Pkcs1v15Sign {
    match mac_algorithm {
        MacAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        MacAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        MacAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

/// Sign the precomputed MAC. The MAC is the digest: it is signed
/// directly through the prehash APIs, never hashed a second time.
fn sign_mac(key: &SigningKey, mac_algorithm: MacAlgorithm, mac: &[u8]) -> Result<Vec<u8>> {
    match key {
        SigningKey::Rsa(private_key) => private_key
            .sign(pkcs1v15_scheme(mac_algorithm), mac)
            .map_err(|e| SigningFailedSnafu { reason: e.to_string() }.build()),
        SigningKey::EcdsaP256(signing_key) => {
            let signature: p256::ecdsa::Signature = signing_key
                .sign_prehash(mac)
                .map_err(|e| SigningFailedSnafu { reason: e.to_string() }.build())?;
            Ok(signature.to_der().as_bytes().to_vec())
        }
    }
}

/// Encode a tag list as an AT value: `group(2 LE) | element(2 LE)`
/// per tag.
pub fn encode_tag_list(tags: &[Tag]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tags.len() * 4);
    for tag in tags {
        out.extend_from_slice(&tag.group().to_le_bytes());
        out.extend_from_slice(&tag.element().to_le_bytes());
    }
    out
}

/// Decode an AT value back into a tag list.
pub fn decode_tag_list(bytes: &[u8]) -> Vec<Tag> {
    bytes
        .chunks_exact(4)
        .map(|c| Tag(u16::from_le_bytes([c[0], c[1]]), u16::from_le_bytes([c[2], c[3]])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_is_tag_ordered_and_raw() {
        let mut ds = DataSet::new();
        ds.put_str(tags::PATIENT_ID, VR::LO, "P1");
        ds.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        let selected = default_signed_tags(&ds);
        let bytes = serialize_elements(&ds, &selected).unwrap();
        // (0010,0010) then (0010,0020)
        assert_eq!(&bytes[0..4], &[0x10, 0x00, 0x10, 0x00]);
        assert_eq!(&bytes[4..12], b"DOE^JOHN");
        assert_eq!(&bytes[12..16], &[0x10, 0x00, 0x20, 0x00]);
        assert_eq!(&bytes[16..18], b"P1");
    }

    #[test]
    fn default_selection_skips_the_signature_group() {
        let mut ds = DataSet::new();
        ds.put_str(tags::PATIENT_ID, VR::LO, "P1");
        ds.put_str(tags::DIGITAL_SIGNATURE_UID, VR::UI, "1.2.3");
        let selected = default_signed_tags(&ds);
        assert_eq!(selected, vec![tags::PATIENT_ID]);
    }

    #[test]
    fn tag_list_round_trip() {
        let list = vec![tags::PATIENT_NAME, tags::STUDY_INSTANCE_UID];
        assert_eq!(decode_tag_list(&encode_tag_list(&list)), list);
    }

    #[test]
    fn mac_algorithms_have_expected_widths() {
        assert_eq!(mac_of(MacAlgorithm::Sha256, b"x").len(), 32);
        assert_eq!(mac_of(MacAlgorithm::Sha384, b"x").len(), 48);
        assert_eq!(mac_of(MacAlgorithm::Sha512, b"x").len(), 64);
    }
}
