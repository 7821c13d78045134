//! Signature verification.
use crate::cert;
use crate::error::{MalformedSignatureSnafu, Result, UnsupportedKeySnafu};
use crate::sign::{decode_tag_list, mac_of, pkcs1v15_scheme, serialize_elements};
use crate::{MacAlgorithm, SignatureInfo, VerificationStatus};
use der::Encode;
use pacs_core::dictionary::tags;
use pacs_core::DataSet;
use rsa::signature::hazmat::PrehashVerifier;
use std::collections::HashSet;

/// Knobs of the verification path.
#[derive(Debug, Default, Clone)]
pub struct VerificationOptions {
    /// certificate thumbprints (lowercase hex SHA-256) considered
    /// revoked
    pub revoked_thumbprints: HashSet<String>,
}

/// The outcome of verifying one data set.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub status: VerificationStatus,
    /// metadata of the examined signature, when one was present and
    /// readable
    pub info: Option<SignatureInfo>,
}

/// Verify the digital signature sequence of a data set.
///
/// The outcome is a status, not an error; errors are reserved for
/// signature items this implementation cannot interpret at all.
pub fn verify_data_set(
    data_set: &DataSet,
    options: &VerificationOptions,
) -> Result<VerificationReport> {
    let Some(items) = data_set.sequence_items(tags::DIGITAL_SIGNATURES_SEQUENCE) else {
        return Ok(VerificationReport {
            status: VerificationStatus::NoSignature,
            info: None,
        });
    };
    let Some(item) = items.first() else {
        return Ok(VerificationReport {
            status: VerificationStatus::NoSignature,
            info: None,
        });
    };

    let malformed = |reason: &str| {
        MalformedSignatureSnafu {
            reason: reason.to_string(),
        }
        .build()
    };

    let mac_algorithm = item
        .get_str(tags::MAC_ALGORITHM)
        .and_then(|code| MacAlgorithm::from_code(&code))
        .ok_or_else(|| malformed("unknown or missing MAC algorithm"))?;
    let signed_tags = item
        .get(tags::DATA_ELEMENTS_SIGNED)
        .and_then(|e| e.bytes().ok())
        .map(decode_tag_list)
        .ok_or_else(|| malformed("missing signed-tags list"))?;
    let certificate_der = item
        .get(tags::CERTIFICATE_OF_SIGNER)
        .and_then(|e| e.bytes().ok())
        .ok_or_else(|| malformed("missing signer certificate"))?
        .to_vec();
    let signature_bytes = item
        .get(tags::SIGNATURE)
        .and_then(|e| e.bytes().ok())
        .ok_or_else(|| malformed("missing signature bytes"))?
        .to_vec();

    let info = SignatureInfo {
        signature_uid: item.get_str(tags::DIGITAL_SIGNATURE_UID).unwrap_or_default(),
        signer: cert::subject_of(&certificate_der).unwrap_or_default(),
        signed_at: item
            .get_str(tags::DIGITAL_SIGNATURE_DATE_TIME)
            .and_then(|dt| parse_dicom_datetime(&dt)),
        mac_algorithm,
        signed_tags: signed_tags.clone(),
        certificate_thumbprint: cert::thumbprint(&certificate_der),
    };

    // certificate-level checks precede the cryptographic check
    let certificate = cert::parse(&certificate_der)?;
    if options
        .revoked_thumbprints
        .contains(&info.certificate_thumbprint)
    {
        return Ok(report(VerificationStatus::Revoked, info));
    }
    if !cert::in_validity_period(&certificate, std::time::SystemTime::now()) {
        return Ok(report(VerificationStatus::Expired, info));
    }
    if !cert::is_self_signed(&certificate) {
        // no trust-chain walk: refuse certificates we cannot anchor
        return Ok(report(VerificationStatus::UntrustedSigner, info));
    }

    // recompute the MAC over the currently stored elements
    let serialized = match serialize_elements(data_set, &signed_tags) {
        Ok(bytes) => bytes,
        // a signed element was removed: the signature no longer holds
        Err(crate::Error::MissingElement { .. }) => {
            return Ok(report(VerificationStatus::Invalid, info))
        }
        Err(e) => return Err(e),
    };
    let mac = mac_of(mac_algorithm, &serialized);

    let valid = verify_mac(&certificate, mac_algorithm, &mac, &signature_bytes)?;
    Ok(report(
        if valid {
            VerificationStatus::Valid
        } else {
            VerificationStatus::Invalid
        },
        info,
    ))
}

fn report(status: VerificationStatus, info: SignatureInfo) -> VerificationReport {
    VerificationReport {
        status,
        info: Some(info),
    }
}

/// Check the signature against the precomputed MAC through the prehash
/// APIs, with the digest algorithm taken from the signature item.
fn verify_mac(
    certificate: &x509_cert::Certificate,
    mac_algorithm: MacAlgorithm,
    mac: &[u8],
    signature_bytes: &[u8],
) -> Result<bool> {
    let spki = &certificate.tbs_certificate.subject_public_key_info;
    let spki_der = spki.to_der().map_err(|e| {
        UnsupportedKeySnafu {
            reason: e.to_string(),
        }
        .build()
    })?;

    // try RSA first, then ECDSA P-256
    if let Ok(public_key) = {
        use rsa::pkcs8::DecodePublicKey;
        rsa::RsaPublicKey::from_public_key_der(&spki_der)
    } {
        return Ok(public_key
            .verify(pkcs1v15_scheme(mac_algorithm), mac, signature_bytes)
            .is_ok());
    }

    if let Ok(verifying_key) = {
        use p256::pkcs8::DecodePublicKey;
        p256::ecdsa::VerifyingKey::from_public_key_der(&spki_der)
    } {
        let Ok(signature) = p256::ecdsa::Signature::from_der(signature_bytes) else {
            return Ok(false);
        };
        return Ok(verifying_key.verify_prehash(mac, &signature).is_ok());
    }

    UnsupportedKeySnafu {
        reason: "neither RSA nor P-256".to_string(),
    }
    .fail()
}

/// Parse `YYYYMMDDHHMMSS[.ffffff]` into a UTC timestamp.
fn parse_dicom_datetime(value: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    use chrono::TimeZone;
    let digits: String = value.chars().take(14).collect();
    if digits.len() < 14 {
        return None;
    }
    let dt = chrono::NaiveDateTime::parse_from_str(&digits, "%Y%m%d%H%M%S").ok()?;
    Some(chrono::Utc.from_utc_datetime(&dt))
}
