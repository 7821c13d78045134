//! Certificate handling: parsing, thumbprints, self-signed checks and
//! a self-signed certificate generator for provisioning.
use crate::error::{BadCertificateSnafu, CertificateBuildSnafu, Result};
use der::{Decode, Encode};
use sha2::{Digest, Sha256};
use snafu::ResultExt;
use std::str::FromStr;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Validity;
use x509_cert::Certificate;

/// Parse a DER-encoded certificate.
pub fn parse(der_bytes: &[u8]) -> Result<Certificate> {
    Certificate::from_der(der_bytes).context(BadCertificateSnafu)
}

/// The lowercase hex SHA-256 thumbprint of a certificate's DER bytes.
pub fn thumbprint(der_bytes: &[u8]) -> String {
    let digest = Sha256::digest(der_bytes);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// The subject of a certificate, as an RFC 4514 string.
pub fn subject_of(der_bytes: &[u8]) -> Option<String> {
    parse(der_bytes).ok().map(|c| c.tbs_certificate.subject.to_string())
}

/// Whether the certificate is self-signed (issuer equals subject).
/// Without trust-chain validation, only self-signed signer
/// certificates are admitted.
pub fn is_self_signed(certificate: &Certificate) -> bool {
    certificate.tbs_certificate.issuer == certificate.tbs_certificate.subject
}

/// Whether `now` falls within the certificate's validity period.
pub fn in_validity_period(certificate: &Certificate, now: std::time::SystemTime) -> bool {
    let validity = &certificate.tbs_certificate.validity;
    let not_before = validity.not_before.to_system_time();
    let not_after = validity.not_after.to_system_time();
    now >= not_before && now <= not_after
}

/// Generate a self-signed RSA certificate for the given subject,
/// valid for `valid_days` from now. Returns the DER bytes.
pub fn generate_self_signed_rsa(
    private_key: &rsa::RsaPrivateKey,
    subject: &str,
    valid_days: u64,
) -> Result<Vec<u8>> {
    use rsa::pkcs1v15::SigningKey;
    use rsa::pkcs8::EncodePublicKey;

    let build_err = |e: String| CertificateBuildSnafu { reason: e }.build();

    let subject = Name::from_str(subject).map_err(|e| build_err(e.to_string()))?;
    let serial = SerialNumber::from(1u32);
    let validity = Validity::from_now(std::time::Duration::from_secs(valid_days * 24 * 3600))
        .map_err(|e| build_err(e.to_string()))?;
    let public_key_der = private_key
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| build_err(e.to_string()))?;
    let spki = SubjectPublicKeyInfoOwned::from_der(public_key_der.as_bytes())
        .map_err(|e| build_err(e.to_string()))?;

    let signer = SigningKey::<Sha256>::new(private_key.clone());
    let builder = CertificateBuilder::new(
        Profile::Root,
        serial,
        validity,
        subject,
        spki,
        &signer,
    )
    .map_err(|e| build_err(e.to_string()))?;
    let certificate: Certificate = builder
        .build::<rsa::pkcs1v15::Signature>()
        .map_err(|e| build_err(e.to_string()))?;
    certificate
        .to_der()
        .map_err(|e| build_err(e.to_string()))
}
