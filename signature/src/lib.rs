//! Digital signatures over DICOM data sets, per PS3.15.
//!
//! A signature covers a selected set of data elements, serialized in
//! ascending tag order, digested with a SHA-2 MAC and signed with the
//! signer's RSA or ECDSA key. The signature lives as an item of the
//! sequence at (0400,0561) carrying the signature UID, timestamp,
//! certificate, MAC algorithm, the signed-tags list and the signature
//! bytes. Verification recomputes the MAC from the data set and checks
//! the signature against the embedded certificate's public key.
pub mod cert;
pub mod error;
pub mod sign;
pub mod verify;

use pacs_core::Tag;

pub use crate::cert::{generate_self_signed_rsa, thumbprint};
pub use crate::error::{Error, Result};
pub use crate::sign::{sign_data_set, SignerIdentity, SigningKey};
pub use crate::verify::{verify_data_set, VerificationOptions, VerificationReport};

/// The MAC algorithms admitted by PS3.15 that this implementation
/// produces and verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl MacAlgorithm {
    /// The CS code written into the MAC Algorithm attribute.
    pub fn code(self) -> &'static str {
        match self {
            MacAlgorithm::Sha256 => "SHA256",
            MacAlgorithm::Sha384 => "SHA384",
            MacAlgorithm::Sha512 => "SHA512",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "SHA256" => Some(MacAlgorithm::Sha256),
            "SHA384" => Some(MacAlgorithm::Sha384),
            "SHA512" => Some(MacAlgorithm::Sha512),
            _ => None,
        }
    }
}

/// The terminal states of signature verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    /// The signature matches the current data set content.
    Valid,
    /// The signature does not match (content or signature tampered).
    Invalid,
    /// The signer certificate is outside its validity period.
    Expired,
    /// The certificate is not self-signed and no trust chain is
    /// available to validate it.
    UntrustedSigner,
    /// The certificate thumbprint is on the revocation list.
    Revoked,
    /// The data set carries no digital signature sequence.
    NoSignature,
}

/// Descriptive metadata of one embedded signature.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureInfo {
    pub signature_uid: String,
    /// the subject of the signer certificate
    pub signer: String,
    pub signed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub mac_algorithm: MacAlgorithm,
    pub signed_tags: Vec<Tag>,
    /// lowercase hex SHA-256 of the certificate DER
    pub certificate_thumbprint: String,
}
