//! Errors of signature creation and verification plumbing.
//!
//! Note that a failed verification is not an error: it is reported as a
//! [`VerificationStatus`][crate::VerificationStatus]. Errors here mean
//! the operation itself could not be carried out.
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The data set holds a signature sequence this implementation
    /// cannot interpret.
    #[snafu(display("Malformed digital signature item: {}", reason))]
    MalformedSignature { reason: String },

    /// The embedded certificate could not be parsed.
    #[snafu(display("Could not parse signer certificate"))]
    BadCertificate { source: der::Error },

    /// The certificate's public key does not fit the signature
    /// algorithm in use.
    #[snafu(display("Unsupported or mismatched public key: {}", reason))]
    UnsupportedKey { reason: String },

    /// Producing the cryptographic signature failed.
    #[snafu(display("Could not produce signature: {}", reason))]
    SigningFailed { reason: String },

    /// Certificate generation failed.
    #[snafu(display("Could not build certificate: {}", reason))]
    CertificateBuild { reason: String },

    /// The element selection includes a tag the data set does not hold.
    #[snafu(display("Cannot sign absent element {}", tag))]
    MissingElement { tag: pacs_core::Tag },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
