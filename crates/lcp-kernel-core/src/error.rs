//! Error types for the LCP Kernel Core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while parsing or encoding license material.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed license: {0}")]
    MalformedLicense(String),

    #[error("invalid user key: {0}")]
    InvalidUserKey(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// A single problem found by the field validator.
///
/// The validator accumulates these instead of stopping at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("license must contain '{0}'")]
    MissingField(String),

    #[error("unknown encryption profile '{0}'")]
    UnsupportedProfile(String),

    #[error("license rights are not valid until {0}")]
    RightsNotYetValid(DateTime<Utc>),

    #[error("license rights expired at {0}")]
    RightsExpired(DateTime<Utc>),

    #[error("'{path}' is not a valid timestamp: {value}")]
    InvalidTimestamp { path: String, value: String },
}

/// Block-cipher failures.
///
/// Any of these aborts the whole decryption; plaintext is never returned
/// partially.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    #[error("ciphertext of {0} bytes is too short to hold an IV")]
    MissingIv(usize),

    #[error("unsupported key length: {0} bytes")]
    InvalidKeyLength(usize),

    #[error("ciphertext body of {0} bytes is not a whole number of blocks")]
    MisalignedInput(usize),

    #[error("bad padding")]
    BadPadding,
}

/// Reasons a license is rejected by the verification pipeline.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Accumulated field validation problems (never empty).
    #[error("invalid license fields: {}", join_field_errors(.0))]
    Fields(Vec<FieldError>),

    #[error("user key is invalid")]
    InvalidUserKey,

    #[error("license updated at {updated} before the certificate became valid ({not_before})")]
    CertificateNotYetValid {
        updated: DateTime<Utc>,
        not_before: DateTime<Utc>,
    },

    #[error("license updated at {updated} after the certificate expired ({not_after})")]
    CertificateExpired {
        updated: DateTime<Utc>,
        not_after: DateTime<Utc>,
    },

    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedSignatureAlgorithm(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("content key decryption failed: {0}")]
    ContentKey(#[from] DecryptError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, LicenseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_are_joined() {
        let err = LicenseError::Fields(vec![
            FieldError::MissingField("id".into()),
            FieldError::MissingField("links".into()),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid license fields: license must contain 'id', license must contain 'links'"
        );
    }
}
