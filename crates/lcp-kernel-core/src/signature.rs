//! License signature verification.
//!
//! The signature covers the canonical encoding of the license without its
//! `signature` member, hashed with SHA-256 and signed with the provider's
//! RSA key (PKCS#1 v1.5).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::certificate::Certificate;
use crate::error::{CoreError, LicenseError, Result};
use crate::license::{License, SignatureInfo};

/// The only signature algorithm accepted.
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// Verify a license against the certificate embedded in it.
pub fn verify_signature(license: &License) -> Result<()> {
    let info = signature_info(license)?;
    let certificate = info
        .certificate
        .as_deref()
        .ok_or_else(|| missing("signature/certificate"))?;
    let der = BASE64
        .decode(certificate.trim())
        .map_err(|e| LicenseError::MalformedCertificate(e.to_string()))?;
    verify_signature_with(license, &der)
}

/// Verify a license against an explicitly supplied DER certificate.
///
/// This performs:
/// - Certificate parsing
/// - `updated` (or `issued`) inside the certificate validity window
/// - Algorithm check
/// - RSA verification of the SHA-256 digest of the signing input
pub fn verify_signature_with(license: &License, certificate_der: &[u8]) -> Result<()> {
    let info = signature_info(license)?;

    let certificate = Certificate::from_der(certificate_der)?;
    let updated = license.updated_or_issued()?;
    certificate.check_validity(updated)?;

    let algorithm = info
        .algorithm
        .as_deref()
        .ok_or_else(|| missing("signature/algorithm"))?;
    if algorithm != RSA_SHA256 {
        return Err(LicenseError::UnsupportedSignatureAlgorithm(algorithm.to_string()));
    }

    let value = info
        .value
        .as_deref()
        .ok_or_else(|| missing("signature/value"))?;
    let signature = BASE64
        .decode(value.trim())
        .map_err(|_| LicenseError::InvalidSignature)?;

    let digest = Sha256::digest(license.signing_input()?);
    certificate
        .rsa_public_key()?
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
        .map_err(|_| LicenseError::InvalidSignature)?;

    debug!(license_id = license.id().unwrap_or_default(), "license signature verified");
    Ok(())
}

fn signature_info(license: &License) -> Result<&SignatureInfo> {
    license.signature_info().ok_or_else(|| missing("signature"))
}

fn missing(path: &str) -> LicenseError {
    CoreError::MalformedLicense(format!("license must contain '{path}'")).into()
}
