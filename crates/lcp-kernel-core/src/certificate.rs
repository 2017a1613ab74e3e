//! The provider certificate embedded in a license signature.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use x509_cert::der::{Decode, Encode};
use x509_cert::time::Time;

use crate::error::{LicenseError, Result};

/// An X.509 certificate reduced to what license verification needs.
#[derive(Debug, Clone)]
pub struct Certificate {
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    spki_der: Vec<u8>,
}

impl Certificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let cert = x509_cert::Certificate::from_der(der)
            .map_err(|e| LicenseError::MalformedCertificate(e.to_string()))?;
        let tbs = &cert.tbs_certificate;

        let spki_der = tbs
            .subject_public_key_info
            .to_der()
            .map_err(|e| LicenseError::MalformedCertificate(e.to_string()))?;

        Ok(Self {
            not_before: to_utc(&tbs.validity.not_before)?,
            not_after: to_utc(&tbs.validity.not_after)?,
            spki_der,
        })
    }

    /// Parse a base64 DER certificate, as found in `signature/certificate`.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let der = BASE64
            .decode(encoded.trim())
            .map_err(|e| LicenseError::MalformedCertificate(e.to_string()))?;
        Self::from_der(&der)
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Require `updated` to fall inside the validity window.
    pub fn check_validity(&self, updated: DateTime<Utc>) -> Result<()> {
        if updated < self.not_before {
            return Err(LicenseError::CertificateNotYetValid {
                updated,
                not_before: self.not_before,
            });
        }
        if updated > self.not_after {
            return Err(LicenseError::CertificateExpired {
                updated,
                not_after: self.not_after,
            });
        }
        Ok(())
    }

    /// The subject public key as an RSA key.
    pub fn rsa_public_key(&self) -> Result<RsaPublicKey> {
        RsaPublicKey::from_public_key_der(&self.spki_der)
            .map_err(|e| LicenseError::MalformedCertificate(format!("not an RSA key: {e}")))
    }
}

fn to_utc(time: &Time) -> Result<DateTime<Utc>> {
    let since_epoch = time.to_unix_duration();
    let secs = i64::try_from(since_epoch.as_secs())
        .map_err(|_| LicenseError::MalformedCertificate("validity out of range".into()))?;
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| LicenseError::MalformedCertificate("validity out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::parse_timestamp;

    fn window() -> Certificate {
        Certificate {
            not_before: parse_timestamp("2020-01-01T00:00:00Z").unwrap(),
            not_after: parse_timestamp("2030-01-01T00:00:00Z").unwrap(),
            spki_der: Vec::new(),
        }
    }

    #[test]
    fn test_validity_window() {
        let cert = window();
        assert!(cert
            .check_validity(parse_timestamp("2024-05-05T00:00:00Z").unwrap())
            .is_ok());
        assert!(matches!(
            cert.check_validity(parse_timestamp("2019-12-31T23:59:59Z").unwrap()),
            Err(LicenseError::CertificateNotYetValid { .. })
        ));
        assert!(matches!(
            cert.check_validity(parse_timestamp("2030-01-01T00:00:01Z").unwrap()),
            Err(LicenseError::CertificateExpired { .. })
        ));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let cert = window();
        assert!(cert.check_validity(cert.not_before()).is_ok());
        assert!(cert.check_validity(cert.not_after()).is_ok());
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            Certificate::from_der(&[0x30, 0x03, 0x01, 0x02]),
            Err(LicenseError::MalformedCertificate(_))
        ));
        assert!(matches!(
            Certificate::from_base64("not base64!"),
            Err(LicenseError::MalformedCertificate(_))
        ));
    }

    #[test]
    fn test_missing_key_is_malformed() {
        assert!(matches!(
            window().rsa_public_key(),
            Err(LicenseError::MalformedCertificate(_))
        ));
    }
}
