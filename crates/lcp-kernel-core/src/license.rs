//! License: the signed document granting access to a publication.
//!
//! A license is kept twice: as the raw JSON object it arrived as (the
//! signature covers those exact members, including ones this crate does not
//! model) and as a typed view for convenient access.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::canonical::license_signing_input;
use crate::error::CoreError;
use crate::profile::ProfilePolicy;

/// Typed view of a license document.
///
/// Every member is optional here; presence of the mandatory ones is the
/// field validator's job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseDocument {
    pub id: Option<String>,
    pub issued: Option<String>,
    pub updated: Option<String>,
    pub provider: Option<String>,
    pub encryption: Option<Encryption>,
    pub rights: Option<Rights>,
    pub signature: Option<SignatureInfo>,
    pub links: Option<Vec<Link>>,
    pub user: Option<Value>,
}

/// The `encryption` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Encryption {
    pub profile: Option<String>,
    pub content_key: Option<ContentKeyInfo>,
    pub user_key: Option<UserKeyInfo>,
}

/// The `encryption/content_key` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentKeyInfo {
    pub algorithm: Option<String>,
    /// Base64 of IV || AES-CBC(content key).
    pub encrypted_value: Option<String>,
}

/// The `encryption/user_key` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserKeyInfo {
    pub algorithm: Option<String>,
    /// Base64 of IV || AES-CBC(license id), used to check the user key.
    pub key_check: Option<String>,
    pub text_hint: Option<String>,
}

/// The `rights` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rights {
    pub start: Option<String>,
    pub end: Option<String>,
    pub print: Option<u64>,
    pub copy: Option<u64>,
}

/// The `signature` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignatureInfo {
    pub algorithm: Option<String>,
    /// Base64 DER of the signing certificate.
    pub certificate: Option<String>,
    /// Base64 signature value.
    pub value: Option<String>,
}

/// An entry of the `links` collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Link {
    pub rel: Option<String>,
    pub href: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub templated: Option<bool>,
}

/// A parsed license.
#[derive(Debug, Clone)]
pub struct License {
    raw: Value,
    document: LicenseDocument,
}

impl License {
    /// Parse a license from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let raw: Value = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::MalformedLicense(e.to_string()))?;
        Self::from_value(raw)
    }

    /// Build a license from an already parsed JSON value.
    pub fn from_value(raw: Value) -> Result<Self, CoreError> {
        if !raw.is_object() {
            return Err(CoreError::MalformedLicense(
                "license is not a JSON object".into(),
            ));
        }
        let document = LicenseDocument::deserialize(&raw)
            .map_err(|e| CoreError::MalformedLicense(e.to_string()))?;
        Ok(Self { raw, document })
    }

    /// The raw JSON object.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The typed view.
    pub fn document(&self) -> &LicenseDocument {
        &self.document
    }

    pub fn id(&self) -> Option<&str> {
        self.document.id.as_deref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.document.provider.as_deref()
    }

    pub fn profile(&self) -> Option<&str> {
        self.document
            .encryption
            .as_ref()
            .and_then(|e| e.profile.as_deref())
    }

    pub fn user_key_info(&self) -> Option<&UserKeyInfo> {
        self.document
            .encryption
            .as_ref()
            .and_then(|e| e.user_key.as_ref())
    }

    pub fn content_key_info(&self) -> Option<&ContentKeyInfo> {
        self.document
            .encryption
            .as_ref()
            .and_then(|e| e.content_key.as_ref())
    }

    pub fn signature_info(&self) -> Option<&SignatureInfo> {
        self.document.signature.as_ref()
    }

    /// Find the first link with the given relation.
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.document
            .links
            .as_ref()?
            .iter()
            .find(|link| link.rel.as_deref() == Some(rel))
    }

    /// Whether this license is handled by the external official decryptor.
    pub fn is_official(&self, policy: &ProfilePolicy) -> bool {
        policy.is_official(self.profile(), self.provider())
    }

    /// The timestamp the certificate window is checked against:
    /// `updated` when present, `issued` otherwise.
    pub fn updated_or_issued(&self) -> Result<DateTime<Utc>, CoreError> {
        let (path, value) = match (&self.document.updated, &self.document.issued) {
            (Some(updated), _) if !updated.is_empty() => ("updated", updated),
            (_, Some(issued)) => ("issued", issued),
            _ => {
                return Err(CoreError::MalformedLicense(
                    "license has neither 'updated' nor 'issued'".into(),
                ))
            }
        };
        parse_timestamp(value).ok_or_else(|| {
            CoreError::MalformedLicense(format!("'{path}' is not a valid timestamp: {value}"))
        })
    }

    /// The bytes covered by the license signature.
    pub fn signing_input(&self) -> Result<Vec<u8>, CoreError> {
        license_signing_input(&self.raw)
    }

    /// Resolve a slash-separated member path, e.g. `encryption/profile`.
    ///
    /// Returns `None` when any segment is absent, `null`, or an empty string.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut current = &self.raw;
        for segment in path.split('/') {
            current = current.get(segment)?;
            if is_blank(current) {
                return None;
            }
        }
        Some(current)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{BASIC_PROFILE, PROFILE_1_0};
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "id": "ef15e740-697f-11e3-949a-0800200c9a66",
            "issued": "2013-11-04T01:08:15+01:00",
            "updated": "2014-02-21T09:44:17+01:00",
            "provider": "http://www.imaginaryebookretailer.com",
            "encryption": {
                "profile": BASIC_PROFILE,
                "content_key": {
                    "encrypted_value": "/k8RpXqf4E2WEunCp76E8PjhS051NXwAXeTD1ioazYxCRGvHLAck/KQ3cCh5JxDmCK0nRLyAxs1X0aA3z55boQ==",
                    "algorithm": "http://www.w3.org/2001/04/xmlenc#aes256-cbc"
                },
                "user_key": {
                    "text_hint": "Enter your email address",
                    "algorithm": "http://www.w3.org/2001/04/xmlenc#sha256",
                    "key_check": "jJEjUDipHK3OjGt6kFq7dcOLZuicQFUYwQ+TYkAIWKm6Xv6kpHFhF7LOkUK/Owww"
                }
            },
            "links": [
                { "rel": "publication", "href": "http://www.example.com/file.epub", "type": "application/epub+zip" },
                { "rel": "hint", "href": "http://www.example.com/hint.html", "type": "text/html" }
            ],
            "rights": { "print": 0, "copy": 0 },
            "signature": {
                "algorithm": "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
                "certificate": "MIIDEjCCAfqgAwIBAgIBATANBgkqhkiG9w0BAQsFADBAMQswCQYDVQQGEwJVUzES",
                "value": "q/3IInic9c/EaJHyG1Kkqk5v1zlJNsiQBmxz4lykhyD3dA2jg2ZzrOenYU9GxP/x"
            }
        })
    }

    #[test]
    fn test_typed_view() {
        let license = License::from_value(sample()).unwrap();
        assert_eq!(license.id(), Some("ef15e740-697f-11e3-949a-0800200c9a66"));
        assert_eq!(license.profile(), Some(BASIC_PROFILE));
        assert_eq!(license.document().rights.as_ref().unwrap().print, Some(0));
        assert_eq!(
            license.link("hint").and_then(|l| l.media_type.as_deref()),
            Some("text/html")
        );
        assert!(license.link("status").is_none());
    }

    #[test]
    fn test_field_lookup() {
        let license = License::from_value(sample()).unwrap();
        assert!(license.field("encryption/user_key/key_check").is_some());
        assert!(license.field("encryption/user_key/missing").is_none());
        assert!(license.field("rights/start").is_none());
        assert!(license.field("links").is_some());
    }

    #[test]
    fn test_blank_fields_are_missing() {
        let mut raw = sample();
        raw["provider"] = json!("");
        raw["issued"] = Value::Null;
        let license = License::from_value(raw).unwrap();
        assert!(license.field("provider").is_none());
        assert!(license.field("issued").is_none());
    }

    #[test]
    fn test_updated_or_issued() {
        let license = License::from_value(sample()).unwrap();
        let expected = parse_timestamp("2014-02-21T08:44:17Z").unwrap();
        assert_eq!(license.updated_or_issued().unwrap(), expected);

        let mut raw = sample();
        raw.as_object_mut().unwrap().remove("updated");
        let license = License::from_value(raw).unwrap();
        let expected = parse_timestamp("2013-11-04T00:08:15Z").unwrap();
        assert_eq!(license.updated_or_issued().unwrap(), expected);
    }

    #[test]
    fn test_is_official() {
        let policy = ProfilePolicy::default();
        let license = License::from_value(sample()).unwrap();
        assert!(!license.is_official(&policy));

        let mut raw = sample();
        raw["encryption"]["profile"] = json!(PROFILE_1_0);
        let license = License::from_value(raw).unwrap();
        assert!(license.is_official(&policy));
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(matches!(
            License::from_bytes(b"[1,2,3]"),
            Err(CoreError::MalformedLicense(_))
        ));
        assert!(matches!(
            License::from_bytes(b"{not json"),
            Err(CoreError::MalformedLicense(_))
        ));
    }

    #[test]
    fn test_rejects_mistyped_member() {
        let mut raw = sample();
        raw["id"] = json!(42);
        assert!(License::from_value(raw).is_err());
    }
}
