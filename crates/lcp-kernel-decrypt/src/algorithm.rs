//! Encryption algorithm identifiers found in a publication's encryption
//! descriptor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// AES-256-CBC content encryption, keyed by the license content key.
pub const AES256_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";

/// IDPF font obfuscation.
pub const IDPF_FONT: &str = "http://www.idpf.org/2008/embedding";

/// Adobe font obfuscation.
pub const ADOBE_FONT: &str = "http://ns.adobe.com/pdf/enc#RC";

/// A resource encryption algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Algorithm {
    Aes256Cbc,
    IdpfFont,
    AdobeFont,
    /// Any other URI. Has no decrypt target.
    Unknown(String),
}

impl Algorithm {
    pub fn from_uri(uri: &str) -> Self {
        match uri {
            AES256_CBC => Self::Aes256Cbc,
            IDPF_FONT => Self::IdpfFont,
            ADOBE_FONT => Self::AdobeFont,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_uri(&self) -> &str {
        match self {
            Self::Aes256Cbc => AES256_CBC,
            Self::IdpfFont => IDPF_FONT,
            Self::AdobeFont => ADOBE_FONT,
            Self::Unknown(uri) => uri,
        }
    }

    /// Whether this is a font obfuscation scheme (no license needed).
    pub fn is_font_obfuscation(&self) -> bool {
        matches!(self, Self::IdpfFont | Self::AdobeFont)
    }
}

impl From<String> for Algorithm {
    fn from(uri: String) -> Self {
        Self::from_uri(&uri)
    }
}

impl From<Algorithm> for String {
    fn from(algorithm: Algorithm) -> Self {
        algorithm.as_uri().to_string()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_uri())
    }
}
