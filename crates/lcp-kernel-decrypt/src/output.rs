//! Output shaping for decrypted resources.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::media_type::is_markup;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The form a caller wants decrypted content in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Text,
    Base64,
    Binary,
}

/// Decrypted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plaintext {
    Text(String),
    Base64(String),
    Binary { bytes: Vec<u8>, media_type: String },
}

impl Plaintext {
    pub fn mode(&self) -> OutputMode {
        match self {
            Self::Text(_) => OutputMode::Text,
            Self::Base64(_) => OutputMode::Base64,
            Self::Binary { .. } => OutputMode::Binary,
        }
    }

    /// The text content of a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The encoded content of a `Base64` value.
    pub fn as_base64(&self) -> Option<&str> {
        match self {
            Self::Base64(encoded) => Some(encoded),
            _ => None,
        }
    }

    /// The bytes of a `Binary` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    /// Strip surrounding whitespace from text content.
    pub fn trimmed(self) -> Self {
        match self {
            Self::Text(text) => Self::Text(text.trim().to_string()),
            other => other,
        }
    }
}

/// Shape decrypted, decompressed bytes into the requested form.
pub fn shape(bytes: Vec<u8>, mode: OutputMode, media_type: &str) -> Plaintext {
    match mode {
        OutputMode::Text => {
            let text = decode_text(bytes);
            if is_markup(media_type) {
                Plaintext::Text(trim_after_last_tag(text))
            } else {
                Plaintext::Text(text)
            }
        }
        OutputMode::Base64 => Plaintext::Base64(BASE64.encode(&bytes)),
        OutputMode::Binary => Plaintext::Binary {
            bytes,
            media_type: media_type.to_string(),
        },
    }
}

/// Decode UTF-8, dropping a leading BOM. Invalid sequences are replaced.
pub fn decode_text(bytes: Vec<u8>) -> String {
    let body = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_vec(),
        None => bytes,
    };
    match String::from_utf8(body) {
        Ok(text) => text,
        Err(e) => {
            warn!(valid_up_to = e.utf8_error().valid_up_to(), "decrypted text is not valid UTF-8");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

/// Drop anything after the last `>`, when one exists past the first byte.
pub fn trim_after_last_tag(mut text: String) -> String {
    if let Some(index) = text.rfind('>') {
        if index > 0 {
            text.truncate(index + 1);
        }
    }
    text
}
