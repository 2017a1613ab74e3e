//! Messages exchanged with the external decryptor.
//!
//! Both directions carry a `type` tag so they can share one JSON pipe.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Ask the external decryptor to decrypt one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "remote_decrypt_data")]
pub struct DecryptJob {
    /// Resource path; correlates the response.
    pub path: String,
    /// Encrypted bytes, IV first.
    pub content: Vec<u8>,
}

/// Decrypted bytes for a previously posted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "decrypted_data")]
pub struct DecryptResponse {
    pub path: String,
    /// Plaintext bytes, ready for output shaping.
    pub content: Vec<u8>,
}

impl DecryptJob {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl DecryptResponse {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
