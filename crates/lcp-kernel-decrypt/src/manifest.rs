//! Encryption manifest: which resources are encrypted, and how.
//!
//! Built once from the publication's parsed encryption descriptor and
//! read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::algorithm::Algorithm;
use crate::compression::Compression;

/// Retrieval key marking a resource as encrypted with the license content key.
pub const LCP_RETRIEVAL_KEY: &str = "license.lcpl#/encryption/content_key";

/// A publication's parsed encryption descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionDescriptor {
    /// The publication unique identifier, used by font obfuscation.
    #[serde(default)]
    pub unique_identifier: Option<String>,

    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
}

/// One encrypted resource in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub path: String,
    pub algorithm: Algorithm,
    #[serde(default)]
    pub retrieval_key: Option<String>,
    #[serde(default)]
    pub compression: Compression,
}

/// How one resource is encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub algorithm: Algorithm,
    pub retrieval_key: Option<String>,
    pub compression: Compression,
}

/// Normalized resource path → encryption entry.
#[derive(Debug, Clone, Default)]
pub struct EncryptionManifest {
    unique_identifier: Option<String>,
    entries: HashMap<String, ManifestEntry>,
}

impl EncryptionManifest {
    /// Build the manifest. Later entries for the same path replace earlier ones.
    pub fn build(descriptor: EncryptionDescriptor) -> Self {
        let entries = descriptor
            .resources
            .into_iter()
            .map(|resource| {
                (
                    normalize_path(&resource.path).to_string(),
                    ManifestEntry {
                        algorithm: resource.algorithm,
                        retrieval_key: resource.retrieval_key.filter(|k| !k.is_empty()),
                        compression: resource.compression,
                    },
                )
            })
            .collect();

        Self {
            unique_identifier: descriptor.unique_identifier,
            entries,
        }
    }

    pub fn lookup(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.get(normalize_path(path))
    }

    pub fn unique_identifier(&self) -> Option<&str> {
        self.unique_identifier.as_deref()
    }

    /// Whether any resource is encrypted with the license content key.
    pub fn is_lcp_protected(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.retrieval_key.as_deref() == Some(LCP_RETRIEVAL_KEY))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
    }
}

/// Strip leading `/` and `./` segments.
pub fn normalize_path(path: &str) -> &str {
    let mut path = path;
    loop {
        if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else {
            return path;
        }
    }
}
