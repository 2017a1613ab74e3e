//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use lcp_kernel_core::UserKey;
use lcp_kernel_decrypt::{Algorithm, Compression, ManifestEntry, OutputMode, LCP_RETRIEVAL_KEY};

use crate::fixtures::{deflate_raw, encrypt_resource};

/// Generate a license id.
pub fn license_id() -> impl Strategy<Value = String> {
    "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}"
}

/// Generate a passphrase.
pub fn passphrase() -> impl Strategy<Value = String> {
    "[ -~]{1,40}"
}

/// Generate a user key from a random passphrase.
pub fn user_key() -> impl Strategy<Value = UserKey> {
    passphrase().prop_map(|p| UserKey::from_passphrase(&p))
}

/// Generate a 256-bit content key.
pub fn content_key() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

/// Generate a resource path inside a publication.
pub fn resource_path() -> impl Strategy<Value = String> {
    ("[A-Za-z]{1,8}", "[a-z0-9_]{1,12}", prop_oneof!["xhtml", "css", "png", "otf"])
        .prop_map(|(dir, name, ext)| format!("{dir}/{name}.{ext}"))
}

/// Generate an output mode.
pub fn output_mode() -> impl Strategy<Value = OutputMode> {
    prop_oneof![
        Just(OutputMode::Text),
        Just(OutputMode::Base64),
        Just(OutputMode::Binary),
    ]
}

/// Generate a compression method.
pub fn compression() -> impl Strategy<Value = Compression> {
    prop_oneof![Just(Compression::Stored), Just(Compression::Deflate)]
}

/// Generate resource bytes up to `max_len`.
pub fn resource_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..max_len)
}

/// Generate an arbitrary JSON tree.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "\\PC{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("\\PC{0,8}", inner, 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate a JSON object, the shape every license has.
pub fn json_object() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("\\PC{0,8}", json_value(), 0..8)
        .prop_map(|entries| Value::Object(entries.into_iter().collect()))
}

/// Parameters for generating an encrypted resource.
#[derive(Debug, Clone)]
pub struct ResourceParams {
    pub key: [u8; 32],
    pub plaintext: Vec<u8>,
    pub compression: Compression,
    pub mode: OutputMode,
}

impl Arbitrary for ResourceParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (content_key(), resource_bytes(4096), compression(), output_mode())
            .prop_map(|(key, plaintext, compression, mode)| ResourceParams {
                key,
                plaintext,
                compression,
                mode,
            })
            .boxed()
    }
}

/// Build the stored ciphertext and manifest entry for generated parameters.
pub fn resource_from_params(params: &ResourceParams) -> anyhow::Result<(Vec<u8>, ManifestEntry)> {
    let stored = match params.compression {
        Compression::Deflate => deflate_raw(&params.plaintext)?,
        Compression::Stored => params.plaintext.clone(),
    };
    let ciphertext = encrypt_resource(&params.key, &stored)?;
    let entry = ManifestEntry {
        algorithm: Algorithm::Aes256Cbc,
        retrieval_key: Some(LCP_RETRIEVAL_KEY.to_string()),
        compression: params.compression,
    };
    Ok((ciphertext, entry))
}
