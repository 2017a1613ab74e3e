//! Test fixtures: signed licenses, issuer certificates, encrypted resources.

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use flate2::write::DeflateEncoder;
use lcp_kernel_core::{
    cipher, license_signing_input, ContentKey, License, UserKey, BASIC_PROFILE, PROFILE_1_0,
    RSA_SHA256,
};
use lcp_kernel_decrypt::{
    Algorithm, Compression, EncryptionDescriptor, EncryptionManifest, ResourceDescriptor,
    LCP_RETRIEVAL_KEY,
};
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey};
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::der::asn1::UtcTime;
use x509_cert::der::{Decode, Encode};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::{Time, Validity};

/// Passphrase used by default fixtures.
pub const PASSPHRASE: &str = "open sesame";

/// Provider of default fixtures.
pub const TEST_PROVIDER: &str = "https://provider.example.com";

/// A provider outside the exempt list, so profile-1.0 licenses from it are official.
pub const OFFICIAL_PROVIDER: &str = "https://official.example.com";

const ISSUER_KEY_BITS: usize = 2048;

static ISSUER_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();

/// The RSA key every fixture license is signed with.
///
/// Generated once per test process.
pub fn issuer_key() -> anyhow::Result<&'static RsaPrivateKey> {
    if let Some(key) = ISSUER_KEY.get() {
        return Ok(key);
    }
    let key = RsaPrivateKey::new(&mut rand::thread_rng(), ISSUER_KEY_BITS)
        .context("generating issuer key")?;
    // A racing thread may have won; either key is fine.
    let _ = ISSUER_KEY.set(key);
    ISSUER_KEY
        .get()
        .ok_or_else(|| anyhow!("issuer key not initialized"))
}

/// Self-signed issuer certificate over the fixture key, DER encoded.
pub fn issuer_certificate(
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> anyhow::Result<Vec<u8>> {
    let key = issuer_key()?;
    let public_der = key
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| anyhow!("encoding issuer public key: {e}"))?;
    let spki = SubjectPublicKeyInfoOwned::from_der(public_der.as_bytes())
        .map_err(|e| anyhow!("decoding issuer SPKI: {e}"))?;

    let validity = Validity {
        not_before: utc_time(not_before)?,
        not_after: utc_time(not_after)?,
    };
    let subject = Name::from_str("CN=LCP Kernel Test Provider,O=LCP Kernel")
        .map_err(|e| anyhow!("subject name: {e}"))?;
    let signer = SigningKey::<Sha256>::new(key.clone());

    let builder = CertificateBuilder::new(
        Profile::Root,
        SerialNumber::from(1u32),
        validity,
        subject,
        spki,
        &signer,
    )
    .map_err(|e| anyhow!("certificate builder: {e}"))?;
    let certificate = builder
        .build::<RsaSignature>()
        .map_err(|e| anyhow!("signing certificate: {e}"))?;
    certificate
        .to_der()
        .map_err(|e| anyhow!("encoding certificate: {e}"))
}

fn utc_time(at: DateTime<Utc>) -> anyhow::Result<Time> {
    let secs = u64::try_from(at.timestamp()).context("certificate time before epoch")?;
    let time = UtcTime::from_unix_duration(Duration::from_secs(secs))
        .map_err(|e| anyhow!("certificate time out of range: {e}"))?;
    Ok(Time::UtcTime(time))
}

fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A license under construction.
///
/// Defaults produce a basic-profile license that passes every stage of the
/// pipeline for [`PASSPHRASE`].
#[derive(Debug, Clone)]
pub struct LicenseFixture {
    pub id: String,
    pub passphrase: String,
    pub profile: String,
    pub provider: String,
    pub issued: String,
    pub updated: Option<String>,
    pub rights_start: Option<String>,
    pub rights_end: Option<String>,
    pub content_key: Vec<u8>,
    pub cert_not_before: DateTime<Utc>,
    pub cert_not_after: DateTime<Utc>,
}

impl LicenseFixture {
    pub fn new() -> Self {
        Self {
            id: "ef15e740-697f-11e3-949a-0800200c9a66".to_string(),
            passphrase: PASSPHRASE.to_string(),
            profile: BASIC_PROFILE.to_string(),
            provider: TEST_PROVIDER.to_string(),
            issued: "2024-03-01T10:00:00Z".to_string(),
            updated: None,
            rights_start: Some("2024-03-01T00:00:00Z".to_string()),
            rights_end: None,
            content_key: (0u8..32).collect(),
            cert_not_before: utc(2020, 1, 1),
            cert_not_after: utc(2040, 1, 1),
        }
    }

    /// A profile-1.0 license from an official provider.
    pub fn official() -> Self {
        Self::new()
            .with_profile(PROFILE_1_0)
            .with_provider(OFFICIAL_PROVIDER)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = passphrase.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_updated(mut self, updated: impl Into<String>) -> Self {
        self.updated = Some(updated.into());
        self
    }

    pub fn with_rights(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.rights_start = start.map(str::to_string);
        self.rights_end = end.map(str::to_string);
        self
    }

    pub fn with_content_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.content_key = key.into();
        self
    }

    pub fn with_certificate_validity(
        mut self,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> Self {
        self.cert_not_before = not_before;
        self.cert_not_after = not_after;
        self
    }

    /// The user key a reader with the right passphrase holds.
    pub fn user_key(&self) -> UserKey {
        UserKey::from_passphrase(&self.passphrase)
    }

    pub fn content_key(&self) -> anyhow::Result<ContentKey> {
        Ok(ContentKey::from_bytes(self.content_key.clone())?)
    }

    /// The unsigned license document.
    pub fn unsigned_value(&self) -> anyhow::Result<Value> {
        let user_key = self.user_key();
        let key_check = encrypt_b64(user_key.as_bytes(), self.id.as_bytes())?;
        let encrypted_value = encrypt_b64(user_key.as_bytes(), &self.content_key)?;

        let mut rights = serde_json::Map::new();
        rights.insert("print".into(), json!(10));
        rights.insert("copy".into(), json!(2048));
        if let Some(start) = &self.rights_start {
            rights.insert("start".into(), json!(start));
        }
        if let Some(end) = &self.rights_end {
            rights.insert("end".into(), json!(end));
        }

        let mut value = json!({
            "id": self.id,
            "issued": self.issued,
            "provider": self.provider,
            "encryption": {
                "profile": self.profile,
                "content_key": {
                    "algorithm": "http://www.w3.org/2001/04/xmlenc#aes256-cbc",
                    "encrypted_value": encrypted_value,
                },
                "user_key": {
                    "algorithm": "http://www.w3.org/2001/04/xmlenc#sha256",
                    "key_check": key_check,
                    "text_hint": "The fixture passphrase",
                },
            },
            "links": [
                {
                    "rel": "hint",
                    "href": "https://provider.example.com/passphrase-hint",
                    "type": "text/html",
                },
                {
                    "rel": "publication",
                    "href": "https://provider.example.com/book.epub",
                    "type": "application/epub+zip",
                },
            ],
            "user": { "id": "reader-1" },
            "rights": Value::Object(rights),
        });
        if let (Some(updated), Some(object)) = (&self.updated, value.as_object_mut()) {
            object.insert("updated".into(), json!(updated));
        }
        Ok(value)
    }

    /// The signed license document.
    pub fn build_value(&self) -> anyhow::Result<Value> {
        let mut value = self.unsigned_value()?;
        sign_value(&mut value, self.cert_not_before, self.cert_not_after)?;
        Ok(value)
    }

    pub fn build(&self) -> anyhow::Result<License> {
        Ok(License::from_value(self.build_value()?)?)
    }

    /// The signed license as it would arrive in a `.lcpl` file.
    pub fn build_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.build_value()?)?)
    }
}

impl Default for LicenseFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Sign `value` with the issuer key, replacing any `signature` member.
pub fn sign_value(
    value: &mut Value,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> anyhow::Result<()> {
    let key = issuer_key()?;
    let certificate = issuer_certificate(not_before, not_after)?;

    let digest = Sha256::digest(license_signing_input(value)?);
    let signature = key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .context("signing license")?;

    let object = value
        .as_object_mut()
        .ok_or_else(|| anyhow!("license is not a JSON object"))?;
    object.insert(
        "signature".into(),
        json!({
            "algorithm": RSA_SHA256,
            "certificate": BASE64.encode(certificate),
            "value": BASE64.encode(signature),
        }),
    );
    Ok(())
}

/// Encrypt with a random IV, returning IV || ciphertext.
pub fn encrypt_resource(key: &[u8], plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
    let iv: [u8; cipher::IV_SIZE] = rand::random();
    Ok(cipher::encrypt(key, &iv, plaintext)?)
}

fn encrypt_b64(key: &[u8], plaintext: &[u8]) -> anyhow::Result<String> {
    Ok(BASE64.encode(encrypt_resource(key, plaintext)?))
}

/// Compress with raw DEFLATE, as EPUB packagers do before encrypting.
pub fn deflate_raw(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Deflate then encrypt, the way packaged content resources are stored.
pub fn package_resource(key: &[u8], plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
    encrypt_resource(key, &deflate_raw(plaintext)?)
}

/// Descriptor of an LCP-encrypted resource.
pub fn lcp_resource(path: &str, compression: Compression) -> ResourceDescriptor {
    ResourceDescriptor {
        path: path.to_string(),
        algorithm: Algorithm::Aes256Cbc,
        retrieval_key: Some(LCP_RETRIEVAL_KEY.to_string()),
        compression,
    }
}

/// Descriptor of an obfuscated font.
pub fn font_resource(path: &str, algorithm: Algorithm) -> ResourceDescriptor {
    ResourceDescriptor {
        path: path.to_string(),
        algorithm,
        retrieval_key: None,
        compression: Compression::Stored,
    }
}

/// A manifest with the given resources.
pub fn manifest(
    unique_identifier: Option<&str>,
    resources: Vec<ResourceDescriptor>,
) -> EncryptionManifest {
    EncryptionManifest::build(EncryptionDescriptor {
        unique_identifier: unique_identifier.map(str::to_string),
        resources,
    })
}
