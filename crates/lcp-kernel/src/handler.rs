//! The license handler: verifies one license, then decrypts resources.
//!
//! The license pipeline runs its stages in a fixed order under the
//! handler's write lock. The first failure leaves the handler failed for
//! good; success fixes the decryption strategy for its lifetime.

use chrono::{DateTime, Utc};
use lcp_kernel_channel::DecryptChannel;
use lcp_kernel_core::{
    check_fields, check_user_key, derive_content_key, verify_signature, ContentKey, License,
    LicenseError, ProfilePolicy, UserKey, UserKeyCheck,
};
use lcp_kernel_decrypt::manifest::normalize_path;
use lcp_kernel_decrypt::obfuscation::deobfuscate;
use lcp_kernel_decrypt::output::shape;
use lcp_kernel_decrypt::{
    media_type, Algorithm, Ciphertext, EncryptionManifest, OutputMode, Plaintext, ResourceError,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::HandlerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{HandlerError, Result};

/// A stage of the license pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fields,
    UserKey,
    Signature,
    ContentKey,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fields => "fields",
            Self::UserKey => "user key",
            Self::Signature => "signature",
            Self::ContentKey => "content key",
        };
        f.write_str(name)
    }
}

/// How resources of a verified license are decrypted.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// In process, with the derived content key.
    Local(Arc<ContentKey>),
    /// By the external decryptor, which owns the key.
    Delegated,
}

/// A verified license.
#[derive(Debug, Clone)]
pub struct Session {
    pub license_id: String,
    pub strategy: Strategy,
}

/// License lifecycle.
#[derive(Debug, Clone, Default)]
pub enum LicenseState {
    #[default]
    Unvalidated,
    Ready(Session),
    Failed { stage: Stage, reason: String },
}

/// A snapshot of the license lifecycle without key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseStatus {
    Unvalidated,
    Ready { license_id: String, delegated: bool },
    Failed { stage: Stage },
}

/// Verifies a license and decrypts the publication's resources.
///
/// Provides:
/// - The license pipeline (fields, user key, signature, content key)
/// - Resource decryption routed by the encryption manifest
/// - Delegated decryption for official licenses, when a channel is attached
pub struct LicenseHandler {
    config: HandlerConfig,
    manifest: Arc<EncryptionManifest>,
    user_key: UserKey,
    state: RwLock<LicenseState>,
    dispatcher: Dispatcher,
}

impl LicenseHandler {
    /// Create a handler for one publication.
    pub fn new(manifest: EncryptionManifest, user_key: UserKey, config: HandlerConfig) -> Self {
        let dispatcher = Dispatcher::new(&config);
        Self {
            config,
            manifest: Arc::new(manifest),
            user_key,
            state: RwLock::new(LicenseState::Unvalidated),
            dispatcher,
        }
    }

    /// Attach the external decryptor used for official licenses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_channel(mut self, channel: Arc<dyn DecryptChannel>) -> Self {
        self.dispatcher.attach_channel(channel);
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn manifest(&self) -> &EncryptionManifest {
        &self.manifest
    }

    /// Number of paths with an outstanding delegated job.
    pub fn pending_requests(&self) -> usize {
        self.dispatcher.pending().len()
    }

    /// Callers waiting on the delegated job for `path`.
    pub fn waiting(&self, path: &str) -> usize {
        self.dispatcher.pending().waiting(normalize_path(path))
    }

    /// Whether the attached delegated channel has closed.
    pub fn channel_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }

    pub async fn status(&self) -> LicenseStatus {
        match &*self.state.read().await {
            LicenseState::Unvalidated => LicenseStatus::Unvalidated,
            LicenseState::Ready(session) => LicenseStatus::Ready {
                license_id: session.license_id.clone(),
                delegated: matches!(session.strategy, Strategy::Delegated),
            },
            LicenseState::Failed { stage, .. } => LicenseStatus::Failed { stage: *stage },
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // License Pipeline
    // ─────────────────────────────────────────────────────────────────────────

    /// Run the license pipeline against the current time.
    pub async fn check_license(&self, license: &License) -> Result<()> {
        self.check_license_at(license, Utc::now()).await
    }

    /// Run the license pipeline, judging the rights window against `now`.
    ///
    /// Calling again with the same license after success is a no-op; after
    /// a failure it returns [`HandlerError::LicenseFailed`] without
    /// re-running anything.
    pub async fn check_license_at(&self, license: &License, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        match &*state {
            LicenseState::Ready(session) => {
                return if license.id() == Some(session.license_id.as_str()) {
                    Ok(())
                } else {
                    Err(HandlerError::AlreadyVerified(session.license_id.clone()))
                };
            }
            LicenseState::Failed { stage, reason } => {
                return Err(HandlerError::LicenseFailed {
                    stage: *stage,
                    reason: reason.clone(),
                });
            }
            LicenseState::Unvalidated => {}
        }

        let outcome = if self.config.offload_cpu_work {
            let license = license.clone();
            let user_key = self.user_key.clone();
            let policy = self.config.profile_policy.clone();
            tokio::task::spawn_blocking(move || run_pipeline(&license, &user_key, &policy, now))
                .await
                .map_err(HandlerError::pipeline_aborted)?
        } else {
            run_pipeline(license, &self.user_key, &self.config.profile_policy, now)
        };

        match outcome {
            Ok(session) => {
                info!(
                    license_id = %session.license_id,
                    delegated = matches!(session.strategy, Strategy::Delegated),
                    "license verified"
                );
                *state = LicenseState::Ready(session);
                Ok(())
            }
            Err((stage, source)) => {
                warn!(%stage, error = %source, "license rejected");
                *state = LicenseState::Failed {
                    stage,
                    reason: source.to_string(),
                };
                Err(HandlerError::License { stage, source })
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resource Decryption
    // ─────────────────────────────────────────────────────────────────────────

    /// Decrypt one resource of the publication.
    ///
    /// `media_type` is inferred from the path extension when absent.
    pub async fn decrypt_resource(
        &self,
        path: &str,
        ciphertext: Ciphertext,
        mode: OutputMode,
        media_type: Option<&str>,
    ) -> Result<Plaintext> {
        let entry = self
            .manifest
            .lookup(path)
            .ok_or_else(|| ResourceError::unsupported(path, "resource is not in the encryption manifest"))?
            .clone();
        let media_type = media_type
            .map(str::to_string)
            .unwrap_or_else(|| media_type::from_path(path).to_string());

        match &entry.algorithm {
            Algorithm::IdpfFont | Algorithm::AdobeFont => {
                debug!(path, algorithm = %entry.algorithm, "de-obfuscating font");
                let data = ciphertext.into_bytes().await?;
                let data = deobfuscate(
                    path,
                    &entry.algorithm,
                    self.manifest.unique_identifier(),
                    data,
                )?;
                Ok(shape(data, mode, &media_type))
            }
            Algorithm::Aes256Cbc => match self.strategy().await? {
                Strategy::Local(key) => {
                    debug!(path, ?mode, "decrypting locally");
                    self.dispatcher
                        .decrypt_local(key, ciphertext, entry, mode, media_type)
                        .await
                }
                Strategy::Delegated => {
                    debug!(path, ?mode, "decrypting through delegated channel");
                    self.dispatcher
                        .decrypt_delegated(normalize_path(path), ciphertext, mode, media_type)
                        .await
                }
            },
            Algorithm::Unknown(uri) => Err(ResourceError::unsupported(
                path,
                format!("no decrypt target for {uri}"),
            )
            .into()),
        }
    }

    async fn strategy(&self) -> Result<Strategy> {
        match &*self.state.read().await {
            LicenseState::Ready(session) => Ok(session.strategy.clone()),
            LicenseState::Unvalidated => Err(HandlerError::NotReady),
            LicenseState::Failed { stage, reason } => Err(HandlerError::LicenseFailed {
                stage: *stage,
                reason: reason.clone(),
            }),
        }
    }
}

/// The license pipeline. Stages run strictly in order; the first failure
/// stops it.
fn run_pipeline(
    license: &License,
    user_key: &UserKey,
    policy: &ProfilePolicy,
    now: DateTime<Utc>,
) -> std::result::Result<Session, (Stage, LicenseError)> {
    check_fields(license, now).map_err(|e| (Stage::Fields, e))?;
    debug!("license fields checked");

    let check = check_user_key(license, user_key, policy).map_err(|e| (Stage::UserKey, e))?;
    debug!(?check, "user key stage done");

    verify_signature(license).map_err(|e| (Stage::Signature, e))?;
    debug!("license signature checked");

    let strategy = match check {
        UserKeyCheck::Skipped => Strategy::Delegated,
        UserKeyCheck::Verified => {
            let key = derive_content_key(license, user_key).map_err(|e| (Stage::ContentKey, e))?;
            Strategy::Local(Arc::new(key))
        }
    };

    let license_id = license.id().unwrap_or_default().to_string();
    Ok(Session {
        license_id,
        strategy,
    })
}
