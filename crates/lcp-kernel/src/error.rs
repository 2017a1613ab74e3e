//! Error types for the LCP Kernel.

use lcp_kernel_channel::ChannelError;
use lcp_kernel_core::LicenseError;
use lcp_kernel_decrypt::ResourceError;
use thiserror::Error;
use tokio::task::JoinError;

use crate::handler::Stage;

/// Errors that can occur during handler operations.
///
/// `License`, `LicenseFailed` and `PipelineAborted` concern the license;
/// `Resource` and `Channel` mean one resource failed.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The pipeline rejected the license.
    #[error("license rejected at {stage} stage: {source}")]
    License {
        stage: Stage,
        #[source]
        source: LicenseError,
    },

    /// A previous pipeline run failed; the handler stays failed.
    #[error("publication cannot be opened: license failed at {stage} stage ({reason})")]
    LicenseFailed { stage: Stage, reason: String },

    /// The license pipeline task died before reaching a verdict.
    ///
    /// The handler stays unvalidated, so the check can be run again.
    #[error("license pipeline aborted: {0}")]
    PipelineAborted(String),

    /// A different license was already verified by this handler.
    #[error("handler already verified license '{0}'")]
    AlreadyVerified(String),

    /// No license has been verified yet.
    #[error("no license has been verified")]
    NotReady,

    /// The license is official but no external channel is attached.
    #[error("official license needs a delegated channel")]
    NoChannel,

    /// Resource decryption error.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Delegated channel error.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

impl HandlerError {
    pub(crate) fn pipeline_aborted(e: JoinError) -> Self {
        Self::PipelineAborted(e.to_string())
    }

    /// Whether the error is about the license rather than one resource.
    pub fn is_license_failure(&self) -> bool {
        matches!(
            self,
            Self::License { .. }
                | Self::LicenseFailed { .. }
                | Self::PipelineAborted(_)
                | Self::AlreadyVerified(_)
                | Self::NotReady
        )
    }
}

/// Result type for handler operations.
pub type Result<T> = std::result::Result<T, HandlerError>;
