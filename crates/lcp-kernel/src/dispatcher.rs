//! Decrypt dispatcher: runs a resource through the local engine or the
//! delegated channel.

use lcp_kernel_channel::{
    ChannelError, DecryptChannel, DecryptJob, PendingRequests, Registration, Waiter,
};
use lcp_kernel_core::ContentKey;
use lcp_kernel_decrypt::{Ciphertext, Engine, ManifestEntry, OutputMode, Plaintext, ResourceError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::HandlerConfig;
use crate::error::{HandlerError, Result};

/// Routes decryption work for one handler.
pub struct Dispatcher {
    offload_cpu_work: bool,
    channel: Option<Arc<dyn DecryptChannel>>,
    pending: Arc<PendingRequests>,
    /// Set once the response pump has stopped for good.
    closed: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(config: &HandlerConfig) -> Self {
        Self {
            offload_cpu_work: config.offload_cpu_work,
            channel: None,
            pending: Arc::new(PendingRequests::new(config.trim_delegated_text)),
            closed: Arc::new(AtomicBool::new(false)),
            pump: None,
        }
    }

    /// Attach the external decryptor and start pumping its responses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach_channel(&mut self, channel: Arc<dyn DecryptChannel>) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.closed = Arc::new(AtomicBool::new(false));
        let pump = tokio::spawn(pump_responses(
            Arc::clone(&channel),
            Arc::clone(&self.pending),
            Arc::clone(&self.closed),
        ));
        self.channel = Some(channel);
        self.pump = Some(pump);
    }

    /// Whether the attached channel has stopped delivering responses.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Decrypt in process with the content key.
    pub async fn decrypt_local(
        &self,
        key: Arc<ContentKey>,
        ciphertext: Ciphertext,
        entry: ManifestEntry,
        mode: OutputMode,
        media_type: String,
    ) -> Result<Plaintext> {
        let engine = Engine::new(key);
        if !self.offload_cpu_work {
            return Ok(engine
                .decrypt_resource(ciphertext, &entry, mode, &media_type)
                .await?);
        }

        let bytes = ciphertext.into_bytes().await?;
        let plaintext = tokio::task::spawn_blocking(move || {
            engine.decrypt_payload(&bytes, &entry, mode, &media_type)
        })
        .await
        .map_err(|e| ResourceError::Task(e.to_string()))??;
        Ok(plaintext)
    }

    /// Hand the ciphertext to the external decryptor and wait for the result.
    ///
    /// Only the first concurrent request for a path posts a job. If that
    /// request is cancelled before the post completes, the entry is removed
    /// so the next request for the path posts again.
    pub async fn decrypt_delegated(
        &self,
        path: &str,
        ciphertext: Ciphertext,
        mode: OutputMode,
        media_type: String,
    ) -> Result<Plaintext> {
        let channel = self.channel.as_ref().ok_or(HandlerError::NoChannel)?;
        if self.is_closed() {
            return Err(ChannelError::Closed.into());
        }
        let content = ciphertext.into_bytes().await?;

        let (waiter, rx) = Waiter::new(mode, media_type);
        let registration = self.pending.register(path, waiter);
        // The pump sets the flag before abandoning the table, so a
        // registration that raced past it is dropped here.
        if self.is_closed() {
            self.pending.abandon(path);
            return Err(ChannelError::Closed.into());
        }

        match registration {
            Registration::First => {
                debug!(path, len = content.len(), "posting delegated decrypt job");
                let guard = PostGuard::new(&self.pending, path);
                let job = DecryptJob {
                    path: path.to_string(),
                    content,
                };
                channel.post(job).await?;
                guard.posted();
            }
            Registration::Joined => {
                debug!(path, "joined outstanding delegated job");
            }
        }

        rx.await
            .map_err(|_| ChannelError::Abandoned(path.to_string()).into())
    }
}

/// Removes a path's pending entry unless its job was posted.
///
/// Covers both a failed post and a caller dropped while the post is
/// in flight.
struct PostGuard<'a> {
    pending: &'a PendingRequests,
    path: &'a str,
    posted: bool,
}

impl<'a> PostGuard<'a> {
    fn new(pending: &'a PendingRequests, path: &'a str) -> Self {
        Self {
            pending,
            path,
            posted: false,
        }
    }

    fn posted(mut self) {
        self.posted = true;
    }
}

impl Drop for PostGuard<'_> {
    fn drop(&mut self) {
        if self.posted {
            return;
        }
        if let Some(request) = self.pending.abandon(self.path) {
            debug!(path = self.path, waiters = request.len(), "delegated job not posted");
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Resolve pending requests from channel responses until the channel closes.
///
/// Transport errors are logged and skipped; only a closed channel stops the
/// pump, after which every waiter is abandoned and new requests fail fast.
async fn pump_responses(
    channel: Arc<dyn DecryptChannel>,
    pending: Arc<PendingRequests>,
    closed: Arc<AtomicBool>,
) {
    loop {
        match channel.recv().await {
            Ok(response) => {
                pending.resolve(response);
            }
            Err(ChannelError::InvalidMessage(e)) => {
                warn!(error = %e, "undecodable delegated response");
            }
            Err(ChannelError::TransportError(e)) => {
                warn!(error = %e, "delegated channel transport error");
                tokio::task::yield_now().await;
            }
            Err(e) => {
                closed.store(true, Ordering::SeqCst);
                let abandoned = pending.abandon_all();
                debug!(error = %e, abandoned, "delegated channel finished");
                break;
            }
        }
    }
}
