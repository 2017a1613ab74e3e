//! Pending delegated requests, keyed by resource path.
//!
//! Concurrent requests for one path share a single outbound job: the first
//! waiter posts it, later ones only join. One response resolves every
//! waiter for its path and removes the entry.

use lcp_kernel_decrypt::output::shape;
use lcp_kernel_decrypt::{OutputMode, Plaintext};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::messages::DecryptResponse;

/// One caller waiting for a delegated result, with the form it wants.
#[derive(Debug)]
pub struct Waiter {
    pub mode: OutputMode,
    pub media_type: String,
    tx: oneshot::Sender<Plaintext>,
}

impl Waiter {
    /// Create a waiter and the receiver its caller awaits.
    pub fn new(mode: OutputMode, media_type: impl Into<String>) -> (Self, oneshot::Receiver<Plaintext>) {
        let (tx, rx) = oneshot::channel();
        let waiter = Self {
            mode,
            media_type: media_type.into(),
            tx,
        };
        (waiter, rx)
    }

    /// Shape `content` for this waiter and hand it over.
    ///
    /// Returns false when the caller has gone away.
    fn resolve(self, content: &[u8], trim_text: bool) -> bool {
        let plaintext = shape(content.to_vec(), self.mode, &self.media_type);
        let plaintext = if trim_text { plaintext.trimmed() } else { plaintext };
        self.tx.send(plaintext).is_ok()
    }
}

/// All waiters for one path.
#[derive(Debug, Default)]
pub struct PendingDecryptRequest {
    waiters: Vec<Waiter>,
}

impl PendingDecryptRequest {
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

/// Whether a registration must post the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First waiter for the path: post the job.
    First,
    /// A job is already outstanding: just wait.
    Joined,
}

/// The pending-request table.
#[derive(Debug, Default)]
pub struct PendingRequests {
    requests: Mutex<HashMap<String, PendingDecryptRequest>>,
    trim_text: bool,
}

impl PendingRequests {
    /// `trim_text` strips whitespace around text results.
    pub fn new(trim_text: bool) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            trim_text,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingDecryptRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or append a waiter for `path`.
    pub fn register(&self, path: &str, waiter: Waiter) -> Registration {
        let mut requests = self.lock();
        match requests.get_mut(path) {
            Some(request) => {
                request.waiters.push(waiter);
                debug!(path, waiters = request.waiters.len(), "joined pending request");
                Registration::Joined
            }
            None => {
                requests.insert(
                    path.to_string(),
                    PendingDecryptRequest {
                        waiters: vec![waiter],
                    },
                );
                Registration::First
            }
        }
    }

    /// Resolve every waiter for the response's path.
    ///
    /// Returns the number of waiters that received a result, or `None` for
    /// a stale response with no pending entry.
    pub fn resolve(&self, response: DecryptResponse) -> Option<usize> {
        let request = self.lock().remove(&response.path);
        let Some(request) = request else {
            warn!(path = %response.path, "stale delegated response, no pending request");
            return None;
        };

        let delivered = request
            .waiters
            .into_iter()
            .map(|waiter| waiter.resolve(&response.content, self.trim_text))
            .filter(|delivered| *delivered)
            .count();
        debug!(path = %response.path, delivered, "delegated response resolved");
        Some(delivered)
    }

    /// Drop the entry for `path`, e.g. when posting its job failed.
    pub fn abandon(&self, path: &str) -> Option<PendingDecryptRequest> {
        self.lock().remove(path)
    }

    /// Drop every entry. Their callers see the request as abandoned.
    pub fn abandon_all(&self) -> usize {
        let mut requests = self.lock();
        let count = requests.len();
        requests.clear();
        count
    }

    /// Waiters currently registered for `path`.
    pub fn waiting(&self, path: &str) -> usize {
        self.lock().get(path).map_or(0, PendingDecryptRequest::len)
    }

    /// Number of paths with an outstanding job.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
