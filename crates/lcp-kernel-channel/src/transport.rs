//! Channel abstraction for delegated decryption.
//!
//! The channel carries jobs to an external privileged decryptor and brings
//! back its responses. Implementations may use IPC, a message port, or any
//! other transport.

use async_trait::async_trait;

use crate::error::Result;
use crate::messages::{DecryptJob, DecryptResponse};

/// Channel trait for posting jobs and receiving responses.
///
/// Implementations must be thread-safe (Send + Sync). Responses may arrive
/// in any order; they are correlated by path.
#[async_trait]
pub trait DecryptChannel: Send + Sync {
    /// Post a job to the external decryptor.
    async fn post(&self, job: DecryptJob) -> Result<()>;

    /// Receive the next response.
    ///
    /// Blocks until a response is available; fails once the channel closes.
    async fn recv(&self) -> Result<DecryptResponse>;
}

/// An in-memory channel for tests and in-process embedding.
pub mod memory {
    use super::*;
    use crate::error::ChannelError;
    use tokio::sync::{mpsc, Mutex};

    /// Default buffer size of each direction.
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// The handler's end.
    pub struct MemoryChannel {
        jobs: mpsc::Sender<DecryptJob>,
        responses: Mutex<mpsc::Receiver<DecryptResponse>>,
    }

    /// The external decryptor's end.
    pub struct RemoteEnd {
        jobs: Mutex<mpsc::Receiver<DecryptJob>>,
        responses: mpsc::Sender<DecryptResponse>,
    }

    impl MemoryChannel {
        /// Create a connected pair.
        pub fn pair() -> (MemoryChannel, RemoteEnd) {
            Self::with_capacity(DEFAULT_CAPACITY)
        }

        pub fn with_capacity(capacity: usize) -> (MemoryChannel, RemoteEnd) {
            let (job_tx, job_rx) = mpsc::channel(capacity);
            let (response_tx, response_rx) = mpsc::channel(capacity);
            (
                MemoryChannel {
                    jobs: job_tx,
                    responses: Mutex::new(response_rx),
                },
                RemoteEnd {
                    jobs: Mutex::new(job_rx),
                    responses: response_tx,
                },
            )
        }
    }

    #[async_trait]
    impl DecryptChannel for MemoryChannel {
        async fn post(&self, job: DecryptJob) -> Result<()> {
            self.jobs.send(job).await.map_err(|_| ChannelError::Closed)
        }

        async fn recv(&self) -> Result<DecryptResponse> {
            let mut rx = self.responses.lock().await;
            rx.recv().await.ok_or(ChannelError::Closed)
        }
    }

    impl RemoteEnd {
        /// Wait for the next job. `None` once the handler end is dropped.
        pub async fn next_job(&self) -> Option<DecryptJob> {
            self.jobs.lock().await.recv().await
        }

        /// Take a job if one is already queued.
        pub async fn try_next_job(&self) -> Option<DecryptJob> {
            self.jobs.lock().await.try_recv().ok()
        }

        /// Send a response back to the handler.
        pub async fn respond(&self, response: DecryptResponse) -> Result<()> {
            self.responses
                .send(response)
                .await
                .map_err(|_| ChannelError::Closed)
        }

        /// Serve jobs with `decrypt` until the handler end is dropped.
        pub async fn serve<F>(&self, mut decrypt: F)
        where
            F: FnMut(&DecryptJob) -> Vec<u8> + Send,
        {
            while let Some(job) = self.next_job().await {
                let content = decrypt(&job);
                let response = DecryptResponse {
                    path: job.path,
                    content,
                };
                if self.respond(response).await.is_err() {
                    break;
                }
            }
        }
    }
}
