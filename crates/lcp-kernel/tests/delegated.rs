//! Official licenses: decryption through the external decryptor.

use async_trait::async_trait;
use lcp_kernel::channel::{ChannelError, DecryptJob, DecryptResponse};
use lcp_kernel::core::cipher;
use lcp_kernel::decrypt::Compression;
use lcp_kernel::{
    DecryptChannel, HandlerConfig, HandlerError, LicenseHandler, LicenseStatus, MemoryChannel,
    OutputMode, RemoteEnd,
};
use lcp_kernel_testkit::{encrypt_resource, lcp_resource, manifest, LicenseFixture};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

const CHAPTER: &str = "OEBPS/chapter2.xhtml";
const IMAGE: &str = "OEBPS/images/cover.png";

fn official_handler(fixture: &LicenseFixture) -> (LicenseHandler, RemoteEnd) {
    let manifest = manifest(
        None,
        vec![
            lcp_resource(CHAPTER, Compression::Stored),
            lcp_resource(IMAGE, Compression::Stored),
        ],
    );
    let (channel, remote) = MemoryChannel::pair();
    let handler = LicenseHandler::new(manifest, fixture.user_key(), HandlerConfig::default())
        .with_channel(Arc::new(channel));
    (handler, remote)
}

async fn wait_for_waiters(handler: &LicenseHandler, path: &str, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while handler.waiting(path) < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("waiters never registered");
}

#[tokio::test]
async fn test_official_license_is_delegated() {
    let fixture = LicenseFixture::official();
    let (handler, _remote) = official_handler(&fixture);

    // The user key is not checked locally for official licenses.
    handler
        .check_license(&fixture.build().unwrap())
        .await
        .unwrap();
    assert_eq!(
        handler.status().await,
        LicenseStatus::Ready {
            license_id: fixture.id.clone(),
            delegated: true,
        }
    );
}

#[tokio::test]
async fn test_concurrent_requests_share_one_job() {
    let fixture = LicenseFixture::official();
    let (handler, remote) = official_handler(&fixture);
    handler.check_license(&fixture.build().unwrap()).await.unwrap();
    let handler = Arc::new(handler);

    let markup = b"  <html><body>two</body></html>  ";
    let stored = encrypt_resource(&fixture.content_key, markup).unwrap();

    let first = {
        let handler = Arc::clone(&handler);
        let stored = stored.clone();
        tokio::spawn(async move {
            handler
                .decrypt_resource(CHAPTER, stored.into(), OutputMode::Text, None)
                .await
        })
    };
    let job = remote.next_job().await.unwrap();
    assert_eq!(job.path, CHAPTER);
    assert_eq!(job.content, stored);

    let second = {
        let handler = Arc::clone(&handler);
        let stored = stored.clone();
        tokio::spawn(async move {
            handler
                .decrypt_resource(CHAPTER, stored.into(), OutputMode::Base64, None)
                .await
        })
    };
    wait_for_waiters(&handler, CHAPTER, 2).await;
    assert_eq!(handler.pending_requests(), 1);
    assert!(remote.try_next_job().await.is_none());

    let content = cipher::decrypt(&fixture.content_key, &job.content).unwrap();
    remote
        .respond(DecryptResponse {
            path: job.path,
            content,
        })
        .await
        .unwrap();

    let text = first.await.unwrap().unwrap();
    let encoded = second.await.unwrap().unwrap();
    assert_eq!(text.as_text(), Some("<html><body>two</body></html>"));
    assert_eq!(
        encoded.as_base64(),
        Some("ICA8aHRtbD48Ym9keT50d288L2JvZHk+PC9odG1sPiAg")
    );
    assert_eq!(handler.pending_requests(), 0);
}

#[tokio::test]
async fn test_stale_response_is_ignored() {
    let fixture = LicenseFixture::official();
    let (handler, remote) = official_handler(&fixture);
    handler.check_license(&fixture.build().unwrap()).await.unwrap();
    let handler = Arc::new(handler);

    remote
        .respond(DecryptResponse {
            path: "OEBPS/nobody-asked.xhtml".into(),
            content: b"stale".to_vec(),
        })
        .await
        .unwrap();

    let server = tokio::spawn(async move {
        remote
            .serve(|job| job.content.iter().rev().copied().collect())
            .await;
    });

    let out = handler
        .decrypt_resource(IMAGE, vec![1u8, 2, 3].into(), OutputMode::Binary, None)
        .await
        .unwrap();
    assert_eq!(out.as_bytes(), Some(&[3u8, 2, 1][..]));

    drop(handler);
    server.await.unwrap();
}

#[tokio::test]
async fn test_closed_channel_abandons_waiters() {
    let fixture = LicenseFixture::official();
    let (handler, remote) = official_handler(&fixture);
    handler.check_license(&fixture.build().unwrap()).await.unwrap();
    let handler = Arc::new(handler);

    let request = {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            handler
                .decrypt_resource(IMAGE, vec![0u8; 16].into(), OutputMode::Binary, None)
                .await
        })
    };
    let _job = remote.next_job().await.unwrap();
    drop(remote);

    let err = request.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        HandlerError::Channel(ChannelError::Abandoned(path)) if path == IMAGE
    ));
    assert_eq!(handler.pending_requests(), 0);
    assert!(handler.channel_closed());

    // New requests fail fast once the decryptor is gone.
    let err = handler
        .decrypt_resource(IMAGE, vec![0u8; 16].into(), OutputMode::Binary, None)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::Channel(ChannelError::Closed)));
}

#[tokio::test]
async fn test_official_license_without_channel() {
    let fixture = LicenseFixture::official();
    let manifest = manifest(None, vec![lcp_resource(CHAPTER, Compression::Stored)]);
    let handler = LicenseHandler::new(manifest, fixture.user_key(), HandlerConfig::default());
    handler.check_license(&fixture.build().unwrap()).await.unwrap();

    let err = handler
        .decrypt_resource(CHAPTER, vec![0u8; 32].into(), OutputMode::Text, None)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::NoChannel));
}

/// A transport whose peer refuses every job.
struct RefusingChannel;

#[async_trait]
impl DecryptChannel for RefusingChannel {
    async fn post(&self, _job: DecryptJob) -> lcp_kernel::channel::Result<()> {
        Err(ChannelError::TransportError("peer refused".into()))
    }

    async fn recv(&self) -> lcp_kernel::channel::Result<DecryptResponse> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_failed_post_clears_pending_entry() {
    let fixture = LicenseFixture::official();
    let manifest = manifest(None, vec![lcp_resource(CHAPTER, Compression::Stored)]);
    let handler = LicenseHandler::new(manifest, fixture.user_key(), HandlerConfig::default())
        .with_channel(Arc::new(RefusingChannel));
    handler.check_license(&fixture.build().unwrap()).await.unwrap();

    for _ in 0..2 {
        let err = handler
            .decrypt_resource(CHAPTER, vec![0u8; 32].into(), OutputMode::Text, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Channel(ChannelError::TransportError(_))
        ));
        assert_eq!(handler.pending_requests(), 0);
    }
}

/// An in-process decryptor that reverses each job's bytes.
///
/// The first `stalled_posts` posts never complete. With
/// `fail_first_recv`, the first receive reports a transport error.
struct EchoChannel {
    posts: AtomicUsize,
    stalled_posts: usize,
    recv_failed: AtomicBool,
    fail_first_recv: bool,
    responses_tx: mpsc::Sender<DecryptResponse>,
    responses_rx: Mutex<mpsc::Receiver<DecryptResponse>>,
}

impl EchoChannel {
    fn new(stalled_posts: usize, fail_first_recv: bool) -> Self {
        let (responses_tx, responses_rx) = mpsc::channel(16);
        Self {
            posts: AtomicUsize::new(0),
            stalled_posts,
            recv_failed: AtomicBool::new(false),
            fail_first_recv,
            responses_tx,
            responses_rx: Mutex::new(responses_rx),
        }
    }
}

#[async_trait]
impl DecryptChannel for EchoChannel {
    async fn post(&self, job: DecryptJob) -> lcp_kernel::channel::Result<()> {
        if self.posts.fetch_add(1, Ordering::SeqCst) < self.stalled_posts {
            std::future::pending::<()>().await;
        }
        let response = DecryptResponse {
            path: job.path,
            content: job.content.into_iter().rev().collect(),
        };
        self.responses_tx
            .send(response)
            .await
            .map_err(|_| ChannelError::Closed)
    }

    async fn recv(&self) -> lcp_kernel::channel::Result<DecryptResponse> {
        if self.fail_first_recv && !self.recv_failed.swap(true, Ordering::SeqCst) {
            return Err(ChannelError::TransportError("connection reset".into()));
        }
        let mut rx = self.responses_rx.lock().await;
        rx.recv().await.ok_or(ChannelError::Closed)
    }
}

async fn echo_handler(fixture: &LicenseFixture, channel: Arc<EchoChannel>) -> LicenseHandler {
    let manifest = manifest(None, vec![lcp_resource(IMAGE, Compression::Stored)]);
    let handler = LicenseHandler::new(manifest, fixture.user_key(), HandlerConfig::default())
        .with_channel(channel);
    handler.check_license(&fixture.build().unwrap()).await.unwrap();
    handler
}

#[tokio::test]
async fn test_cancelled_first_request_does_not_block_path() {
    let fixture = LicenseFixture::official();
    let channel = Arc::new(EchoChannel::new(1, false));
    let handler = echo_handler(&fixture, Arc::clone(&channel)).await;

    let first = tokio::time::timeout(
        Duration::from_millis(50),
        handler.decrypt_resource(IMAGE, vec![1u8, 2, 3].into(), OutputMode::Binary, None),
    )
    .await;
    assert!(first.is_err(), "stalled post should not complete");
    assert_eq!(handler.pending_requests(), 0);

    let second = tokio::time::timeout(
        Duration::from_secs(2),
        handler.decrypt_resource(IMAGE, vec![1u8, 2, 3].into(), OutputMode::Binary, None),
    )
    .await
    .expect("second request hung")
    .unwrap();
    assert_eq!(second.as_bytes(), Some(&[3u8, 2, 1][..]));
    assert_eq!(channel.posts.load(Ordering::SeqCst), 2);
    assert_eq!(handler.pending_requests(), 0);
}

#[tokio::test]
async fn test_transport_error_keeps_pump_running() {
    let fixture = LicenseFixture::official();
    let channel = Arc::new(EchoChannel::new(0, true));
    let handler = echo_handler(&fixture, Arc::clone(&channel)).await;

    let out = tokio::time::timeout(
        Duration::from_secs(2),
        handler.decrypt_resource(IMAGE, vec![4u8, 5].into(), OutputMode::Binary, None),
    )
    .await
    .expect("request hung after transport error")
    .unwrap();
    assert_eq!(out.as_bytes(), Some(&[5u8, 4][..]));
    assert!(channel.recv_failed.load(Ordering::SeqCst));
    assert!(!handler.channel_closed());
}
