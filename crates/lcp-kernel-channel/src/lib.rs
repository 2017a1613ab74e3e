//! # LCP Kernel Channel
//!
//! Delegated decryption through an external privileged decryptor.
//!
//! ## Overview
//!
//! Licenses on the official profile are opened by an external process
//! that owns the content key. The handler posts the encrypted bytes over a
//! [`DecryptChannel`] and waits for the plaintext to come back, correlated
//! by resource path.
//!
//! ## Key Properties
//!
//! - **Deduplicated**: one outbound job per path while a request is outstanding
//! - **Fan-out**: one response resolves every waiter for its path
//! - **Per-waiter shaping**: each waiter gets the output form it asked for
//! - **Stale-tolerant**: responses with no pending request are logged and dropped
//!
//! ## Message Flow
//!
//! ```text
//! Handler                           External decryptor
//!   |--- remote_decrypt_data ------->|
//!   |<-- decrypted_data -------------|
//! ```

pub mod error;
pub mod messages;
pub mod pending;
pub mod transport;

pub use error::{ChannelError, Result};
pub use messages::{DecryptJob, DecryptResponse};
pub use pending::{PendingDecryptRequest, PendingRequests, Registration, Waiter};
pub use transport::{memory::MemoryChannel, memory::RemoteEnd, DecryptChannel};
