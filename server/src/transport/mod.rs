//! Queue transport: the four remote operations the disposition engine needs.
//!
//! [`QueueTransport`] is the seam between decision logic and HTTP. The
//! production implementation is [`ServiceBusRestClient`]; tests script their
//! own implementations.

pub mod endpoint;
pub mod rest_client;

pub use endpoint::QueueEndpoint;
pub use rest_client::ServiceBusRestClient;

use crate::common::ServiceBusResult;
use crate::model::{MessageLock, PeekedMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result of peek-locking the head of a queue.
#[derive(Debug, Clone, PartialEq)]
pub enum PeekResult {
    /// The queue had no visible message (HTTP 204).
    Empty,
    /// A message is now locked by this worker.
    Message(PeekedMessage),
}

/// Remote queue operations, each a single round trip with no retry.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Peek-locks the head message.
    async fn peek_head(&self) -> ServiceBusResult<PeekResult>;

    /// Deletes (completes) a locked message.
    async fn delete(&self, lock: &MessageLock) -> ServiceBusResult<()>;

    /// Releases the lock so the message becomes visible again.
    async fn unlock(&self, lock: &MessageLock) -> ServiceBusResult<()>;

    /// Sends a new message that becomes visible at `enqueue_at`.
    ///
    /// Succeeds only when the service acknowledges creation (HTTP 201).
    async fn send_scheduled(
        &self,
        enqueue_at: DateTime<Utc>,
        body: Vec<u8>,
    ) -> ServiceBusResult<()>;
}
