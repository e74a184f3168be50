use crate::config::WorkerConfig;
use crate::model::{MessageLock, PeekedMessage};
use chrono::{DateTime, Duration, Utc};

/// Base delay, and per-delivery increment, of a requeue in seconds.
pub const REQUEUE_BACKOFF_SECS: i64 = 60;

/// Why a message cannot be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoActionReason {
    /// The peek response had no usable `BrokerProperties` header.
    MissingBrokerProperties,
    /// The header was present but lacked `MessageId` or `LockToken`.
    MissingLockOrMessageId,
}

/// What to do with a peeked message.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Complete the message, removing it from the queue.
    Delete(MessageLock),
    /// Unlock the message so it becomes visible again.
    Release(MessageLock),
    /// Send `body` scheduled for `delay_until`, then delete the original.
    RequeueThenDelete {
        lock: MessageLock,
        delay_until: DateTime<Utc>,
        body: Vec<u8>,
        /// `body` carries the new `DeliveryCount`. False when the original
        /// body is not a JSON object and is sent unchanged.
        delivery_count_applied: bool,
    },
    /// Nothing can be done; the lock is unknown or already gone.
    NoActionPossible(NoActionReason),
}

impl Disposition {
    pub fn name(&self) -> &'static str {
        match self {
            Disposition::Delete(_) => "delete",
            Disposition::Release(_) => "release",
            Disposition::RequeueThenDelete { .. } => "requeue",
            Disposition::NoActionPossible(_) => "none",
        }
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub disposition: Disposition,
    pub effective_delivery_count: u32,
    /// The delivery count reached the dead-letter threshold. Informational:
    /// Service Bus dead-letters on its own counter.
    pub exceeds_max_delivery: bool,
}

/// Delay before a requeued message becomes visible again.
pub fn requeue_delay(effective_delivery_count: u32) -> Duration {
    Duration::seconds(
        REQUEUE_BACKOFF_SECS * i64::from(effective_delivery_count) + REQUEUE_BACKOFF_SECS,
    )
}

/// Chooses the disposition of `message` under `config`.
///
/// Pure: `now` anchors the requeue delay and nothing is logged or sent. Delete
/// mode wins over requeue mode; with neither set the message is released.
pub fn decide(message: &PeekedMessage, config: &WorkerConfig, now: DateTime<Utc>) -> Decision {
    let effective_delivery_count = message.effective_delivery_count();
    let exceeds_max_delivery = effective_delivery_count >= config.max_delivery_count();

    let disposition = match message.lock() {
        None if !message.has_broker_properties() => {
            Disposition::NoActionPossible(NoActionReason::MissingBrokerProperties)
        }
        None => Disposition::NoActionPossible(NoActionReason::MissingLockOrMessageId),
        Some(lock) if config.delete_message() => Disposition::Delete(lock),
        Some(lock) if config.requeue_message() => {
            let (body, delivery_count_applied) = match message
                .body_data()
                .with_delivery_count(effective_delivery_count)
            {
                Some(body) => (body, true),
                None => (message.body().to_vec(), false),
            };

            Disposition::RequeueThenDelete {
                lock,
                delay_until: now + requeue_delay(effective_delivery_count),
                body,
                delivery_count_applied,
            }
        }
        Some(lock) => Disposition::Release(lock),
    };

    Decision {
        disposition,
        effective_delivery_count,
        exceeds_max_delivery,
    }
}
