use crate::model::MessageLock;

/// URLs of the Service Bus REST operations for one queue path.
///
/// `base` is the namespace endpoint, `queue_path` a queue name or its
/// `$DeadLetterQueue` sub-queue. The `$` in the sub-queue name is sent as-is,
/// as Service Bus expects; message ID and lock token are percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEndpoint {
    queue_url: String,
}

impl QueueEndpoint {
    pub fn new(base: &str, queue_path: &str) -> Self {
        Self {
            queue_url: format!(
                "{}/{}",
                base.trim_end_matches('/'),
                queue_path.trim_matches('/')
            ),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// `POST` target that peek-locks the head message.
    pub fn peek_url(&self) -> String {
        format!("{}/messages/head", self.queue_url)
    }

    /// `DELETE` (complete) and `PUT` (unlock) target for a locked message.
    pub fn lock_url(&self, lock: &MessageLock) -> String {
        format!(
            "{}/messages/{}/{}",
            self.queue_url,
            urlencoding::encode(&lock.message_id),
            urlencoding::encode(&lock.lock_token)
        )
    }

    /// `POST` target for sending a new message.
    pub fn send_url(&self) -> String {
        format!("{}/messages", self.queue_url)
    }
}
