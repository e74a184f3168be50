use serde::Deserialize;
use serde_json::Value;

/// Body field carrying the application's own delivery counter.
pub const DELIVERY_COUNT_FIELD: &str = "DeliveryCount";
/// Body field identifying the webhook a message belongs to, when present.
pub const WEBHOOK_ID_FIELD: &str = "WebhookId";

/// Delivery metadata returned by Service Bus in the `BrokerProperties` header.
///
/// Only the fields the worker acts on are kept; everything else in the header
/// is ignored. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BrokerProperties {
    pub lock_token: Option<String>,
    pub message_id: Option<String>,
    pub sequence_number: Option<i64>,
    pub delivery_count: Option<u32>,
}

impl BrokerProperties {
    /// Parses the JSON value of a `BrokerProperties` header.
    pub fn parse(header: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(header)
    }
}

/// Identity of a locked delivery, required to delete or release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLock {
    pub message_id: String,
    pub lock_token: String,
}

/// A message peek-locked from the head of a queue.
///
/// Built once from the peek response and never modified. The application
/// delivery count is read from the body when the body is a JSON object with a
/// numeric `DeliveryCount` field.
///
/// # Examples
///
/// ```no_run
/// use server::model::{BrokerProperties, PeekedMessage};
///
/// let properties = BrokerProperties::parse(r#"{"LockToken":"lt","MessageId":"m1","DeliveryCount":2}"#)?;
/// let message = PeekedMessage::new(Some(properties), br#"{"DeliveryCount":3}"#.to_vec());
/// assert_eq!(message.effective_delivery_count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PeekedMessage {
    lock_token: Option<String>,
    message_id: Option<String>,
    sequence_number: Option<i64>,
    broker_delivery_count: Option<u32>,
    application_delivery_count: Option<u32>,
    has_broker_properties: bool,
    body: Vec<u8>,
}

impl PeekedMessage {
    /// Creates a message from the peek response's broker properties (if the
    /// header was present and parseable) and raw body.
    pub fn new(properties: Option<BrokerProperties>, body: Vec<u8>) -> Self {
        let has_broker_properties = properties.is_some();
        let properties = properties.unwrap_or_default();
        let application_delivery_count = match BodyData::from_bytes(&body) {
            BodyData::ValidJson(value) => value
                .get(DELIVERY_COUNT_FIELD)
                .and_then(Value::as_u64)
                .and_then(|count| u32::try_from(count).ok()),
            BodyData::RawString(_) => None,
        };

        Self {
            lock_token: properties.lock_token,
            message_id: properties.message_id,
            sequence_number: properties.sequence_number,
            broker_delivery_count: properties.delivery_count,
            application_delivery_count,
            has_broker_properties,
            body,
        }
    }

    pub fn lock_token(&self) -> Option<&str> {
        self.lock_token.as_deref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn sequence_number(&self) -> Option<i64> {
        self.sequence_number
    }

    pub fn broker_delivery_count(&self) -> Option<u32> {
        self.broker_delivery_count
    }

    pub fn application_delivery_count(&self) -> Option<u32> {
        self.application_delivery_count
    }

    /// Whether the peek response carried a usable `BrokerProperties` header.
    pub fn has_broker_properties(&self) -> bool {
        self.has_broker_properties
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_data(&self) -> BodyData {
        BodyData::from_bytes(&self.body)
    }

    /// Lock handle, available only when both the message ID and lock token are known.
    pub fn lock(&self) -> Option<MessageLock> {
        match (&self.message_id, &self.lock_token) {
            (Some(message_id), Some(lock_token)) => Some(MessageLock {
                message_id: message_id.clone(),
                lock_token: lock_token.clone(),
            }),
            _ => None,
        }
    }

    /// Delivery count used for dead-letter escalation and requeue backoff.
    ///
    /// The application counter from the body counts previous requeues, so this
    /// delivery is one more. Without it the broker's count is used, or zero
    /// when the broker did not report one either.
    pub fn effective_delivery_count(&self) -> u32 {
        match self.application_delivery_count {
            Some(count) => count.saturating_add(1),
            None => self.broker_delivery_count.unwrap_or(0),
        }
    }

    /// `WebhookId` from a JSON body, used to identify escalated messages.
    pub fn webhook_id(&self) -> Option<String> {
        match self.body_data() {
            BodyData::ValidJson(value) => value.get(WEBHOOK_ID_FIELD).map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            BodyData::RawString(_) => None,
        }
    }
}

/// Represents the body content of a Service Bus message.
///
/// Message bodies can be either valid JSON or raw string content.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyData {
    /// Message body contains valid JSON data
    ValidJson(Value),
    /// Message body contains raw string data (including invalid JSON)
    RawString(String),
}

impl BodyData {
    /// Attempts to parse the body as JSON first, otherwise keeps it as text.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(val) => BodyData::ValidJson(val),
            Err(_) => BodyData::RawString(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Serialized body with `DeliveryCount` set to `count`.
    ///
    /// Returns `None` when the body is not a JSON object and so has nowhere
    /// to carry the counter.
    pub fn with_delivery_count(&self, count: u32) -> Option<Vec<u8>> {
        match self {
            BodyData::ValidJson(Value::Object(map)) => {
                let mut map = map.clone();
                map.insert(DELIVERY_COUNT_FIELD.to_string(), Value::from(count));
                serde_json::to_vec(&Value::Object(map)).ok()
            }
            _ => None,
        }
    }
}
