use super::{PeekResult, QueueEndpoint, QueueTransport};
use crate::auth::AuthToken;
use crate::common::{HttpError, ServiceBusError, ServiceBusResult};
use crate::model::{BrokerProperties, MessageLock, PeekedMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};

/// Header carrying message metadata on both requests and responses.
pub const BROKER_PROPERTIES_HEADER: &str = "BrokerProperties";

/// Service Bus REST client bound to one queue path and one access token.
///
/// # Examples
///
/// ```no_run
/// use server::auth::{SasKey, SasTokenGenerator, TokenProvider};
/// use server::transport::{QueueEndpoint, QueueTransport, ServiceBusRestClient};
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let base = "https://contoso.servicebus.windows.net";
///     let token = SasTokenGenerator::new(base, "RootManageSharedAccessKey", SasKey::new("key"))
///         .token_for("orders")?;
///     let client = ServiceBusRestClient::new(QueueEndpoint::new(base, "orders"), token)?;
///     let head = client.peek_head().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ServiceBusRestClient {
    http_client: reqwest::Client,
    endpoint: QueueEndpoint,
    token: AuthToken,
}

impl ServiceBusRestClient {
    /// Creates a client with default `reqwest` settings.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::ClientCreation`] if the TLS backend cannot be initialized.
    pub fn new(endpoint: QueueEndpoint, token: AuthToken) -> Result<Self, HttpError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| HttpError::ClientCreation {
                reason: e.to_string(),
            })?;

        Ok(Self::with_client(http_client, endpoint, token))
    }

    /// Creates a client around an existing `reqwest::Client`.
    pub fn with_client(
        http_client: reqwest::Client,
        endpoint: QueueEndpoint,
        token: AuthToken,
    ) -> Self {
        Self {
            http_client,
            endpoint,
            token,
        }
    }

    pub fn endpoint(&self) -> &QueueEndpoint {
        &self.endpoint
    }

    async fn execute(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> ServiceBusResult<reqwest::Response> {
        request
            .header(AUTHORIZATION, &self.token.token)
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(url, e).into())
    }

    /// Reads `BrokerProperties` from a peek response, logging instead of failing
    /// when it is missing or malformed.
    fn broker_properties(headers: &HeaderMap) -> Option<BrokerProperties> {
        let Some(value) = headers.get(BROKER_PROPERTIES_HEADER) else {
            log::error!("BrokerProperties header missing from peek response");
            return None;
        };

        // Labels and ids may be non-ASCII, which `HeaderValue::to_str` rejects
        let raw = match std::str::from_utf8(value.as_bytes()) {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("BrokerProperties header is not valid UTF-8: {e}");
                return None;
            }
        };

        match BrokerProperties::parse(raw) {
            Ok(properties) => Some(properties),
            Err(e) => {
                log::error!("BrokerProperties header is not valid JSON: {e}; value={raw}");
                None
            }
        }
    }

    /// Formats a timestamp as RFC 1123, the format `ScheduledEnqueueTimeUtc` expects.
    pub fn format_enqueue_time(enqueue_at: DateTime<Utc>) -> String {
        enqueue_at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }
}

#[async_trait]
impl QueueTransport for ServiceBusRestClient {
    async fn peek_head(&self) -> ServiceBusResult<PeekResult> {
        let url = self.endpoint.peek_url();
        log::debug!("Peek-locking head message: POST {url}");

        let response = self
            .execute(
                &url,
                self.http_client.post(&url).header(CONTENT_LENGTH, 0),
            )
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(PeekResult::Empty);
        }
        if !status.is_success() {
            return Err(ServiceBusError::from_response(response, "peek_head").await);
        }

        log::debug!("Headers: {:?}", response.headers());
        let properties = Self::broker_properties(response.headers());

        let body = response.bytes().await.map_err(|e| {
            ServiceBusError::MessageReceiveFailed(format!("Failed to read message body: {e}"))
        })?;

        Ok(PeekResult::Message(PeekedMessage::new(
            properties,
            body.to_vec(),
        )))
    }

    async fn delete(&self, lock: &MessageLock) -> ServiceBusResult<()> {
        let url = self.endpoint.lock_url(lock);
        log::debug!("Deleting message: DELETE {url}");

        let response = self.execute(&url, self.http_client.delete(&url)).await?;
        log::debug!("Response Code: {}", response.status());

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ServiceBusError::from_response(response, "delete_message").await)
        }
    }

    async fn unlock(&self, lock: &MessageLock) -> ServiceBusResult<()> {
        let url = self.endpoint.lock_url(lock);
        log::debug!("Unlocking message: PUT {url}");

        let response = self
            .execute(&url, self.http_client.put(&url).header(CONTENT_LENGTH, 0))
            .await?;
        log::debug!("Response Code: {}", response.status());

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ServiceBusError::from_response(response, "unlock_message").await)
        }
    }

    async fn send_scheduled(
        &self,
        enqueue_at: DateTime<Utc>,
        body: Vec<u8>,
    ) -> ServiceBusResult<()> {
        let url = self.endpoint.send_url();
        let broker_properties = serde_json::json!({
            "ScheduledEnqueueTimeUtc": Self::format_enqueue_time(enqueue_at),
        })
        .to_string();
        log::debug!("Sending scheduled message: POST {url} {BROKER_PROPERTIES_HEADER}={broker_properties}");

        let response = self
            .execute(
                &url,
                self.http_client
                    .post(&url)
                    .header(CONTENT_TYPE, "application/json")
                    .header(BROKER_PROPERTIES_HEADER, broker_properties)
                    .body(body),
            )
            .await?;
        log::debug!("Response Code: {}", response.status());

        if response.status() == StatusCode::CREATED {
            Ok(())
        } else {
            Err(ServiceBusError::from_response(response, "send_scheduled_message").await)
        }
    }
}
