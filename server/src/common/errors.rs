use std::fmt;
use thiserror::Error;

/// Failures of the HTTP client itself, before any Service Bus status is known.
///
/// A request that reaches the service and gets a non-success status is not an
/// `HttpError`; it becomes [`ServiceBusError::ApiError`] so the status, body
/// and request ID survive.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP client creation failed: {reason}")]
    ClientCreation { reason: String },

    /// The request never completed, or its response could not be read.
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },
}

impl HttpError {
    /// Classifies a `reqwest` error raised while calling `url`.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_builder() {
            HttpError::ClientCreation {
                reason: err.to_string(),
            }
        } else {
            HttpError::RequestFailed {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

/// Errors returned by queue transport and token signing.
#[derive(Debug, Clone)]
pub enum ServiceBusError {
    /// Service Bus answered with a status the operation does not accept.
    ApiError {
        /// JSON error code when the body carried one, else `HTTP_<status>`.
        code: String,
        status_code: u16,
        /// Response body, or a generated description when it was empty.
        message: String,
        /// `x-ms-request-id`, quoted in support requests.
        request_id: Option<String>,
        /// Transport operation, e.g. `"unlock_message"`.
        operation: String,
    },
    /// The request did not reach the service.
    ConnectionFailed(String),
    OperationTimeout(String),
    /// The access token could not be signed.
    AuthenticationError(String),
    /// The peek succeeded but the message body could not be read.
    MessageReceiveFailed(String),
    ConfigurationError(String),
}

impl fmt::Display for ServiceBusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceBusError::ApiError {
                code,
                status_code,
                message,
                request_id,
                operation,
            } => {
                write!(f, "{operation} rejected with HTTP {status_code} ({code}): {message}")?;
                match request_id {
                    Some(id) => write!(f, " [Request ID: {id}]"),
                    None => Ok(()),
                }
            }
            ServiceBusError::ConnectionFailed(msg) => write!(f, "Connection failed: {msg}"),
            ServiceBusError::OperationTimeout(msg) => write!(f, "Operation timed out: {msg}"),
            ServiceBusError::AuthenticationError(msg) => write!(f, "Authentication error: {msg}"),
            ServiceBusError::MessageReceiveFailed(msg) => {
                write!(f, "Message receive failed: {msg}")
            }
            ServiceBusError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceBusError {}

impl ServiceBusError {
    /// Builds an [`ServiceBusError::ApiError`] from a response whose status
    /// `operation` does not accept. Consumes the body.
    pub async fn from_response(response: reqwest::Response, operation: &str) -> Self {
        let status_code = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-ms-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let (code, message) = match response.text().await {
            // Data-plane errors are usually XML; only a JSON body yields a code
            Ok(body) => match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error.code, envelope.error.message),
                Err(_) if body.is_empty() => {
                    (format!("HTTP_{status_code}"), format!("HTTP {status_code} error"))
                }
                Err(_) => (format!("HTTP_{status_code}"), body),
            },
            Err(e) => (
                format!("HTTP_{status_code}"),
                format!("unable to read response body: {e}"),
            ),
        };

        ServiceBusError::ApiError {
            code,
            status_code,
            message,
            request_id,
            operation: operation.to_string(),
        }
    }

    /// HTTP status, when the service answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceBusError::ApiError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            ServiceBusError::ApiError { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl From<HttpError> for ServiceBusError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::ClientCreation { reason } => ServiceBusError::ConfigurationError(format!(
                "HTTP client creation failed: {reason}"
            )),
            HttpError::RequestFailed { url, reason } => {
                ServiceBusError::ConnectionFailed(format!("{url}: {reason}"))
            }
            HttpError::Timeout { url } => ServiceBusError::OperationTimeout(url),
        }
    }
}

pub type ServiceBusResult<T> = Result<T, ServiceBusError>;
