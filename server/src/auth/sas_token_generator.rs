use super::provider::{AuthToken, SasKey, TokenProvider};
use crate::common::{ServiceBusError, ServiceBusResult};
use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of every generated token. A run performs at most three requests,
/// so the token is never refreshed.
pub const TOKEN_TTL_SECS: i64 = 2000;

/// Generator for Service Bus Shared Access Signature (SAS) tokens.
///
/// Signs `"<url-encoded resource URI>\n<expiry>"` with HMAC-SHA256 using the
/// shared access key bytes as they are configured (the key is not base64
/// decoded first). The resource URI is the namespace endpoint joined with the
/// queue path, so a token for `orders` does not authorize `orders/$DeadLetterQueue`.
///
/// # Examples
///
/// ```no_run
/// use server::auth::{SasKey, SasTokenGenerator};
///
/// let generator = SasTokenGenerator::new(
///     "https://my-namespace.servicebus.windows.net",
///     "RootManageSharedAccessKey",
///     SasKey::new("key-value"),
/// );
/// let token = generator.generate_sas_token("orders")?;
/// ```
#[derive(Clone, Debug)]
pub struct SasTokenGenerator {
    endpoint: String,
    key_name: String,
    key: SasKey,
}

impl SasTokenGenerator {
    /// Creates a generator for the given namespace endpoint
    /// (`https://<namespace>.servicebus.windows.net`).
    pub fn new(endpoint: impl Into<String>, key_name: impl Into<String>, key: SasKey) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            key_name: key_name.into(),
            key,
        }
    }

    /// Full resource URI a token for `resource_path` is scoped to.
    pub fn resource_uri(&self, resource_path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint,
            resource_path.trim_start_matches('/')
        )
    }

    /// Generates a token for `resource_path` expiring [`TOKEN_TTL_SECS`] from now.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceBusError::AuthenticationError`] if the HMAC cannot be
    /// keyed with the configured key.
    pub fn generate_sas_token(&self, resource_path: &str) -> ServiceBusResult<AuthToken> {
        let expiry = Utc::now() + Duration::seconds(TOKEN_TTL_SECS);
        let expires_at = expiry.timestamp();
        let token = self.generate_sas_token_at(resource_path, expires_at)?;

        log::debug!(
            "Generated SAS token for {} expiring at {}",
            self.resource_uri(resource_path),
            expiry.to_rfc3339()
        );

        Ok(AuthToken { token, expires_at })
    }

    /// Generates the token string for an explicit expiry timestamp (epoch seconds).
    pub fn generate_sas_token_at(
        &self,
        resource_path: &str,
        expiry_timestamp: i64,
    ) -> ServiceBusResult<String> {
        let encoded_uri = urlencoding::encode(&self.resource_uri(resource_path)).into_owned();
        let string_to_sign = format!("{encoded_uri}\n{expiry_timestamp}");

        let mut mac = HmacSha256::new_from_slice(self.key.expose().as_bytes()).map_err(|e| {
            ServiceBusError::AuthenticationError(format!("Failed to create HMAC: {e}"))
        })?;

        mac.update(string_to_sign.as_bytes());
        let signature = mac.finalize();
        let signature_base64 = general_purpose::STANDARD.encode(signature.into_bytes());

        Ok(format!(
            "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
            encoded_uri,
            urlencoding::encode(&signature_base64),
            expiry_timestamp,
            self.key_name
        ))
    }
}

impl TokenProvider for SasTokenGenerator {
    fn token_for(&self, resource_path: &str) -> ServiceBusResult<AuthToken> {
        self.generate_sas_token(resource_path)
    }
}
