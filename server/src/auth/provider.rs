use crate::common::ServiceBusResult;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Signed access token for one Service Bus resource.
#[derive(Clone, Debug)]
pub struct AuthToken {
    /// Value for the `Authorization` header
    pub token: String,
    /// Expiry as Unix epoch seconds
    pub expires_at: i64,
}

/// Shared access key value, wiped from memory on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SasKey(String);

impl SasKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SasKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SasKey(<redacted>)")
    }
}

/// Source of access tokens for Service Bus resources.
///
/// The worker signs locally with [`SasTokenGenerator`](super::SasTokenGenerator);
/// tests substitute fixed tokens.
pub trait TokenProvider: Send + Sync {
    /// Produces a token authorizing requests against `resource_path`
    /// (a queue name, or `<queue>/$DeadLetterQueue`).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceBusError`](crate::common::ServiceBusError) if signing fails.
    fn token_for(&self, resource_path: &str) -> ServiceBusResult<AuthToken>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_redacted_in_debug() {
        let key = SasKey::new("super-secret");

        assert_eq!(format!("{key:?}"), "SasKey(<redacted>)");
        assert_eq!(key.expose(), "super-secret");
    }
}
