pub mod provider;
pub mod sas_token_generator;

pub use provider::{AuthToken, SasKey, TokenProvider};
pub use sas_token_generator::{SasTokenGenerator, TOKEN_TTL_SECS};
