//! Provider adapter error types.

use keybridge_core::Provider;
use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("OAuth provider {0} is not configured")]
    NotConfigured(Provider),

    /// The OS secure random source failed. Never falls back to a weaker
    /// generator.
    #[error("secure random source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("user info request failed: {0}")]
    UserInfo(String),

    #[error("provider {0} does not support refresh tokens")]
    RefreshNotSupported(Provider),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("URL parsing error: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}
