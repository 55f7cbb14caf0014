//! Flow-level error types.
//!
//! Every variant here is terminal for its flow: nothing is retried, and
//! the orchestrator converts each into a failure [`crate::Outcome`]
//! before it can reach a caller.

use keybridge_core::StoreError;
use keybridge_providers::ProviderError;
use thiserror::Error;

pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The callback state did not match the pending flow, or no pending
    /// flow exists (consumed, expired, or never started).
    #[error("authorization state mismatch")]
    CsrfStateMismatch,

    #[error("callback did not include an authorization code")]
    MissingAuthorizationCode,

    /// The provider sent an `error` query parameter, typically because
    /// the user declined consent.
    #[error("provider reported an error: {0}")]
    ProviderDenied(String),

    /// A link flow reached the callback without an authenticated user.
    #[error("no authenticated user for account linking")]
    NotAuthenticated,

    #[error("{0} did not supply an email address")]
    MissingRequiredEmail(keybridge_core::Provider),

    #[error("access token expired and refresh failed: {0}")]
    TokenExpiredAndRefreshFailed(String),
}
