//! Token lifecycle: keep stored access tokens usable.

use crate::error::{FlowError, FlowResult};
use chrono::Duration;
use keybridge_core::{ConnectionStore, OAuthConnection};
use keybridge_providers::ProviderRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hands out access tokens for stored connections, refreshing through
/// the provider when a token is expired or about to expire.
///
/// Refresh failures are terminal: the caller must re-run an interactive
/// flow. A stale token is never returned.
pub struct TokenManager {
    registry: Arc<ProviderRegistry>,
    connections: Arc<dyn ConnectionStore>,
    refresh_margin: Duration,
}

impl TokenManager {
    pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::seconds(60);

    pub fn new(registry: Arc<ProviderRegistry>, connections: Arc<dyn ConnectionStore>) -> Self {
        Self {
            registry,
            connections,
            refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Return a usable access token for `connection`, refreshing and
    /// persisting first if it expires within the safety margin.
    pub async fn get_valid_access_token(
        &self,
        connection: &OAuthConnection,
    ) -> FlowResult<String> {
        if !connection.expires_within(self.refresh_margin) {
            return Ok(connection.access_token.clone());
        }

        let refresh_token = connection.refresh_token.as_deref().ok_or_else(|| {
            FlowError::TokenExpiredAndRefreshFailed(
                "connection has no refresh token".to_string(),
            )
        })?;
        let adapter = self
            .registry
            .get(connection.provider)
            .map_err(|e| FlowError::TokenExpiredAndRefreshFailed(e.to_string()))?;

        let mut tokens = adapter.refresh_token(refresh_token).await.map_err(|e| {
            warn!(provider = %connection.provider, error = %e, "token refresh failed");
            FlowError::TokenExpiredAndRefreshFailed(e.to_string())
        })?;
        // Providers may omit the refresh token on refresh; keep the one
        // we have.
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = connection.refresh_token.clone();
        }

        let updated = self
            .connections
            .update_tokens(connection.id, &tokens, None)
            .await?;
        debug!(provider = %connection.provider, "refreshed access token");
        Ok(updated.access_token)
    }
}
