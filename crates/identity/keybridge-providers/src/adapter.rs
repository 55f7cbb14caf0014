//! The provider adapter capability trait and registry.

use crate::config::OAuthConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::facebook::FacebookAdapter;
use crate::google::GoogleAdapter;
use crate::linkedin::LinkedinAdapter;
use crate::microsoft::MicrosoftAdapter;
use crate::pkce::Pkce;
use crate::transport::HttpTransport;
use async_trait::async_trait;
use keybridge_core::{Provider, TokenSet, UserInfo};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Endpoint URLs for one provider. Adapters ship with the real provider
/// endpoints and tests substitute a mock server's.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
    pub userinfo: String,
}

/// Capability set every provider variant implements.
///
/// Adapters are stateless: PKCE/state values come in from the caller,
/// which owns their session correlation.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Build the provider's authorization URL with the configured client
    /// id, redirect URI, default scopes, `response_type=code`, the CSRF
    /// state, and the PKCE challenge when present.
    fn authorization_url(&self, state: &str, pkce: Option<&Pkce>) -> ProviderResult<Url>;

    /// Exchange an authorization code for tokens, including the PKCE
    /// `code_verifier` when the flow used one.
    async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> ProviderResult<TokenSet>;

    /// Fetch the provider profile and map it into the canonical shape.
    async fn fetch_user_info(&self, access_token: &str) -> ProviderResult<UserInfo>;

    /// Exchange a refresh token for a new access token. Providers without
    /// a usable refresh grant fail with
    /// [`ProviderError::RefreshNotSupported`].
    async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<TokenSet>;
}

impl std::fmt::Debug for dyn ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("provider", &self.provider())
            .finish()
    }
}

/// Registry of enabled adapters, keyed by provider.
///
/// Built from [`OAuthConfig`]; providers without credentials are never
/// registered, so a disabled provider cannot be selected.
pub struct ProviderRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register the adapters for every provider enabled in `config`.
    pub fn from_config(config: &OAuthConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let mut registry = Self::new();
        if config.is_enabled(Provider::Google) {
            registry.register(Arc::new(GoogleAdapter::new(
                config.google.clone(),
                config.redirect_uri(Provider::Google),
                Arc::clone(&transport),
            )));
        }
        if config.is_enabled(Provider::Facebook) {
            registry.register(Arc::new(FacebookAdapter::new(
                config.facebook.clone(),
                config.redirect_uri(Provider::Facebook),
                Arc::clone(&transport),
            )));
        }
        if config.is_enabled(Provider::Linkedin) {
            registry.register(Arc::new(LinkedinAdapter::new(
                config.linkedin.clone(),
                config.redirect_uri(Provider::Linkedin),
                Arc::clone(&transport),
            )));
        }
        if config.is_enabled(Provider::Microsoft) {
            registry.register(Arc::new(MicrosoftAdapter::new(
                config.microsoft.clone(),
                config.redirect_uri(Provider::Microsoft),
                Arc::clone(&transport),
            )));
        }
        debug!(providers = ?registry.enabled(), "built provider registry");
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn get(&self, provider: Provider) -> ProviderResult<Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(&provider)
            .cloned()
            .ok_or(ProviderError::NotConfigured(provider))
    }

    pub fn enabled(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.adapters.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
