//! OAuth provider configuration.
//!
//! A provider is enabled iff both its client id and secret are non-empty;
//! disabled providers are never registered and can never be selected by
//! the flow orchestrator.

use keybridge_core::Provider;
use std::env;
use std::time::Duration;

/// Client credentials shared by every provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ProviderCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    fn from_env(provider: &str) -> Self {
        let var = |suffix: &str| {
            env::var(format!("OAUTH_{}_{suffix}", provider.to_uppercase())).unwrap_or_default()
        };
        Self {
            client_id: var("CLIENT_ID"),
            client_secret: var("CLIENT_SECRET"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GoogleSettings {
    pub credentials: ProviderCredentials,
    /// Scopes beyond openid/email/profile, e.g. spreadsheet access.
    pub extra_scopes: Vec<String>,
    /// Requests `access_type=offline` plus a consent prompt so Google
    /// issues a refresh token.
    pub offline_access: bool,
}

#[derive(Debug, Clone)]
pub struct FacebookSettings {
    pub credentials: ProviderCredentials,
    pub graph_api_version: String,
}

impl Default for FacebookSettings {
    fn default() -> Self {
        Self {
            credentials: ProviderCredentials::default(),
            graph_api_version: "v18.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkedinSettings {
    pub credentials: ProviderCredentials,
}

#[derive(Debug, Clone)]
pub struct MicrosoftSettings {
    pub credentials: ProviderCredentials,
    /// Azure AD tenant: "common", "organizations", "consumers", or a
    /// tenant id.
    pub tenant: String,
}

impl Default for MicrosoftSettings {
    fn default() -> Self {
        Self {
            credentials: ProviderCredentials::default(),
            tenant: "common".to_string(),
        }
    }
}

/// Top-level broker configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Public base URL; callback URIs are `{base_url}/oauth/{provider}/callback`.
    pub base_url: String,
    pub google: GoogleSettings,
    pub facebook: FacebookSettings,
    pub linkedin: LinkedinSettings,
    pub microsoft: MicrosoftSettings,
    pub http_timeout: Duration,
}

impl OAuthConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            google: GoogleSettings::default(),
            facebook: FacebookSettings::default(),
            linkedin: LinkedinSettings::default(),
            microsoft: MicrosoftSettings::default(),
            http_timeout: Duration::from_secs(30),
        }
    }

    /// Load credentials from `OAUTH_<PROVIDER>_CLIENT_ID` /
    /// `OAUTH_<PROVIDER>_CLIENT_SECRET` environment variables.
    pub fn from_env(base_url: impl Into<String>) -> Self {
        let mut config = Self::new(base_url);
        config.google.credentials = ProviderCredentials::from_env("google");
        config.facebook.credentials = ProviderCredentials::from_env("facebook");
        config.linkedin.credentials = ProviderCredentials::from_env("linkedin");
        config.microsoft.credentials = ProviderCredentials::from_env("microsoft");
        config
    }

    pub fn with_google(mut self, settings: GoogleSettings) -> Self {
        self.google = settings;
        self
    }

    pub fn with_facebook(mut self, settings: FacebookSettings) -> Self {
        self.facebook = settings;
        self
    }

    pub fn with_linkedin(mut self, settings: LinkedinSettings) -> Self {
        self.linkedin = settings;
        self
    }

    pub fn with_microsoft(mut self, settings: MicrosoftSettings) -> Self {
        self.microsoft = settings;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn redirect_uri(&self, provider: Provider) -> String {
        format!("{}/oauth/{provider}/callback", self.base_url)
    }

    pub fn credentials(&self, provider: Provider) -> &ProviderCredentials {
        match provider {
            Provider::Google => &self.google.credentials,
            Provider::Facebook => &self.facebook.credentials,
            Provider::Linkedin => &self.linkedin.credentials,
            Provider::Microsoft => &self.microsoft.credentials,
        }
    }

    pub fn is_enabled(&self, provider: Provider) -> bool {
        self.credentials(provider).is_configured()
    }

    pub fn enabled_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.is_enabled(*p))
            .collect()
    }
}
