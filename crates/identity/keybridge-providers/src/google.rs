//! Google OAuth 2.0 adapter.

use crate::adapter::{Endpoints, ProviderAdapter};
use crate::config::GoogleSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::pkce::Pkce;
use crate::transport::HttpTransport;
use crate::wire::WireTokenResponse;
use async_trait::async_trait;
use keybridge_core::{Provider, TokenSet, UserInfo};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const DEFAULT_SCOPES: &[&str] = &["openid", "email", "profile"];

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    #[serde(alias = "sub")]
    id: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

pub struct GoogleAdapter {
    settings: GoogleSettings,
    redirect_uri: String,
    transport: Arc<dyn HttpTransport>,
    endpoints: Endpoints,
}

impl GoogleAdapter {
    pub fn new(
        settings: GoogleSettings,
        redirect_uri: String,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            settings,
            redirect_uri,
            transport,
            endpoints: Endpoints {
                authorize: AUTHORIZE_URL.to_string(),
                token: TOKEN_URL.to_string(),
                userinfo: USERINFO_URL.to_string(),
            },
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn scopes(&self) -> String {
        let mut scopes: Vec<&str> = DEFAULT_SCOPES.to_vec();
        scopes.extend(self.settings.extra_scopes.iter().map(String::as_str));
        scopes.join(" ")
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state: &str, pkce: Option<&Pkce>) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.endpoints.authorize)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.credentials.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &self.scopes())
                .append_pair("state", state);
            if let Some(pkce) = pkce {
                query
                    .append_pair("code_challenge", &pkce.challenge)
                    .append_pair("code_challenge_method", Pkce::METHOD);
            }
            if self.settings.offline_access {
                // Google only issues a refresh token on a consent prompt.
                query
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent");
            }
        }
        Ok(url)
    }

    async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> ProviderResult<TokenSet> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.settings.credentials.client_id.as_str()),
            (
                "client_secret",
                self.settings.credentials.client_secret.as_str(),
            ),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        if let Some(verifier) = verifier {
            params.push(("code_verifier", verifier));
        }

        let response = self.transport.post_form(&self.endpoints.token, &params).await?;
        if !response.is_success() {
            return Err(ProviderError::TokenExchange(format!(
                "Google returned status {}: {}",
                response.status, response.body
            )));
        }
        let wire: WireTokenResponse = response.json()?;
        debug!("exchanged authorization code with Google");
        Ok(wire.into_token_set())
    }

    async fn fetch_user_info(&self, access_token: &str) -> ProviderResult<UserInfo> {
        let response = self
            .transport
            .get_bearer(&self.endpoints.userinfo, access_token)
            .await?;
        if !response.is_success() {
            return Err(ProviderError::UserInfo(format!(
                "Google returned status {}: {}",
                response.status, response.body
            )));
        }
        let raw: serde_json::Value = response.json()?;
        let info: GoogleUserInfo = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        Ok(UserInfo {
            provider_id: info.id,
            email: info.email,
            given_name: info.given_name,
            family_name: info.family_name,
            display_name: info.name,
            picture_url: info.picture,
            raw,
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<TokenSet> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.settings.credentials.client_id.as_str()),
            (
                "client_secret",
                self.settings.credentials.client_secret.as_str(),
            ),
        ];
        let response = self.transport.post_form(&self.endpoints.token, &params).await?;
        if !response.is_success() {
            return Err(ProviderError::TokenExchange(format!(
                "Google refresh returned status {}: {}",
                response.status, response.body
            )));
        }
        let wire: WireTokenResponse = response.json()?;
        Ok(wire.into_token_set())
    }
}
