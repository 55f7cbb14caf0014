//! Facebook (Graph API) OAuth 2.0 adapter.
//!
//! Facebook's SDK-managed dialog validates state on its own side, so
//! [`Provider::manages_own_state`] exempts it from the broker's CSRF
//! check; the adapter still sends the state parameter through.

use crate::adapter::{Endpoints, ProviderAdapter};
use crate::config::FacebookSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::pkce::Pkce;
use crate::transport::HttpTransport;
use crate::wire::WireTokenResponse;
use async_trait::async_trait;
use keybridge_core::{Provider, TokenSet, UserInfo};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

const DEFAULT_SCOPES: &[&str] = &["email", "public_profile"];

#[derive(Debug, Deserialize)]
struct FacebookUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

pub struct FacebookAdapter {
    settings: FacebookSettings,
    redirect_uri: String,
    transport: Arc<dyn HttpTransport>,
    endpoints: Endpoints,
}

impl FacebookAdapter {
    pub fn new(
        settings: FacebookSettings,
        redirect_uri: String,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let version = settings.graph_api_version.clone();
        Self {
            settings,
            redirect_uri,
            transport,
            endpoints: Endpoints {
                authorize: format!("https://www.facebook.com/{version}/dialog/oauth"),
                token: format!("https://graph.facebook.com/{version}/oauth/access_token"),
                userinfo: format!(
                    "https://graph.facebook.com/{version}/me\
                     ?fields=id,name,email,first_name,last_name,picture"
                ),
            },
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

#[async_trait]
impl ProviderAdapter for FacebookAdapter {
    fn provider(&self) -> Provider {
        Provider::Facebook
    }

    fn authorization_url(&self, state: &str, pkce: Option<&Pkce>) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.endpoints.authorize)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.credentials.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("response_type", "code")
                // Facebook wants comma-separated scopes.
                .append_pair("scope", &DEFAULT_SCOPES.join(","))
                .append_pair("state", state);
            if let Some(pkce) = pkce {
                query
                    .append_pair("code_challenge", &pkce.challenge)
                    .append_pair("code_challenge_method", Pkce::METHOD);
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
                "Facebook returned status {}: {}",
                response.status, response.body
            )));
        }
        let wire: WireTokenResponse = response.json()?;
        Ok(wire.into_token_set())
    }

    async fn fetch_user_info(&self, access_token: &str) -> ProviderResult<UserInfo> {
        let response = self
            .transport
            .get_bearer(&self.endpoints.userinfo, access_token)
            .await?;
        if !response.is_success() {
            return Err(ProviderError::UserInfo(format!(
                "Facebook returned status {}: {}",
                response.status, response.body
            )));
        }
        let raw: serde_json::Value = response.json()?;
        let info: FacebookUserInfo = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        // Picture is nested: {"picture":{"data":{"url":...}}}.
        let picture_url = raw
            .pointer("/picture/data/url")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Ok(UserInfo {
            provider_id: info.id,
            email: info.email,
            given_name: info.first_name,
            family_name: info.last_name,
            display_name: info.name,
            picture_url,
            raw,
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> ProviderResult<TokenSet> {
        Err(ProviderError::RefreshNotSupported(Provider::Facebook))
    }
}
