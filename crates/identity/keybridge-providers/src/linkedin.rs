//! LinkedIn OAuth 2.0 adapter (OpenID Connect userinfo).

use crate::adapter::{Endpoints, ProviderAdapter};
use crate::config::LinkedinSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::pkce::Pkce;
use crate::transport::HttpTransport;
use crate::wire::WireTokenResponse;
use async_trait::async_trait;
use keybridge_core::{Provider, TokenSet, UserInfo};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

const AUTHORIZE_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";

const DEFAULT_SCOPES: &[&str] = &["openid", "email", "profile"];

#[derive(Debug, Deserialize)]
struct LinkedinUserInfo {
    sub: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

pub struct LinkedinAdapter {
    settings: LinkedinSettings,
    redirect_uri: String,
    transport: Arc<dyn HttpTransport>,
    endpoints: Endpoints,
}

impl LinkedinAdapter {
    pub fn new(
        settings: LinkedinSettings,
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
}

#[async_trait]
impl ProviderAdapter for LinkedinAdapter {
    fn provider(&self) -> Provider {
        Provider::Linkedin
    }

    fn authorization_url(&self, state: &str, pkce: Option<&Pkce>) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.endpoints.authorize)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.credentials.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &DEFAULT_SCOPES.join(" "))
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
                "LinkedIn returned status {}: {}",
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
                "LinkedIn returned status {}: {}",
                response.status, response.body
            )));
        }
        let raw: serde_json::Value = response.json()?;
        let info: LinkedinUserInfo = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        Ok(UserInfo {
            provider_id: info.sub,
            email: info.email,
            given_name: info.given_name,
            family_name: info.family_name,
            display_name: info.name,
            picture_url: info.picture,
            raw,
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> ProviderResult<TokenSet> {
        Err(ProviderError::RefreshNotSupported(Provider::Linkedin))
    }
}
