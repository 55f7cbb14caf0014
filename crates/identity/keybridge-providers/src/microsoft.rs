//! Microsoft identity platform (Azure AD v2.0) adapter.

use crate::adapter::{Endpoints, ProviderAdapter};
use crate::config::MicrosoftSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::pkce::Pkce;
use crate::transport::HttpTransport;
use crate::wire::WireTokenResponse;
use async_trait::async_trait;
use keybridge_core::{Provider, TokenSet, UserInfo};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

const GRAPH_ME_URL: &str = "https://graph.microsoft.com/v1.0/me";

const DEFAULT_SCOPES: &[&str] = &["openid", "email", "profile", "User.Read"];

#[derive(Debug, Deserialize)]
struct MicrosoftUserInfo {
    id: String,
    mail: Option<String>,
    #[serde(rename = "userPrincipalName")]
    user_principal_name: Option<String>,
    #[serde(rename = "givenName")]
    given_name: Option<String>,
    #[serde(rename = "surname")]
    surname: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

pub struct MicrosoftAdapter {
    settings: MicrosoftSettings,
    redirect_uri: String,
    transport: Arc<dyn HttpTransport>,
    endpoints: Endpoints,
}

impl MicrosoftAdapter {
    pub fn new(
        settings: MicrosoftSettings,
        redirect_uri: String,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let tenant = settings.tenant.clone();
        Self {
            settings,
            redirect_uri,
            transport,
            endpoints: Endpoints {
                authorize: format!(
                    "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize"
                ),
                token: format!("https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token"),
                userinfo: GRAPH_ME_URL.to_string(),
            },
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

#[async_trait]
impl ProviderAdapter for MicrosoftAdapter {
    fn provider(&self) -> Provider {
        Provider::Microsoft
    }

    fn authorization_url(&self, state: &str, pkce: Option<&Pkce>) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.endpoints.authorize)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.credentials.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("response_mode", "query")
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
                "Microsoft returned status {}: {}",
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
                "Microsoft Graph returned status {}: {}",
                response.status, response.body
            )));
        }
        let raw: serde_json::Value = response.json()?;
        let info: MicrosoftUserInfo = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        // Personal accounts often carry the address only in the UPN.
        let email = info.mail.or(info.user_principal_name);
        Ok(UserInfo {
            provider_id: info.id,
            email,
            given_name: info.given_name,
            family_name: info.surname,
            display_name: info.display_name,
            picture_url: None,
            raw,
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> ProviderResult<TokenSet> {
        Err(ProviderError::RefreshNotSupported(Provider::Microsoft))
    }
}
