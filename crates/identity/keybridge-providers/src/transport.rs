//! Abstract HTTP transport for outbound provider calls.

use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A provider response: status plus raw body.
///
/// The body is kept as text so adapters can surface the provider's raw
/// error payload when a call fails.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> ProviderResult<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

/// Minimal outbound HTTP capability the adapters need: a form POST for
/// token endpoints and a bearer-authenticated GET for userinfo endpoints.
/// Implementations must apply a bounded timeout; calls are never retried.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> ProviderResult<TransportResponse>;

    async fn get_bearer(&self, url: &str, access_token: &str)
    -> ProviderResult<TransportResponse>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    async fn read(response: reqwest::Response) -> ProviderResult<TransportResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> ProviderResult<TransportResponse> {
        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Self::read(response).await
    }

    async fn get_bearer(
        &self,
        url: &str,
        access_token: &str,
    ) -> ProviderResult<TransportResponse> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Self::read(response).await
    }
}
