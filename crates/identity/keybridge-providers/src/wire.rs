//! Wire-format token responses shared by the adapters.

use chrono::{Duration, Utc};
use keybridge_core::TokenSet;
use serde::Deserialize;

/// Token endpoint response shape common to all four providers.
///
/// `expires_in` is converted to an absolute expiry at parse time so the
/// stored [`TokenSet`] never depends on when it is read back.
#[derive(Debug, Deserialize)]
pub struct WireTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl WireTokenResponse {
    pub fn into_token_set(self) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
        }
    }
}
