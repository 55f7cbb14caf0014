//! Canonical records exchanged between adapters and the flow engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tokens returned by a provider's token endpoint.
///
/// `expires_at` is absolute; adapters convert the wire-level `expires_in`
/// at the moment the response is parsed. `None` means the provider issued
/// a non-expiring token (or no expiry at all).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Provider profile data mapped into one shape.
///
/// Each adapter translates its provider's field names (`sub` vs `id`,
/// `given_name` vs `first_name`, ...) into this record. `raw` keeps the
/// untranslated response body for the connection's profile snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    /// Provider-assigned stable subject identifier.
    pub provider_id: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub display_name: Option<String>,
    pub picture_url: Option<String>,
    /// Untranslated provider response, persisted as the profile snapshot.
    pub raw: serde_json::Value,
}

impl UserInfo {
    /// Email with empty strings treated as absent. Some providers return
    /// `""` rather than omitting the field.
    pub fn email_nonempty(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}
