//! Persisted models: users and their provider connections.

use crate::provider::Provider;
use crate::types::TokenSet;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A local user account.
///
/// The broker only reads (lookup by email, username existence) and
/// provisions users; it never updates arbitrary user fields after
/// creation.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub flag_verified: bool,
    pub flag_enabled: bool,
    /// Random unusable password hash; OAuth is the only login path for
    /// provisioned users.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for provisioning a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub flag_verified: bool,
    pub flag_enabled: bool,
    pub password_hash: String,
}

/// One (user, provider) pairing with its tokens and profile snapshot.
///
/// Deliberately not `Serialize`: access and refresh tokens must never
/// reach a client. [`ConnectionSummary`] is the only serialized view.
#[derive(Debug, Clone)]
pub struct OAuthConnection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: Provider,
    pub provider_user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Last-fetched provider profile, stored verbatim.
    pub user_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthConnection {
    /// Whether the access token is expired or expires within `margin`.
    /// A connection without an expiry never counts as expired.
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - margin <= Utc::now(),
            None => false,
        }
    }

    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            id: self.id,
            provider: self.provider,
            provider_user_id: self.provider_user_id.clone(),
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields for creating a new connection.
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub user_id: Uuid,
    pub provider: Provider,
    pub provider_user_id: String,
    pub tokens: TokenSet,
    pub user_data: serde_json::Value,
}

/// Token-free view of a connection for the listing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub id: Uuid,
    pub provider: Provider,
    pub provider_user_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(expires_at: Option<DateTime<Utc>>) -> OAuthConnection {
        OAuthConnection {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            provider: Provider::Google,
            provider_user_id: "42".into(),
            access_token: "tok".into(),
            refresh_token: None,
            expires_at,
            user_data: serde_json::Value::Null,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_expiry_never_expires() {
        assert!(!connection(None).expires_within(Duration::seconds(60)));
    }

    #[test]
    fn past_expiry_counts_as_expired() {
        let conn = connection(Some(Utc::now() - Duration::minutes(5)));
        assert!(conn.expires_within(Duration::seconds(60)));
    }

    #[test]
    fn expiry_inside_margin_counts_as_expired() {
        let conn = connection(Some(Utc::now() + Duration::seconds(30)));
        assert!(conn.expires_within(Duration::seconds(60)));
        assert!(!conn.expires_within(Duration::seconds(0)));
    }

    #[test]
    fn summary_carries_no_tokens() {
        let json = serde_json::to_value(connection(None).summary()).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("access_token"));
        assert!(!object.contains_key("accessToken"));
        assert!(!object.contains_key("refresh_token"));
        assert!(!object.contains_key("refreshToken"));
        assert_eq!(object["provider"], "google");
        assert_eq!(object["providerUserId"], "42");
    }
}
