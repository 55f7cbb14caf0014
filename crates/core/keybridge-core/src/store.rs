//! Store traits for the user/account and connection collaborators.

use crate::models::{NewConnection, NewUser, OAuthConnection, User};
use crate::provider::Provider;
use crate::types::TokenSet;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert collided with an existing row. The reconciler treats
    /// this as "lost a find-or-create race, re-run the find", never as a
    /// fatal error.
    #[error("unique constraint violated on {field}")]
    UniqueViolation { field: &'static str },

    #[error("record not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// User/account store collaborator.
///
/// The broker never mutates existing users; it only looks them up and
/// provisions new ones. Implementations must enforce uniqueness of email
/// and username at insert time.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn username_exists(&self, username: &str) -> StoreResult<bool>;

    async fn create(&self, user: NewUser) -> StoreResult<User>;
}

/// Persistence for OAuth connections.
///
/// Implementations must enforce both uniqueness constraints at insert
/// time: (provider, provider_user_id) system-wide and (user_id, provider)
/// per user.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn find_by_provider_identity(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> StoreResult<Option<OAuthConnection>>;

    async fn find_by_user_and_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> StoreResult<Option<OAuthConnection>>;

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OAuthConnection>>;

    async fn create(&self, connection: NewConnection) -> StoreResult<OAuthConnection>;

    /// Replace the connection's tokens, bump `updated_at`, and optionally
    /// replace the profile snapshot.
    async fn update_tokens(
        &self,
        id: Uuid,
        tokens: &TokenSet,
        user_data: Option<serde_json::Value>,
    ) -> StoreResult<OAuthConnection>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}
