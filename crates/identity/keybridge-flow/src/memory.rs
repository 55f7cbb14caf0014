//! In-memory user and connection stores.
//!
//! Reference implementations of the storage contract, used directly in
//! tests and small deployments. Both enforce their uniqueness
//! constraints inside the write lock, so racing inserts resolve to one
//! winner and one [`StoreError::UniqueViolation`].

use async_trait::async_trait;
use chrono::Utc;
use keybridge_core::{
    ConnectionStore, NewConnection, NewUser, OAuthConnection, Provider, StoreError, StoreResult,
    TokenSet, User, UserStore,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.username == username))
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation { field: "email" });
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation { field: "username" });
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            flag_verified: user.flag_verified,
            flag_enabled: user.flag_enabled,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[derive(Default)]
pub struct InMemoryConnectionStore {
    connections: RwLock<HashMap<Uuid, OAuthConnection>>,
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn find_by_provider_identity(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> StoreResult<Option<OAuthConnection>> {
        let connections = self.connections.read().await;
        Ok(connections
            .values()
            .find(|c| c.provider == provider && c.provider_user_id == provider_user_id)
            .cloned())
    }

    async fn find_by_user_and_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> StoreResult<Option<OAuthConnection>> {
        let connections = self.connections.read().await;
        Ok(connections
            .values()
            .find(|c| c.user_id == user_id && c.provider == provider)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OAuthConnection>> {
        let connections = self.connections.read().await;
        let mut result: Vec<OAuthConnection> = connections
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by_key(|c| c.provider.as_str());
        Ok(result)
    }

    async fn create(&self, connection: NewConnection) -> StoreResult<OAuthConnection> {
        let mut connections = self.connections.write().await;
        if connections.values().any(|c| {
            c.provider == connection.provider && c.provider_user_id == connection.provider_user_id
        }) {
            return Err(StoreError::UniqueViolation {
                field: "provider_user_id",
            });
        }
        if connections
            .values()
            .any(|c| c.user_id == connection.user_id && c.provider == connection.provider)
        {
            return Err(StoreError::UniqueViolation {
                field: "user_id_provider",
            });
        }
        let now = Utc::now();
        let connection = OAuthConnection {
            id: Uuid::new_v4(),
            user_id: connection.user_id,
            provider: connection.provider,
            provider_user_id: connection.provider_user_id,
            access_token: connection.tokens.access_token,
            refresh_token: connection.tokens.refresh_token,
            expires_at: connection.tokens.expires_at,
            user_data: connection.user_data,
            created_at: now,
            updated_at: now,
        };
        connections.insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn update_tokens(
        &self,
        id: Uuid,
        tokens: &TokenSet,
        user_data: Option<serde_json::Value>,
    ) -> StoreResult<OAuthConnection> {
        let mut connections = self.connections.write().await;
        let connection = connections.get_mut(&id).ok_or(StoreError::NotFound)?;
        connection.access_token = tokens.access_token.clone();
        connection.refresh_token = tokens.refresh_token.clone();
        connection.expires_at = tokens.expires_at;
        if let Some(user_data) = user_data {
            connection.user_data = user_data;
        }
        connection.updated_at = Utc::now();
        Ok(connection.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut connections = self.connections.write().await;
        connections.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}
