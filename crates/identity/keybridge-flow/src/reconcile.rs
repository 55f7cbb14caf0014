//! Identity reconciliation: provider identities onto local users.

use crate::error::{FlowError, FlowResult};
use keybridge_core::{
    ConnectionStore, NewConnection, NewUser, OAuthConnection, Provider, StoreError, TokenSet, User,
    UserInfo, UserStore,
};
use keybridge_providers::ProviderError;
use rand_core::{OsRng, RngCore};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const PROVISION_ATTEMPTS: usize = 3;

/// Result of a login-mode reconciliation.
pub struct ReconcileResult {
    pub user: User,
    pub connection: OAuthConnection,
    pub is_new_user: bool,
}

/// Maps a provider identity to a local user, provisioning on first
/// contact.
///
/// Insert races are resolved by retrying the find: the stores' unique
/// constraints pick one winner and everyone else adopts that row.
pub struct Reconciler {
    users: Arc<dyn UserStore>,
    connections: Arc<dyn ConnectionStore>,
}

impl Reconciler {
    pub fn new(users: Arc<dyn UserStore>, connections: Arc<dyn ConnectionStore>) -> Self {
        Self { users, connections }
    }

    /// Resolve a login callback to a user, creating the user and/or
    /// connection as needed.
    ///
    /// Resolution order: existing connection by (provider, subject),
    /// then existing user by email, then provision. Idempotent for a
    /// given provider identity.
    pub async fn find_or_create_user(
        &self,
        provider: Provider,
        info: &UserInfo,
        tokens: TokenSet,
    ) -> FlowResult<ReconcileResult> {
        if let Some(existing) = self
            .connections
            .find_by_provider_identity(provider, &info.provider_id)
            .await?
        {
            let connection = self
                .connections
                .update_tokens(existing.id, &tokens, Some(info.raw.clone()))
                .await?;
            let user = self
                .users
                .find_by_id(existing.user_id)
                .await?
                .ok_or(StoreError::NotFound)?;
            debug!(%provider, user_id = %user.id, "existing connection, tokens refreshed");
            return Ok(ReconcileResult {
                user,
                connection,
                is_new_user: false,
            });
        }

        let email = info
            .email_nonempty()
            .ok_or(FlowError::MissingRequiredEmail(provider))?;

        let (user, is_new_user) = self.find_or_provision_user(provider, email, info).await?;

        let connection = self
            .upsert_connection(user.id, provider, info, tokens)
            .await?;
        Ok(ReconcileResult {
            user,
            connection,
            is_new_user,
        })
    }

    /// Attach (or refresh) a provider connection for an authenticated
    /// user.
    pub async fn link_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
        info: &UserInfo,
        tokens: TokenSet,
    ) -> FlowResult<(User, OAuthConnection)> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(StoreError::NotFound)?;
        let connection = match self
            .connections
            .find_by_user_and_provider(user_id, provider)
            .await?
        {
            Some(existing) => {
                self.connections
                    .update_tokens(existing.id, &tokens, Some(info.raw.clone()))
                    .await?
            }
            None => self.upsert_connection(user_id, provider, info, tokens).await?,
        };
        info!(%provider, %user_id, "linked provider account");
        Ok((user, connection))
    }

    async fn upsert_connection(
        &self,
        user_id: Uuid,
        provider: Provider,
        info: &UserInfo,
        tokens: TokenSet,
    ) -> FlowResult<OAuthConnection> {
        let new_connection = NewConnection {
            user_id,
            provider,
            provider_user_id: info.provider_id.clone(),
            tokens: tokens.clone(),
            user_data: info.raw.clone(),
        };
        match self.connections.create(new_connection).await {
            Ok(connection) => Ok(connection),
            Err(StoreError::UniqueViolation { field }) => {
                // Duplicate-connection race; adopt the winner's row.
                debug!(%provider, field, "connection insert collided, re-reading");
                let existing = self
                    .connections
                    .find_by_provider_identity(provider, &info.provider_id)
                    .await?
                    .ok_or(StoreError::NotFound)?;
                Ok(self
                    .connections
                    .update_tokens(existing.id, &tokens, Some(info.raw.clone()))
                    .await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find the user for `email`, provisioning one if none exists.
    ///
    /// A lost insert race is recovered, whichever constraint fired: an
    /// email collision means the winner's row is readable now, and a
    /// username collision (same local-part derived from a different
    /// email) re-derives the username against the winner's row. Bounded
    /// so a persistently broken store cannot loop forever.
    async fn find_or_provision_user(
        &self,
        provider: Provider,
        email: &str,
        info: &UserInfo,
    ) -> FlowResult<(User, bool)> {
        for _ in 0..PROVISION_ATTEMPTS {
            if let Some(user) = self.users.find_by_email(email).await? {
                return Ok((user, false));
            }
            match self.provision_user(email, info).await {
                Ok(user) => {
                    info!(%provider, user_id = %user.id, "provisioned new user");
                    return Ok((user, true));
                }
                Err(FlowError::Store(StoreError::UniqueViolation { field })) => {
                    debug!(%provider, field, "user insert collided, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Backend("user provisioning kept colliding".to_string()).into())
    }

    async fn provision_user(&self, email: &str, info: &UserInfo) -> FlowResult<User> {
        let username = self.unique_username(&derive_username(email)).await?;
        let user = NewUser {
            email: email.to_string(),
            username,
            first_name: info.given_name.clone().unwrap_or_default(),
            last_name: info.family_name.clone().unwrap_or_default(),
            // Provider-asserted email counts as verified.
            flag_verified: true,
            flag_enabled: true,
            password_hash: random_password_hash()?,
        };
        Ok(self.users.create(user).await?)
    }

    async fn unique_username(&self, base: &str) -> FlowResult<String> {
        if !self.users.username_exists(base).await? {
            return Ok(base.to_string());
        }
        let mut suffix: u32 = 1;
        loop {
            let candidate = format!("{base}{suffix}");
            if !self.users.username_exists(&candidate).await? {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }
}

/// Username base from the email local-part, restricted to
/// `[A-Za-z0-9_]`.
fn derive_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let sanitized: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if sanitized.is_empty() {
        "user".to_string()
    } else {
        sanitized
    }
}

/// Random unusable password hash. OAuth stays the only login path for
/// provisioned users.
fn random_password_hash() -> FlowResult<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| FlowError::Provider(ProviderError::EntropyUnavailable(e.to_string())))?;
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}
