//! Ephemeral per-flow session state and its store trait.

use crate::provider::Provider;
use crate::store::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State stashed between the authorization redirect and the callback.
///
/// Keyed by (session, provider) so concurrent flows for different
/// providers in one browser session do not collide. Consumed exactly once
/// at callback time; a replayed callback finds nothing and fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingFlowState {
    /// Random token round-tripped through the provider for CSRF
    /// correlation.
    pub csrf_state: String,
    /// PKCE code verifier sent with the token exchange.
    pub pkce_verifier: String,
    /// Set when the callback should link to this already-authenticated
    /// user instead of logging in.
    pub link_user: Option<Uuid>,
    /// Whether the terminal outcome is delivered over the popup channel.
    pub popup: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingFlowState {
    pub fn new(csrf_state: String, pkce_verifier: String, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            csrf_state,
            pkce_verifier,
            link_user: None,
            popup: false,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn with_link_user(mut self, user_id: Uuid) -> Self {
        self.link_user = Some(user_id);
        self
    }

    pub fn with_popup(mut self, popup: bool) -> Self {
        self.popup = popup;
        self
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Short-lived store for [`PendingFlowState`].
///
/// `take` is the only read and it deletes: the removal must be atomic
/// with respect to concurrent callbacks for the same key, so a replayed
/// callback can never observe the state a second time.
#[async_trait]
pub trait FlowStateStore: Send + Sync {
    async fn put(
        &self,
        session_id: &str,
        provider: Provider,
        state: PendingFlowState,
    ) -> StoreResult<()>;

    /// Atomically remove and return the pending state for this
    /// (session, provider), if present and not expired.
    async fn take(&self, session_id: &str, provider: Provider)
    -> StoreResult<Option<PendingFlowState>>;
}
