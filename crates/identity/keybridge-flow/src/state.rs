//! In-memory flow state store.

use async_trait::async_trait;
use keybridge_core::{FlowStateStore, PendingFlowState, Provider, StoreResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Process-local [`FlowStateStore`] keyed by (session, provider).
///
/// The write lock around `remove` makes consumption atomic: of two
/// concurrent callbacks for the same key, exactly one gets the state.
#[derive(Default)]
pub struct InMemoryFlowStateStore {
    states: RwLock<HashMap<(String, Provider), PendingFlowState>>,
}

impl InMemoryFlowStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowStateStore for InMemoryFlowStateStore {
    async fn put(
        &self,
        session_id: &str,
        provider: Provider,
        state: PendingFlowState,
    ) -> StoreResult<()> {
        let mut states = self.states.write().await;
        states.insert((session_id.to_string(), provider), state);
        Ok(())
    }

    async fn take(
        &self,
        session_id: &str,
        provider: Provider,
    ) -> StoreResult<Option<PendingFlowState>> {
        let mut states = self.states.write().await;
        let state = states.remove(&(session_id.to_string(), provider));
        match state {
            Some(state) if state.is_expired() => {
                debug!(%provider, "discarded expired flow state");
                Ok(None)
            }
            other => Ok(other),
        }
    }
}
