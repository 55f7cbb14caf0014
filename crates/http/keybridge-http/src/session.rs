//! Session collaborator: who is the caller?

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Resolves a browser session to an authenticated user and records
/// logins produced by successful flows.
///
/// The broker never issues its own credentials; establishing the
/// session after a login outcome is delegated here.
#[async_trait]
pub trait SessionAuth: Send + Sync {
    async fn current_user(&self, session_id: &str) -> Option<Uuid>;

    async fn establish(&self, session_id: &str, user_id: Uuid);
}

/// Process-local session map.
#[derive(Default)]
pub struct InMemorySessionAuth {
    sessions: RwLock<HashMap<String, Uuid>>,
}

impl InMemorySessionAuth {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionAuth for InMemorySessionAuth {
    async fn current_user(&self, session_id: &str) -> Option<Uuid> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).copied()
    }

    async fn establish(&self, session_id: &str, user_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn establish_then_resolve() {
        let auth = InMemorySessionAuth::new();
        let user_id = Uuid::new_v4();
        assert!(auth.current_user("s1").await.is_none());
        auth.establish("s1", user_id).await;
        assert_eq!(auth.current_user("s1").await, Some(user_id));
        assert!(auth.current_user("s2").await.is_none());
    }
}
