//! The redirect → callback flow orchestrator.

use crate::error::{FlowError, FlowResult};
use crate::outcome::{FlowAction, Outcome};
use crate::reconcile::Reconciler;
use chrono::Duration;
use keybridge_core::{FlowStateStore, PendingFlowState, Provider};
use keybridge_providers::{Pkce, ProviderRegistry, generate_state};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// How a flow was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowMode {
    Login,
    /// Attach the provider to an already-authenticated user instead of
    /// logging in.
    Link { user_id: Uuid },
}

/// Where to send the browser to start a flow.
#[derive(Debug, Clone)]
pub struct RedirectTarget {
    pub provider: Provider,
    pub url: Url,
}

/// Query parameters a provider sends to the callback endpoint.
#[derive(Debug, Clone, Default)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Drives one authorization flow from redirect to terminal [`Outcome`].
///
/// `handle_callback` never returns an error: every failure becomes an
/// `Outcome` with `success = false`, carrying the popup flag recorded
/// when the flow began.
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    flow_states: Arc<dyn FlowStateStore>,
    reconciler: Reconciler,
    state_ttl: Duration,
}

impl Orchestrator {
    pub const DEFAULT_STATE_TTL: Duration = Duration::minutes(10);

    pub fn new(
        registry: Arc<ProviderRegistry>,
        flow_states: Arc<dyn FlowStateStore>,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            registry,
            flow_states,
            reconciler,
            state_ttl: Self::DEFAULT_STATE_TTL,
        }
    }

    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    /// Start a flow: generate PKCE + CSRF state, stash the pending
    /// state under (session, provider), and build the provider's
    /// authorization URL.
    pub async fn begin_redirect(
        &self,
        session_id: &str,
        provider: Provider,
        mode: FlowMode,
        popup: bool,
    ) -> FlowResult<RedirectTarget> {
        let adapter = self.registry.get(provider)?;
        let pkce = Pkce::generate()?;
        let csrf_state = generate_state()?;

        let mut pending =
            PendingFlowState::new(csrf_state.clone(), pkce.verifier.clone(), self.state_ttl)
                .with_popup(popup);
        if let FlowMode::Link { user_id } = mode {
            pending = pending.with_link_user(user_id);
        }
        self.flow_states.put(session_id, provider, pending).await?;

        let url = adapter.authorization_url(&csrf_state, Some(&pkce))?;
        debug!(%provider, link = matches!(mode, FlowMode::Link { .. }), "starting authorization flow");
        Ok(RedirectTarget { provider, url })
    }

    /// Complete a flow. Consumes the pending state first, so a replayed
    /// callback finds nothing and fails regardless of what else it
    /// carries.
    pub async fn handle_callback(
        &self,
        session_id: &str,
        provider: Provider,
        query: CallbackQuery,
        current_user: Option<Uuid>,
    ) -> Outcome {
        let pending = match self.flow_states.take(session_id, provider).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(%provider, error = %e, "flow state store failed");
                return Outcome::failure(provider, FlowAction::Login, e.to_string(), false);
            }
        };
        let popup = pending.as_ref().is_some_and(|p| p.popup);
        let action = if pending.as_ref().is_some_and(|p| p.link_user.is_some()) {
            FlowAction::Link
        } else {
            FlowAction::Login
        };

        match self
            .run_callback(provider, pending, query, current_user, popup)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%provider, error = %e, "authorization flow failed");
                Outcome::failure(provider, action, e.to_string(), popup)
            }
        }
    }

    async fn run_callback(
        &self,
        provider: Provider,
        pending: Option<PendingFlowState>,
        query: CallbackQuery,
        current_user: Option<Uuid>,
        popup: bool,
    ) -> FlowResult<Outcome> {
        if let Some(error) = query.error {
            return Err(FlowError::ProviderDenied(error));
        }

        let pending = pending.ok_or(FlowError::CsrfStateMismatch)?;
        // Facebook's dialog validates state on its own side; everyone
        // else must echo ours back exactly.
        if !provider.manages_own_state()
            && query.state.as_deref() != Some(pending.csrf_state.as_str())
        {
            return Err(FlowError::CsrfStateMismatch);
        }

        let code = query.code.ok_or(FlowError::MissingAuthorizationCode)?;
        let adapter = self.registry.get(provider)?;
        let tokens = adapter
            .exchange_code(&code, Some(&pending.pkce_verifier))
            .await?;
        let info = adapter.fetch_user_info(&tokens.access_token).await?;

        if pending.link_user.is_some() {
            let user_id = current_user.ok_or(FlowError::NotAuthenticated)?;
            let (user, _connection) = self
                .reconciler
                .link_provider(user_id, provider, &info, tokens)
                .await?;
            Ok(Outcome::link_success(provider, &user, popup))
        } else {
            let result = self
                .reconciler
                .find_or_create_user(provider, &info, tokens)
                .await?;
            info!(
                %provider,
                user_id = %result.user.id,
                is_new_user = result.is_new_user,
                "authorization flow completed"
            );
            Ok(Outcome::login_success(
                provider,
                &result.user,
                result.is_new_user,
                popup,
            ))
        }
    }
}
