//! Endpoint handlers and router assembly.

use crate::popup::popup_page;
use crate::session::SessionAuth;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use keybridge_core::{ConnectionStore, ConnectionSummary, Provider};
use keybridge_flow::{CallbackQuery, FlowAction, FlowError, FlowMode, Orchestrator, Outcome};
use keybridge_providers::ProviderError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

const SESSION_COOKIE: &str = "keybridge_session";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub connections: Arc<dyn ConnectionStore>,
    pub sessions: Arc<dyn SessionAuth>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/oauth/connections", get(list_connections))
        .route("/oauth/link/{provider}", get(begin_link))
        .route("/oauth/disconnect/{provider}", post(disconnect))
        .route("/oauth/{provider}", get(begin_login))
        .route("/oauth/{provider}/callback", get(callback))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct BeginParams {
    popup: Option<String>,
}

impl BeginParams {
    fn is_popup(&self) -> bool {
        matches!(self.popup.as_deref(), Some("1") | Some("true"))
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    state: Option<String>,
    code: Option<String>,
    error: Option<String>,
}

impl From<CallbackParams> for CallbackQuery {
    fn from(params: CallbackParams) -> Self {
        Self {
            state: params.state,
            code: params.code,
            error: params.error,
        }
    }
}

async fn begin_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<BeginParams>,
    headers: HeaderMap,
) -> Response {
    let Ok(provider) = provider.parse::<Provider>() else {
        return error_json(StatusCode::NOT_FOUND, "Unknown OAuth provider.");
    };
    let (session_id, is_new_session) = ensure_session(&headers);
    begin_flow(
        &state,
        provider,
        FlowMode::Login,
        &session_id,
        is_new_session,
        params.is_popup(),
    )
    .await
}

async fn begin_link(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<BeginParams>,
    headers: HeaderMap,
) -> Response {
    let Ok(provider) = provider.parse::<Provider>() else {
        return error_json(StatusCode::NOT_FOUND, "Unknown OAuth provider.");
    };
    let Some(user_id) = authenticated_user(&state, &headers).await else {
        return error_json(StatusCode::UNAUTHORIZED, "Authentication required.");
    };
    let (session_id, is_new_session) = ensure_session(&headers);
    begin_flow(
        &state,
        provider,
        FlowMode::Link { user_id },
        &session_id,
        is_new_session,
        params.is_popup(),
    )
    .await
}

async fn begin_flow(
    state: &AppState,
    provider: Provider,
    mode: FlowMode,
    session_id: &str,
    is_new_session: bool,
    popup: bool,
) -> Response {
    match state
        .orchestrator
        .begin_redirect(session_id, provider, mode, popup)
        .await
    {
        Ok(target) => {
            let mut response = Redirect::temporary(target.url.as_str()).into_response();
            if is_new_session {
                set_session_cookie(&mut response, session_id);
            }
            response
        }
        Err(FlowError::Provider(ProviderError::NotConfigured(provider))) => {
            warn!(%provider, "flow requested for unconfigured provider");
            error_json(StatusCode::NOT_FOUND, "Unknown OAuth provider.")
        }
        Err(e) => {
            error!(%provider, error = %e, "failed to start authorization flow");
            error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to start authorization flow.",
            )
        }
    }
}

async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let Ok(provider) = provider.parse::<Provider>() else {
        return error_json(StatusCode::NOT_FOUND, "Unknown OAuth provider.");
    };
    let session_id = cookie_session(&headers).unwrap_or_default();
    let current_user = authenticated_user(&state, &headers).await;

    let outcome = state
        .orchestrator
        .handle_callback(&session_id, provider, params.into(), current_user)
        .await;

    if outcome.success && outcome.action == FlowAction::Login {
        if let Some(user) = &outcome.user {
            state.sessions.establish(&session_id, user.id).await;
        }
    }

    deliver_outcome(&outcome)
}

fn deliver_outcome(outcome: &Outcome) -> Response {
    if outcome.popup {
        Html(popup_page(outcome)).into_response()
    } else {
        let redirect = outcome.redirect.as_deref().unwrap_or(if outcome.success {
            Outcome::DEFAULT_REDIRECT
        } else {
            Outcome::FAILURE_REDIRECT
        });
        Redirect::to(redirect).into_response()
    }
}

async fn disconnect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Ok(provider) = provider.parse::<Provider>() else {
        return error_json(StatusCode::NOT_FOUND, "Unknown OAuth provider.");
    };
    let Some(user_id) = authenticated_user(&state, &headers).await else {
        return error_json(StatusCode::UNAUTHORIZED, "Authentication required.");
    };

    let connection = match state
        .connections
        .find_by_user_and_provider(user_id, provider)
        .await
    {
        Ok(connection) => connection,
        Err(e) => {
            error!(%provider, error = %e, "connection lookup failed");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Storage error.");
        }
    };
    let Some(connection) = connection else {
        return error_json(
            StatusCode::NOT_FOUND,
            &format!("No {} connection found.", provider.display_name()),
        );
    };

    match state.connections.delete(connection.id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": format!("{} account disconnected.", provider.display_name()),
            })),
        )
            .into_response(),
        Err(keybridge_core::StoreError::NotFound) => error_json(
            StatusCode::NOT_FOUND,
            &format!("No {} connection found.", provider.display_name()),
        ),
        Err(e) => {
            error!(%provider, error = %e, "connection delete failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Storage error.")
        }
    }
}

async fn list_connections(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user_id) = authenticated_user(&state, &headers).await else {
        return error_json(StatusCode::UNAUTHORIZED, "Authentication required.");
    };

    match state.connections.list_for_user(user_id).await {
        Ok(connections) => {
            let by_provider: BTreeMap<&'static str, ConnectionSummary> = connections
                .iter()
                .map(|c| (c.provider.as_str(), c.summary()))
                .collect();
            Json(by_provider).into_response()
        }
        Err(e) => {
            error!(error = %e, "connection listing failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Storage error.")
        }
    }
}

async fn authenticated_user(state: &AppState, headers: &HeaderMap) -> Option<Uuid> {
    let session_id = cookie_session(headers)?;
    state.sessions.current_user(&session_id).await
}

fn cookie_session(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn ensure_session(headers: &HeaderMap) -> (String, bool) {
    match cookie_session(headers) {
        Some(session_id) => (session_id, false),
        None => (Uuid::new_v4().to_string(), true),
    }
}

fn set_session_cookie(response: &mut Response, session_id: &str) {
    let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({"success": false, "message": message})),
    )
        .into_response()
}
