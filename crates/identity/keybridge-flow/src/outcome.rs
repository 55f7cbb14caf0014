//! Terminal flow outcomes and their client-facing shapes.

use keybridge_core::{Provider, User};
use serde::Serialize;
use uuid::Uuid;

/// Which kind of flow produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowAction {
    Login,
    Link,
}

/// Token-free user view carried in successful outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Terminal result of one authorization flow, success or failure.
///
/// The only flow result callers ever see. `popup` selects the delivery
/// channel and is not part of the serialized payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub success: bool,
    pub provider: Provider,
    pub action: FlowAction,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    pub is_new_user: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip)]
    pub popup: bool,
}

impl Outcome {
    pub const DEFAULT_REDIRECT: &'static str = "/dashboard";
    pub const FAILURE_REDIRECT: &'static str = "/login";

    pub fn login_success(provider: Provider, user: &User, is_new_user: bool, popup: bool) -> Self {
        let message = if is_new_user {
            "Welcome! Your account has been created.".to_string()
        } else {
            format!("Successfully logged in with {}.", provider.display_name())
        };
        Self {
            success: true,
            provider,
            action: FlowAction::Login,
            message,
            user: Some(UserSummary::from(user)),
            is_new_user,
            redirect: Some(Self::DEFAULT_REDIRECT.to_string()),
            popup,
        }
    }

    pub fn link_success(provider: Provider, user: &User, popup: bool) -> Self {
        Self {
            success: true,
            provider,
            action: FlowAction::Link,
            message: format!("{} account linked successfully.", provider.display_name()),
            user: Some(UserSummary::from(user)),
            is_new_user: false,
            redirect: Some(Self::DEFAULT_REDIRECT.to_string()),
            popup,
        }
    }

    pub fn failure(
        provider: Provider,
        action: FlowAction,
        message: impl Into<String>,
        popup: bool,
    ) -> Self {
        Self {
            success: false,
            provider,
            action,
            message: message.into(),
            user: None,
            is_new_user: false,
            redirect: Some(Self::FAILURE_REDIRECT.to_string()),
            popup,
        }
    }

    /// Structured message for the popup completion channel.
    pub fn to_popup_message(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "oauth_result",
            "provider": self.provider,
            "success": self.success,
            "action": self.action,
            "message": self.message,
            "user": self.user,
            "isNewUser": self.is_new_user,
            "redirect": self.redirect,
        })
    }
}
