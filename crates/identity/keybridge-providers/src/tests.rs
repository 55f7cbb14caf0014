use crate::adapter::{Endpoints, ProviderAdapter, ProviderRegistry};
use crate::config::{
    FacebookSettings, GoogleSettings, MicrosoftSettings, OAuthConfig, ProviderCredentials,
};
use crate::error::ProviderError;
use crate::facebook::FacebookAdapter;
use crate::google::GoogleAdapter;
use crate::microsoft::MicrosoftAdapter;
use crate::pkce::Pkce;
use crate::transport::{HttpTransport, ReqwestTransport};
use keybridge_core::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> ProviderCredentials {
    ProviderCredentials::new("test-client-id", "test-client-secret")
}

fn transport() -> Arc<dyn HttpTransport> {
    Arc::new(ReqwestTransport::default())
}

fn mock_endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        authorize: format!("{}/authorize", server.uri()),
        token: format!("{}/token", server.uri()),
        userinfo: format!("{}/userinfo", server.uri()),
    }
}

fn google_adapter(server: &MockServer) -> GoogleAdapter {
    let settings = GoogleSettings {
        credentials: credentials(),
        ..Default::default()
    };
    GoogleAdapter::new(
        settings,
        "https://app.example.com/oauth/google/callback".to_string(),
        transport(),
    )
    .with_endpoints(mock_endpoints(server))
}

fn query_map(url: &url::Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[test]
fn google_authorization_url_carries_state_and_pkce() {
    let settings = GoogleSettings {
        credentials: credentials(),
        ..Default::default()
    };
    let adapter = GoogleAdapter::new(
        settings,
        "https://app.example.com/oauth/google/callback".to_string(),
        transport(),
    );
    let pkce = Pkce::generate().unwrap();
    let url = adapter.authorization_url("csrf-state", Some(&pkce)).unwrap();
    let query = query_map(&url);

    assert_eq!(url.host_str(), Some("accounts.google.com"));
    assert_eq!(query["client_id"], "test-client-id");
    assert_eq!(
        query["redirect_uri"],
        "https://app.example.com/oauth/google/callback"
    );
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["state"], "csrf-state");
    assert_eq!(query["code_challenge"], pkce.challenge);
    assert_eq!(query["code_challenge_method"], "S256");
    assert!(query["scope"].contains("email"));
    assert!(!query.contains_key("access_type"));
}

#[test]
fn google_offline_access_requests_refresh_token() {
    let settings = GoogleSettings {
        credentials: credentials(),
        offline_access: true,
        extra_scopes: vec!["https://www.googleapis.com/auth/drive".to_string()],
    };
    let adapter = GoogleAdapter::new(
        settings,
        "https://app.example.com/oauth/google/callback".to_string(),
        transport(),
    );
    let url = adapter.authorization_url("s", None).unwrap();
    let query = query_map(&url);

    assert_eq!(query["access_type"], "offline");
    assert_eq!(query["prompt"], "consent");
    assert!(query["scope"].contains("auth/drive"));
    assert!(!query.contains_key("code_challenge"));
}

#[test]
fn facebook_authorization_url_joins_scopes_with_commas() {
    let adapter = FacebookAdapter::new(
        FacebookSettings {
            credentials: credentials(),
            ..Default::default()
        },
        "https://app.example.com/oauth/facebook/callback".to_string(),
        transport(),
    );
    let url = adapter.authorization_url("fb-state", None).unwrap();
    let query = query_map(&url);

    assert_eq!(url.host_str(), Some("www.facebook.com"));
    assert_eq!(query["scope"], "email,public_profile");
    assert_eq!(query["state"], "fb-state");
}

#[test]
fn microsoft_authorization_url_uses_tenant_and_query_mode() {
    let adapter = MicrosoftAdapter::new(
        MicrosoftSettings {
            credentials: credentials(),
            tenant: "organizations".to_string(),
        },
        "https://app.example.com/oauth/microsoft/callback".to_string(),
        transport(),
    );
    let url = adapter.authorization_url("ms-state", None).unwrap();

    assert!(url.path().starts_with("/organizations/"));
    assert_eq!(query_map(&url)["response_mode"], "query");
}

#[tokio::test]
async fn google_code_exchange_sends_verifier_and_parses_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("code_verifier=the-verifier"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "google-at",
            "refresh_token": "google-rt",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = google_adapter(&server);
    let tokens = adapter
        .exchange_code("auth-code", Some("the-verifier"))
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "google-at");
    assert_eq!(tokens.refresh_token.as_deref(), Some("google-rt"));
    assert!(tokens.expires_at.is_some());
}

#[tokio::test]
async fn google_code_exchange_surfaces_provider_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let adapter = google_adapter(&server);
    let err = adapter.exchange_code("bad-code", None).await.unwrap_err();

    match err {
        ProviderError::TokenExchange(message) => {
            assert!(message.contains("400"));
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("expected TokenExchange, got {other:?}"),
    }
}

#[tokio::test]
async fn google_userinfo_accepts_sub_alias() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer google-at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sub": "google-user-1",
            "email": "jane.doe@example.com",
            "given_name": "Jane",
            "family_name": "Doe",
            "name": "Jane Doe",
            "picture": "https://lh3.example.com/photo"
        })))
        .mount(&server)
        .await;

    let adapter = google_adapter(&server);
    let info = adapter.fetch_user_info("google-at").await.unwrap();

    assert_eq!(info.provider_id, "google-user-1");
    assert_eq!(info.email.as_deref(), Some("jane.doe@example.com"));
    assert_eq!(info.display_name.as_deref(), Some("Jane Doe"));
    assert_eq!(info.raw["sub"], "google-user-1");
}

#[tokio::test]
async fn facebook_userinfo_unwraps_nested_picture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "fb-42",
            "name": "Jane Doe",
            "email": "jane@example.com",
            "first_name": "Jane",
            "last_name": "Doe",
            "picture": {"data": {"url": "https://graph.example.com/pic"}}
        })))
        .mount(&server)
        .await;

    let adapter = FacebookAdapter::new(
        FacebookSettings {
            credentials: credentials(),
            ..Default::default()
        },
        "https://app.example.com/oauth/facebook/callback".to_string(),
        transport(),
    )
    .with_endpoints(mock_endpoints(&server));
    let info = adapter.fetch_user_info("fb-at").await.unwrap();

    assert_eq!(info.provider_id, "fb-42");
    assert_eq!(
        info.picture_url.as_deref(),
        Some("https://graph.example.com/pic")
    );
}

#[tokio::test]
async fn microsoft_userinfo_falls_back_to_principal_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "ms-7",
            "mail": null,
            "userPrincipalName": "jane@contoso.com",
            "givenName": "Jane",
            "surname": "Doe",
            "displayName": "Jane Doe"
        })))
        .mount(&server)
        .await;

    let adapter = MicrosoftAdapter::new(
        MicrosoftSettings {
            credentials: credentials(),
            ..Default::default()
        },
        "https://app.example.com/oauth/microsoft/callback".to_string(),
        transport(),
    )
    .with_endpoints(mock_endpoints(&server));
    let info = adapter.fetch_user_info("ms-at").await.unwrap();

    assert_eq!(info.email.as_deref(), Some("jane@contoso.com"));
}

#[tokio::test]
async fn facebook_refresh_is_not_supported() {
    let adapter = FacebookAdapter::new(
        FacebookSettings {
            credentials: credentials(),
            ..Default::default()
        },
        "https://app.example.com/oauth/facebook/callback".to_string(),
        transport(),
    );
    let err = adapter.refresh_token("rt").await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::RefreshNotSupported(Provider::Facebook)
    ));
}

#[tokio::test]
async fn google_refresh_exchanges_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-rt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-at",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let adapter = google_adapter(&server);
    let tokens = adapter.refresh_token("old-rt").await.unwrap();

    assert_eq!(tokens.access_token, "fresh-at");
    // Google omits the refresh token on refresh; callers keep the old one.
    assert!(tokens.refresh_token.is_none());
}

#[test]
fn registry_only_holds_enabled_providers() {
    let mut config = OAuthConfig::new("https://app.example.com");
    config.google.credentials = credentials();
    config.linkedin.credentials = credentials();

    let registry = ProviderRegistry::from_config(&config, transport());

    assert_eq!(
        registry.enabled(),
        vec![Provider::Google, Provider::Linkedin]
    );
    assert!(registry.get(Provider::Google).is_ok());
    let err = registry.get(Provider::Facebook).unwrap_err();
    assert!(matches!(
        err,
        ProviderError::NotConfigured(Provider::Facebook)
    ));
}
