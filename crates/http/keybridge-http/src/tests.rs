use crate::routes::{AppState, router};
use crate::session::{InMemorySessionAuth, SessionAuth};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use keybridge_core::{ConnectionStore, UserStore};
use keybridge_flow::{
    InMemoryConnectionStore, InMemoryFlowStateStore, InMemoryUserStore, Orchestrator, Reconciler,
};
use keybridge_providers::{
    Endpoints, GoogleAdapter, GoogleSettings, HttpTransport, ProviderCredentials,
    ProviderRegistry, ReqwestTransport,
};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    app: Router,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::default());
    let google = GoogleAdapter::new(
        GoogleSettings {
            credentials: ProviderCredentials::new("client-id", "client-secret"),
            ..Default::default()
        },
        "http://localhost/oauth/google/callback".to_string(),
        transport,
    )
    .with_endpoints(Endpoints {
        authorize: format!("{}/google/authorize", server.uri()),
        token: format!("{}/google/token", server.uri()),
        userinfo: format!("{}/google/userinfo", server.uri()),
    });
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(google));

    let users = Arc::new(InMemoryUserStore::new());
    let connections = Arc::new(InMemoryConnectionStore::new());
    let orchestrator = Orchestrator::new(
        Arc::new(registry),
        Arc::new(InMemoryFlowStateStore::new()),
        Reconciler::new(
            users.clone() as Arc<dyn UserStore>,
            connections.clone() as Arc<dyn ConnectionStore>,
        ),
    );
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        connections: connections as Arc<dyn ConnectionStore>,
        sessions: Arc::new(InMemorySessionAuth::new()) as Arc<dyn SessionAuth>,
    };

    Harness {
        server,
        app: router(state),
    }
}

async fn mount_google_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/google/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "google-at",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/google/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "42",
            "email": "a@b.com",
            "given_name": "A"
        })))
        .mount(server)
        .await;
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> axum::response::Response {
    let mut request = Request::builder().uri(uri).method("GET");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post(app: &Router, uri: &str, cookie: Option<&str>) -> axum::response::Response {
    let mut request = Request::builder().uri(uri).method("POST");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Runs begin + callback for google; returns the session cookie.
async fn login(h: &Harness, popup: bool) -> (String, axum::response::Response) {
    let uri = if popup {
        "/oauth/google?popup=1"
    } else {
        "/oauth/google"
    };
    let begin = get(&h.app, uri, None).await;
    assert_eq!(begin.status(), StatusCode::TEMPORARY_REDIRECT);

    let cookie = begin
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let location = begin
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    let authorize_url = url::Url::parse(location).unwrap();
    let state = authorize_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let callback = get(
        &h.app,
        &format!("/oauth/google/callback?state={state}&code=abc"),
        Some(&cookie),
    )
    .await;
    (cookie, callback)
}

#[tokio::test]
async fn unknown_provider_is_not_found() {
    let h = harness().await;
    let response = get(&h.app, "/oauth/github", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn begin_login_redirects_to_provider_and_sets_cookie() {
    let h = harness().await;
    let response = get(&h.app, "/oauth/google", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with(&format!("{}/google/authorize", h.server.uri())));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("code_challenge="));
    assert!(location.contains("state="));

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("keybridge_session="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn full_login_flow_establishes_session_and_lists_connection() {
    let h = harness().await;
    mount_google_success(&h.server).await;

    let (cookie, callback) = login(&h, false).await;
    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        callback.headers().get(header::LOCATION).unwrap(),
        "/dashboard"
    );

    let listing = get(&h.app, "/oauth/connections", Some(&cookie)).await;
    assert_eq!(listing.status(), StatusCode::OK);
    let json = body_json(listing).await;
    assert_eq!(json["google"]["providerUserId"], "42");
    assert!(json["google"].get("accessToken").is_none());
    assert!(json["google"].get("access_token").is_none());
}

#[tokio::test]
async fn failed_callback_redirects_to_login() {
    let h = harness().await;
    let begin = get(&h.app, "/oauth/google", None).await;
    let cookie = begin
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let callback = get(
        &h.app,
        "/oauth/google/callback?state=forged&code=abc",
        Some(&cookie),
    )
    .await;
    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert_eq!(callback.headers().get(header::LOCATION).unwrap(), "/login");
}

#[tokio::test]
async fn popup_callback_delivers_html_message() {
    let h = harness().await;
    mount_google_success(&h.server).await;

    let (_cookie, callback) = login(&h, true).await;
    assert_eq!(callback.status(), StatusCode::OK);
    let content_type = callback
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/html"));
    let page = body_text(callback).await;
    assert!(page.contains("oauth_result"));
    assert!(page.contains("postMessage"));
}

#[tokio::test]
async fn connections_listing_requires_authentication() {
    let h = harness().await;
    let response = get(&h.app, "/oauth/connections", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn link_requires_authentication() {
    let h = harness().await;
    let response = get(&h.app, "/oauth/link/google", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disconnect_removes_exactly_one_connection() {
    let h = harness().await;
    mount_google_success(&h.server).await;
    let (cookie, _) = login(&h, false).await;

    let first = post(&h.app, "/oauth/disconnect/google", Some(&cookie)).await;
    assert_eq!(first.status(), StatusCode::OK);
    let json = body_json(first).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Google account disconnected.");

    let second = post(&h.app, "/oauth/disconnect/google", Some(&cookie)).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    let json = body_json(second).await;
    assert_eq!(json["success"], false);

    let listing = get(&h.app, "/oauth/connections", Some(&cookie)).await;
    let json = body_json(listing).await;
    assert!(json.get("google").is_none());
}

#[tokio::test]
async fn disconnect_requires_authentication() {
    let h = harness().await;
    let response = post(&h.app, "/oauth/disconnect/google", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
