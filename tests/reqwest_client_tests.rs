use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authkeep::auth::{AuthCoordinator, TokenStore, TokenUpdate};
use authkeep::config::AuthConfig;
use authkeep::error::AuthError;
use authkeep::http::{ApiRequest, HttpClient, ReqwestClient};
use authkeep::navigation::Redirect;

fn client_for(server: &MockServer, store: Arc<TokenStore>) -> ReqwestClient {
    ReqwestClient::new(server.uri())
        .expect("build client")
        .with_token_store(store)
}

#[tokio::test]
async fn sends_store_token_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer stored-token"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "some" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(TokenStore::in_memory());
    store.set(TokenUpdate::access("stored-token"));
    let client = client_for(&server, store);

    let me = client.request(ApiRequest::get("/auth/me")).await.expect("profile");
    assert_eq!(me["name"], "some");
}

#[tokio::test]
async fn explicit_bearer_wins_over_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer previous"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(TokenStore::in_memory());
    store.set(TokenUpdate::access("current"));
    let client = client_for(&server, store);

    let response = client
        .request(ApiRequest::post("/auth/logout").with_bearer(Some("previous".to_string())))
        .await
        .expect("logout");
    assert_eq!(response, Value::Null);
}

#[tokio::test]
async fn forwards_query_and_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/auth/me"))
        .and(query_param("id", "5"))
        .and(body_json(json!({ "data": "some" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(TokenStore::in_memory()));
    let request = ApiRequest::put("/auth/me")
        .with_query_param("id", "5")
        .with_body(json!({ "data": "some" }));

    let response = client.request(request).await.expect("update");
    assert_eq!(response, json!({ "ok": true }));
}

#[tokio::test]
async fn non_success_status_maps_to_server_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(TokenStore::in_memory()));
    let err = client
        .request(ApiRequest::post("/auth/login").with_body(json!({})))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::rejected(401, "Invalid credentials"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn non_json_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(TokenStore::in_memory()));
    let err = client.request(ApiRequest::get("/auth/me")).await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidServerResponse(_)));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let client = ReqwestClient::new("http://127.0.0.1:9").expect("build client");
    let err = client.request(ApiRequest::get("/auth/me")).await.unwrap_err();

    assert!(matches!(err, AuthError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn login_then_refresh_against_live_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "a@b.c", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "first",
            "refresh_token": "refresh-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(header("authorization", "Bearer first"))
        .and(body_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "refresh-1",
            "client_id": "app"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "second" })))
        .expect(1)
        .mount(&server)
        .await;

    let config = Arc::new(AuthConfig {
        refresh_token_url: Some("/auth/token".to_string()),
        client_id: Some("app".to_string()),
        ..AuthConfig::new(server.uri())
    });
    let store = Arc::new(TokenStore::in_memory());
    let client = Arc::new(
        ReqwestClient::from_config(&config)
            .expect("build client")
            .with_token_store(store.clone()),
    );
    let auth = AuthCoordinator::new(config, client, store.clone());

    auth.login(json!({ "email": "a@b.c", "password": "pw" }), Redirect::Skip)
        .await
        .expect("login");
    let token = auth.update_token().await.expect("refresh");

    assert_eq!(token.access_token.as_deref(), Some("second"));
    assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
}
