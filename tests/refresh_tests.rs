//! Token refresh: single-flight sharing, failure modes, store effects.

mod auth_support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::Notify;

use authkeep::auth::{TokenRefresher, TokenStore, TokenUpdate};
use authkeep::error::AuthError;
use authkeep::http::HttpMethod;

use auth_support::{quiet_config, ScriptedClient};

fn refresher_over(client: Arc<ScriptedClient>) -> (TokenRefresher, Arc<TokenStore>) {
    let store = Arc::new(TokenStore::in_memory());
    let refresher = TokenRefresher::new(store.clone(), client, Arc::new(quiet_config()));
    (refresher, store)
}

async fn release_when_pending(refresher: &TokenRefresher, gate: &Notify) {
    while !refresher.is_refreshing() {
        tokio::task::yield_now().await;
    }
    tokio::task::yield_now().await;
    gate.notify_one();
}

#[tokio::test]
async fn fails_without_refresh_token() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let (refresher, store) = refresher_over(client.clone());

    let err = refresher.refresh().await.unwrap_err();

    assert_eq!(err, AuthError::NoRefreshToken);
    assert_eq!(client.calls(), 0);
    assert!(store.get().is_empty());
}

#[tokio::test]
async fn stores_new_access_token() {
    let client = Arc::new(ScriptedClient::new(vec![Ok(json!({ "token": "newToken" }))]));
    let (refresher, store) = refresher_over(client.clone());
    store.set(TokenUpdate::refresh("some"));

    let token = refresher.refresh().await.unwrap();

    assert_eq!(token.access_token.as_deref(), Some("newToken"));
    assert_eq!(store.access_token().as_deref(), Some("newToken"));
    assert_eq!(store.refresh_token().as_deref(), Some("some"));

    let request = &client.requests()[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path, "/auth/login");
    assert_eq!(
        request.body,
        Some(json!({ "grant_type": "refresh_token", "refresh_token": "some" }))
    );
}

#[tokio::test]
async fn response_without_token_is_invalid_and_leaves_store() {
    let client = Arc::new(ScriptedClient::new(vec![Ok(json!({ "Error": "serverError" }))]));
    let (refresher, store) = refresher_over(client);
    store.set(TokenUpdate::refresh("some"));

    let err = refresher.refresh().await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidServerResponse(_)));
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token().as_deref(), Some("some"));
}

#[tokio::test]
async fn server_rejection_propagates() {
    let client = Arc::new(ScriptedClient::new(vec![Err(AuthError::rejected(
        401,
        "refresh token revoked",
    ))]));
    let (refresher, store) = refresher_over(client);
    store.set(TokenUpdate::access("old").with_refresh(Some("some".to_string())));

    let err = refresher.refresh().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(store.access_token().as_deref(), Some("old"));
}

#[tokio::test]
async fn concurrent_callers_share_one_success() {
    let gate = Arc::new(Notify::new());
    let client = Arc::new(ScriptedClient::gated(
        vec![
            Ok(json!({ "token": "newToken" })),
            Ok(json!({ "token": "other newToken" })),
        ],
        gate.clone(),
    ));
    let (refresher, store) = refresher_over(client.clone());
    store.set(TokenUpdate::refresh("some"));

    let (first, second, ()) = tokio::join!(
        refresher.refresh(),
        refresher.refresh(),
        release_when_pending(&refresher, &gate)
    );

    assert_eq!(client.calls(), 1);
    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(store.access_token().as_deref(), Some("newToken"));
    assert!(!refresher.is_refreshing());
}

#[tokio::test]
async fn concurrent_callers_share_one_failure() {
    let gate = Arc::new(Notify::new());
    let client = Arc::new(ScriptedClient::gated(
        vec![
            Ok(json!({ "Error": "no token" })),
            Ok(json!({ "token": "valid token" })),
        ],
        gate.clone(),
    ));
    let (refresher, store) = refresher_over(client.clone());
    store.set(TokenUpdate::refresh("some"));

    let (first, second, ()) = tokio::join!(
        refresher.refresh(),
        refresher.refresh(),
        release_when_pending(&refresher, &gate)
    );

    assert_eq!(client.calls(), 1);
    let first = first.unwrap_err();
    assert!(matches!(first, AuthError::InvalidServerResponse(_)));
    assert_eq!(first, second.unwrap_err());
    assert_eq!(store.access_token(), None);
}

#[tokio::test]
async fn settled_attempt_is_not_reused() {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(json!({ "token": "first" })),
        Ok(json!({ "token": "second", "refresh_token": "rotated" })),
    ]));
    let (refresher, store) = refresher_over(client.clone());
    store.set(TokenUpdate::refresh("some"));

    refresher.refresh().await.unwrap();
    assert!(refresher.pending_since().is_none());
    let token = refresher.refresh().await.unwrap();

    assert_eq!(client.calls(), 2);
    assert_eq!(token.access_token.as_deref(), Some("second"));
    assert_eq!(token.refresh_token.as_deref(), Some("rotated"));
    let second_body = client.requests()[1].body.clone().unwrap();
    assert_eq!(second_body["refresh_token"], "some");
}

#[tokio::test]
async fn refresh_url_overrides_login_url() {
    let client = Arc::new(ScriptedClient::new(vec![Ok(json!({ "access_token": "a" }))]));
    let store = Arc::new(TokenStore::in_memory());
    store.set(TokenUpdate::refresh("r"));
    let config = authkeep::config::AuthConfig {
        refresh_token_url: Some("/auth/token".to_string()),
        ..quiet_config()
    };
    let refresher = TokenRefresher::new(store, client.clone(), Arc::new(config));

    refresher.refresh().await.unwrap();

    assert_eq!(client.requests()[0].path, "/auth/token");
}
