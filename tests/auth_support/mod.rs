#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::Notify;

use authkeep::auth::{AuthCoordinator, TokenStore};
use authkeep::config::{AuthConfig, PopupOptions, ProviderConfig};
use authkeep::error::AuthError;
use authkeep::http::{ApiRequest, HttpClient};
use authkeep::navigation::Navigator;
use authkeep::oauth::{CallbackParams, Popup, ProviderFlow};

/// Config with every redirect disabled.
pub fn quiet_config() -> AuthConfig {
    AuthConfig {
        login_redirect: None,
        logout_redirect: None,
        signup_redirect: None,
        ..AuthConfig::new("http://localhost:1927/")
    }
}

/// Answers every request with `{method, path, query, body}`, lifting any
/// `access_token`/`refresh_token` in the body to the top level.
#[derive(Default)]
pub struct EchoClient {
    requests: Mutex<Vec<ApiRequest>>,
}

impl EchoClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn last(&self) -> ApiRequest {
        self.requests().pop().expect("at least one request")
    }
}

#[async_trait]
impl HttpClient for EchoClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, AuthError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        let mut response = Map::new();
        response.insert("method".to_string(), json!(request.method.to_string()));
        response.insert("path".to_string(), json!(request.path));
        response.insert("query".to_string(), json!(request.query));
        response.insert(
            "body".to_string(),
            request.body.clone().unwrap_or(Value::Null),
        );
        if let Some(body) = &request.body {
            for key in ["access_token", "refresh_token"] {
                if let Some(value) = body.get(key) {
                    response.insert(key.to_string(), value.clone());
                }
            }
        }
        Ok(Value::Object(response))
    }
}

/// Replays queued outcomes in order, optionally holding each request until
/// the gate is notified.
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<Value, AuthError>>>,
    requests: Mutex<Vec<ApiRequest>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<Value, AuthError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn gated(responses: Vec<Result<Value, AuthError>>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(responses)
        }
    }

    pub fn push(&self, response: Result<Value, AuthError>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.responses.lock().expect("responses lock").pop_front();
        next.unwrap_or_else(|| Err(AuthError::Transport("no scripted response left".to_string())))
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    events: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("events lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &str) {
        self.events
            .lock()
            .expect("events lock")
            .push(target.to_string());
    }

    fn reload(&self) {
        self.events
            .lock()
            .expect("events lock")
            .push("<reload>".to_string());
    }
}

/// Provider flow resolving to `{provider, userData, access_token}`, or to a
/// fixed payload when one is given.
pub struct StubFlow {
    access_token: &'static str,
    payload: Option<Value>,
    calls: AtomicUsize,
}

impl StubFlow {
    pub fn issuing(access_token: &'static str) -> Self {
        Self {
            access_token,
            payload: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn resolving_to(payload: Value) -> Self {
        Self {
            access_token: "",
            payload: Some(payload),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderFlow for StubFlow {
    async fn open(
        &self,
        provider: &ProviderConfig,
        user_data: Option<&Value>,
    ) -> Result<Value, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(payload) = &self.payload {
            return Ok(payload.clone());
        }
        Ok(json!({
            "provider": provider.name,
            "userData": user_data.cloned().unwrap_or(Value::Null),
            "access_token": self.access_token,
        }))
    }
}

/// Popup that records the URLs it opens and answers with fixed callback
/// parameters. A `{state}` placeholder in a value is replaced by the `state`
/// query parameter of the opened URL.
pub struct StubPopup {
    callback: CallbackParams,
    opened: Mutex<Vec<String>>,
}

impl StubPopup {
    pub fn answering(pairs: &[(&str, &str)]) -> Self {
        Self {
            callback: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened lock").clone()
    }
}

#[async_trait]
impl Popup for StubPopup {
    async fn open(
        &self,
        url: &str,
        _redirect_uri: Option<&str>,
        _options: &PopupOptions,
    ) -> Result<CallbackParams, AuthError> {
        self.opened
            .lock()
            .expect("opened lock")
            .push(url.to_string());
        let state = reqwest::Url::parse(url)
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(k, _)| k == "state")
                    .map(|(_, v)| v.into_owned())
            })
            .unwrap_or_default();
        Ok(self
            .callback
            .iter()
            .map(|(k, v)| (k.clone(), v.replace("{state}", &state)))
            .collect())
    }
}

pub fn coordinator_with(
    config: AuthConfig,
    client: Arc<dyn HttpClient>,
) -> (AuthCoordinator, Arc<TokenStore>) {
    let store = Arc::new(TokenStore::in_memory());
    let auth = AuthCoordinator::new(Arc::new(config), client, store.clone());
    (auth, store)
}
