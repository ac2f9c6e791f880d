use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

use crate::auth::TokenStore;
use crate::config::AuthConfig;
use crate::error::AuthError;

use super::{ApiRequest, HttpClient};

/// [`HttpClient`] backed by `reqwest`.
///
/// Relative paths are joined onto the base URL. When a token store is
/// attached, its access token is sent as a bearer `Authorization` header.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use authkeep::auth::TokenStore;
/// use authkeep::http::ReqwestClient;
///
/// let store = Arc::new(TokenStore::in_memory());
/// let client = ReqwestClient::new("https://api.example.com")?.with_token_store(store);
/// # Ok::<(), authkeep::error::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    base_url: String,
    store: Option<Arc<TokenStore>>,
}

impl ReqwestClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use the auth endpoint override if configured, else the base URL.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::with_timeout(config.api_base_url(), config.request_timeout())
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store: None,
        }
    }

    pub fn with_token_store(mut self, store: Arc<TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, AuthError> {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, url = %url, "auth api request");

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let bearer = request
            .bearer
            .or_else(|| self.store.as_ref().and_then(|store| store.access_token()));
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), url = %url, "auth api rejected request");
            return Err(status_to_error(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| {
            AuthError::InvalidServerResponse(format!("response body is not JSON: {err}"))
        })
    }
}

/// Map a non-2xx status to a [`AuthError::ServerRejected`], preferring the
/// server's own message when the body carries one.
fn status_to_error(status: u16, body: &str) -> AuthError {
    let message = extract_message(body).unwrap_or_else(|| body.trim().to_string());
    AuthError::rejected(status, message)
}

fn extract_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    ["message", "error_description", "error", "Error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
