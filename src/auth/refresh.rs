//! Single-flight exchange of the refresh token for a new access token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::http::{ApiRequest, HttpClient};

use super::store::TokenStore;
use super::token::{Token, TokenUpdate};

type SharedOutcome = Shared<BoxFuture<'static, Result<Token, AuthError>>>;

/// One exchange, shared by every caller that asked while it was in flight.
struct RefreshAttempt {
    id: u64,
    started_at: DateTime<Utc>,
    outcome: SharedOutcome,
}

/// Refreshes the access token, running at most one exchange at a time.
///
/// Callers arriving while an exchange is in flight await that exchange and
/// observe its exact outcome. The in-flight slot is emptied when the exchange
/// settles; the next call starts a new one. Completed results are not cached.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use authkeep::auth::{TokenRefresher, TokenStore};
/// use authkeep::config::AuthConfig;
/// use authkeep::http::ReqwestClient;
///
/// # async fn run() -> authkeep::error::Result<()> {
/// let config = Arc::new(AuthConfig::new("https://api.example.com"));
/// let store = Arc::new(TokenStore::in_memory());
/// let client = Arc::new(ReqwestClient::from_config(&config)?.with_token_store(store.clone()));
/// let refresher = TokenRefresher::new(store, client, config);
/// let token = refresher.refresh().await?;
/// # Ok(())
/// # }
/// ```
pub struct TokenRefresher {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<TokenStore>,
    client: Arc<dyn HttpClient>,
    config: Arc<AuthConfig>,
    pending: Mutex<Option<RefreshAttempt>>,
    next_id: AtomicU64,
}

impl TokenRefresher {
    pub fn new(store: Arc<TokenStore>, client: Arc<dyn HttpClient>, config: Arc<AuthConfig>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                client,
                config,
                pending: Mutex::new(None),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Fails with [`AuthError::NoRefreshToken`] without any request when the
    /// store holds no refresh token, and with
    /// [`AuthError::InvalidServerResponse`] when the server answers without
    /// an access token. Neither failure touches the store.
    pub async fn refresh(&self) -> Result<Token, AuthError> {
        let refresh_token = self
            .inner
            .store
            .refresh_token()
            .ok_or(AuthError::NoRefreshToken)?;
        let outcome = self.inner.join_or_start(refresh_token);
        outcome.await
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_pending().is_some()
    }

    /// When the in-flight exchange started, if there is one.
    pub fn pending_since(&self) -> Option<DateTime<Utc>> {
        self.inner
            .lock_pending()
            .as_ref()
            .map(|attempt| attempt.started_at)
    }
}

impl Inner {
    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<RefreshAttempt>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join_or_start(self: &Arc<Self>, refresh_token: String) -> SharedOutcome {
        let mut pending = self.lock_pending();
        if let Some(attempt) = pending.as_ref() {
            debug!(attempt = attempt.id, "joining in-flight token refresh");
            return attempt.outcome.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(self);
        let outcome = async move {
            let result = inner.exchange(refresh_token).await;
            inner.settle(id, result.is_ok());
            result
        }
        .boxed()
        .shared();

        debug!(attempt = id, "starting token refresh");
        *pending = Some(RefreshAttempt {
            id,
            started_at: Utc::now(),
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Empty the slot, but only if it still holds attempt `id`.
    fn settle(&self, id: u64, succeeded: bool) {
        let mut pending = self.lock_pending();
        if let Some(attempt) = pending.as_ref().filter(|attempt| attempt.id == id) {
            let elapsed_ms = (Utc::now() - attempt.started_at).num_milliseconds();
            debug!(attempt = id, succeeded, elapsed_ms, "token refresh settled");
            *pending = None;
        }
    }

    async fn exchange(&self, refresh_token: String) -> Result<Token, AuthError> {
        let mut body = Map::new();
        body.insert(
            "grant_type".to_string(),
            Value::String("refresh_token".to_string()),
        );
        body.insert(
            self.config.refresh_token_submit_prop.clone(),
            Value::String(refresh_token),
        );
        if let Some(client_id) = &self.config.client_id {
            body.insert("client_id".to_string(), Value::String(client_id.clone()));
        }

        let request = ApiRequest::post(self.config.refresh_url()).with_body(Value::Object(body));
        let response = self.client.request(request).await.map_err(|err| {
            warn!(error = %err, "token refresh request failed");
            err
        })?;

        let fields = &self.config.token_fields;
        let Some(access_token) = fields.access_token(&response) else {
            warn!("token refresh response carried no access token");
            return Err(AuthError::InvalidServerResponse(
                "refresh response carried no access token".to_string(),
            ));
        };
        let update = TokenUpdate::access(access_token).with_refresh(fields.refresh_token(&response));
        let token = self.store.set(update);
        info!("access token refreshed");
        Ok(token)
    }
}
