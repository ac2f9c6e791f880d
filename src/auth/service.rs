use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::http::{ApiRequest, HttpClient};
use crate::navigation::{Navigator, NoopNavigator, Redirect};
use crate::oauth::{HeadlessPopup, OAuthFlowBroker, Popup, ProviderFlow};

use super::inspect::{JwtInspector, TokenInspector};
use super::refresh::TokenRefresher;
use super::session::{SessionState, SessionStatus};
use super::store::TokenStore;
use super::token::{AuthResult, Token};

/// Selector for the profile endpoint's query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criteria {
    /// Sent as `?id=<value>`.
    Id(String),
    Query(BTreeMap<String, String>),
}

impl Criteria {
    fn into_query(self) -> BTreeMap<String, String> {
        match self {
            Self::Id(id) => BTreeMap::from([("id".to_string(), id)]),
            Self::Query(query) => query,
        }
    }
}

impl From<i64> for Criteria {
    fn from(id: i64) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<&str> for Criteria {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for Criteria {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<BTreeMap<String, String>> for Criteria {
    fn from(query: BTreeMap<String, String>) -> Self {
        Self::Query(query)
    }
}

/// Application-facing authentication facade.
///
/// Owns the token store, the refresher, the session view and the provider
/// broker, and applies the configured redirect after each state change. All
/// I/O decisions beyond navigation belong to the caller.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use authkeep::auth::{AuthCoordinator, TokenStore};
/// use authkeep::config::AuthConfig;
/// use authkeep::http::ReqwestClient;
/// use authkeep::navigation::Redirect;
///
/// # async fn run() -> authkeep::error::Result<()> {
/// let config = Arc::new(AuthConfig::new("https://api.example.com"));
/// let store = Arc::new(TokenStore::in_memory());
/// let client = Arc::new(ReqwestClient::from_config(&config)?.with_token_store(store.clone()));
/// let auth = AuthCoordinator::new(config, client, store);
///
/// auth.login(serde_json::json!({ "email": "a@b.c", "password": "secret" }), Redirect::Skip)
///     .await?;
/// assert!(auth.is_authenticated());
/// auth.logout(Redirect::Skip).await;
/// # Ok(())
/// # }
/// ```
pub struct AuthCoordinator {
    config: Arc<AuthConfig>,
    client: Arc<dyn HttpClient>,
    store: Arc<TokenStore>,
    refresher: Arc<TokenRefresher>,
    inspector: Option<Arc<dyn TokenInspector>>,
    session: SessionState,
    broker: OAuthFlowBroker,
    navigator: Arc<dyn Navigator>,
}

impl AuthCoordinator {
    /// Coordinator with a [`JwtInspector`], no navigation and no popup.
    pub fn new(config: Arc<AuthConfig>, client: Arc<dyn HttpClient>, store: Arc<TokenStore>) -> Self {
        let refresher = Arc::new(TokenRefresher::new(
            store.clone(),
            client.clone(),
            config.clone(),
        ));
        let inspector: Option<Arc<dyn TokenInspector>> = Some(Arc::new(JwtInspector::new()));
        let session = SessionState::new(
            store.clone(),
            inspector.clone(),
            refresher.clone(),
            config.auto_update_token,
        );
        let broker = OAuthFlowBroker::with_popup(
            config.clone(),
            store.clone(),
            client.clone(),
            Arc::new(HeadlessPopup),
        );
        Self {
            config,
            client,
            store,
            refresher,
            inspector,
            session,
            broker,
            navigator: Arc::new(NoopNavigator),
        }
    }

    /// Replace the token inspector. `None` treats every present access token
    /// as valid.
    pub fn with_inspector(mut self, inspector: Option<Arc<dyn TokenInspector>>) -> Self {
        self.inspector = inspector;
        self.session = SessionState::new(
            self.store.clone(),
            self.inspector.clone(),
            self.refresher.clone(),
            self.config.auto_update_token,
        );
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Use the built-in OAuth flows with the host's popup.
    pub fn with_popup(mut self, popup: Arc<dyn Popup>) -> Self {
        self.broker = OAuthFlowBroker::with_popup(
            self.config.clone(),
            self.store.clone(),
            self.client.clone(),
            popup,
        );
        self
    }

    /// Replace both provider flows.
    pub fn with_flows(mut self, oauth1: Arc<dyn ProviderFlow>, oauth2: Arc<dyn ProviderFlow>) -> Self {
        self.broker = OAuthFlowBroker::new(self.config.clone(), self.store.clone(), oauth1, oauth2);
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn refresher(&self) -> &Arc<TokenRefresher> {
        &self.refresher
    }

    /// Post credentials to the login endpoint and start a session from the
    /// response.
    ///
    /// A 2xx answer without an access token fails with
    /// [`AuthError::InvalidServerResponse`]. The store is untouched on every
    /// failure.
    pub async fn login(
        &self,
        credentials: Value,
        redirect: impl Into<Redirect>,
    ) -> Result<AuthResult, AuthError> {
        let request = ApiRequest::post(self.config.login_url.clone()).with_body(credentials);
        let response = self.client.request(request).await?;
        let token = self.token_from(&response).ok_or_else(|| {
            warn!("login response carried no access token");
            AuthError::InvalidServerResponse("login response carried no access token".to_string())
        })?;

        let token = self.store.replace(token);
        info!(has_refresh_token = token.has_refresh_token(), "login succeeded");
        let redirect: Redirect = redirect.into();
        redirect.apply(self.navigator.as_ref(), self.config.login_redirect.as_deref());
        Ok(AuthResult { token, response })
    }

    /// Register a new account and return the server response.
    ///
    /// With `login_on_signup` set and a token in the response, a session is
    /// started and the login redirect applies. Otherwise the store is left
    /// alone and the signup redirect applies.
    pub async fn signup(
        &self,
        user_data: Value,
        redirect: impl Into<Redirect>,
    ) -> Result<Value, AuthError> {
        let request = ApiRequest::post(self.config.signup_url.clone()).with_body(user_data);
        let response = self.client.request(request).await?;
        let redirect: Redirect = redirect.into();

        if self.config.login_on_signup {
            if let Some(token) = self.token_from(&response) {
                self.store.replace(token);
                info!("signup succeeded, session started");
                redirect.apply(self.navigator.as_ref(), self.config.login_redirect.as_deref());
                return Ok(response);
            }
            debug!("signup response carried no token, not logging in");
        }

        info!("signup succeeded");
        redirect.apply(self.navigator.as_ref(), self.config.signup_redirect.as_deref());
        Ok(response)
    }

    /// Authenticate through a configured third-party provider.
    pub async fn authenticate(
        &self,
        provider: &str,
        redirect: impl Into<Redirect>,
        user_data: Option<Value>,
    ) -> Result<AuthResult, AuthError> {
        let result = self.broker.authenticate(provider, user_data.as_ref()).await?;
        let redirect: Redirect = redirect.into();
        redirect.apply(self.navigator.as_ref(), self.config.login_redirect.as_deref());
        Ok(result)
    }

    /// End the session. Never fails.
    ///
    /// The store is cleared before the server is told; a failed notification
    /// is logged and otherwise ignored.
    pub async fn logout(&self, redirect: impl Into<Redirect>) {
        let access_token = self.store.access_token();
        self.store.clear();
        info!("logged out");

        if let Some(url) = &self.config.logout_url {
            let request =
                ApiRequest::new(self.config.logout_method, url.clone()).with_bearer(access_token);
            if let Err(err) = self.client.request(request).await {
                warn!(error = %err, "server logout notification failed");
            }
        }

        let redirect: Redirect = redirect.into();
        redirect.apply(self.navigator.as_ref(), self.config.logout_redirect.as_deref());
    }

    /// Detach a provider identity from the current account.
    pub async fn unlink(&self, provider: &str) -> Result<Value, AuthError> {
        let request = ApiRequest::new(self.config.unlink_method, self.config.unlink_path(provider));
        let response = self.client.request(request).await?;
        info!(provider, "provider unlinked");
        Ok(response)
    }

    pub async fn get_me(&self, criteria: Option<Criteria>) -> Result<Value, AuthError> {
        let request = ApiRequest::get(self.config.profile_url.clone())
            .with_query(criteria.map(Criteria::into_query).unwrap_or_default());
        self.client.request(request).await
    }

    /// Send `body` to the profile endpoint with the configured method.
    pub async fn update_me(
        &self,
        body: Value,
        criteria: Option<Criteria>,
    ) -> Result<Value, AuthError> {
        let request = ApiRequest::new(self.config.profile_method, self.config.profile_url.clone())
            .with_query(criteria.map(Criteria::into_query).unwrap_or_default())
            .with_body(body);
        self.client.request(request).await
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.store.refresh_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub async fn is_authenticated_refreshing(&self) -> bool {
        self.session.is_authenticated_refreshing().await
    }

    pub fn is_token_expired(&self) -> Option<bool> {
        self.session.is_token_expired()
    }

    pub fn token_payload(&self) -> Option<Value> {
        self.session.token_payload()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Exchange the refresh token for a new access token.
    pub async fn update_token(&self) -> Result<Token, AuthError> {
        self.refresher.refresh().await
    }

    fn token_from(&self, response: &Value) -> Option<Token> {
        self.config
            .token_fields
            .token(response, self.config.use_refresh_token)
    }
}
