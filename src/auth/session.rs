use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::inspect::TokenInspector;
use super::refresh::TokenRefresher;
use super::store::TokenStore;

/// Snapshot of the session as derived from the current token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    /// `None` when the token cannot be inspected.
    pub expired: Option<bool>,
    pub payload: Option<Value>,
}

/// Answers "is the user logged in?" from the token store and an optional
/// [`TokenInspector`].
///
/// Without an inspector every present access token counts as valid.
pub struct SessionState {
    store: Arc<TokenStore>,
    inspector: Option<Arc<dyn TokenInspector>>,
    refresher: Arc<TokenRefresher>,
    auto_update_token: bool,
}

impl SessionState {
    pub fn new(
        store: Arc<TokenStore>,
        inspector: Option<Arc<dyn TokenInspector>>,
        refresher: Arc<TokenRefresher>,
        auto_update_token: bool,
    ) -> Self {
        Self {
            store,
            inspector,
            refresher,
            auto_update_token,
        }
    }

    /// True when an access token is present and not known to be expired.
    pub fn is_authenticated(&self) -> bool {
        self.store.access_token().is_some() && self.is_token_expired() != Some(true)
    }

    /// Expiry of the current access token. `None` when there is no token, no
    /// inspector, or the token carries no readable expiry.
    pub fn is_token_expired(&self) -> Option<bool> {
        let token = self.store.access_token()?;
        self.inspector.as_ref()?.is_expired(&token)
    }

    pub fn token_payload(&self) -> Option<Value> {
        let token = self.store.access_token()?;
        self.inspector.as_ref()?.payload(&token)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            authenticated: self.is_authenticated(),
            expired: self.is_token_expired(),
            payload: self.token_payload(),
        }
    }

    /// Like [`Self::is_authenticated`], but tries a refresh first when the
    /// access token has expired and automatic updates are enabled.
    ///
    /// A failed refresh is reported as `false`, never as an error.
    pub async fn is_authenticated_refreshing(&self) -> bool {
        if self.is_authenticated() {
            return true;
        }
        let token = self.store.get();
        if !self.auto_update_token || !token.has_access_token() || !token.has_refresh_token() {
            return false;
        }
        match self.refresher.refresh().await {
            Ok(_) => self.is_authenticated(),
            Err(err) => {
                debug!(error = %err, "refresh during authentication check failed");
                false
            }
        }
    }
}
