//! Third-party provider authentication through a popup round trip.

mod oauth1;
mod oauth2;

pub use oauth1::OAuth1Flow;
pub use oauth2::OAuth2Flow;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::auth::{AuthResult, TokenStore};
use crate::config::{AuthConfig, OAuthVersion, PopupOptions, ProviderConfig};
use crate::error::AuthError;
use crate::http::HttpClient;

/// Parameters the provider hands back on its redirect, query and fragment
/// merged.
pub type CallbackParams = BTreeMap<String, String>;

/// Host capability that shows the provider page and waits for its redirect.
///
/// Implementations must settle when the user closes the window, with an
/// error if the redirect never happened.
#[async_trait]
pub trait Popup: Send + Sync {
    async fn open(
        &self,
        url: &str,
        redirect_uri: Option<&str>,
        options: &PopupOptions,
    ) -> Result<CallbackParams, AuthError>;
}

/// Popup for hosts that cannot show one. Every flow fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessPopup;

#[async_trait]
impl Popup for HeadlessPopup {
    async fn open(
        &self,
        url: &str,
        _redirect_uri: Option<&str>,
        _options: &PopupOptions,
    ) -> Result<CallbackParams, AuthError> {
        Err(AuthError::OAuthHandshakeFailed(format!(
            "no popup available to open {url}"
        )))
    }
}

/// One protocol's round trip, resolving to the payload the token is read from.
#[async_trait]
pub trait ProviderFlow: Send + Sync {
    async fn open(
        &self,
        provider: &ProviderConfig,
        user_data: Option<&Value>,
    ) -> Result<Value, AuthError>;
}

/// Runs the provider flow matching the provider's protocol version and
/// writes the resulting token.
pub struct OAuthFlowBroker {
    config: Arc<AuthConfig>,
    store: Arc<TokenStore>,
    oauth1: Arc<dyn ProviderFlow>,
    oauth2: Arc<dyn ProviderFlow>,
}

impl OAuthFlowBroker {
    pub fn new(
        config: Arc<AuthConfig>,
        store: Arc<TokenStore>,
        oauth1: Arc<dyn ProviderFlow>,
        oauth2: Arc<dyn ProviderFlow>,
    ) -> Self {
        Self {
            config,
            store,
            oauth1,
            oauth2,
        }
    }

    /// Broker using the built-in flows over `client` and `popup`.
    pub fn with_popup(
        config: Arc<AuthConfig>,
        store: Arc<TokenStore>,
        client: Arc<dyn HttpClient>,
        popup: Arc<dyn Popup>,
    ) -> Self {
        let oauth1 = Arc::new(OAuth1Flow::new(client.clone(), popup.clone()));
        let oauth2 = Arc::new(OAuth2Flow::new(client, popup));
        Self::new(config, store, oauth1, oauth2)
    }

    /// Authenticate with the named provider.
    ///
    /// Fails with [`AuthError::UnknownProvider`] before any popup opens. Any
    /// failure during the round trip, including a payload without an access
    /// token, surfaces as [`AuthError::OAuthHandshakeFailed`] and leaves the
    /// store untouched.
    pub async fn authenticate(
        &self,
        name: &str,
        user_data: Option<&Value>,
    ) -> Result<AuthResult, AuthError> {
        let provider = self.config.provider(name)?;
        let flow = match provider.version {
            OAuthVersion::OAuth1 => &self.oauth1,
            OAuthVersion::OAuth2 => &self.oauth2,
        };

        let payload = flow
            .open(provider, user_data)
            .await
            .map_err(|err| handshake_failure(name, err))?;

        let fields = &self.config.token_fields;
        let token = fields
            .token(&payload, self.config.use_refresh_token)
            .ok_or_else(|| {
                warn!(provider = name, "provider payload carried no access token");
                AuthError::OAuthHandshakeFailed(format!("{name} returned no access token"))
            })?;

        let token = self.store.replace(token);
        info!(provider = name, version = %provider.version, "provider authentication succeeded");
        Ok(AuthResult {
            token,
            response: payload,
        })
    }
}

fn handshake_failure(provider: &str, err: AuthError) -> AuthError {
    warn!(provider, error = %err, "provider authentication failed");
    match err {
        AuthError::OAuthHandshakeFailed(_) => err,
        other => AuthError::OAuthHandshakeFailed(other.to_string()),
    }
}

pub(crate) fn callback_to_value(params: CallbackParams) -> Value {
    Value::Object(
        params
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

/// Copy the fields of `extra` over `target` when `extra` is an object.
pub(crate) fn merge_object(target: &mut Map<String, Value>, extra: Option<&Value>) {
    if let Some(Value::Object(fields)) = extra {
        target.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}
