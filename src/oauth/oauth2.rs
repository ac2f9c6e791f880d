use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::error::AuthError;
use crate::http::{ApiRequest, HttpClient};

use super::{callback_to_value, merge_object, CallbackParams, Popup, ProviderFlow};

/// OAuth 2.0 authorization code and implicit flows.
pub struct OAuth2Flow {
    client: Arc<dyn HttpClient>,
    popup: Arc<dyn Popup>,
}

impl OAuth2Flow {
    pub fn new(client: Arc<dyn HttpClient>, popup: Arc<dyn Popup>) -> Self {
        Self { client, popup }
    }

    /// Provider authorization URL for one attempt.
    pub fn authorization_url(provider: &ProviderConfig, state: &str) -> Result<Url, AuthError> {
        let scope = provider.scope.join(provider.scope_delimiter());
        let mut params: Vec<(&str, &str)> = vec![("response_type", provider.response_type())];
        if let Some(client_id) = &provider.client_id {
            params.push(("client_id", client_id.as_str()));
        }
        if let Some(redirect_uri) = &provider.redirect_uri {
            params.push(("redirect_uri", redirect_uri.as_str()));
        }
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }
        params.push(("state", state));
        params.extend(provider.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        Url::parse_with_params(&provider.authorization_endpoint, &params).map_err(|err| {
            AuthError::Configuration(format!(
                "invalid authorization endpoint for {}: {err}",
                provider.name
            ))
        })
    }
}

#[async_trait]
impl ProviderFlow for OAuth2Flow {
    async fn open(
        &self,
        provider: &ProviderConfig,
        user_data: Option<&Value>,
    ) -> Result<Value, AuthError> {
        let state = provider
            .state
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let url = Self::authorization_url(provider, &state)?;

        debug!(provider = %provider.name, "opening oauth2 popup");
        let callback = self
            .popup
            .open(url.as_str(), provider.redirect_uri.as_deref(), &provider.popup)
            .await?;
        verify_callback(&callback, &state)?;

        if provider.is_implicit() {
            return Ok(callback_to_value(callback));
        }

        let mut body = Map::new();
        if let Some(client_id) = &provider.client_id {
            body.insert("clientId".to_string(), Value::String(client_id.clone()));
        }
        if let Some(redirect_uri) = &provider.redirect_uri {
            body.insert("redirectUri".to_string(), Value::String(redirect_uri.clone()));
        }
        merge_object(&mut body, user_data);
        merge_object(&mut body, Some(&callback_to_value(callback)));

        self.client
            .request(ApiRequest::post(provider.url.clone()).with_body(Value::Object(body)))
            .await
    }
}

fn verify_callback(callback: &CallbackParams, state: &str) -> Result<(), AuthError> {
    if let Some(error) = callback.get("error") {
        let detail = callback
            .get("error_description")
            .map(|description| format!("{error}: {description}"))
            .unwrap_or_else(|| error.clone());
        return Err(AuthError::OAuthHandshakeFailed(detail));
    }
    match callback.get("state") {
        Some(returned) if returned != state => Err(AuthError::OAuthHandshakeFailed(
            "state parameter mismatch".to_string(),
        )),
        _ => Ok(()),
    }
}
