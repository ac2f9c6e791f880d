use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::AuthError;
use crate::http::{ApiRequest, HttpClient};

use super::{callback_to_value, merge_object, Popup, ProviderFlow};

/// OAuth 1.0a three-legged flow. Request signing is left to the server
/// behind `provider.url`.
pub struct OAuth1Flow {
    client: Arc<dyn HttpClient>,
    popup: Arc<dyn Popup>,
}

impl OAuth1Flow {
    pub fn new(client: Arc<dyn HttpClient>, popup: Arc<dyn Popup>) -> Self {
        Self { client, popup }
    }

    async fn request_token(
        &self,
        provider: &ProviderConfig,
    ) -> Result<Vec<(String, String)>, AuthError> {
        let mut body = Map::new();
        if let Some(redirect_uri) = &provider.redirect_uri {
            body.insert("redirectUri".to_string(), Value::String(redirect_uri.clone()));
        }
        let response = self
            .client
            .request(ApiRequest::post(provider.url.clone()).with_body(Value::Object(body)))
            .await?;

        let Value::Object(fields) = response else {
            return Err(AuthError::InvalidServerResponse(
                "request token response is not an object".to_string(),
            ));
        };
        fields
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                Value::Number(_) | Value::Bool(_) => Ok((key, value.to_string())),
                _ => Err(AuthError::InvalidServerResponse(format!(
                    "request token field {key} is not a scalar"
                ))),
            })
            .collect()
    }
}

#[async_trait]
impl ProviderFlow for OAuth1Flow {
    async fn open(
        &self,
        provider: &ProviderConfig,
        user_data: Option<&Value>,
    ) -> Result<Value, AuthError> {
        let request_token = self.request_token(provider).await?;
        let url = Url::parse_with_params(&provider.authorization_endpoint, &request_token)
            .map_err(|err| {
                AuthError::Configuration(format!(
                    "invalid authorization endpoint for {}: {err}",
                    provider.name
                ))
            })?;

        debug!(provider = %provider.name, "opening oauth1 popup");
        let callback = self
            .popup
            .open(url.as_str(), provider.redirect_uri.as_deref(), &provider.popup)
            .await?;
        if let Some(error) = callback.get("denied").or_else(|| callback.get("error")) {
            return Err(AuthError::OAuthHandshakeFailed(format!(
                "authorization denied: {error}"
            )));
        }

        let mut body = Map::new();
        merge_object(&mut body, user_data);
        merge_object(&mut body, Some(&callback_to_value(callback)));

        self.client
            .request(ApiRequest::post(provider.url.clone()).with_body(Value::Object(body)))
            .await
    }
}
