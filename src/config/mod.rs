//! Configuration (layered: code > env > config file > defaults).

pub mod providers;

pub use providers::{default_providers, OAuthVersion, PopupOptions, ProviderConfig};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::response::TokenFields;
use crate::error::AuthError;
use crate::http::HttpMethod;

/// Endpoints, redirect targets, token conventions and providers.
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```
/// use authkeep::config::AuthConfig;
///
/// let config = AuthConfig::from_toml_str(r#"
///     base_url = "https://api.example.com"
///     login_on_signup = false
///     unlink_method = "post"
///
///     [providers.google]
///     client_id = "google-client"
/// "#)?;
/// assert!(!config.login_on_signup);
/// assert_eq!(config.provider("google")?.client_id.as_deref(), Some("google-client"));
/// # Ok::<(), authkeep::error::AuthError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub base_url: String,
    /// Base URL override used only for auth API requests.
    pub endpoint: Option<String>,
    pub login_url: String,
    pub signup_url: String,
    pub profile_url: String,
    pub profile_method: HttpMethod,
    /// Prefix the provider name is appended to.
    pub unlink_url: String,
    pub unlink_method: HttpMethod,
    /// Server-side logout notification; skipped when unset.
    pub logout_url: Option<String>,
    pub logout_method: HttpMethod,
    /// Falls back to `login_url` when unset.
    pub refresh_token_url: Option<String>,
    pub refresh_token_submit_prop: String,
    pub client_id: Option<String>,
    pub login_redirect: Option<String>,
    pub logout_redirect: Option<String>,
    pub signup_redirect: Option<String>,
    pub login_on_signup: bool,
    pub auto_update_token: bool,
    /// Read refresh tokens out of login and provider responses.
    pub use_refresh_token: bool,
    pub request_timeout_secs: u64,
    pub token_fields: TokenFields,
    #[serde(deserialize_with = "providers::deserialize_merged")]
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            endpoint: None,
            login_url: "/auth/login".to_string(),
            signup_url: "/auth/signup".to_string(),
            profile_url: "/auth/me".to_string(),
            profile_method: HttpMethod::Put,
            unlink_url: "/auth/unlink/".to_string(),
            unlink_method: HttpMethod::Get,
            logout_url: None,
            logout_method: HttpMethod::Get,
            refresh_token_url: None,
            refresh_token_submit_prop: "refresh_token".to_string(),
            client_id: None,
            login_redirect: Some("/".to_string()),
            logout_redirect: Some("/".to_string()),
            signup_redirect: Some("/login".to_string()),
            login_on_signup: true,
            auto_update_token: false,
            use_refresh_token: true,
            request_timeout_secs: 30,
            token_fields: TokenFields::default(),
            providers: default_providers(),
        }
    }
}

impl AuthConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AuthError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(AuthError::Configuration(format!(
                    "cannot read {}: {err}",
                    path.display()
                )))
            }
        };
        Self::from_toml_str(&raw)
    }

    /// Load from `AUTHKEEP_CONFIG` (if set), then apply environment overrides.
    ///
    /// Reads `.env` first when present.
    pub fn from_env() -> Result<Self, AuthError> {
        let _ = dotenvy::dotenv();
        let mut config = match std::env::var("AUTHKEEP_CONFIG") {
            Ok(path) => Self::load_from_path(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), AuthError> {
        if let Some(url) = var("AUTHKEEP_BASE_URL") {
            self.base_url = url;
        }
        if let Some(endpoint) = var("AUTHKEEP_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(client_id) = var("AUTHKEEP_CLIENT_ID") {
            self.client_id = Some(client_id);
        }
        if let Some(flag) = var("AUTHKEEP_AUTO_UPDATE_TOKEN") {
            self.auto_update_token = parse_flag("AUTHKEEP_AUTO_UPDATE_TOKEN", &flag)?;
        }
        if let Some(flag) = var("AUTHKEEP_LOGIN_ON_SIGNUP") {
            self.login_on_signup = parse_flag("AUTHKEEP_LOGIN_ON_SIGNUP", &flag)?;
        }
        Ok(())
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.insert(provider.name.clone(), provider);
        self
    }

    pub fn provider(&self, name: &str) -> Result<&ProviderConfig, AuthError> {
        self.providers
            .get(name)
            .ok_or_else(|| AuthError::UnknownProvider(name.to_string()))
    }

    pub fn api_base_url(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(&self.base_url)
    }

    pub fn refresh_url(&self) -> &str {
        self.refresh_token_url.as_deref().unwrap_or(&self.login_url)
    }

    pub fn unlink_path(&self, provider: &str) -> String {
        format!("{}{provider}", self.unlink_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, AuthError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AuthError::Configuration(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}
