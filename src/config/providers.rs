//! Third-party identity provider definitions.

use std::collections::BTreeMap;

use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize};
use strum::Display;

/// OAuth protocol generation a provider speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum OAuthVersion {
    #[serde(rename = "1.0", alias = "oauth1")]
    #[strum(serialize = "1.0")]
    OAuth1,
    #[default]
    #[serde(rename = "2.0", alias = "oauth2")]
    #[strum(serialize = "2.0")]
    OAuth2,
}

/// Popup window geometry requested from the [`crate::oauth::Popup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
        }
    }
}

impl PopupOptions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Everything needed to run one provider's login round trip.
///
/// `url` is the auth API path that exchanges the provider's answer for a
/// session token; `authorization_endpoint` is the provider page opened in the
/// popup.
///
/// # Example
/// ```
/// use authkeep::config::{OAuthVersion, ProviderConfig};
///
/// let provider = ProviderConfig::builder()
///     .name("gitlab")
///     .version(OAuthVersion::OAuth2)
///     .url("/auth/gitlab")
///     .authorization_endpoint("https://gitlab.com/oauth/authorize")
///     .client_id("client-123".to_string())
///     .scope(vec!["read_user".to_string()])
///     .build();
/// assert_eq!(provider.response_type(), "code");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct ProviderConfig {
    #[builder(into)]
    pub name: String,
    pub version: OAuthVersion,
    #[builder(into)]
    pub url: String,
    #[builder(into)]
    pub authorization_endpoint: String,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub scope: Vec<String>,
    pub scope_delimiter: Option<String>,
    pub response_type: Option<String>,
    /// Fixed OAuth 2.0 `state`; a random one is generated per flow otherwise.
    pub state: Option<String>,
    /// Extra query parameters for the authorization URL.
    #[serde(default)]
    #[builder(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    #[builder(default)]
    pub popup: PopupOptions,
}

impl ProviderConfig {
    pub fn response_type(&self) -> &str {
        self.response_type.as_deref().unwrap_or("code")
    }

    pub fn scope_delimiter(&self) -> &str {
        self.scope_delimiter.as_deref().unwrap_or(" ")
    }

    /// Implicit flows return the access token straight from the popup.
    pub fn is_implicit(&self) -> bool {
        self.response_type().split(' ').any(|kind| kind == "token")
    }

    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: OAuthVersion::OAuth2,
            url: format!("/auth/{name}"),
            authorization_endpoint: String::new(),
            redirect_uri: None,
            client_id: None,
            scope: Vec::new(),
            scope_delimiter: None,
            response_type: None,
            state: None,
            params: BTreeMap::new(),
            popup: PopupOptions::default(),
        }
    }
}

/// Partial provider entry from a config file, layered over built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderOverride {
    version: Option<OAuthVersion>,
    url: Option<String>,
    authorization_endpoint: Option<String>,
    redirect_uri: Option<String>,
    client_id: Option<String>,
    scope: Option<Vec<String>>,
    scope_delimiter: Option<String>,
    response_type: Option<String>,
    state: Option<String>,
    params: Option<BTreeMap<String, String>>,
    popup: Option<PopupOptions>,
}

impl ProviderOverride {
    fn apply(self, mut base: ProviderConfig) -> ProviderConfig {
        if let Some(version) = self.version {
            base.version = version;
        }
        if let Some(url) = self.url {
            base.url = url;
        }
        if let Some(endpoint) = self.authorization_endpoint {
            base.authorization_endpoint = endpoint;
        }
        if self.redirect_uri.is_some() {
            base.redirect_uri = self.redirect_uri;
        }
        if self.client_id.is_some() {
            base.client_id = self.client_id;
        }
        if let Some(scope) = self.scope {
            base.scope = scope;
        }
        if self.scope_delimiter.is_some() {
            base.scope_delimiter = self.scope_delimiter;
        }
        if self.response_type.is_some() {
            base.response_type = self.response_type;
        }
        if self.state.is_some() {
            base.state = self.state;
        }
        if let Some(params) = self.params {
            base.params.extend(params);
        }
        if let Some(popup) = self.popup {
            base.popup = popup;
        }
        base
    }
}

/// Deserialize a provider table, merging each entry over the default of the
/// same name.
pub(crate) fn deserialize_merged<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, ProviderConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, ProviderOverride>::deserialize(deserializer)?;
    let mut providers = default_providers();
    for (name, entry) in overrides {
        let base = providers
            .remove(&name)
            .unwrap_or_else(|| ProviderConfig::named(&name));
        providers.insert(name, entry.apply(base));
    }
    Ok(providers)
}

/// Built-in providers. Client ids and redirect URIs are left for the
/// application to fill in.
pub fn default_providers() -> BTreeMap<String, ProviderConfig> {
    let facebook = ProviderConfig {
        authorization_endpoint: "https://www.facebook.com/v2.5/dialog/oauth".to_string(),
        scope: vec!["email".to_string()],
        scope_delimiter: Some(",".to_string()),
        params: BTreeMap::from([("display".to_string(), "popup".to_string())]),
        popup: PopupOptions::new(580, 400),
        ..ProviderConfig::named("facebook")
    };
    let google = ProviderConfig {
        authorization_endpoint: "https://accounts.google.com/o/oauth2/auth".to_string(),
        scope: vec![
            "openid".to_string(),
            "profile".to_string(),
            "email".to_string(),
        ],
        params: BTreeMap::from([("display".to_string(), "popup".to_string())]),
        popup: PopupOptions::new(452, 633),
        ..ProviderConfig::named("google")
    };
    let github = ProviderConfig {
        authorization_endpoint: "https://github.com/login/oauth/authorize".to_string(),
        scope: vec!["user:email".to_string()],
        popup: PopupOptions::new(1020, 618),
        ..ProviderConfig::named("github")
    };
    let linkedin = ProviderConfig {
        authorization_endpoint: "https://www.linkedin.com/uas/oauth2/authorization".to_string(),
        scope: vec!["r_emailaddress".to_string()],
        popup: PopupOptions::new(527, 582),
        ..ProviderConfig::named("linkedin")
    };
    let twitter = ProviderConfig {
        version: OAuthVersion::OAuth1,
        authorization_endpoint: "https://api.twitter.com/oauth/authenticate".to_string(),
        popup: PopupOptions::new(495, 645),
        ..ProviderConfig::named("twitter")
    };

    [facebook, google, github, linkedin, twitter]
        .into_iter()
        .map(|provider| (provider.name.clone(), provider))
        .collect()
}
