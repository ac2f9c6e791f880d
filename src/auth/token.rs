use serde::{Deserialize, Serialize};

/// Access/refresh token pair held by a [`super::TokenStore`].
///
/// Both values are opaque strings. A missing access token means the session
/// is unauthenticated, whatever the refresh token says.
///
/// # Example
/// ```
/// use authkeep::auth::Token;
///
/// let token = Token::new(Some("access".to_string()), Some("refresh".to_string()));
/// assert!(token.has_access_token());
/// assert!(!Token::default().has_access_token());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Token {
    pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Partial token write. `None` fields leave the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl TokenUpdate {
    pub fn access(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            refresh_token: None,
        }
    }

    pub fn refresh(token: impl Into<String>) -> Self {
        Self {
            access_token: None,
            refresh_token: Some(token.into()),
        }
    }

    pub fn with_refresh(mut self, token: Option<String>) -> Self {
        self.refresh_token = token;
        self
    }
}

impl From<Token> for TokenUpdate {
    fn from(token: Token) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        }
    }
}

/// Normalized outcome of login, signup-with-login and provider authentication.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResult {
    /// Token pair as written to the store.
    pub token: Token,
    /// Raw server or provider response the token was extracted from.
    pub response: serde_json::Value,
}
