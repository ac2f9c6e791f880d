//! Locating token values inside server responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::token::Token;

/// Where tokens live in login, refresh and provider responses.
///
/// `*_prop` is a dotted path into the response. If the value found there is
/// a string it is the token; if it is an object, the token is read from its
/// `*_name` key (below the optional dotted `*_root`). When the path yields
/// nothing, the access token falls back to a top-level `access_token_name`
/// key, so both `{"access_token": "…"}` and `{"token": "…"}` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenFields {
    pub access_token_prop: String,
    pub access_token_name: String,
    pub access_token_root: Option<String>,
    pub refresh_token_prop: String,
    pub refresh_token_name: String,
    pub refresh_token_root: Option<String>,
}

impl Default for TokenFields {
    fn default() -> Self {
        Self {
            access_token_prop: "access_token".to_string(),
            access_token_name: "token".to_string(),
            access_token_root: None,
            refresh_token_prop: "refresh_token".to_string(),
            refresh_token_name: "token".to_string(),
            refresh_token_root: None,
        }
    }
}

impl TokenFields {
    pub fn access_token(&self, response: &Value) -> Option<String> {
        lookup(
            response,
            &self.access_token_prop,
            &self.access_token_name,
            self.access_token_root.as_deref(),
        )
        .or_else(|| non_empty(response.get(&self.access_token_name)))
    }

    /// The refresh token has no top-level fallback: `token` conventionally
    /// names the access token.
    pub fn refresh_token(&self, response: &Value) -> Option<String> {
        lookup(
            response,
            &self.refresh_token_prop,
            &self.refresh_token_name,
            self.refresh_token_root.as_deref(),
        )
    }

    /// Extract a full token pair; `None` unless an access token is present.
    pub fn token(&self, response: &Value, with_refresh: bool) -> Option<Token> {
        let access_token = self.access_token(response)?;
        let refresh_token = if with_refresh {
            self.refresh_token(response)
        } else {
            None
        };
        Some(Token::new(Some(access_token), refresh_token))
    }
}

fn lookup(response: &Value, prop: &str, name: &str, root: Option<&str>) -> Option<String> {
    let found = walk(response, prop)?;
    if found.is_string() {
        return non_empty(Some(found));
    }
    if !found.is_object() {
        return None;
    }
    let base = match root {
        Some(root) => walk(found, root)?,
        None => found,
    };
    non_empty(base.get(name))
}

fn walk<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.get(segment))
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
