//! HTTP transport capability used by every network-facing component.

mod reqwest_client;

pub use reqwest_client::ReqwestClient;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::AuthError;

/// HTTP verbs the auth API uses.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single request against the auth API.
///
/// `path` is relative to the client's base URL unless it is absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
    /// Bearer token to send instead of the one in the token store.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query.extend(query);
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// Transport used to reach the auth API.
///
/// Implementations resolve to the decoded JSON body (`Value::Null` for an
/// empty one), fail with [`AuthError::ServerRejected`] on non-2xx statuses and
/// with [`AuthError::Transport`] when no response arrived. Timeouts are the
/// implementation's concern.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, request: ApiRequest) -> Result<Value, AuthError>;
}
