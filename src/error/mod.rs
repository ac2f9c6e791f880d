//! Error types for authkeep.

use thiserror::Error;

/// Normalized authentication errors.
///
/// Cloneable: every caller waiting on a shared refresh attempt receives its
/// own copy of the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No refresh token available")]
    NoRefreshToken,
    #[error("Invalid server response: {0}")]
    InvalidServerResponse(String),
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    #[error("OAuth handshake failed: {0}")]
    OAuthHandshakeFailed(String),
    #[error("Server rejected request (status {status}): {message}")]
    ServerRejected { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    /// Build a [`AuthError::ServerRejected`] from a status code and message.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::ServerRejected {
            status,
            message: message.into(),
        }
    }

    /// HTTP status attached to this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a caller-driven retry could plausibly succeed.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::ServerRejected { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidServerResponse(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AuthError>;
