use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use super::storage::{MemoryStorage, TokenStorage};
use super::token::{Token, TokenUpdate};

/// Owner of the current token pair.
///
/// The only mutable state the crate shares between components. Every change
/// is written through to the injected [`TokenStorage`]; storage failures are
/// logged and otherwise ignored, so the in-memory view stays authoritative for
/// the running process.
///
/// # Example
/// ```
/// use authkeep::auth::{TokenStore, TokenUpdate};
///
/// let store = TokenStore::in_memory();
/// store.set(TokenUpdate::refresh("refresh"));
/// store.set(TokenUpdate::access("access"));
/// assert_eq!(store.refresh_token().as_deref(), Some("refresh"));
/// store.clear();
/// assert!(store.get().is_empty());
/// ```
pub struct TokenStore {
    state: RwLock<Token>,
    storage: Arc<dyn TokenStorage>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = self.get();
        f.debug_struct("TokenStore")
            .field("has_access_token", &token.has_access_token())
            .field("has_refresh_token", &token.has_refresh_token())
            .finish()
    }
}

impl TokenStore {
    /// Create a store, loading any persisted token. Unreadable storage
    /// starts the store empty.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let initial = match storage.read() {
            Ok(Some(token)) => {
                debug!(
                    has_access_token = token.has_access_token(),
                    has_refresh_token = token.has_refresh_token(),
                    "loaded persisted token"
                );
                token
            }
            Ok(None) => Token::default(),
            Err(err) => {
                warn!(error = %err, "failed to read persisted token, starting unauthenticated");
                Token::default()
            }
        };
        Self {
            state: RwLock::new(initial),
            storage,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn get(&self) -> Token {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
    }

    /// Merge `update` into the current token and return the result.
    ///
    /// Fields left `None` keep their stored value.
    pub fn set(&self, update: TokenUpdate) -> Token {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(access_token) = update.access_token {
            state.access_token = Some(access_token);
        }
        if let Some(refresh_token) = update.refresh_token {
            state.refresh_token = Some(refresh_token);
        }
        self.persist(&state);
        state.clone()
    }

    /// Overwrite both fields with `token`, including absent ones.
    ///
    /// Used when a new session begins, so a refresh token left over from an
    /// earlier session cannot outlive it.
    pub fn replace(&self, token: Token) -> Token {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = token;
        self.persist(&state);
        state.clone()
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = Token::default();
        if let Err(err) = self.storage.clear() {
            warn!(error = %err, "failed to clear persisted token");
        }
    }

    fn persist(&self, token: &Token) {
        if let Err(err) = self.storage.write(token) {
            warn!(error = %err, "failed to persist token");
        }
    }
}
