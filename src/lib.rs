//! authkeep: client-side session authentication
//!
//! Keeps an access/refresh token pair, answers whether the user is logged in,
//! refreshes expired tokens with at most one exchange in flight, and drives
//! login, signup, logout and third-party OAuth 1.0a / 2.0 provider flows
//! against a token-issuing HTTP API.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use authkeep::prelude::*;
//!
//! # async fn example() -> authkeep::error::Result<()> {
//! let config = Arc::new(AuthConfig::from_env()?);
//! let store = Arc::new(TokenStore::new(Arc::new(FileStorage::new_default())));
//! let client = Arc::new(ReqwestClient::from_config(&config)?.with_token_store(store.clone()));
//! let auth = AuthCoordinator::new(config, client, store);
//!
//! if !auth.is_authenticated_refreshing().await {
//!     auth.login(serde_json::json!({ "email": "me@example.com", "password": "pw" }), Redirect::Skip)
//!         .await?;
//! }
//! let me = auth.get_me(None).await?;
//! println!("{me}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod navigation;
pub mod oauth;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
