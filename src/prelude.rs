//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthCoordinator, AuthResult, Criteria, FileStorage, JwtInspector, MemoryStorage,
    SessionStatus, Token, TokenInspector, TokenStorage, TokenStore, TokenUpdate,
};
pub use crate::config::{AuthConfig, OAuthVersion, ProviderConfig};
pub use crate::error::{AuthError, Result};
pub use crate::http::{ApiRequest, HttpClient, HttpMethod, ReqwestClient};
pub use crate::navigation::{Navigator, Redirect};
pub use crate::oauth::{Popup, ProviderFlow};
