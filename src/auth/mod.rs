//! Token state, session queries, refresh and the login facade.

pub mod inspect;
pub mod refresh;
pub mod response;
pub mod service;
pub mod session;
pub mod storage;
pub mod store;
pub mod token;

pub use inspect::{JwtInspector, TokenInspector};
pub use refresh::TokenRefresher;
pub use response::TokenFields;
pub use service::{AuthCoordinator, Criteria};
pub use session::{SessionState, SessionStatus};
pub use storage::{FileStorage, FileStorageConfig, MemoryStorage, TokenStorage};
pub use store::TokenStore;
pub use token::{AuthResult, Token, TokenUpdate};
