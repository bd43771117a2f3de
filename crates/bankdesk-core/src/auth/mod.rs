//! Authentication and session management.
//!
//! This module provides:
//! - `Credential`: the bearer token, redacted in debug output
//! - `SessionStore`: holder of the current token and display name
//! - `RefreshCoordinator`: single-flight token refresh shared by all requests
//! - `AuthClient`: login and refresh calls against `/api/auth`
//! - `CredentialStore`: optional OS keychain storage of staff passwords

pub mod client;
pub mod credentials;
pub mod refresh;
pub mod session;
pub mod token;

pub use client::AuthClient;
pub use credentials::CredentialStore;
pub use refresh::{
    RefreshCoordinator, RefreshError, SessionExpiredHandler, TokenRefresher,
    DEFAULT_REFRESH_TIMEOUT,
};
pub use session::{establish, FileSessionStore, MemorySessionStore, SessionData, SessionStore};
pub use token::Credential;
