//! Core library for bankdesk.
//!
//! Provides the authenticated request pipeline used by every bankdesk
//! front end: the `ApiClient` attaches the staff member's access token to
//! each request, and on a 401/403 obtains a fresh token through a single
//! shared refresh call before replaying the request once.
//!
//! Typed wrappers for the banking endpoints (jobs, account opening and
//! cash movements, customer onboarding, branches, loan origination,
//! collateral, staff and repayment reports) sit on top of that
//! pipeline.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod transport;

pub use api::{ApiClient, ApiError, ApiRequest};
pub use auth::{
    Credential, FileSessionStore, MemorySessionStore, RefreshCoordinator, RefreshError,
    SessionExpiredHandler, SessionStore,
};
pub use config::Config;
pub use transport::Transport;
