//! REST API client module for the core banking service.
//!
//! This module provides the `ApiClient` for issuing authenticated calls
//! against the banking API, the `ApiRequest` description that lets a
//! rejected call be replayed, and the `ApiError` taxonomy.
//!
//! The API uses short-lived JWT bearer tokens issued by `/api/auth/login`
//! and renewed by `/api/auth/refresh` using an HttpOnly session cookie.

pub mod client;
pub mod error;
pub mod request;

pub use client::ApiClient;
pub use error::ApiError;
pub use request::ApiRequest;
