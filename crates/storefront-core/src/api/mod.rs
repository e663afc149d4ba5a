//! REST API client module for the storefront services.
//!
//! This module provides the `ApiClient` for the two public APIs the app
//! talks to: the auth API (token login) and the posts API (feed data).
//!
//! Requests are authorized per call through a `RequestContext` rather than
//! through headers stored on the client.

pub mod client;
pub mod context;
pub mod error;

pub use client::{ApiClient, AuthTokens};
pub use context::RequestContext;
pub use error::{describe_error, ApiError};
