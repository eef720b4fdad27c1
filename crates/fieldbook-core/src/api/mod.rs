//! REST API client module for the booking services.
//!
//! This module provides the `ApiClient` for the field, user and order
//! services. Requests are signed per target service (see `signing`) and
//! authenticated endpoints carry the session's bearer token.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginResult, RetryPolicy};
pub use error::ApiError;
