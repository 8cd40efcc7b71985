//! REST API client module for the quicknote message server.
//!
//! This module provides the `ApiClient` for reading the signed-in user and
//! listing, creating and deleting their messages.
//!
//! The server authenticates every call except the health check with the
//! identity token issued by the user pool, sent as a bearer credential.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ApiError, GENERIC_FAILURE_MESSAGE};
