//! quicknote core - accounts, sessions and personal messages.
//!
//! This crate holds everything the front end needs that is not drawing:
//! - `auth`: sign-up, confirmation, sign-in and the cached session
//! - `api`: the authenticated message server client
//! - `feed`: the client-side copy of the caller's messages
//! - `config`: settings file and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod feed;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, Session, SessionManager};
pub use config::{Config, SessionStoreKind};
pub use feed::MessageFeed;
pub use models::{Message, UserInfo};
