//! Data models for the quicknote API.
//!
//! This module contains the wire types exchanged with the message server:
//!
//! - `Message`, `MessagesResponse`, `CreateMessage`: user-scoped notes
//! - `UserInfo`: the caller as resolved from the identity token
//! - `HealthStatus`: unauthenticated liveness probe

pub mod message;
pub mod user;

pub use message::{
    validate_message_text, CreateMessage, DeleteResponse, Message, MessagesResponse,
    MAX_MESSAGE_LENGTH,
};
pub use user::{HealthStatus, UserInfo};
