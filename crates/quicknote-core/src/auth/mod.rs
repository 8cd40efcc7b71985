//! Authentication module for managing user sessions.
//!
//! This module provides:
//! - `SessionManager`: sign-up, confirmation, sign-in, current session with
//!   transparent refresh, sign-out
//! - `IdentityProvider`: the managed identity service (`CognitoIdentityProvider`,
//!   `MemoryIdentityProvider`)
//! - `SessionProvider`: the client-side session cache (`MemorySessionProvider`,
//!   `FileSessionProvider`, `KeyringSessionProvider`)
//! - `AuthForm`: sign-in / sign-up / confirm form state
//!
//! Identity tokens are refreshed once they are within a minute of expiry.

pub mod cognito;
pub mod credentials;
pub mod error;
pub mod form;
pub mod identity;
pub mod manager;
pub mod memory;
pub mod session;
pub mod store;

pub use cognito::CognitoIdentityProvider;
pub use credentials::KeyringSessionProvider;
pub use error::AuthError;
pub use form::{AuthForm, AuthMode, AuthOutcome};
pub use identity::IdentityProvider;
pub use manager::SessionManager;
pub use memory::{AccountState, MemoryIdentityProvider};
pub use session::{Session, TokenClaims};
pub use store::{FileSessionProvider, MemorySessionProvider, SessionProvider};
