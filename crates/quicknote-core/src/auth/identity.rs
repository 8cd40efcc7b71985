use async_trait::async_trait;

use super::{AuthError, Session};

/// A managed identity provider holding user credentials and issuing signed
/// session tokens.
///
/// Accounts move `Unregistered -> Unconfirmed -> Confirmed`: `register`
/// performs the first step, `confirm` the second, and `authenticate` only
/// succeeds for confirmed accounts.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an unconfirmed account. Rejections (bad email, weak password,
    /// duplicate account) are `AuthError::Registration`.
    async fn register(&self, email: &str, password: &str) -> Result<(), AuthError>;

    /// Confirm an account with the code sent to its email. Bad or expired
    /// codes are `AuthError::Confirmation`.
    async fn confirm(&self, email: &str, code: &str) -> Result<(), AuthError>;

    /// Exchange credentials for a session. Wrong credentials are
    /// `AuthError::Authentication`; an account still awaiting its code is
    /// `AuthError::NotConfirmed`.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Obtain fresh identity and access tokens using a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;
}
