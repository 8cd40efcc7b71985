use thiserror::Error;

/// Failures from the identity provider or the session cache.
///
/// Provider rejections carry the provider's own message so the view layer
/// can show it verbatim.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("Confirmation failed: {0}")]
    Confirmation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Credentials were right but the account still awaits its emailed code.
    #[error("Account not confirmed: {0}")]
    NotConfirmed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from identity provider: {0}")]
    InvalidResponse(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// The provider's message without the category prefix.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Registration(msg)
            | AuthError::Confirmation(msg)
            | AuthError::Authentication(msg)
            | AuthError::NotConfirmed(msg) => msg.clone(),
            AuthError::Network(_) => {
                "Unable to reach the sign-in service. Check your internet connection.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        AuthError::Storage(format!("{:#}", err))
    }
}
