use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{AuthError, IdentityProvider, Session, SessionProvider};

/// Mediates between the UI and the identity provider. Produces a usable
/// identity token on demand, or reports that there is no session.
///
/// The session cache is injected rather than global, so every holder of the
/// manager observes the same sign-in state.
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn SessionProvider>,
}

impl SessionManager {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn SessionProvider>) -> Self {
        Self { identity, store }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.identity.register(email.trim(), password).await?;
        info!("Account registered, awaiting confirmation");
        Ok(())
    }

    pub async fn confirm(&self, email: &str, code: &str) -> Result<(), AuthError> {
        self.identity.confirm(email.trim(), code.trim()).await?;
        info!("Account confirmed");
        Ok(())
    }

    /// Sign in and cache the resulting session.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.identity.authenticate(email.trim(), password).await?;
        self.store.set(&session).map_err(AuthError::storage)?;
        info!("Signed in");
        Ok(session)
    }

    /// The cached session with an unexpired identity token, or `None`.
    ///
    /// An expired identity token is refreshed transparently. If the refresh
    /// fails for any reason the cache is cleared and the caller sees no
    /// session, never an expired one.
    pub async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.store.get().map_err(AuthError::storage)? else {
            return Ok(None);
        };

        if !session.is_expired() {
            return Ok(Some(session));
        }

        debug!("Identity token expired, refreshing session");
        match self.identity.refresh(&session.refresh_token).await {
            Ok(refreshed) if refreshed.is_complete() && !refreshed.is_expired() => {
                self.store.set(&refreshed).map_err(AuthError::storage)?;
                debug!(minutes_left = refreshed.minutes_until_expiry(), "Session refreshed");
                Ok(Some(refreshed))
            }
            Ok(_) => {
                warn!("Refresh returned an unusable token, discarding session");
                self.store.clear().map_err(AuthError::storage)?;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed, discarding session");
                self.store.clear().map_err(AuthError::storage)?;
                Ok(None)
            }
        }
    }

    /// Identity token of the current session, refreshed if needed.
    pub async fn identity_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.current_session().await?.map(|s| s.identity_token))
    }

    /// Forget the cached session. Signing out with no session is a no-op.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.store.clear().map_err(AuthError::storage)?;
        info!("Signed out");
        Ok(())
    }
}
