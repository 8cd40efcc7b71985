use anyhow::{Context, Result};
use keyring::Entry;

use super::{Session, SessionProvider};

const SERVICE_NAME: &str = "quicknote";

/// Keychain account under which the session is stored.
const SESSION_ACCOUNT: &str = "session";

/// Session stored in the OS keychain as a JSON blob.
pub struct KeyringSessionProvider {
    service: String,
}

impl KeyringSessionProvider {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a different keychain service name (separate profiles, tests).
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, SESSION_ACCOUNT).context("Failed to create keyring entry")
    }
}

impl Default for KeyringSessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for KeyringSessionProvider {
    fn get(&self) -> Result<Option<Session>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let session: Session = serde_json::from_str(&secret)
                    .context("Failed to parse session from keychain")?;
                Ok(Some(session).filter(Session::is_complete))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    fn set(&self, session: &Session) -> Result<()> {
        let secret = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store session in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A store under its own service name, or `None` when this machine has
    /// no usable keychain (headless CI, containers without keyutils).
    fn available_store(service: &str) -> Option<KeyringSessionProvider> {
        let store = KeyringSessionProvider::with_service(service);
        match store.set(&Session::new("check-id", "check-access", "check-refresh")) {
            Ok(()) => Some(store),
            Err(e) => {
                eprintln!("skipping keychain test: {:#}", e);
                None
            }
        }
    }

    #[test]
    fn test_set_then_get_returns_session() {
        let Some(store) = available_store("quicknote-test-roundtrip") else {
            return;
        };
        let session = Session::new("id-token", "access-token", "refresh-token");
        store.set(&session).unwrap();

        let stored = store.get().unwrap();
        store.clear().unwrap();
        assert_eq!(stored, Some(session));
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_clear_without_entry_is_ok() {
        let Some(store) = available_store("quicknote-test-clear") else {
            return;
        };
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }
}
