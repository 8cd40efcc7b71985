//! Client-side session caches.
//!
//! The identity provider's session cache is modelled explicitly as a
//! `SessionProvider` and injected into the `SessionManager`, so every caller
//! shares one cache and tests can substitute an in-memory one.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::debug;

use super::Session;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Storage for the current session. Implementations must be safe to share
/// between call sites.
pub trait SessionProvider: Send + Sync {
    /// Read the cached session, if any. Incomplete sessions read as absent.
    fn get(&self) -> Result<Option<Session>>;

    /// Replace the cached session.
    fn set(&self, session: &Session) -> Result<()>;

    /// Remove the cached session. Clearing an empty cache is not an error.
    fn clear(&self) -> Result<()>;
}

/// Process-local cache. Nothing survives a restart.
#[derive(Default)]
pub struct MemorySessionProvider {
    session: Mutex<Option<Session>>,
}

impl MemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Session>>> {
        self.session
            .lock()
            .map_err(|_| anyhow::anyhow!("Session cache lock poisoned"))
    }
}

impl SessionProvider for MemorySessionProvider {
    fn get(&self) -> Result<Option<Session>> {
        Ok(self.lock()?.clone().filter(Session::is_complete))
    }

    fn set(&self, session: &Session) -> Result<()> {
        *self.lock()? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

/// Session persisted as JSON in the cache directory, so a sign-in survives
/// restarts until the refresh token stops working.
pub struct FileSessionProvider {
    cache_dir: PathBuf,
}

impl FileSessionProvider {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl SessionProvider for FileSessionProvider {
    fn get(&self) -> Result<Option<Session>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let session: Session =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        if !session.is_complete() {
            debug!(?path, "Ignoring incomplete session file");
            return Ok(None);
        }
        Ok(Some(session))
    }

    fn set(&self, session: &Session) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict session file permissions")?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}
