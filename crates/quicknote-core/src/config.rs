//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the message server URL, the Cognito user pool identifiers, where the
//! session is cached, and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/quicknote/config.json`. Environment
//! variables override the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{
    CognitoIdentityProvider, FileSessionProvider, IdentityProvider, KeyringSessionProvider,
    SessionManager, SessionProvider,
};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "quicknote";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Region used when neither the config nor the pool id names one.
const DEFAULT_REGION: &str = "us-east-1";

const ENV_API_URL: &str = "QUICKNOTE_API_URL";
const ENV_SESSION_STORE: &str = "QUICKNOTE_SESSION_STORE";
const ENV_COGNITO_REGION: &str = "COGNITO_REGION";
const ENV_COGNITO_USER_POOL_ID: &str = "COGNITO_USER_POOL_ID";
const ENV_COGNITO_CLIENT_ID: &str = "COGNITO_CLIENT_ID";

/// Where the signed-in session is kept between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStoreKind {
    #[default]
    File,
    Keyring,
}

impl FromStr for SessionStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(SessionStoreKind::File),
            "keyring" | "keychain" => Ok(SessionStoreKind::Keyring),
            other => Err(anyhow::anyhow!("Unknown session store: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub cognito_region: Option<String>,
    pub cognito_user_pool_id: Option<String>,
    pub cognito_client_id: Option<String>,
    pub session_store: SessionStoreKind,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            cognito_region: None,
            cognito_user_pool_id: None,
            cognito_client_id: None,
            session_store: SessionStoreKind::default(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(region) = get(ENV_COGNITO_REGION) {
            self.cognito_region = Some(region);
        }
        if let Some(pool) = get(ENV_COGNITO_USER_POOL_ID) {
            self.cognito_user_pool_id = Some(pool);
        }
        if let Some(client) = get(ENV_COGNITO_CLIENT_ID) {
            self.cognito_client_id = Some(client);
        }
        if let Some(store) = get(ENV_SESSION_STORE) {
            self.session_store = store
                .parse()
                .with_context(|| format!("Invalid {}", ENV_SESSION_STORE))?;
        }
        Ok(())
    }

    /// Cognito region: explicit setting, else the prefix of the user pool id
    /// (`us-east-1_AbCdEf` lives in `us-east-1`), else the default.
    pub fn region(&self) -> String {
        if let Some(region) = self.cognito_region.as_deref().filter(|r| !r.is_empty()) {
            return region.to_string();
        }
        self.cognito_user_pool_id
            .as_deref()
            .and_then(|pool| pool.split_once('_'))
            .map(|(region, _)| region)
            .filter(|region| !region.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_string()
    }

    pub fn client_id(&self) -> Result<&str> {
        self.cognito_client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No Cognito app client configured. Set {} or cognito_client_id in {}",
                    ENV_COGNITO_CLIENT_ID,
                    CONFIG_FILE
                )
            })
    }

    /// Location of the config file.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// The configured session cache.
    pub fn session_store(&self) -> Result<Arc<dyn SessionProvider>> {
        Ok(match self.session_store {
            SessionStoreKind::File => Arc::new(FileSessionProvider::new(self.cache_dir()?)),
            SessionStoreKind::Keyring => Arc::new(KeyringSessionProvider::new()),
        })
    }

    pub fn identity_provider(&self) -> Result<Arc<dyn IdentityProvider>> {
        let provider = CognitoIdentityProvider::new(&self.region(), self.client_id()?)
            .context("Failed to create Cognito client")?;
        Ok(Arc::new(provider))
    }

    /// Session manager wired to the configured provider and cache.
    pub fn session_manager(&self) -> Result<SessionManager> {
        Ok(SessionManager::new(
            self.identity_provider()?,
            self.session_store()?,
        ))
    }
}
