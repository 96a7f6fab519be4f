use crate::session::{FileStore, SessionConfig, SessionManager};
use anyhow::Result;
use std::{env, path::PathBuf, sync::Arc, time::Duration};

const DEFAULT_STORE_FILE: &str = ".opal-session.json";

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub base_url: String,
    pub store_path: PathBuf,
    pub timeout: Duration,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            store_path: default_store_path(),
            timeout: crate::session::config::DEFAULT_TIMEOUT,
        }
    }

    /// Builds a session manager backed by the file store.
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn session_manager(&self) -> Result<SessionManager> {
        let config = SessionConfig::new(&self.base_url)?.with_timeout(self.timeout);
        let store = Arc::new(FileStore::new(&self.store_path));
        Ok(SessionManager::new(&config, store)?)
    }
}

/// `$HOME/.opal-session.json`, or the working directory when `HOME` is unset.
#[must_use]
pub fn default_store_path() -> PathBuf {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map_or_else(
            || PathBuf::from(DEFAULT_STORE_FILE),
            |home| PathBuf::from(home).join(DEFAULT_STORE_FILE),
        )
}
