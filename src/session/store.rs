//! Durable client-side token storage.
//!
//! `KeyValueStore` is the seam between the session manager and wherever the
//! client keeps its state: `FileStore` for the CLI, `MemoryStore` for tests and
//! embedders. The store is the only shared mutable resource; concurrent writers
//! get last-write-wins, there is no locking across operations.
//!
//! `TokenStore` layers the token contract on top: `access_token`,
//! `refresh_token`, and `user_roles` are written in one batch and removed in
//! one batch, never individually. `registered_email` lives in the same store
//! but outside the session keys, so logout and forced invalidation keep it.

use super::{error::StoreError, types::TokenPair};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    ffi::OsString,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, warn};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_ROLES_KEY: &str = "user_roles";
pub const REGISTERED_EMAIL_KEY: &str = "registered_email";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_ROLES_KEY];

/// String key-value storage scoped to one client.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes every entry or none of them.
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError>;

    /// Removes every key in one write.
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError>;
}

/// In-process store, lost when the process exits.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let mut map = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut map = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// JSON object on disk. Every write replaces the file through a sibling temp
/// file and a rename, so readers never observe half a batch.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Like `read_all`, but a corrupt file reads as empty so the next write
    /// replaces it. The flag reports whether the file was discarded.
    fn read_or_discard(&self) -> Result<(BTreeMap<String, String>, bool), StoreError> {
        match self.read_all() {
            Ok(map) => Ok((map, false)),
            Err(StoreError::Json(err)) => {
                warn!(path = %self.path.display(), "discarding unreadable token store: {err}");
                Ok((BTreeMap::new(), true))
            }
            Err(err) => Err(err),
        }
    }

    /// Sibling of the store file, named after the full file name.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), keys = entries.len(), "token store written");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let (mut map, _) = self.read_or_discard()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        self.write_all(&map)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let (mut map, corrupt) = self.read_or_discard()?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before && !corrupt {
            return Ok(());
        }
        self.write_all(&map)
    }
}

/// Token-shaped view over a `KeyValueStore`.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// Reads the persisted pair. A store holding only one of the two tokens is
    /// cleared and reported as empty.
    /// # Errors
    /// Returns an error if the backing store fails.
    pub fn load(&self) -> Result<Option<TokenPair>, StoreError> {
        let access = self.inner.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.inner.get(REFRESH_TOKEN_KEY)?;

        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(Some(TokenPair::new(access, refresh))),
            (None, None) => Ok(None),
            _ => {
                warn!("partial token pair found in store, clearing");
                self.clear()?;
                Ok(None)
            }
        }
    }

    /// Persists the pair together with the role cache.
    /// # Errors
    /// Returns an error if the backing store fails.
    pub fn save(&self, pair: &TokenPair, roles: &BTreeSet<String>) -> Result<(), StoreError> {
        let roles = Value::from(roles.iter().cloned().collect::<Vec<_>>()).to_string();
        self.inner.set_many(&[
            (ACCESS_TOKEN_KEY, pair.access_token().to_string()),
            (REFRESH_TOKEN_KEY, pair.refresh_token().to_string()),
            (USER_ROLES_KEY, roles),
        ])
    }

    /// Cached roles written at login, if any.
    /// # Errors
    /// Returns an error if the backing store fails.
    pub fn cached_roles(&self) -> Result<Option<BTreeSet<String>>, StoreError> {
        let Some(raw) = self.inner.get(USER_ROLES_KEY)? else {
            return Ok(None);
        };
        Ok(serde_json::from_str::<Vec<String>>(&raw)
            .ok()
            .map(|roles| roles.into_iter().collect()))
    }

    /// Removes all session keys in one write.
    /// # Errors
    /// Returns an error if the backing store fails.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.inner.remove_many(&SESSION_KEYS)
    }

    /// Email of the last registration, kept for the activation step.
    /// # Errors
    /// Returns an error if the backing store fails.
    pub fn registered_email(&self) -> Result<Option<String>, StoreError> {
        self.inner.get(REGISTERED_EMAIL_KEY)
    }

    /// # Errors
    /// Returns an error if the backing store fails.
    pub fn set_registered_email(&self, email: &str) -> Result<(), StoreError> {
        self.inner
            .set_many(&[(REGISTERED_EMAIL_KEY, email.to_string())])
    }
}
