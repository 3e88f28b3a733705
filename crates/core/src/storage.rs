//! Client-local key-value storage and the token pair kept in it
//!
//! The store itself is opaque: string keys mapping to string values, the same
//! contract a browser's `localStorage` offers. [`TokenStore`] layers the one
//! invariant the session relies on: the access and refresh token are written,
//! read and removed together.

use crate::error::CoreResult;
use crate::tokens::SessionTokens;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Key holding the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Opaque string store
///
/// Batch operations must apply all entries or none from the point of view of
/// other readers of the same store.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>>;

    fn set_items(&self, entries: &[(&str, &str)]) -> CoreResult<()>;

    fn remove_items(&self, keys: &[&str]) -> CoreResult<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process store, used by tests and short-lived sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(lock(&self.items).get(key).cloned())
    }

    fn set_items(&self, entries: &[(&str, &str)]) -> CoreResult<()> {
        let mut items = lock(&self.items);
        for (key, value) in entries {
            items.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> CoreResult<()> {
        let mut items = lock(&self.items);
        for key in keys {
            items.remove(*key);
        }
        Ok(())
    }
}

/// JSON object on disk, rewritten whole on every change
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> CoreResult<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, items: &HashMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Rename over the old file so readers see either the old or the new map.
        let tmp = self.path.with_extension("tmp");
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Bearer tokens live here; owner only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            if tmp.exists() {
                fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
            }
        }
        let mut file = options.open(&tmp)?;
        file.write_all(&serde_json::to_vec_pretty(items)?)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>> {
        let _guard = lock(&self.guard);
        Ok(self.read_all()?.remove(key))
    }

    fn set_items(&self, entries: &[(&str, &str)]) -> CoreResult<()> {
        let _guard = lock(&self.guard);
        let mut items = self.read_all()?;
        for (key, value) in entries {
            items.insert((*key).to_string(), (*value).to_string());
        }
        self.write_all(&items)
    }

    fn remove_items(&self, keys: &[&str]) -> CoreResult<()> {
        let _guard = lock(&self.guard);
        let mut items = self.read_all()?;
        let before = items.len();
        for key in keys {
            items.remove(*key);
        }
        if items.len() == before {
            return Ok(());
        }
        self.write_all(&items)
    }
}

/// The persisted token pair
///
/// Reads and writes always cover both keys under one lock, so no caller can
/// observe a refresh token from one pair next to the access token of another.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
    guard: Arc<Mutex<()>>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Load the pair; a half-present pair counts as logged out
    pub fn load(&self) -> CoreResult<Option<SessionTokens>> {
        let _guard = lock(&self.guard);
        self.load_locked()
    }

    fn load_locked(&self) -> CoreResult<Option<SessionTokens>> {
        let access = self.backend.get_item(ACCESS_TOKEN_KEY)?;
        let refresh = self.backend.get_item(REFRESH_TOKEN_KEY)?;

        match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => Ok(Some(SessionTokens {
                access_token,
                refresh_token,
            })),
            (None, None) => Ok(None),
            _ => {
                warn!("Ignoring incomplete token pair in storage");
                Ok(None)
            }
        }
    }

    pub fn access_token(&self) -> CoreResult<Option<String>> {
        Ok(self.load()?.map(|tokens| tokens.access_token))
    }

    pub fn save(&self, tokens: &SessionTokens) -> CoreResult<()> {
        let _guard = lock(&self.guard);
        self.backend.set_items(&[
            (ACCESS_TOKEN_KEY, tokens.access_token.as_str()),
            (REFRESH_TOKEN_KEY, tokens.refresh_token.as_str()),
        ])
    }

    pub fn clear(&self) -> CoreResult<()> {
        let _guard = lock(&self.guard);
        self.clear_locked()
    }

    fn clear_locked(&self) -> CoreResult<()> {
        self.backend.remove_items(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY])
    }

    /// Store `next` only if `expected` is still the stored pair
    ///
    /// Returns whether the write happened.
    pub fn replace_if(&self, expected: &SessionTokens, next: &SessionTokens) -> CoreResult<bool> {
        let _guard = lock(&self.guard);
        if self.load_locked()?.as_ref() != Some(expected) {
            return Ok(false);
        }
        self.backend.set_items(&[
            (ACCESS_TOKEN_KEY, next.access_token.as_str()),
            (REFRESH_TOKEN_KEY, next.refresh_token.as_str()),
        ])?;
        Ok(true)
    }

    /// Remove the pair only if it is still `expected`
    pub fn clear_if(&self, expected: &SessionTokens) -> CoreResult<bool> {
        let _guard = lock(&self.guard);
        if self.load_locked()?.as_ref() != Some(expected) {
            return Ok(false);
        }
        self.clear_locked()?;
        Ok(true)
    }
}
