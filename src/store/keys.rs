//! API key store
//!
//! Persists the key set as a single JSON document in the store root.
//! Keys are opaque bearer credentials; whoever holds one is authenticated.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{NvrError, Result};

/// Number of random bytes behind each key.
const KEY_BYTES: usize = 32;

/// Generate a new API key: 32 bytes of OS randomness, base64 (standard).
///
/// Uniqueness rests on entropy alone; there is no collision check. A failing
/// randomness source fails the calling request rather than degrading to a
/// weaker generator.
pub fn generate_key() -> Result<String> {
    let mut buf = [0u8; KEY_BYTES];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| NvrError::Entropy(e.to_string()))?;
    Ok(general_purpose::STANDARD.encode(buf))
}

/// File-backed API key store.
///
/// The in-memory map is authoritative during the process lifetime; every
/// mutation is written through to disk before it returns.
#[derive(Debug)]
pub struct ApiKeyStore {
    path: PathBuf,
    keys: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl ApiKeyStore {
    /// Open the store at `path`, loading any persisted key set. An unreadable
    /// file is logged and treated as empty; mutations surface their own
    /// errors.
    pub fn open(path: PathBuf) -> Self {
        let keys = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("api key file {} unreadable: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::error!("reading api key file {}: {}", path.display(), e);
                HashMap::new()
            }
        };
        Self {
            path,
            keys: RwLock::new(keys),
        }
    }

    /// Issue a new key and persist it.
    pub fn issue(&self) -> Result<String> {
        let key = generate_key()?;
        let mut keys = self.keys.write();
        keys.insert(key.clone(), Utc::now());
        self.persist(&keys)?;
        Ok(key)
    }

    /// Revoke a key. Irreversible.
    pub fn revoke(&self, key: &str) -> Result<()> {
        let mut keys = self.keys.write();
        if keys.remove(key).is_none() {
            return Err(NvrError::KeyNotFound);
        }
        self.persist(&keys)
    }

    /// Does the key exist?
    pub fn exists(&self, key: &str) -> bool {
        self.keys.read().contains_key(key)
    }

    /// True when no keys have been issued yet (bootstrap state).
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    fn persist(&self, keys: &HashMap<String, DateTime<Utc>>) -> Result<()> {
        let raw = serde_json::to_string_pretty(keys)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn temp_store() -> (tempfile::TempDir, ApiKeyStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ApiKeyStore::open(dir.path().join("api_keys.json"));
        (dir, store)
    }

    #[test]
    fn test_generated_keys_distinct_and_32_bytes() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let key = generate_key().unwrap();
            let raw = general_purpose::STANDARD.decode(&key).unwrap();
            assert_eq!(raw.len(), 32);
            assert!(seen.insert(key), "duplicate key generated");
        }
    }

    #[test]
    fn test_issue_exists_revoke() {
        let (_dir, store) = temp_store();
        assert!(store.is_empty());

        let key = store.issue().unwrap();
        assert!(store.exists(&key));
        assert!(!store.is_empty());
        assert_eq!(store.len(), 1);

        store.revoke(&key).unwrap();
        assert!(!store.exists(&key));
        assert!(store.is_empty());
    }

    #[test]
    fn test_revoke_unknown_key() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.revoke("no-such-key"),
            Err(NvrError::KeyNotFound)
        ));
    }

    #[test]
    fn test_keys_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_keys.json");

        let store = ApiKeyStore::open(path.clone());
        let key = store.issue().unwrap();
        drop(store);

        let reopened = ApiKeyStore::open(path);
        assert!(reopened.exists(&key));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_keys.json");
        fs::write(&path, "not json").unwrap();

        let store = ApiKeyStore::open(path);
        assert!(store.is_empty());
    }
}
