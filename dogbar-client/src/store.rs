//! Key-value stores backing the session
//!
//! The admin console keeps two stores: a persistent one that survives
//! restarts (session token, cached admin info) and a transient one scoped
//! to the current run (return URL after login).

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// String key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
    fn clear(&self);

    /// Remove every key starting with `prefix`, returns how many were removed
    fn remove_prefixed(&self, prefix: &str) -> usize {
        let doomed: Vec<String> = self
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// JSON-file backed store, written through on every mutation
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or create) the store at `base_path/filename`
    pub fn open(base_path: impl Into<PathBuf>, filename: &str) -> Self {
        let path = base_path.into().join(filename);
        let entries = Self::load(&path).unwrap_or_default();
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Option<BTreeMap<String, String>> {
        if !path.exists() {
            return None;
        }
        let json = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&json) {
            Ok(map) => Some(map),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt session store");
                None
            }
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(entries)?;
            fs::write(&self.path, json)
        })();

        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist session store");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write();
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    fn clear(&self) {
        let mut entries = self.entries.write();
        entries.clear();
        self.persist(&entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_prefix_removal() {
        let store = MemoryStore::new();
        store.set("sb-token", "a");
        store.set("sb-refresh", "b");
        store.set("theme", "dark");

        assert_eq!(store.remove_prefixed("sb-"), 2);
        assert_eq!(store.keys(), vec!["theme".to_string()]);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), "session.json");
            store.set("admin_user", "a@b.co");
            store.set("returnUrl", "/admin/media.html");
            store.remove("returnUrl");
        }

        let reopened = FileStore::open(dir.path(), "session.json");
        assert_eq!(reopened.get("admin_user").as_deref(), Some("a@b.co"));
        assert_eq!(reopened.get("returnUrl"), None);

        reopened.clear();
        let again = FileStore::open(dir.path(), "session.json");
        assert!(again.keys().is_empty());
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("session.json"), "{not json").unwrap();
        let store = FileStore::open(dir.path(), "session.json");
        assert!(store.keys().is_empty());
    }
}
