//! Durable key-value storage for session state.
//!
//! Custom endpoints, call history, the latency cache and the selected chain
//! are all persisted as JSON strings under fixed keys. Components receive a
//! `Arc<dyn KeyValueStore>` so tests can swap in [`MemoryStore`].

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Storage keys
// ---------------------------------------------------------------------------

pub const KEY_CUSTOM_ENDPOINTS: &str = "rpc-caller-custom-endpoints";
pub const KEY_CALL_HISTORY: &str = "rpc-caller-call-history";
pub const KEY_LATENCY_CACHE: &str = "rpc-caller-rpc-latency-cache";
pub const KEY_SELECTED_CHAIN: &str = "rpc-caller-selected-chain";
pub const KEY_SELECTED_ENDPOINT: &str = "rpc-caller-selected-endpoint";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// String key-value store scoped to the local user session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a JSON value. Missing keys, unreadable stores and
/// corrupt JSON all yield `T::default()`; the latter two are logged.
pub fn load_json<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "Corrupt stored value, using defaults: {e}");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, "Failed to read stored value: {e:#}");
            T::default()
        }
    }
}

/// Serialize `value` as JSON and store it under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value)
        .with_context(|| format!("Failed to serialize value for {key}"))?;
    store.set(key, &json)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
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
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Store backed by a single JSON object file.
///
/// The file is re-read on every access and rewritten on every mutation, so
/// two handles on the same path always observe each other's writes. The
/// mutex only serializes read-modify-write cycles within this process.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store: {}", self.path.display()))?;
        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), "Corrupt store file, starting empty: {e}");
                Ok(HashMap::new())
            }
        }
    }

    fn write_all(&self, map: &HashMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        let content = serde_json::to_string_pretty(map).context("Failed to serialize store")?;

        // Write a sibling temp file, then rename it over the store.
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())
            .context("Failed to write store temp file")?;
        tmp.as_file().sync_all().context("Failed to flush store temp file")?;

        // Owner-only on Unix (0o600 = rw-------), set before the rename.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .context("Failed to set store file permissions")?;
        }

        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write store: {}", self.path.display()))?;

        debug!(path = %self.path.display(), keys = map.len(), "store saved");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value.to_string());
        self.write_all(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_get_set_remove() {
        let store = MemoryStore::new();
        assert!(store.get("a").unwrap().is_none());
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn file_store_persists_across_handles() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("store.json");

        let first = FileStore::new(&path);
        first.set(KEY_SELECTED_CHAIN, "\"evm:1\"").unwrap();

        let second = FileStore::new(&path);
        assert_eq!(
            second.get(KEY_SELECTED_CHAIN).unwrap().as_deref(),
            Some("\"evm:1\"")
        );

        second.remove(KEY_SELECTED_CHAIN).unwrap();
        assert!(first.get(KEY_SELECTED_CHAIN).unwrap().is_none());
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("absent.json"));
        assert!(store.get("anything").unwrap().is_none());
    }

    #[test]
    fn file_store_corrupt_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, "NOT JSON {{{").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get("k").unwrap().is_none());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        FileStore::new(&path).set("k", "v").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_replaces_a_world_readable_file() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, r#"{"old":"1"}"#).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileStore::new(&path);
        store.set("k", "v").unwrap();
        store.set("k2", "v2").unwrap();
        store.remove("old").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.get("k2").unwrap().as_deref(), Some("v2"));
        assert!(store.get("old").unwrap().is_none());

        // No temp files are left beside the store.
        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("store.json")]);
    }

    #[test]
    fn load_json_falls_back_on_corrupt_value() {
        let store = MemoryStore::new();
        store.set("list", "[1, 2").unwrap();
        let loaded: Vec<u32> = load_json(&store, "list");
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_then_load_json() {
        let store = MemoryStore::new();
        save_json(&store, "list", &vec![3u32, 4]).unwrap();
        let loaded: Vec<u32> = load_json(&store, "list");
        assert_eq!(loaded, vec![3, 4]);
    }
}
