//! Key-value storage port.
//!
//! The fetch cache and the app state store both persist through
//! [`KeyValueStore`], so backends can be swapped without touching callers.
//! Values are opaque strings (JSON in practice).

use crate::config::StorageBackend;
use crate::db::Database;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Minimal synchronous key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value stored under `key`; missing keys are not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// List keys starting with `prefix`
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Open the configured backend at `path`
pub fn open(backend: StorageBackend, path: impl AsRef<Path>) -> Result<Arc<dyn KeyValueStore>> {
    let path = path.as_ref();
    let store: Arc<dyn KeyValueStore> = match backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::new(path)?),
        StorageBackend::Sqlite => Arc::new(Database::open(path)?),
    };
    Ok(store)
}

/// In-process store, used by tests and the `memory` backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Longest escaped key stored under its own name; longer keys are hashed
const MAX_NAME_LEN: usize = 200;
/// Readable part kept in front of the hash of a long key
const HASHED_PREFIX_LEN: usize = 64;
const PLAIN_EXT: &str = ".json";
const HASHED_EXT: &str = ".entry";

/// File contents for a hashed key, which cannot be decoded from the name
#[derive(Debug, Serialize, Deserialize)]
struct HashedEntry {
    key: String,
    value: String,
}

/// Directory-backed store writing one JSON file per key
pub struct FileStore {
    /// Root directory
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;
        info!(dir = %dir.display(), "File store initialized");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a key. Separators are escaped so every key maps to a
    /// distinct file directly under the root. Keys whose escaped form would
    /// exceed filesystem name limits get a readable prefix plus a SHA-256 of
    /// the key, and keep the key itself inside the file.
    fn path_for(&self, key: &str) -> PathBuf {
        let name = escape(key);
        if name.len() <= MAX_NAME_LEN {
            return self.dir.join(format!("{}{}", name, PLAIN_EXT));
        }

        let mut cut = HASHED_PREFIX_LEN;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        self.dir
            .join(format!("{}~{}{}", &name[..cut], hash_key(key), HASHED_EXT))
    }

    fn is_hashed(path: &Path) -> bool {
        path.to_str().is_some_and(|p| p.ends_with(HASHED_EXT))
    }

    fn read_hashed(path: &Path) -> Result<HashedEntry> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read store file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse store file: {}", path.display()))
    }

    fn key_for(file_name: &str) -> Option<String> {
        let encoded = file_name.strip_suffix(PLAIN_EXT)?;
        let mut key = String::with_capacity(encoded.len());
        let mut chars = encoded.chars();
        while let Some(c) = chars.next() {
            if c == '%' {
                let hex: String = chars.by_ref().take(2).collect();
                let byte = u8::from_str_radix(&hex, 16).ok()?;
                key.push(byte as char);
            } else {
                key.push(c);
            }
        }
        Some(key)
    }
}

fn escape(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '%' => name.push_str("%25"),
            '/' => name.push_str("%2F"),
            '\\' => name.push_str("%5C"),
            ':' => name.push_str("%3A"),
            '*' => name.push_str("%2A"),
            '?' => name.push_str("%3F"),
            '"' => name.push_str("%22"),
            '<' => name.push_str("%3C"),
            '>' => name.push_str("%3E"),
            '|' => name.push_str("%7C"),
            c => name.push(c),
        }
    }
    name
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(key = key, "Store miss");
            return Ok(None);
        }

        if Self::is_hashed(&path) {
            let entry = Self::read_hashed(&path)?;
            return Ok((entry.key == key).then_some(entry.value));
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read store file: {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let content = if Self::is_hashed(&path) {
            serde_json::to_string(&HashedEntry {
                key: key.to_string(),
                value: value.to_string(),
            })?
        } else {
            value.to_string()
        };
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write store file: {}", path.display()))?;
        debug!(key = key, path = %path.display(), "Store write");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove store file: {}", path.display()))?;
        }
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list store directory: {}", self.dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let key = if Self::is_hashed(&path) {
                Some(Self::read_hashed(&path)?.key)
            } else {
                entry.file_name().to_str().and_then(Self::key_for)
            };
            if let Some(key) = key {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
