//! The key-value capability the kernel is handed.
//!
//! The kernel never assumes durability beyond "a read after a write sees the
//! write within the same process". Values are JSON arrays for ledgers or
//! stringified integers for clocks.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use pilot_core::KernelError;

/// Opaque ordered key → string map. Implementations may be an in-memory map,
/// an embedded database, or any remote KV.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, KernelError>;
    fn set(&self, key: &str, value: &str) -> Result<(), KernelError>;
    fn remove(&self, key: &str) -> Result<(), KernelError>;
}

// ── MemoryKv ─────────────────────────────────────────────────────────────────

/// In-memory store for tests and MOCK hosts.
#[derive(Default)]
pub struct MemoryKv {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KernelError> {
        let map = self
            .map
            .lock()
            .map_err(|_| KernelError::Storage("poisoned kv lock".to_string()))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KernelError> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| KernelError::Storage("poisoned kv lock".to_string()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KernelError> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| KernelError::Storage("poisoned kv lock".to_string()))?;
        map.remove(key);
        Ok(())
    }
}

// ── SledKv ───────────────────────────────────────────────────────────────────

/// Persistent store backed by sled (pure-Rust, no C dependencies).
pub struct SledKv {
    db: sled::Db,
}

impl SledKv {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KernelError> {
        let db = sled::open(path).map_err(|e| KernelError::Storage(e.to_string()))?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), KernelError> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| KernelError::Storage(e.to_string()))
    }
}

impl KvStore for SledKv {
    fn get(&self, key: &str) -> Result<Option<String>, KernelError> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| KernelError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let s = String::from_utf8(bytes.to_vec())
                    .map_err(|e| KernelError::Serialization(e.to_string()))?;
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KernelError> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map(|_| ())
            .map_err(|e| KernelError::Storage(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), KernelError> {
        self.db
            .remove(key.as_bytes())
            .map(|_| ())
            .map_err(|e| KernelError::Storage(e.to_string()))
    }
}
