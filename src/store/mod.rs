//! Named-document state persistence
//!
//! Policy state lives in three independently persisted JSON documents
//! (message ledger, custom-admin sets, cooldown overrides) so corruption
//! in one never loses the others. The trait is object-safe so tests can
//! substitute [`MemoryStore`] without touching a filesystem.

pub mod json_file;

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

pub use json_file::JsonFileStore;

/// Load/save of named byte documents in durable storage
///
/// `load` returns `None` for a document that has never been written.
pub trait StateStore: Send + Sync {
    /// Load the raw bytes of a named document, or `None` if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read.
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Durably replace a named document
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. Previously durable contents
    /// must survive a failed or interrupted write.
    fn save(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// Load and deserialize a named document, falling back to the default
///
/// A missing document is the normal first-run case. An unreadable or
/// corrupt document is logged and also falls back; startup never fails
/// on bad state files.
pub fn load_document<T: DeserializeOwned + Default>(store: &dyn StateStore, name: &str) -> T {
    match store.load(name) {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(document = name, error = %e, "corrupt state document, starting empty");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(document = name, error = %e, "failed to read state document, starting empty");
            T::default()
        }
    }
}

/// Serialize and persist a named document
///
/// # Errors
///
/// Returns an error if serialization or the underlying write fails.
/// Callers decide whether that is fatal; for write-through policy state
/// it is surfaced but the in-memory change stands.
pub fn save_document<T: Serialize>(store: &dyn StateStore, name: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    store.save(name, &bytes)
}

/// In-memory store for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail, to exercise durability-warning paths
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = fail;
    }
}

impl StateStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let docs = self.docs.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(docs.get(name).cloned())
    }

    fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        if *self.fail_writes.lock().unwrap_or_else(std::sync::PoisonError::into_inner) {
            return Err(Error::Store(format!("simulated write failure: {name}")));
        }
        let mut docs = self.docs.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        docs.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Doc {
        count: u32,
    }

    #[test]
    fn missing_document_loads_default() {
        let store = MemoryStore::new();
        let doc: Doc = load_document(&store, "nothing");
        assert_eq!(doc, Doc::default());
    }

    #[test]
    fn round_trip() {
        let store = MemoryStore::new();
        save_document(&store, "doc", &Doc { count: 7 }).unwrap();
        let doc: Doc = load_document(&store, "doc");
        assert_eq!(doc.count, 7);
    }

    #[test]
    fn corrupt_document_loads_default() {
        let store = MemoryStore::new();
        store.save("doc", b"{not json").unwrap();
        let doc: Doc = load_document(&store, "doc");
        assert_eq!(doc, Doc::default());
    }

    #[test]
    fn write_failure_is_surfaced() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        assert!(save_document(&store, "doc", &Doc { count: 1 }).is_err());
    }
}
