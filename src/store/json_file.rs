//! Flat-file JSON persistence with atomic replacement
//!
//! Each document is one `<name>.json` file under the data directory.
//! Writes go to a temp file in the same directory and are renamed into
//! place, so a crash mid-write leaves the previous contents intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::StateStore;
use crate::{Error, Result};

/// File-backed state store rooted at a data directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::Store(format!("cannot create data dir {}: {e}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Store(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(name);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| Error::Store(format!("cannot create temp file in {}: {e}", self.dir.display())))?;
        tmp.write_all(bytes)
            .and_then(|()| tmp.flush())
            .map_err(|e| Error::Store(format!("cannot write {}: {e}", path.display())))?;
        tmp.persist(&path)
            .map_err(|e| Error::Store(format!("cannot replace {}: {e}", path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StateStore;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        assert!(store.load("ledger").unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        store.save("ledger", b"{\"1\":{}}").unwrap();
        assert_eq!(store.load("ledger").unwrap().unwrap(), b"{\"1\":{}}");
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        store.save("doc", b"old").unwrap();
        store.save("doc", b"new").unwrap();
        assert_eq!(store.load("doc").unwrap().unwrap(), b"new");
        // no stray temp files left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn documents_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        store.save("admins", b"a").unwrap();
        store.save("cooldowns", b"b").unwrap();
        assert_eq!(store.load("admins").unwrap().unwrap(), b"a");
        assert_eq!(store.load("cooldowns").unwrap().unwrap(), b"b");
    }
}
