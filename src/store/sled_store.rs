//! Sled-based state store
//! Persistent key-value storage with crash safety, one tree per handler

use super::KeyValueStore;
use crate::error::StoreError;
use sled::{Db, Tree};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A named sled tree holding state text by store key
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    tree: Tree,
}

impl SledStore {
    /// Open (or create) the database at `path` and use tree `tree`
    pub fn open(path: impl AsRef<Path>, tree: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("cannot create {:?}: {}", parent, e)))?;
        }
        let db = sled::open(path)?;
        let tree = db.open_tree(tree)?;
        tracing::info!("Opened sled state store at {:?}", path);
        Ok(Self {
            db: Arc::new(db),
            tree,
        })
    }

    /// Another tree in the same database
    pub fn sibling(&self, tree: &str) -> Result<Self, StoreError> {
        Ok(Self {
            db: Arc::clone(&self.db),
            tree: self.db.open_tree(tree)?,
        })
    }

    /// Get the default database path
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let mut path = dirs::data_dir()
            .or_else(dirs::config_dir)
            .ok_or_else(|| StoreError::Unavailable("no data directory found".to_string()))?;
        path.push("skill-state");
        path.push("state.db");
        Ok(path)
    }

    pub fn tree_name(&self) -> String {
        String::from_utf8_lossy(&self.tree.name()).into_owned()
    }

    /// List all keys in the tree
    pub fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for key in self.tree.iter().keys() {
            let key = key?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| StoreError::Encoding {
                    key: key.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.tree.insert(key.as_bytes(), value.as_bytes())?;
        self.tree.flush()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.tree.remove(key.as_bytes())?;
        self.tree.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("tree", &self.tree_name())
            .finish()
    }
}
