//! Shared session attribute map

use super::SessionAttributes;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// In-process session attributes. Clones share the same map, so the caller
/// keeps a handle while a handler owns another.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    attributes: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current attributes
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionAttributes for SessionContext {
    fn get(&self, key: &str) -> Option<String> {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn clear(&self) {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn contains(&self, key: &str) -> bool {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}
