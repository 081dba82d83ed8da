//! Backing stores for state handlers
//!
//! The user and application handlers persist through a [`KeyValueStore`];
//! the session handler writes into the caller-owned [`SessionAttributes`].

pub mod memory;
pub mod session;
pub mod sled_store;

pub use memory::InMemoryStore;
pub use session::SessionContext;
pub use sled_store::SledStore;

use crate::error::StoreError;

/// Minimal text key-value contract for durable state.
///
/// A missing key is `Ok(None)`, never an error.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`; deleting an absent key succeeds
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Per-conversation attribute map owned by the caller's session.
///
/// The engine reads and writes entries but never creates or drops the map.
pub trait SessionAttributes: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    fn remove(&self, key: &str);

    fn clear(&self);

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
