//! Persistent key-value storage
//!
//! The store only needs two synchronous, fallible operations from its host
//! storage: read a slot and write a slot. `MemoryStorage` backs native builds
//! and tests; the browser adapter lives in [`crate::platform`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Errors raised by a storage backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("quota exceeded writing {key:?}: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
    #[error("storage access failed for {key:?}: {message}")]
    Access { key: String, message: String },
}

/// Synchronous string-keyed, string-valued storage
pub trait KeyValueStorage {
    /// Read a slot. `Ok(None)` means the slot does not exist.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a slot, replacing any previous text
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for &S {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Rc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }
}

/// In-memory storage. Clones share the same slots, so a test can keep a
/// handle and inspect what a store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Rc<RefCell<HashMap<String, String>>>,
    /// Byte budget over all keys and values, like the browser's per-origin quota
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys plus values exceed `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            slots: Rc::default(),
            quota: Some(quota),
        }
    }

    pub fn remove_item(&self, key: &str) -> Option<String> {
        self.slots.borrow_mut().remove(key)
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        self.slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_get_set() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a"), Ok(None));

        storage.set_item("a", "1").unwrap();
        storage.set_item("a", "2").unwrap();
        assert_eq!(storage.get_item("a"), Ok(Some("2".to_string())));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_memory_storage_clones_share_slots() {
        let storage = MemoryStorage::new();
        let view = storage.clone();
        storage.set_item("k", "v").unwrap();
        assert_eq!(view.get_item("k"), Ok(Some("v".to_string())));

        assert_eq!(view.remove_item("k"), Some("v".to_string()));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_storage_quota() {
        let storage = MemoryStorage::with_quota(8);
        storage.set_item("key", "12345").unwrap();

        // Overwriting the same key only counts the new value
        storage.set_item("key", "54321").unwrap();

        let err = storage.set_item("key", "123456").unwrap_err();
        assert_eq!(
            err,
            StorageError::QuotaExceeded {
                key: "key".to_string(),
                needed: 9,
                quota: 8,
            }
        );
        assert_eq!(storage.get_item("key"), Ok(Some("54321".to_string())));
    }

    #[test]
    fn test_forwarding_impls() {
        let storage = Rc::new(MemoryStorage::new());
        storage.set_item("x", "y").unwrap();
        let by_ref = &*storage;
        assert_eq!(KeyValueStorage::get_item(&by_ref, "x"), Ok(Some("y".to_string())));
    }
}
