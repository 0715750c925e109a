//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Detecting an interactive (browser) environment
//! - Storage (LocalStorage on web)

use crate::storage::{KeyValueStorage, StorageError};

/// True when running in a browser with a `window`. Server-side and native
/// runs have no host storage to touch.
#[cfg(target_arch = "wasm32")]
pub fn is_browser() -> bool {
    web_sys::window().is_some()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn is_browser() -> bool {
    false
}

/// Host storage, if this environment is allowed to use it
pub fn host_storage() -> Option<LocalStorage> {
    is_browser().then_some(LocalStorage)
}

/// The browser's `window.localStorage`
///
/// The storage object is looked up on every call: a page can have storage
/// disabled or revoked, and that must surface as an error on the access
/// that hits it rather than at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn storage(&self) -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            Ok(None) => Err(StorageError::Unavailable(
                "localStorage is disabled".to_string(),
            )),
            Err(err) => Err(StorageError::Unavailable(describe(&err))),
        }
    }
}

/// Readable text for a thrown JS value (DOMException name and message)
#[cfg(target_arch = "wasm32")]
fn describe(err: &wasm_bindgen::JsValue) -> String {
    use wasm_bindgen::JsCast;

    if let Some(exception) = err.dyn_ref::<web_sys::DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStorage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|err| StorageError::Access {
                key: key.to_string(),
                message: describe(&err),
            })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|err| StorageError::Access {
                key: key.to_string(),
                message: describe(&err),
            })
    }
}

/// Native stub: there is no host storage outside the browser
#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStorage for LocalStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable(
            "localStorage requires a browser".to_string(),
        ))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(
            "localStorage requires a browser".to_string(),
        ))
    }
}
