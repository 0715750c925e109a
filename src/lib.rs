//! Source Index - persisted selection store
//!
//! Core modules:
//! - `store`: Reactive value container (subscribe/set/update)
//! - `storage`: Key-value storage trait and in-memory backend
//! - `platform`: Browser/native platform abstraction
//! - `persisted`: Write-through binding of a store to a storage slot
//! - `source_index`: The selected source index store

pub mod persisted;
pub mod platform;
pub mod source_index;
pub mod storage;
pub mod store;

#[cfg(target_arch = "wasm32")]
pub mod bindings;

pub use persisted::{JsonCodec, Persisted, SlotCodec};
pub use source_index::{SourceIndexCodec, SourceIndexId, SourceIndexStore};
pub use storage::{KeyValueStorage, MemoryStorage, StorageError};
pub use store::{Unsubscriber, Writable};

/// Configuration constants
pub mod consts {
    /// LocalStorage slot holding the selected source index id
    pub const SELECTED_SOURCE_INDEX_KEY: &str = "selectedSourceIndexId";

    /// Console log level for the web build
    pub const LOG_LEVEL: log::Level = log::Level::Info;
}
