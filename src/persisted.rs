//! Write-through persistence for a [`Writable`]
//!
//! A `Persisted` store reads its initial value from a named storage slot and
//! writes every change back to it. Storage failures are logged and ignored:
//! the in-memory value is always authoritative for the current session.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::storage::KeyValueStorage;
use crate::store::{Unsubscriber, Writable};

/// Text encoding of a value in its storage slot
pub trait SlotCodec {
    type Value: Clone + PartialEq + 'static;

    /// Decode slot text. `None` means the slot was missing or unreadable.
    fn decode(&self, raw: Option<&str>) -> Self::Value;

    fn encode(&self, value: &Self::Value) -> String;
}

/// JSON encoding for serde types, falling back to `T::default()` when the
/// slot is empty or holds something that no longer parses.
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotCodec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + PartialEq + 'static,
{
    type Value = T;

    fn decode(&self, raw: Option<&str>) -> T {
        let Some(json) = raw.filter(|s| !s.is_empty()) else {
            return T::default();
        };
        match serde_json::from_str(json) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Discarding unreadable stored value: {err}");
                T::default()
            }
        }
    }

    fn encode(&self, value: &T) -> String {
        match serde_json::to_string(value) {
            Ok(json) => json,
            Err(err) => {
                log::error!("Failed to encode value for storage: {err}");
                String::new()
            }
        }
    }
}

/// A [`Writable`] mirrored into a storage slot
pub struct Persisted<C: SlotCodec> {
    key: String,
    store: Writable<C::Value>,
    persistence: Option<Unsubscriber<C::Value>>,
}

impl<C: SlotCodec + 'static> Persisted<C> {
    /// Load the slot and start mirroring changes into it.
    ///
    /// `storage` is `None` when the environment has no usable host storage;
    /// the store then starts from `codec.decode(None)` and never writes.
    pub fn new<S>(key: impl Into<String>, storage: Option<S>, codec: C) -> Self
    where
        S: KeyValueStorage + 'static,
    {
        let key = key.into();

        let initial = match &storage {
            None => codec.decode(None),
            Some(storage) => match storage.get_item(&key) {
                Ok(raw) => {
                    log::debug!("Loaded {key:?} from storage: {raw:?}");
                    codec.decode(raw.as_deref())
                }
                Err(err) => {
                    log::error!("Failed to read {key:?} from storage, starting empty: {err}");
                    codec.decode(None)
                }
            },
        };

        let store = Writable::new(initial);

        let slot = key.clone();
        let persistence = store.subscribe(move |value: &C::Value| {
            let Some(storage) = &storage else {
                return;
            };
            if let Err(err) = storage.set_item(&slot, &codec.encode(value)) {
                log::error!("Failed to write {slot:?} to storage: {err}");
            }
        });

        Self {
            key,
            store,
            persistence: Some(persistence),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value
    pub fn get(&self) -> C::Value {
        self.store.get()
    }

    #[must_use = "dropping the handle keeps the subscription alive forever"]
    pub fn subscribe(&self, callback: impl FnMut(&C::Value) + 'static) -> Unsubscriber<C::Value> {
        self.store.subscribe(callback)
    }

    pub fn set(&self, value: C::Value) {
        self.store.set(value);
    }

    pub fn update(&self, f: impl FnOnce(&C::Value) -> C::Value) {
        self.store.update(f);
    }

    /// The underlying container, for code that only needs the value
    pub fn writable(&self) -> &Writable<C::Value> {
        &self.store
    }

    /// Whether changes are still being written to storage
    pub fn is_persisting(&self) -> bool {
        self.persistence.is_some()
    }

    /// Stop writing to storage. The in-memory store keeps working.
    pub fn dispose(&mut self) {
        if let Some(persistence) = self.persistence.take() {
            persistence.unsubscribe();
            log::debug!("Stopped persisting {:?}", self.key);
        }
    }
}
