//! Selected source index store
//!
//! Holds the id of the currently selected source index (or none) and keeps
//! it in the `selectedSourceIndexId` LocalStorage slot so the selection
//! survives a reload.
//!
//! Slot encoding:
//! - `""` (or a missing slot): no selection
//! - decimal text: that id
//! - anything else reads back as [`SourceIndexId::NotANumber`], which is
//!   written out as `"NaN"`

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::consts::SELECTED_SOURCE_INDEX_KEY;
use crate::persisted::{Persisted, SlotCodec};
use crate::platform::{self, LocalStorage};
use crate::storage::KeyValueStorage;
use crate::store::{Unsubscriber, Writable};

/// Selected source index id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceIndexId {
    Id(i64),
    /// Stored text that is not a number. Kept as-is instead of being reset
    /// to "no selection".
    NotANumber,
}

impl SourceIndexId {
    /// Parse slot text as a base-10 integer (surrounding whitespace allowed)
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<i64>() {
            Ok(id) => SourceIndexId::Id(id),
            Err(_) => SourceIndexId::NotANumber,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SourceIndexId::Id(id) => Some(*id),
            SourceIndexId::NotANumber => None,
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, SourceIndexId::NotANumber)
    }

    /// Id for a JS number. Only integers a JS number holds exactly (up to
    /// 2^53 - 1 in magnitude) become `Id`; anything else is `NotANumber`.
    pub fn from_f64(n: f64) -> Self {
        if !n.is_finite() || n.fract() != 0.0 {
            return SourceIndexId::NotANumber;
        }
        if n.abs() > MAX_SAFE_INTEGER as f64 {
            log::warn!("Source index id {n} is beyond exact number range, storing NaN");
            return SourceIndexId::NotANumber;
        }
        SourceIndexId::Id(n as i64)
    }

    /// The id as a JS number. Ids past 2^53 - 1 in magnitude lose precision.
    pub fn to_f64(&self) -> f64 {
        match self {
            SourceIndexId::Id(id) => {
                if id.unsigned_abs() > MAX_SAFE_INTEGER as u64 {
                    log::warn!("Source index id {id} cannot be represented exactly as a number");
                }
                *id as f64
            }
            SourceIndexId::NotANumber => f64::NAN,
        }
    }
}

/// Largest integer a double represents exactly, along with all below it
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

impl From<i64> for SourceIndexId {
    fn from(id: i64) -> Self {
        SourceIndexId::Id(id)
    }
}

impl fmt::Display for SourceIndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceIndexId::Id(id) => write!(f, "{id}"),
            SourceIndexId::NotANumber => f.write_str("NaN"),
        }
    }
}

impl Serialize for SourceIndexId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SourceIndexId::Id(id) => serializer.serialize_i64(*id),
            SourceIndexId::NotANumber => serializer.serialize_str("NaN"),
        }
    }
}

impl<'de> Deserialize<'de> for SourceIndexId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(i64),
            Text(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Number(id) => SourceIndexId::Id(id),
            Repr::Text(text) => SourceIndexId::parse(&text),
        })
    }
}

/// Slot encoding for `Option<SourceIndexId>`
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceIndexCodec;

impl SlotCodec for SourceIndexCodec {
    type Value = Option<SourceIndexId>;

    fn decode(&self, raw: Option<&str>) -> Option<SourceIndexId> {
        match raw {
            None | Some("") => None,
            Some(text) => Some(SourceIndexId::parse(text)),
        }
    }

    fn encode(&self, value: &Option<SourceIndexId>) -> String {
        value.map(|id| id.to_string()).unwrap_or_default()
    }
}

/// The persisted selection store
///
/// Construct once and hand it to whatever needs the selection. Call
/// [`dispose`](Self::dispose) to stop the write-through.
pub struct SourceIndexStore {
    inner: Persisted<SourceIndexCodec>,
}

impl SourceIndexStore {
    /// `storage` is `None` when no host storage may be touched
    pub fn new<S: KeyValueStorage + 'static>(storage: Option<S>) -> Self {
        Self {
            inner: Persisted::new(SELECTED_SOURCE_INDEX_KEY, storage, SourceIndexCodec),
        }
    }

    /// Store backed by the browser's LocalStorage, or memory-only when not
    /// running in a browser
    pub fn from_environment() -> Self {
        Self::new::<LocalStorage>(platform::host_storage())
    }

    pub fn get(&self) -> Option<SourceIndexId> {
        self.inner.get()
    }

    #[must_use = "dropping the handle keeps the subscription alive forever"]
    pub fn subscribe(
        &self,
        callback: impl FnMut(&Option<SourceIndexId>) + 'static,
    ) -> Unsubscriber<Option<SourceIndexId>> {
        self.inner.subscribe(callback)
    }

    pub fn set(&self, value: Option<SourceIndexId>) {
        self.inner.set(value);
    }

    pub fn update(&self, f: impl FnOnce(&Option<SourceIndexId>) -> Option<SourceIndexId>) {
        self.inner.update(f);
    }

    pub fn writable(&self) -> &Writable<Option<SourceIndexId>> {
        self.inner.writable()
    }

    pub fn is_persisting(&self) -> bool {
        self.inner.is_persisting()
    }

    pub fn dispose(&mut self) {
        self.inner.dispose();
    }
}
