//! JavaScript bindings
//!
//! Exposes the selection store to JS with the store contract UI code
//! expects: `subscribe(fn) -> unsubscribe`, `set(value)`, `update(fn)`.
//! Values cross the boundary as `null`, a number, or `NaN`.

use js_sys::Function;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::consts::LOG_LEVEL;
use crate::source_index::{SourceIndexId, SourceIndexStore};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(LOG_LEVEL) {
        web_sys::console::warn_1(&JsValue::from_str(&format!("Logger already set: {err}")));
    }
}

fn to_js(value: Option<SourceIndexId>) -> JsValue {
    match value {
        None => JsValue::NULL,
        Some(id) => JsValue::from_f64(id.to_f64()),
    }
}

fn from_js(value: &JsValue) -> Option<SourceIndexId> {
    if value.is_null() || value.is_undefined() {
        return None;
    }
    let id = match value.as_f64() {
        Some(n) => SourceIndexId::from_f64(n),
        None => match value.as_string() {
            Some(text) => SourceIndexId::parse(&text),
            None => SourceIndexId::NotANumber,
        },
    };
    Some(id)
}

/// JS handle around a [`SourceIndexStore`] backed by LocalStorage
#[wasm_bindgen]
pub struct SourceIndexStoreHandle {
    store: SourceIndexStore,
}

#[wasm_bindgen]
impl SourceIndexStoreHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            store: SourceIndexStore::from_environment(),
        }
    }

    /// Register `callback`; returns a function that removes it
    pub fn subscribe(&self, callback: Function) -> Function {
        let sub = self.store.subscribe(move |value| {
            if let Err(err) = callback.call1(&JsValue::NULL, &to_js(*value)) {
                log::error!("Source index subscriber threw: {err:?}");
            }
        });

        let mut sub = Some(sub);
        let unsubscribe = Closure::<dyn FnMut()>::new(move || {
            if let Some(sub) = sub.take() {
                sub.unsubscribe();
            }
        });
        unsubscribe.into_js_value().unchecked_into()
    }

    pub fn set(&self, value: JsValue) {
        self.store.set(from_js(&value));
    }

    pub fn update(&self, updater: Function) {
        self.store.update(|current| {
            match updater.call1(&JsValue::NULL, &to_js(*current)) {
                Ok(next) => from_js(&next),
                Err(err) => {
                    log::error!("Source index updater threw: {err:?}");
                    *current
                }
            }
        });
    }

    pub fn get(&self) -> JsValue {
        to_js(self.store.get())
    }

    pub fn dispose(&mut self) {
        self.store.dispose();
    }
}

impl Default for SourceIndexStoreHandle {
    fn default() -> Self {
        Self::new()
    }
}
