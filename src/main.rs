//! Source Index demo entry point
//!
//! The store is meant to run in the browser (see `bindings`). Natively this
//! walks a selection session against in-memory storage and logs each step.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use source_index::consts::SELECTED_SOURCE_INDEX_KEY;
    use source_index::{KeyValueStorage, MemoryStorage, SourceIndexId, SourceIndexStore};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Source Index (native) starting...");

    let storage = MemoryStorage::new();
    let slot = |storage: &MemoryStorage| {
        storage
            .get_item(SELECTED_SOURCE_INDEX_KEY)
            .ok()
            .flatten()
            .unwrap_or_default()
    };

    let store = SourceIndexStore::new(Some(storage.clone()));
    let sub = store.subscribe(|value| match value {
        Some(id) => log::info!("Selected source index: {id}"),
        None => log::info!("No source index selected"),
    });

    store.set(Some(SourceIndexId::Id(5)));
    log::info!("Slot now holds {:?}", slot(&storage));

    store.update(|v| match v {
        None => Some(SourceIndexId::Id(0)),
        Some(id) => id.as_i64().map(|n| SourceIndexId::Id(n + 1)),
    });
    log::info!("Slot now holds {:?}", slot(&storage));

    sub.unsubscribe();
    drop(store);

    // A fresh store picks the selection back up
    let reloaded = SourceIndexStore::new(Some(storage.clone()));
    log::info!("Reloaded selection: {:?}", reloaded.get());

    reloaded.set(None);
    log::info!("Slot now holds {:?}", slot(&storage));
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is bindings::start, this is just to satisfy the compiler
}
